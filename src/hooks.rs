//! Collaborators the batch editor calls out to.
//!
//! Location lookups, backups and count refreshes live outside this crate.
//! The editor reaches them through these traits; the defaults do nothing
//! beyond logging.

use crate::db::{LabelCandidate, Photo};
use crate::error::Result;

/// Result of re-running location side effects for a photo.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocationUpdate {
    pub keywords: Vec<String>,
    pub labels: Vec<LabelCandidate>,
}

/// Reverse geocoding and other location-derived metadata.
pub trait LocationProvider {
    /// Called only when a location field of `photo` changed.
    fn update_location(&self, photo: &Photo) -> Result<LocationUpdate>;
}

/// Best-effort export of an edited photo (e.g. a sidecar file).
pub trait BackupHook {
    fn save_snapshot(&self, photo: &Photo) -> Result<()>;
}

/// Notified once per batch when at least one photo was saved.
pub trait CountsPublisher {
    fn counts_changed(&self);
}

/// Default collaborator: no location data, no backups, counts only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHooks;

impl LocationProvider for NoopHooks {
    fn update_location(&self, _photo: &Photo) -> Result<LocationUpdate> {
        Ok(LocationUpdate::default())
    }
}

impl BackupHook for NoopHooks {
    fn save_snapshot(&self, _photo: &Photo) -> Result<()> {
        Ok(())
    }
}

impl CountsPublisher for NoopHooks {
    fn counts_changed(&self) {
        tracing::debug!("Photo counts changed");
    }
}

/// Bundle of collaborators handed to the editor.
#[derive(Clone, Copy)]
pub struct Hooks<'a> {
    pub location: &'a dyn LocationProvider,
    pub backup: &'a dyn BackupHook,
    pub counts: &'a dyn CountsPublisher,
}

impl Default for Hooks<'static> {
    fn default() -> Self {
        static NOOP: NoopHooks = NoopHooks;
        Self {
            location: &NOOP,
            backup: &NOOP,
            counts: &NOOP,
        }
    }
}
