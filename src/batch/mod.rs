//! Batch editing: apply one form to many photos.

pub mod action;
pub mod dates;
pub mod form;
pub mod labels;
pub mod relations;
pub mod resolver;
pub mod save;

#[cfg(test)]
pub(crate) mod test_support;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

pub use action::{Action, Field, Item, Items, MIXED};
pub use dates::{compute_date_change, DateChange};
pub use form::PhotosForm;
pub use labels::{decide_removal, RemovalDecision};
pub use resolver::{EntityKind, TitleResolver};
pub use save::{SaveRequest, Saver};

use crate::db::{albums::ALBUM_TYPE_DEFAULT, Photo, RetryPolicy, Store};
use crate::error::{Error, Result};
use crate::hooks::Hooks;
use crate::source::PriorityTable;
use relations::{apply_albums, apply_labels, RelationOutcome};

/// What happened to one selected photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoOutcome {
    /// Changed columns were written.
    Saved,
    /// The form did not change anything on this photo.
    Unchanged,
    /// The photo could not be loaded or the form could not be applied to it.
    Skipped,
    /// Writing the photo failed.
    Failed,
}

/// Relation mutations across the whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationStats {
    /// Photos with at least one changed relation.
    pub photos: usize,
    /// Individual relation rows changed.
    pub changes: usize,
    pub errors: usize,
}

impl MutationStats {
    fn add(&mut self, outcome: &RelationOutcome) {
        if outcome.changed > 0 {
            self.photos += 1;
        }
        self.changes += outcome.changed;
        self.errors += outcome.errors.len();
    }
}

#[derive(Debug, Default)]
pub struct BatchResult {
    /// Number of photos in the selection.
    pub selected: usize,
    pub outcomes: Vec<(String, PhotoOutcome)>,
    pub albums: MutationStats,
    pub labels: MutationStats,
    pub errors: Vec<Error>,
    pub cancelled: bool,
}

impl BatchResult {
    fn count(&self, outcome: PhotoOutcome) -> usize {
        self.outcomes.iter().filter(|(_, o)| *o == outcome).count()
    }

    pub fn saved(&self) -> usize {
        self.count(PhotoOutcome::Saved)
    }

    pub fn unchanged(&self) -> usize {
        self.count(PhotoOutcome::Unchanged)
    }

    pub fn skipped(&self) -> usize {
        self.count(PhotoOutcome::Skipped)
    }

    pub fn failed(&self) -> usize {
        self.count(PhotoOutcome::Failed)
    }

    /// Photos that reached the save step.
    pub fn attempted(&self) -> usize {
        self.saved() + self.unchanged() + self.failed()
    }

    pub fn any_saved(&self) -> bool {
        self.saved() > 0
    }

    pub fn outcome(&self, uid: &str) -> Option<PhotoOutcome> {
        self.outcomes.iter().find(|(u, _)| u == uid).map(|(_, o)| *o)
    }
}

impl fmt::Display for BatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "updated metadata on {}/{}, labels on {}/{} with {} errors",
            self.saved(),
            self.selected,
            self.labels.photos,
            self.selected,
            self.errors.len()
        )?;
        if self.cancelled {
            write!(f, " (cancelled)")?;
        }
        Ok(())
    }
}

/// Applies a [`PhotosForm`] to a selection of photos.
///
/// Photos are processed one after another. Every failure is confined to the
/// photo it happened on and reported in the [`BatchResult`].
pub struct BatchEditor<'a> {
    store: &'a dyn Store,
    priorities: &'a PriorityTable,
    hooks: Hooks<'a>,
    retry: RetryPolicy,
    album_type: String,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> BatchEditor<'a> {
    pub fn new(store: &'a dyn Store, priorities: &'a PriorityTable) -> Self {
        Self {
            store,
            priorities,
            hooks: Hooks::default(),
            retry: RetryPolicy::default(),
            album_type: ALBUM_TYPE_DEFAULT.to_string(),
            cancel: None,
        }
    }

    pub fn hooks(mut self, hooks: Hooks<'a>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Type given to albums created from titles.
    pub fn album_type(mut self, album_type: impl Into<String>) -> Self {
        self.album_type = album_type.into();
        self
    }

    /// Checked before each photo; once set, the remaining photos are left alone.
    pub fn cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|c| c.load(Ordering::Relaxed))
    }

    /// Apply `form` to every photo in `uids`.
    ///
    /// `cache` holds photos the caller already loaded; it is filled with
    /// every photo loaded here and updated with the saved state. Only an
    /// empty selection is an error; everything else is reported per photo.
    pub fn apply(
        &self,
        uids: &[String],
        form: &PhotosForm,
        cache: &mut HashMap<String, Photo>,
    ) -> Result<BatchResult> {
        if uids.is_empty() {
            return Err(Error::Validation("no photos selected".to_string()));
        }

        let mut result = BatchResult {
            selected: uids.len(),
            ..Default::default()
        };

        let mut form = form.clone();
        result.errors.extend(form.sanitize());

        let mut resolver = TitleResolver::new(self.store, &self.album_type);
        result.errors.extend(resolver.resolve_items(EntityKind::Album, &mut form.albums));
        result.errors.extend(resolver.resolve_items(EntityKind::Label, &mut form.labels));
        debug!("Resolved titles with {} lookups", resolver.lookups());

        let saver = Saver {
            store: self.store,
            priorities: self.priorities,
            location: self.hooks.location,
            retry: self.retry,
        };

        for uid in uids {
            if self.is_cancelled() {
                info!("Batch cancelled after {} of {} photos", result.outcomes.len(), uids.len());
                result.cancelled = true;
                break;
            }
            let outcome = self.process(uid, &form, &saver, cache, &mut result);
            result.outcomes.push((uid.clone(), outcome));
        }

        if result.any_saved() {
            self.hooks.counts.counts_changed();
        }

        info!("Batch edit: {}", result);
        Ok(result)
    }

    fn process(
        &self,
        uid: &str,
        form: &PhotosForm,
        saver: &Saver<'_>,
        cache: &mut HashMap<String, Photo>,
        result: &mut BatchResult,
    ) -> PhotoOutcome {
        let mut photo = match cache.remove(uid) {
            Some(photo) => photo,
            None => match self.store.load_photo(uid) {
                Ok(Some(photo)) => photo,
                Ok(None) => {
                    warn!("Skipping photo {}: not found", uid);
                    result.errors.push(Error::not_found("photo", uid));
                    return PhotoOutcome::Skipped;
                }
                Err(e) => {
                    warn!("Skipping photo {}: {}", uid, e);
                    result.errors.push(e);
                    return PhotoOutcome::Skipped;
                }
            },
        };

        let albums = apply_albums(self.store, self.retry, &mut photo, &form.albums);
        result.albums.add(&albums);
        result.errors.extend(albums.errors);

        let labels = apply_labels(self.store, self.priorities, self.retry, &mut photo, &form.labels);
        result.labels.add(&labels);
        result.errors.extend(labels.errors);

        let outcome = match SaveRequest::build(form, &photo) {
            Err(e) => {
                warn!("Skipping photo {}: {}", uid, e);
                result.errors.push(e);
                PhotoOutcome::Skipped
            }
            Ok(req) if req.is_empty() => PhotoOutcome::Unchanged,
            Ok(req) => match saver.save(&mut photo, &req) {
                Ok(true) => {
                    if let Err(e) = self.hooks.backup.save_snapshot(&photo) {
                        warn!("Backup of photo {} failed: {}", uid, e);
                    }
                    PhotoOutcome::Saved
                }
                Ok(false) => PhotoOutcome::Unchanged,
                Err(e) => {
                    tracing::error!("Saving photo {} failed: {}", uid, e);
                    result.errors.push(e);
                    // Part of the write may have landed, so cache what the store holds.
                    match self.store.load_photo(uid) {
                        Ok(Some(stored)) => photo = stored,
                        _ => return PhotoOutcome::Failed,
                    }
                    PhotoOutcome::Failed
                }
            },
        };

        cache.insert(uid.to_string(), photo);
        outcome
    }
}
