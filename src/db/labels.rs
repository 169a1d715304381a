//! Types for labels and photo-label associations.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Uncertainty value that marks an association as blocked.
///
/// The `uncertainty` scale is inverted: 0 is a confident match and 100 means
/// "no confidence at all". A row at 100 is not a very strong label, it is an
/// explicit rejection kept so that lower-priority indexers do not re-create
/// the label on their next pass.
pub const BLOCKED: i32 = 100;

/// A label (keyword-like category shared by photos)
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub id: i64,
    pub uid: String,
    pub slug: String,
    pub name: String,
    pub priority: i32,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Label {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Association between a photo and a label with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoLabel {
    pub photo_id: i64,
    pub label_id: i64,
    pub label_uid: String,
    pub name: String,
    pub source: String,
    pub uncertainty: i32,
}

impl PhotoLabel {
    pub fn is_blocked(&self) -> bool {
        self.uncertainty >= BLOCKED
    }
}

/// Label suggested by an indexer (vision model, location lookup, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelCandidate {
    pub name: String,
    /// Uncertainty in percent; see [`BLOCKED`].
    pub uncertainty: i32,
    pub source: String,
}
