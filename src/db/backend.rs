//! Storage abstraction consumed by the batch editor.
//!
//! The editor only needs a narrow set of persistence primitives: find by
//! key, create, restore a soft-deleted row, update columns and delete a
//! relation row. [`super::SqliteDb`] implements them; tests wrap it to
//! inject failures.

use crate::error::Result;

use super::albums::{Album, Membership};
use super::labels::{Label, PhotoLabel};
use super::photos::{Column, Photo};

pub trait Store {
    // === Photos ===

    /// Load a photo with its details, visible albums and label associations.
    fn load_photo(&self, uid: &str) -> Result<Option<Photo>>;

    /// Current label associations of a photo, blocked ones included.
    fn photo_labels(&self, photo_id: i64) -> Result<Vec<PhotoLabel>>;

    /// Write `columns` plus the edit bookkeeping columns to the photo row.
    fn update_photo_columns(&self, photo_id: i64, columns: &[Column]) -> Result<()>;

    /// Write `columns` to the details row of a photo.
    fn update_details_columns(&self, photo_id: i64, columns: &[Column]) -> Result<()>;

    // === Albums ===

    fn find_album(&self, uid: &str) -> Result<Option<Album>>;

    /// Find by slug, soft-deleted albums included.
    fn find_album_by_slug(&self, slug: &str) -> Result<Option<Album>>;

    fn create_album(&self, title: &str, album_type: &str) -> Result<Album>;

    fn restore_album(&self, album_id: i64) -> Result<()>;

    fn add_photo_to_album(&self, album_uid: &str, photo_uid: &str) -> Result<Membership>;

    /// Hide a membership row. Returns false if there was no visible row.
    fn hide_photo_in_album(&self, album_uid: &str, photo_uid: &str) -> Result<bool>;

    // === Labels ===

    fn find_label(&self, uid: &str) -> Result<Option<Label>>;

    /// Find by slug, soft-deleted labels included.
    fn find_label_by_slug(&self, slug: &str) -> Result<Option<Label>>;

    fn create_label(&self, name: &str, priority: i32) -> Result<Label>;

    fn restore_label(&self, label_id: i64) -> Result<()>;

    /// Insert or update the association keyed by (photo_id, label_id).
    fn save_photo_label(&self, label: &PhotoLabel) -> Result<()>;

    fn delete_photo_label(&self, photo_id: i64, label_id: i64) -> Result<()>;
}
