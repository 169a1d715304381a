//! Store wrapper and fixtures shared by the batch tests.

use std::cell::Cell;
use std::collections::HashSet;

use chrono::NaiveDate;

use crate::db::{Album, Column, Label, Membership, Photo, PhotoLabel, SqliteDb, Store};
use crate::error::{Error, Result};

/// Delegates to an in-memory database while counting writes and injecting
/// failures.
pub(crate) struct RecordingStore<'a> {
    pub inner: &'a SqliteDb,
    pub fail_loads: HashSet<String>,
    /// Number of upcoming `update_photo_columns` calls that report a busy database.
    pub busy_updates: Cell<u32>,
    /// Same for `update_details_columns`.
    pub busy_details: Cell<u32>,
    pub writes: Cell<usize>,
    pub loads: Cell<usize>,
}

impl<'a> RecordingStore<'a> {
    pub fn new(inner: &'a SqliteDb) -> Self {
        Self {
            inner,
            fail_loads: HashSet::new(),
            busy_updates: Cell::new(0),
            busy_details: Cell::new(0),
            writes: Cell::new(0),
            loads: Cell::new(0),
        }
    }

    pub fn failing_load(mut self, uid: &str) -> Self {
        self.fail_loads.insert(uid.to_string());
        self
    }

    fn write(&self) {
        self.writes.set(self.writes.get() + 1);
    }
}

pub(crate) fn busy() -> Error {
    Error::Database(rusqlite::Error::SqliteFailure(
        rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
        Some("database is locked".to_string()),
    ))
}

/// Insert a photo taken on the given day at 10:30 local time.
pub(crate) fn insert_photo(db: &SqliteDb, y: i32, m: u32, d: u32) -> Photo {
    let ts = NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|d| d.and_hms_opt(10, 30, 0))
        .unwrap();
    let mut photo = Photo::taken(ts);
    db.insert_photo(&mut photo).unwrap();
    db.load_photo(&photo.uid).unwrap().unwrap()
}

impl Store for RecordingStore<'_> {
    fn load_photo(&self, uid: &str) -> Result<Option<Photo>> {
        self.loads.set(self.loads.get() + 1);
        if self.fail_loads.contains(uid) {
            return Err(Error::Database(rusqlite::Error::InvalidQuery));
        }
        self.inner.load_photo(uid)
    }

    fn photo_labels(&self, photo_id: i64) -> Result<Vec<PhotoLabel>> {
        self.inner.photo_labels(photo_id)
    }

    fn update_photo_columns(&self, photo_id: i64, columns: &[Column]) -> Result<()> {
        self.write();
        if self.busy_updates.get() > 0 {
            self.busy_updates.set(self.busy_updates.get() - 1);
            return Err(busy());
        }
        self.inner.update_photo_columns(photo_id, columns)
    }

    fn update_details_columns(&self, photo_id: i64, columns: &[Column]) -> Result<()> {
        self.write();
        if self.busy_details.get() > 0 {
            self.busy_details.set(self.busy_details.get() - 1);
            return Err(busy());
        }
        self.inner.update_details_columns(photo_id, columns)
    }

    fn find_album(&self, uid: &str) -> Result<Option<Album>> {
        self.inner.find_album(uid)
    }

    fn find_album_by_slug(&self, slug: &str) -> Result<Option<Album>> {
        self.inner.find_album_by_slug(slug)
    }

    fn create_album(&self, title: &str, album_type: &str) -> Result<Album> {
        self.write();
        self.inner.create_album(title, album_type)
    }

    fn restore_album(&self, album_id: i64) -> Result<()> {
        self.write();
        self.inner.restore_album(album_id)
    }

    fn add_photo_to_album(&self, album_uid: &str, photo_uid: &str) -> Result<Membership> {
        self.write();
        self.inner.add_photo_to_album(album_uid, photo_uid)
    }

    fn hide_photo_in_album(&self, album_uid: &str, photo_uid: &str) -> Result<bool> {
        self.write();
        self.inner.hide_photo_in_album(album_uid, photo_uid)
    }

    fn find_label(&self, uid: &str) -> Result<Option<Label>> {
        self.inner.find_label(uid)
    }

    fn find_label_by_slug(&self, slug: &str) -> Result<Option<Label>> {
        self.inner.find_label_by_slug(slug)
    }

    fn create_label(&self, name: &str, priority: i32) -> Result<Label> {
        self.write();
        self.inner.create_label(name, priority)
    }

    fn restore_label(&self, label_id: i64) -> Result<()> {
        self.write();
        self.inner.restore_label(label_id)
    }

    fn save_photo_label(&self, label: &PhotoLabel) -> Result<()> {
        self.write();
        self.inner.save_photo_label(label)
    }

    fn delete_photo_label(&self, photo_id: i64, label_id: i64) -> Result<()> {
        self.write();
        self.inner.delete_photo_label(photo_id, label_id)
    }
}
