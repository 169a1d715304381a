//! Types for albums and album membership.

use chrono::NaiveDateTime;

pub const ALBUM_TYPE_DEFAULT: &str = "album";

/// An album (collection of photos)
#[derive(Debug, Clone, PartialEq)]
pub struct Album {
    pub id: i64,
    pub uid: String,
    pub slug: String,
    pub title: String,
    pub album_type: String,
    pub deleted_at: Option<NaiveDateTime>,
}

impl Album {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Outcome of adding a photo to an album.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    /// A new relation row was created.
    Created,
    /// A hidden relation row was made visible again.
    Restored,
    /// The photo was already a visible member.
    Unchanged,
}

impl Membership {
    pub fn changed(self) -> bool {
        self != Membership::Unchanged
    }
}
