//! SQLite backend implementation.

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use super::albums::{Album, Membership};
use super::backend::Store;
use super::labels::{Label, PhotoLabel};
use super::photos::{Column, Details, Photo};
use super::schema::SCHEMA;
use super::{generate_uid, slugify, ALBUM_PREFIX, LABEL_PREFIX, PHOTO_PREFIX};
use crate::error::{Error, Result};

const PHOTO_COLUMNS: &str = r#"
    p.id, p.uid, p.title, p.title_src, p.caption, p.caption_src,
    p.taken_at, p.taken_at_local, p.taken_src, p.time_zone, p.year, p.month, p.day,
    p.lat, p.lng, p.altitude, p.country, p.place_src,
    p.favorite, p.private, p.iso, p.focal_length, p.f_number, p.exposure,
    p.edited_at, p.checked_at,
    COALESCE(d.keywords, ''), COALESCE(d.keywords_src, ''),
    COALESCE(d.notes, ''), COALESCE(d.notes_src, ''),
    COALESCE(d.subject, ''), COALESCE(d.subject_src, ''),
    COALESCE(d.artist, ''), COALESCE(d.artist_src, ''),
    COALESCE(d.copyright, ''), COALESCE(d.copyright_src, ''),
    COALESCE(d.license, ''), COALESCE(d.license_src, '')
"#;

pub struct SqliteDb {
    pub(crate) conn: Connection,
}

impl SqliteDb {
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    pub fn initialize(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // ========================================================================
    // Photo operations
    // ========================================================================

    /// Insert a new photo and its details row. Assigns `id`, and `uid` if empty.
    pub fn insert_photo(&self, photo: &mut Photo) -> Result<()> {
        if photo.uid.is_empty() {
            photo.uid = generate_uid(PHOTO_PREFIX);
        }
        let columns = photo.columns();
        let names: Vec<&str> = columns.iter().map(|(n, _)| *n).collect();
        let placeholders = vec!["?"; columns.len() + 1].join(", ");
        let sql = format!(
            "INSERT INTO photos (uid, {}) VALUES ({})",
            names.join(", "),
            placeholders
        );
        let values = std::iter::once(rusqlite::types::Value::Text(photo.uid.clone()))
            .chain(columns.into_iter().map(|(_, v)| v));
        self.conn.execute(&sql, params_from_iter(values))?;
        photo.id = self.conn.last_insert_rowid();

        self.conn.execute(
            "INSERT INTO details (photo_id) VALUES (?)",
            [photo.id],
        )?;
        let details = photo.details.columns();
        if details != Details::default().columns() {
            self.update_details_columns(photo.id, &details)?;
        }
        Ok(())
    }

    fn photo_albums(&self, photo_uid: &str) -> Result<Vec<Album>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT a.id, a.uid, a.slug, a.title, a.album_type, a.deleted_at
            FROM albums a
            JOIN photos_albums pa ON pa.album_uid = a.uid
            WHERE pa.photo_uid = ? AND pa.hidden = 0 AND a.deleted_at IS NULL
            ORDER BY a.title
            "#,
        )?;
        let albums = stmt
            .query_map([photo_uid], row_to_album)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(albums)
    }

    // ========================================================================
    // Album operations
    // ========================================================================

    /// Soft-delete an album.
    pub fn delete_album(&self, album_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE albums SET deleted_at = CURRENT_TIMESTAMP WHERE id = ?",
            [album_id],
        )?;
        Ok(())
    }

    /// Photo UIDs with a membership row in the album, hidden or not.
    pub fn album_members(&self, album_uid: &str) -> Result<Vec<(String, bool)>> {
        let mut stmt = self.conn.prepare(
            "SELECT photo_uid, hidden FROM photos_albums WHERE album_uid = ? ORDER BY photo_uid",
        )?;
        let members = stmt
            .query_map([album_uid], |row| Ok((row.get(0)?, row.get::<_, i64>(1)? == 1)))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(members)
    }

    // ========================================================================
    // Label operations
    // ========================================================================

    /// Soft-delete a label.
    pub fn delete_label(&self, label_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE labels SET deleted_at = CURRENT_TIMESTAMP WHERE id = ?",
            [label_id],
        )?;
        Ok(())
    }
}

impl Store for SqliteDb {
    fn load_photo(&self, uid: &str) -> Result<Option<Photo>> {
        let sql = format!(
            "SELECT {} FROM photos p LEFT JOIN details d ON d.photo_id = p.id WHERE p.uid = ?",
            PHOTO_COLUMNS
        );
        let photo = self.conn.query_row(&sql, [uid], row_to_photo).optional()?;
        let Some(mut photo) = photo else {
            return Ok(None);
        };
        photo.albums = self.photo_albums(&photo.uid)?;
        photo.labels = self.photo_labels(photo.id)?;
        Ok(Some(photo))
    }

    fn photo_labels(&self, photo_id: i64) -> Result<Vec<PhotoLabel>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT pl.photo_id, pl.label_id, l.uid, l.name, pl.label_src, pl.uncertainty
            FROM photos_labels pl
            JOIN labels l ON l.id = pl.label_id
            WHERE pl.photo_id = ?
            ORDER BY l.name
            "#,
        )?;
        let labels = stmt
            .query_map([photo_id], |row| {
                Ok(PhotoLabel {
                    photo_id: row.get(0)?,
                    label_id: row.get(1)?,
                    label_uid: row.get(2)?,
                    name: row.get(3)?,
                    source: row.get(4)?,
                    uncertainty: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(labels)
    }

    fn update_photo_columns(&self, photo_id: i64, columns: &[Column]) -> Result<()> {
        let mut assignments: Vec<String> = columns.iter().map(|(n, _)| format!("{} = ?", n)).collect();
        assignments.push("edited_at = CURRENT_TIMESTAMP".to_string());
        assignments.push("checked_at = NULL".to_string());
        assignments.push("updated_at = CURRENT_TIMESTAMP".to_string());
        let sql = format!("UPDATE photos SET {} WHERE id = ?", assignments.join(", "));
        let values = columns
            .iter()
            .map(|(_, v)| v.clone())
            .chain(std::iter::once(rusqlite::types::Value::Integer(photo_id)));
        let updated = self.conn.execute(&sql, params_from_iter(values))?;
        if updated == 0 {
            return Err(Error::not_found("photo", photo_id.to_string()));
        }
        Ok(())
    }

    fn update_details_columns(&self, photo_id: i64, columns: &[Column]) -> Result<()> {
        if columns.is_empty() {
            return Ok(());
        }
        self.conn.execute(
            "INSERT OR IGNORE INTO details (photo_id) VALUES (?)",
            [photo_id],
        )?;
        let assignments: Vec<String> = columns.iter().map(|(n, _)| format!("{} = ?", n)).collect();
        let sql = format!("UPDATE details SET {} WHERE photo_id = ?", assignments.join(", "));
        let values = columns
            .iter()
            .map(|(_, v)| v.clone())
            .chain(std::iter::once(rusqlite::types::Value::Integer(photo_id)));
        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    fn find_album(&self, uid: &str) -> Result<Option<Album>> {
        let album = self
            .conn
            .query_row(
                "SELECT id, uid, slug, title, album_type, deleted_at FROM albums WHERE uid = ?",
                [uid],
                row_to_album,
            )
            .optional()?;
        Ok(album)
    }

    fn find_album_by_slug(&self, slug: &str) -> Result<Option<Album>> {
        // Prefer a live album over a soft-deleted one with the same slug
        let album = self
            .conn
            .query_row(
                r#"
                SELECT id, uid, slug, title, album_type, deleted_at FROM albums
                WHERE slug = ?
                ORDER BY deleted_at IS NOT NULL, id
                LIMIT 1
                "#,
                [slug],
                row_to_album,
            )
            .optional()?;
        Ok(album)
    }

    fn create_album(&self, title: &str, album_type: &str) -> Result<Album> {
        let uid = generate_uid(ALBUM_PREFIX);
        let slug = slugify(title);
        self.conn.execute(
            "INSERT INTO albums (uid, slug, title, album_type) VALUES (?, ?, ?, ?)",
            params![uid, slug, title, album_type],
        )?;
        Ok(Album {
            id: self.conn.last_insert_rowid(),
            uid,
            slug,
            title: title.to_string(),
            album_type: album_type.to_string(),
            deleted_at: None,
        })
    }

    fn restore_album(&self, album_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE albums SET deleted_at = NULL, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            [album_id],
        )?;
        Ok(())
    }

    fn add_photo_to_album(&self, album_uid: &str, photo_uid: &str) -> Result<Membership> {
        let hidden: Option<bool> = self
            .conn
            .query_row(
                "SELECT hidden FROM photos_albums WHERE photo_uid = ? AND album_uid = ?",
                [photo_uid, album_uid],
                |row| Ok(row.get::<_, i64>(0)? == 1),
            )
            .optional()?;
        match hidden {
            None => {
                self.conn.execute(
                    "INSERT INTO photos_albums (photo_uid, album_uid) VALUES (?, ?)",
                    [photo_uid, album_uid],
                )?;
                Ok(Membership::Created)
            }
            Some(true) => {
                self.conn.execute(
                    r#"
                    UPDATE photos_albums SET hidden = 0, updated_at = CURRENT_TIMESTAMP
                    WHERE photo_uid = ? AND album_uid = ?
                    "#,
                    [photo_uid, album_uid],
                )?;
                Ok(Membership::Restored)
            }
            Some(false) => Ok(Membership::Unchanged),
        }
    }

    fn hide_photo_in_album(&self, album_uid: &str, photo_uid: &str) -> Result<bool> {
        let updated = self.conn.execute(
            r#"
            UPDATE photos_albums SET hidden = 1, updated_at = CURRENT_TIMESTAMP
            WHERE photo_uid = ? AND album_uid = ? AND hidden = 0
            "#,
            [photo_uid, album_uid],
        )?;
        Ok(updated > 0)
    }

    fn find_label(&self, uid: &str) -> Result<Option<Label>> {
        let label = self
            .conn
            .query_row(
                "SELECT id, uid, slug, name, priority, deleted_at FROM labels WHERE uid = ?",
                [uid],
                row_to_label,
            )
            .optional()?;
        Ok(label)
    }

    fn find_label_by_slug(&self, slug: &str) -> Result<Option<Label>> {
        let label = self
            .conn
            .query_row(
                "SELECT id, uid, slug, name, priority, deleted_at FROM labels WHERE slug = ?",
                [slug],
                row_to_label,
            )
            .optional()?;
        Ok(label)
    }

    fn create_label(&self, name: &str, priority: i32) -> Result<Label> {
        let uid = generate_uid(LABEL_PREFIX);
        let slug = slugify(name);
        self.conn.execute(
            "INSERT INTO labels (uid, slug, name, priority) VALUES (?, ?, ?, ?)",
            params![uid, slug, name, priority],
        )?;
        Ok(Label {
            id: self.conn.last_insert_rowid(),
            uid,
            slug,
            name: name.to_string(),
            priority,
            deleted_at: None,
        })
    }

    fn restore_label(&self, label_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE labels SET deleted_at = NULL, updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            [label_id],
        )?;
        Ok(())
    }

    fn save_photo_label(&self, label: &PhotoLabel) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO photos_labels (photo_id, label_id, label_src, uncertainty)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (photo_id, label_id) DO UPDATE
            SET label_src = excluded.label_src, uncertainty = excluded.uncertainty
            "#,
            params![label.photo_id, label.label_id, label.source, label.uncertainty],
        )?;
        Ok(())
    }

    fn delete_photo_label(&self, photo_id: i64, label_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM photos_labels WHERE photo_id = ? AND label_id = ?",
            params![photo_id, label_id],
        )?;
        Ok(())
    }
}

fn row_to_photo(row: &rusqlite::Row) -> rusqlite::Result<Photo> {
    Ok(Photo {
        id: row.get(0)?,
        uid: row.get(1)?,
        title: row.get(2)?,
        title_src: row.get(3)?,
        caption: row.get(4)?,
        caption_src: row.get(5)?,
        taken_at: row.get(6)?,
        taken_at_local: row.get(7)?,
        taken_src: row.get(8)?,
        time_zone: row.get(9)?,
        year: row.get(10)?,
        month: row.get(11)?,
        day: row.get(12)?,
        lat: row.get(13)?,
        lng: row.get(14)?,
        altitude: row.get(15)?,
        country: row.get(16)?,
        place_src: row.get(17)?,
        favorite: row.get::<_, i64>(18)? == 1,
        private: row.get::<_, i64>(19)? == 1,
        iso: row.get(20)?,
        focal_length: row.get(21)?,
        f_number: row.get(22)?,
        exposure: row.get(23)?,
        edited_at: row.get(24)?,
        checked_at: row.get(25)?,
        details: Details {
            keywords: row.get(26)?,
            keywords_src: row.get(27)?,
            notes: row.get(28)?,
            notes_src: row.get(29)?,
            subject: row.get(30)?,
            subject_src: row.get(31)?,
            artist: row.get(32)?,
            artist_src: row.get(33)?,
            copyright: row.get(34)?,
            copyright_src: row.get(35)?,
            license: row.get(36)?,
            license_src: row.get(37)?,
        },
        albums: Vec::new(),
        labels: Vec::new(),
    })
}

fn row_to_album(row: &rusqlite::Row) -> rusqlite::Result<Album> {
    Ok(Album {
        id: row.get(0)?,
        uid: row.get(1)?,
        slug: row.get(2)?,
        title: row.get(3)?,
        album_type: row.get(4)?,
        deleted_at: row.get(5)?,
    })
}

fn row_to_label(row: &rusqlite::Row) -> rusqlite::Result<Label> {
    Ok(Label {
        id: row.get(0)?,
        uid: row.get(1)?,
        slug: row.get(2)?,
        name: row.get(3)?,
        priority: row.get(4)?,
        deleted_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn photo() -> Photo {
        let ts = NaiveDate::from_ymd_opt(2021, 7, 14)
            .and_then(|d| d.and_hms_opt(9, 15, 0))
            .unwrap();
        Photo::taken(ts)
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut p = photo();
        db.insert_photo(&mut p).unwrap();

        db.initialize().unwrap();
        assert!(db.load_photo(&p.uid).unwrap().is_some());
    }

    #[test]
    fn test_insert_and_load_photo() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut p = photo();
        p.title = "Lake".to_string();
        p.details.keywords = "water".to_string();
        db.insert_photo(&mut p).unwrap();
        assert!(p.has_identity());

        let loaded = db.load_photo(&p.uid).unwrap().unwrap();
        assert_eq!(loaded.title, "Lake");
        assert_eq!(loaded.taken_at_local, p.taken_at_local);
        assert_eq!(loaded.details.keywords, "water");
        assert!(loaded.checked_at.is_none());
        assert!(db.load_photo("pmissing00000000").unwrap().is_none());
    }

    #[test]
    fn test_update_photo_columns_resets_checked_at() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut p = photo();
        db.insert_photo(&mut p).unwrap();
        db.conn
            .execute("UPDATE photos SET checked_at = CURRENT_TIMESTAMP WHERE id = ?", [p.id])
            .unwrap();

        db.update_photo_columns(p.id, &[("title", rusqlite::types::Value::Text("New".into()))])
            .unwrap();
        let loaded = db.load_photo(&p.uid).unwrap().unwrap();
        assert_eq!(loaded.title, "New");
        assert!(loaded.checked_at.is_none());
        assert!(loaded.edited_at.is_some());

        assert!(matches!(
            db.update_photo_columns(9999, &[]),
            Err(Error::NotFound { .. })
        ));
    }

    #[test]
    fn test_album_membership_hide_and_restore() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut p = photo();
        db.insert_photo(&mut p).unwrap();
        let album = db.create_album("Holiday", "album").unwrap();

        assert_eq!(db.add_photo_to_album(&album.uid, &p.uid).unwrap(), Membership::Created);
        assert_eq!(db.add_photo_to_album(&album.uid, &p.uid).unwrap(), Membership::Unchanged);
        assert_eq!(db.load_photo(&p.uid).unwrap().unwrap().albums.len(), 1);

        assert!(db.hide_photo_in_album(&album.uid, &p.uid).unwrap());
        assert!(!db.hide_photo_in_album(&album.uid, &p.uid).unwrap());
        assert!(db.load_photo(&p.uid).unwrap().unwrap().albums.is_empty());
        assert_eq!(db.album_members(&album.uid).unwrap(), vec![(p.uid.clone(), true)]);

        assert_eq!(db.add_photo_to_album(&album.uid, &p.uid).unwrap(), Membership::Restored);
    }

    #[test]
    fn test_find_album_by_slug_includes_deleted() {
        let db = SqliteDb::open_in_memory().unwrap();
        let album = db.create_album("Old Trip", "album").unwrap();
        db.delete_album(album.id).unwrap();

        let found = db.find_album_by_slug("old-trip").unwrap().unwrap();
        assert!(found.is_deleted());
        db.restore_album(found.id).unwrap();
        assert!(!db.find_album(&album.uid).unwrap().unwrap().is_deleted());
    }

    #[test]
    fn test_photo_label_upsert_and_delete() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut p = photo();
        db.insert_photo(&mut p).unwrap();
        let label = db.create_label("Flower", 0).unwrap();

        let mut assoc = PhotoLabel {
            photo_id: p.id,
            label_id: label.id,
            label_uid: label.uid.clone(),
            name: label.name.clone(),
            source: "vision".to_string(),
            uncertainty: 30,
        };
        db.save_photo_label(&assoc).unwrap();
        assoc.source = "batch".to_string();
        assoc.uncertainty = 100;
        db.save_photo_label(&assoc).unwrap();

        let labels = db.photo_labels(p.id).unwrap();
        assert_eq!(labels, vec![assoc]);

        db.delete_photo_label(p.id, label.id).unwrap();
        assert!(db.photo_labels(p.id).unwrap().is_empty());
    }
}
