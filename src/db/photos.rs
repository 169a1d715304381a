//! Photo entity, its details sub-record and column-level diffs.

use chrono::{Datelike, NaiveDateTime};
use rusqlite::types::Value;

use super::albums::Album;
use super::labels::PhotoLabel;

/// Reserved value for an unknown year, month or day.
pub const UNKNOWN: i32 = -1;

/// Column name and new value, as written by an UPDATE.
pub type Column = (&'static str, Value);

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn timestamp_value(ts: &NaiveDateTime) -> Value {
    Value::Text(ts.format(TIMESTAMP_FORMAT).to_string())
}

/// A photo row with the relations the batch editor needs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Photo {
    pub id: i64,
    pub uid: String,
    pub title: String,
    pub title_src: String,
    pub caption: String,
    pub caption_src: String,
    pub taken_at: NaiveDateTime,
    pub taken_at_local: NaiveDateTime,
    pub taken_src: String,
    pub time_zone: String,
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub lat: f64,
    pub lng: f64,
    pub altitude: i32,
    pub country: String,
    pub place_src: String,
    pub favorite: bool,
    pub private: bool,
    pub iso: i32,
    pub focal_length: i32,
    pub f_number: f64,
    pub exposure: String,
    pub edited_at: Option<NaiveDateTime>,
    pub checked_at: Option<NaiveDateTime>,
    pub details: Details,
    /// Visible album memberships.
    pub albums: Vec<Album>,
    /// Label associations, including blocked ones.
    pub labels: Vec<PhotoLabel>,
}

impl Photo {
    /// A photo taken at `local`, with year/month/day derived from it.
    pub fn taken(local: NaiveDateTime) -> Self {
        Self {
            taken_at: local,
            taken_at_local: local,
            year: local.year(),
            month: local.month() as i32,
            day: local.day() as i32,
            country: "zz".to_string(),
            ..Default::default()
        }
    }

    pub fn has_identity(&self) -> bool {
        self.id > 0 && !self.uid.is_empty()
    }

    /// Mutable columns of the `photos` table.
    pub fn columns(&self) -> Vec<Column> {
        vec![
            ("title", Value::Text(self.title.clone())),
            ("title_src", Value::Text(self.title_src.clone())),
            ("caption", Value::Text(self.caption.clone())),
            ("caption_src", Value::Text(self.caption_src.clone())),
            ("taken_at", timestamp_value(&self.taken_at)),
            ("taken_at_local", timestamp_value(&self.taken_at_local)),
            ("taken_src", Value::Text(self.taken_src.clone())),
            ("time_zone", Value::Text(self.time_zone.clone())),
            ("year", Value::Integer(self.year.into())),
            ("month", Value::Integer(self.month.into())),
            ("day", Value::Integer(self.day.into())),
            ("lat", Value::Real(self.lat)),
            ("lng", Value::Real(self.lng)),
            ("altitude", Value::Integer(self.altitude.into())),
            ("country", Value::Text(self.country.clone())),
            ("place_src", Value::Text(self.place_src.clone())),
            ("favorite", Value::Integer(self.favorite.into())),
            ("private", Value::Integer(self.private.into())),
            ("iso", Value::Integer(self.iso.into())),
            ("focal_length", Value::Integer(self.focal_length.into())),
            ("f_number", Value::Real(self.f_number)),
            ("exposure", Value::Text(self.exposure.clone())),
        ]
    }

    /// Names of the visible labels (blocked associations excluded).
    pub fn label_names(&self) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|l| !l.is_blocked())
            .map(|l| l.name.as_str())
            .collect()
    }

    pub fn label(&self, label_id: i64) -> Option<&PhotoLabel> {
        self.labels.iter().find(|l| l.label_id == label_id)
    }
}

/// Free-text metadata stored in the `details` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Details {
    pub keywords: String,
    pub keywords_src: String,
    pub notes: String,
    pub notes_src: String,
    pub subject: String,
    pub subject_src: String,
    pub artist: String,
    pub artist_src: String,
    pub copyright: String,
    pub copyright_src: String,
    pub license: String,
    pub license_src: String,
}

impl Details {
    pub fn columns(&self) -> Vec<Column> {
        vec![
            ("keywords", Value::Text(self.keywords.clone())),
            ("keywords_src", Value::Text(self.keywords_src.clone())),
            ("notes", Value::Text(self.notes.clone())),
            ("notes_src", Value::Text(self.notes_src.clone())),
            ("subject", Value::Text(self.subject.clone())),
            ("subject_src", Value::Text(self.subject_src.clone())),
            ("artist", Value::Text(self.artist.clone())),
            ("artist_src", Value::Text(self.artist_src.clone())),
            ("copyright", Value::Text(self.copyright.clone())),
            ("copyright_src", Value::Text(self.copyright_src.clone())),
            ("license", Value::Text(self.license.clone())),
            ("license_src", Value::Text(self.license_src.clone())),
        ]
    }

    pub fn keyword_list(&self) -> Vec<String> {
        self.keywords
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Appends keywords not already present (case-insensitive). Returns true if any were added.
    pub fn merge_keywords(&mut self, keywords: &[String]) -> bool {
        let mut list = self.keyword_list();
        let before = list.len();
        for keyword in keywords {
            let keyword = keyword.trim();
            if keyword.is_empty() || list.iter().any(|k| k.eq_ignore_ascii_case(keyword)) {
                continue;
            }
            list.push(keyword.to_string());
        }
        if list.len() == before {
            return false;
        }
        self.keywords = list.join(", ");
        true
    }

    /// Drops every occurrence of `keyword` (case-insensitive). Returns true if the list changed.
    pub fn remove_keyword(&mut self, keyword: &str) -> bool {
        let list = self.keyword_list();
        let kept: Vec<String> = list
            .iter()
            .filter(|k| !k.eq_ignore_ascii_case(keyword.trim()))
            .cloned()
            .collect();
        if kept.len() == list.len() {
            return false;
        }
        self.keywords = kept.join(", ");
        true
    }
}

/// Columns of `after` whose value differs from `before`.
pub fn diff_columns(before: &[Column], after: &[Column]) -> Vec<Column> {
    after
        .iter()
        .filter(|(name, value)| {
            before
                .iter()
                .find(|(n, _)| n == name)
                .map_or(true, |(_, old)| old != value)
        })
        .cloned()
        .collect()
}
