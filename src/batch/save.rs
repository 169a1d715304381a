//! Per-photo save: apply the batch form to one photo and write only the
//! columns that changed.

use tracing::{debug, warn};

use super::dates::{compute_date_change, utc_from_local, DateChange};
use super::form::PhotosForm;
use super::labels::attach_label;
use super::resolver::find_or_create_label;
use crate::db::{diff_columns, with_retry, LabelCandidate, Photo, RetryPolicy, Store};
use crate::error::{Error, Result};
use crate::hooks::LocationProvider;
use crate::source::{PriorityTable, SRC_BATCH};

/// The batch form resolved against one photo.
///
/// `None` leaves the property untouched. Date edits are already merged with
/// the photo's own calendar date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SaveRequest {
    pub title: Option<String>,
    pub caption: Option<String>,
    pub date: Option<DateChange>,
    pub time_zone: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub altitude: Option<i32>,
    pub country: Option<String>,
    pub favorite: Option<bool>,
    pub private: Option<bool>,
    pub iso: Option<i32>,
    pub focal_length: Option<i32>,
    pub f_number: Option<f64>,
    pub exposure: Option<String>,
    pub subject: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub license: Option<String>,
    pub notes: Option<String>,
}

impl SaveRequest {
    pub fn build(form: &PhotosForm, photo: &Photo) -> Result<Self> {
        let date = if form.day.is_set() || form.month.is_set() || form.year.is_set() {
            Some(compute_date_change(
                photo.taken_at_local,
                photo.year,
                photo.month,
                photo.day,
                &form.day,
                &form.month,
                &form.year,
            )?)
        } else {
            None
        };

        Ok(Self {
            title: form.title.target().map(|s| s.trim().to_string()),
            caption: form.caption.target().map(|s| s.trim().to_string()),
            date,
            time_zone: form.time_zone.target(),
            lat: form.lat.target(),
            lng: form.lng.target(),
            altitude: form.altitude.target(),
            country: form.country.target(),
            favorite: form.favorite.target(),
            private: form.private.target(),
            iso: form.iso.target(),
            focal_length: form.focal_length.target(),
            f_number: form.f_number.target(),
            exposure: form.exposure.target(),
            subject: form.subject.target(),
            artist: form.artist.target(),
            copyright: form.copyright.target(),
            license: form.license.target(),
            notes: form.notes.target(),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Write `new` if the batch source may overwrite the value owned by `src`.
fn set_sourced<T: PartialEq>(
    priorities: &PriorityTable,
    field: &str,
    value: &mut T,
    src: &mut String,
    new: Option<T>,
) -> bool {
    let Some(new) = new else {
        return false;
    };
    if !priorities.higher_or_equal(SRC_BATCH, src) {
        debug!("Keeping {} owned by {:?}", field, src);
        return false;
    }
    if *value == new {
        return false;
    }
    *value = new;
    *src = SRC_BATCH.to_string();
    true
}

fn set<T: PartialEq>(value: &mut T, new: Option<T>) -> bool {
    match new {
        Some(new) if *value != new => {
            *value = new;
            true
        }
        _ => false,
    }
}

pub struct Saver<'a> {
    pub store: &'a dyn Store,
    pub priorities: &'a PriorityTable,
    pub location: &'a dyn LocationProvider,
    pub retry: RetryPolicy,
}

impl Saver<'_> {
    /// Apply `req` to `photo` and persist the difference.
    ///
    /// Returns `Ok(false)` without touching the store when nothing changed.
    /// On success `photo` reflects the stored row. On error it is put back
    /// to its state before the call.
    pub fn save(&self, photo: &mut Photo, req: &SaveRequest) -> Result<bool> {
        if !photo.has_identity() {
            return Err(Error::NotPersisted(format!("photo {:?} has no id", photo.uid)));
        }

        let before = photo.clone();
        let p = self.priorities;

        set_sourced(p, "title", &mut photo.title, &mut photo.title_src, req.title.clone());
        set_sourced(p, "caption", &mut photo.caption, &mut photo.caption_src, req.caption.clone());

        self.apply_date(photo, req);

        let mut location_changed = false;
        location_changed |= set_sourced(p, "lat", &mut photo.lat, &mut photo.place_src, req.lat);
        location_changed |= set_sourced(p, "lng", &mut photo.lng, &mut photo.place_src, req.lng);
        location_changed |= set_sourced(p, "altitude", &mut photo.altitude, &mut photo.place_src, req.altitude);
        location_changed |= set_sourced(p, "country", &mut photo.country, &mut photo.place_src, req.country.clone());

        set(&mut photo.favorite, req.favorite);
        set(&mut photo.private, req.private);
        set(&mut photo.iso, req.iso);
        set(&mut photo.focal_length, req.focal_length);
        set(&mut photo.f_number, req.f_number);
        set(&mut photo.exposure, req.exposure.clone());

        let d = &mut photo.details;
        set_sourced(p, "subject", &mut d.subject, &mut d.subject_src, req.subject.clone());
        set_sourced(p, "artist", &mut d.artist, &mut d.artist_src, req.artist.clone());
        set_sourced(p, "copyright", &mut d.copyright, &mut d.copyright_src, req.copyright.clone());
        set_sourced(p, "license", &mut d.license, &mut d.license_src, req.license.clone());
        set_sourced(p, "notes", &mut d.notes, &mut d.notes_src, req.notes.clone());

        if location_changed {
            self.update_location(photo);
        }

        let photo_diff = diff_columns(&before.columns(), &photo.columns());
        let details_diff = diff_columns(&before.details.columns(), &photo.details.columns());
        if photo_diff.is_empty() && details_diff.is_empty() {
            debug!("Photo {} unchanged", photo.uid);
            return Ok(false);
        }

        debug!(
            "Photo {}: updating {} columns, {} details columns",
            photo.uid,
            photo_diff.len(),
            details_diff.len()
        );

        let written = with_retry("update photo", self.retry, || {
            self.store.update_photo_columns(photo.id, &photo_diff)
        })
        .and_then(|()| {
            if details_diff.is_empty() {
                return Ok(());
            }
            with_retry("update details", self.retry, || {
                self.store.update_details_columns(photo.id, &details_diff)
            })
        });

        if let Err(e) = written {
            *photo = before;
            return Err(e);
        }

        photo.edited_at = Some(chrono::Utc::now().naive_utc());
        photo.checked_at = None;
        Ok(true)
    }

    /// Local time, calendar columns and time zone move together, owned by
    /// `taken_src`. UTC is re-derived from the new local time.
    fn apply_date(&self, photo: &mut Photo, req: &SaveRequest) {
        if req.date.is_none() && req.time_zone.is_none() {
            return;
        }
        if !self.priorities.higher_or_equal(SRC_BATCH, &photo.taken_src) {
            debug!("Keeping capture time of {} owned by {:?}", photo.uid, photo.taken_src);
            return;
        }

        let before = (
            photo.taken_at,
            photo.taken_at_local,
            photo.time_zone.clone(),
            photo.year,
            photo.month,
            photo.day,
        );
        let offset = photo.taken_at_local - photo.taken_at;

        if let Some(change) = req.date {
            photo.taken_at_local = change.local;
            photo.year = change.year;
            photo.month = change.month;
            photo.day = change.day;
        }
        if let Some(zone) = &req.time_zone {
            photo.time_zone = zone.clone();
        }
        photo.taken_at = utc_from_local(photo.taken_at_local, &photo.time_zone, offset);

        let after = (
            photo.taken_at,
            photo.taken_at_local,
            photo.time_zone.clone(),
            photo.year,
            photo.month,
            photo.day,
        );
        if after != before {
            photo.taken_src = SRC_BATCH.to_string();
        }
    }

    /// Location side effects. Failures are logged; the edit itself still
    /// goes through.
    fn update_location(&self, photo: &mut Photo) {
        let update = match self.location.update_location(photo) {
            Ok(update) => update,
            Err(e) => {
                warn!("Location update for {} failed: {}", photo.uid, e);
                return;
            }
        };

        photo.details.merge_keywords(&update.keywords);

        let mut attached = false;
        for candidate in &update.labels {
            match self.attach_candidate(photo, candidate) {
                Ok(changed) => attached |= changed,
                Err(e) => warn!("Could not attach label {:?} to {}: {}", candidate.name, photo.uid, e),
            }
        }
        if attached {
            match self.store.photo_labels(photo.id) {
                Ok(labels) => photo.labels = labels,
                Err(e) => warn!("Could not reload labels of {}: {}", photo.uid, e),
            }
        }
    }

    fn attach_candidate(&self, photo: &Photo, candidate: &LabelCandidate) -> Result<bool> {
        let label = find_or_create_label(self.store, &candidate.name)?;
        attach_label(
            self.store,
            self.priorities,
            self.retry,
            photo.id,
            photo.label(label.id),
            &label,
            &candidate.source,
            candidate.uncertainty,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::action::{FloatField, IntField, StringField};
    use crate::batch::test_support::{insert_photo, RecordingStore};
    use crate::db::SqliteDb;
    use crate::hooks::{LocationUpdate, NoopHooks};
    use crate::source::{SRC_ADMIN, SRC_LOCATION};
    use chrono::{Duration, NaiveDate};
    use std::cell::Cell;

    struct Geocoder {
        calls: Cell<usize>,
        fail: bool,
    }

    impl LocationProvider for Geocoder {
        fn update_location(&self, _photo: &Photo) -> Result<LocationUpdate> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(Error::Hook("geocoder offline".into()));
            }
            Ok(LocationUpdate {
                keywords: vec!["berlin".to_string(), "germany".to_string()],
                labels: vec![LabelCandidate {
                    name: "Berlin".to_string(),
                    uncertainty: 20,
                    source: SRC_LOCATION.to_string(),
                }],
            })
        }
    }

    fn saver<'a>(store: &'a dyn Store, priorities: &'a PriorityTable, location: &'a dyn LocationProvider) -> Saver<'a> {
        Saver {
            store,
            priorities,
            location,
            retry: RetryPolicy {
                attempts: 3,
                base_delay: std::time::Duration::from_millis(1),
            },
        }
    }

    fn request(form: &PhotosForm, photo: &Photo) -> SaveRequest {
        SaveRequest::build(form, photo).unwrap()
    }

    #[test]
    fn test_rejects_unpersisted_photo() {
        let db = SqliteDb::open_in_memory().unwrap();
        let priorities = PriorityTable::default();
        let mut photo = Photo::default();
        let result = saver(&db, &priorities, &NoopHooks).save(&mut photo, &SaveRequest::default());
        assert!(matches!(result, Err(Error::NotPersisted(_))));
    }

    #[test]
    fn test_noop_issues_no_writes() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2020, 5, 1);
        photo.title = "Beach".to_string();
        db.update_photo_columns(photo.id, &[("title", rusqlite::types::Value::Text("Beach".into()))])
            .unwrap();
        let mut photo = db.load_photo(&photo.uid).unwrap().unwrap();

        let store = RecordingStore::new(&db);
        let priorities = PriorityTable::default();
        let form = PhotosForm {
            title: StringField::update("Beach".to_string()),
            year: IntField::update(2020),
            ..Default::default()
        };
        let req = request(&form, &photo);
        let changed = saver(&store, &priorities, &NoopHooks).save(&mut photo, &req).unwrap();

        assert!(!changed);
        assert_eq!(store.writes.get(), 0);
    }

    #[test]
    fn test_changed_columns_written_with_batch_source() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2020, 5, 1);
        let store = RecordingStore::new(&db);
        let priorities = PriorityTable::default();
        let form = PhotosForm {
            title: StringField::update("  Harbour ".to_string()),
            favorite: crate::batch::action::BoolField::update(true),
            subject: StringField::update("Boats".to_string()),
            ..Default::default()
        };

        let req = request(&form, &photo);
        assert!(saver(&store, &priorities, &NoopHooks).save(&mut photo, &req).unwrap());
        assert_eq!(store.writes.get(), 2);

        let stored = db.load_photo(&photo.uid).unwrap().unwrap();
        assert_eq!(stored.title, "Harbour");
        assert_eq!(stored.title_src, SRC_BATCH);
        assert!(stored.favorite);
        assert_eq!(stored.details.subject, "Boats");
        assert_eq!(stored.details.subject_src, SRC_BATCH);
        assert!(stored.edited_at.is_some());
        assert!(stored.checked_at.is_none());
        assert!(photo.edited_at.is_some());
    }

    #[test]
    fn test_higher_priority_field_is_kept() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2020, 5, 1);
        photo.title = "Official".to_string();
        photo.title_src = SRC_ADMIN.to_string();
        let priorities = PriorityTable::default();

        let form = PhotosForm {
            title: StringField::update("Mine".to_string()),
            ..Default::default()
        };
        let req = request(&form, &photo);
        assert!(!saver(&db, &priorities, &NoopHooks).save(&mut photo, &req).unwrap());
        assert_eq!(photo.title, "Official");
    }

    #[test]
    fn test_year_update_keeps_month_and_time() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2024, 2, 29);
        let priorities = PriorityTable::default();
        let form = PhotosForm {
            year: IntField::update(2025),
            ..Default::default()
        };

        let req = request(&form, &photo);
        assert!(saver(&db, &priorities, &NoopHooks).save(&mut photo, &req).unwrap());

        let stored = db.load_photo(&photo.uid).unwrap().unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 2, 28)
            .and_then(|d| d.and_hms_opt(10, 30, 0))
            .unwrap();
        assert_eq!(stored.taken_at_local, expected);
        assert_eq!(stored.taken_at, expected);
        assert_eq!((stored.year, stored.month, stored.day), (2025, 2, 28));
        assert_eq!(stored.taken_src, SRC_BATCH);
    }

    #[test]
    fn test_time_zone_rederives_utc() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2022, 6, 1);
        let priorities = PriorityTable::default();
        let form = PhotosForm {
            time_zone: StringField::update("+02:00".to_string()),
            ..Default::default()
        };

        let req = request(&form, &photo);
        assert!(saver(&db, &priorities, &NoopHooks).save(&mut photo, &req).unwrap());
        assert_eq!(photo.taken_at, photo.taken_at_local - Duration::hours(2));
        assert_eq!(photo.time_zone, "+02:00");
        assert_eq!(photo.taken_src, SRC_BATCH);
    }

    #[test]
    fn test_location_change_runs_hook() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2022, 6, 1);
        let priorities = PriorityTable::default();
        let geocoder = Geocoder {
            calls: Cell::new(0),
            fail: false,
        };

        let form = PhotosForm {
            lat: FloatField::update(52.52),
            lng: FloatField::update(13.40),
            ..Default::default()
        };
        let req = request(&form, &photo);
        assert!(saver(&db, &priorities, &geocoder).save(&mut photo, &req).unwrap());
        assert_eq!(geocoder.calls.get(), 1);

        let stored = db.load_photo(&photo.uid).unwrap().unwrap();
        assert_eq!(stored.place_src, SRC_BATCH);
        assert_eq!(stored.details.keywords, "berlin, germany");
        assert_eq!(stored.label_names(), vec!["Berlin"]);
        assert_eq!(stored.labels[0].source, SRC_LOCATION);

        // Same coordinates again: no change, no hook call
        let req = request(&form, &stored);
        let mut stored = stored;
        assert!(!saver(&db, &priorities, &geocoder).save(&mut stored, &req).unwrap());
        assert_eq!(geocoder.calls.get(), 1);
    }

    #[test]
    fn test_failed_location_hook_does_not_block_save() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2022, 6, 1);
        let priorities = PriorityTable::default();
        let geocoder = Geocoder {
            calls: Cell::new(0),
            fail: true,
        };
        let form = PhotosForm {
            country: StringField::update("de".to_string()),
            ..Default::default()
        };

        let req = request(&form, &photo);
        assert!(saver(&db, &priorities, &geocoder).save(&mut photo, &req).unwrap());
        assert_eq!(db.load_photo(&photo.uid).unwrap().unwrap().country, "de");
    }

    #[test]
    fn test_transient_conflict_retried() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2022, 6, 1);
        let store = RecordingStore::new(&db);
        store.busy_updates.set(2);
        let priorities = PriorityTable::default();
        let form = PhotosForm {
            caption: StringField::update("Sunset".to_string()),
            ..Default::default()
        };

        let req = request(&form, &photo);
        assert!(saver(&store, &priorities, &NoopHooks).save(&mut photo, &req).unwrap());
        assert_eq!(store.writes.get(), 3);
        assert_eq!(db.load_photo(&photo.uid).unwrap().unwrap().caption, "Sunset");
    }

    #[test]
    fn test_exhausted_retries_restore_photo() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2022, 6, 1);
        let before = photo.clone();
        let store = RecordingStore::new(&db);
        store.busy_updates.set(10);
        let priorities = PriorityTable::default();
        let form = PhotosForm {
            title: StringField::update("Unsaved".to_string()),
            artist: StringField::update("Jane".to_string()),
            ..Default::default()
        };

        let req = request(&form, &photo);
        let err = saver(&store, &priorities, &NoopHooks).save(&mut photo, &req).unwrap_err();
        assert!(err.is_transient());
        assert_eq!(store.writes.get(), 3);
        assert_eq!(photo, before);
        assert_eq!(db.load_photo(&photo.uid).unwrap().unwrap().title, "");
    }

    #[test]
    fn test_failed_details_write_restores_photo() {
        let db = SqliteDb::open_in_memory().unwrap();
        let mut photo = insert_photo(&db, 2022, 6, 1);
        let before = photo.clone();
        let store = RecordingStore::new(&db);
        store.busy_details.set(10);
        let priorities = PriorityTable::default();
        let form = PhotosForm {
            title: StringField::update("Half".to_string()),
            artist: StringField::update("Jane".to_string()),
            ..Default::default()
        };

        let req = request(&form, &photo);
        assert!(saver(&store, &priorities, &NoopHooks).save(&mut photo, &req).is_err());
        assert_eq!(photo, before);

        // The main row went through before the details write failed.
        let stored = db.load_photo(&photo.uid).unwrap().unwrap();
        assert_eq!(stored.title, "Half");
        assert_eq!(stored.details.artist, "");
    }
}
