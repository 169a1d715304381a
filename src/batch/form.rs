//! The shared edit form of a batch: one field per editable photo property.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::action::{Action, BoolField, Field, FloatField, IntField, Item, Items, StringField, MIXED};
use crate::db::{is_uid, Photo, ALBUM_PREFIX, LABEL_PREFIX, UNKNOWN};
use crate::error::Error;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhotosForm {
    pub title: StringField,
    pub caption: StringField,
    pub day: IntField,
    pub month: IntField,
    pub year: IntField,
    pub time_zone: StringField,
    pub lat: FloatField,
    pub lng: FloatField,
    pub altitude: IntField,
    pub country: StringField,
    pub favorite: BoolField,
    pub private: BoolField,
    pub iso: IntField,
    pub focal_length: IntField,
    pub f_number: FloatField,
    pub exposure: StringField,
    pub subject: StringField,
    pub artist: StringField,
    pub copyright: StringField,
    pub license: StringField,
    pub notes: StringField,
    pub albums: Items,
    pub labels: Items,
}

/// Seed from the first photo; any disagreement marks the field mixed and
/// shows `placeholder` instead of a value.
fn aggregate<T: PartialEq>(photos: &[Photo], placeholder: T, get: impl Fn(&Photo) -> T) -> Field<T> {
    let mut values = photos.iter().map(&get);
    let Some(first) = values.next() else {
        return Field {
            value: placeholder,
            mixed: false,
            action: Action::None,
        };
    };
    if values.all(|v| v == first) {
        Field {
            value: first,
            mixed: false,
            action: Action::None,
        }
    } else {
        Field {
            value: placeholder,
            mixed: true,
            action: Action::None,
        }
    }
}

/// One item per distinct relation, mixed when only part of the selection
/// has it. Shared items sort first, then by title.
fn aggregate_items<'p>(
    total: usize,
    relations: impl Iterator<Item = (&'p str, &'p str)>,
) -> Items {
    let mut counts: HashMap<&str, (&str, usize)> = HashMap::new();
    for (uid, title) in relations {
        counts.entry(uid).or_insert((title, 0)).1 += 1;
    }

    let mut items: Vec<Item> = counts
        .into_iter()
        .map(|(uid, (title, count))| Item {
            value: uid.to_string(),
            title: title.to_string(),
            mixed: count != total,
            action: Action::None,
        })
        .collect();
    items.sort_by(|a, b| {
        a.mixed
            .cmp(&b.mixed)
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            .then_with(|| a.value.cmp(&b.value))
    });

    Items {
        mixed: items.iter().any(|i| i.mixed),
        items,
        action: Action::None,
    }
}

impl PhotosForm {
    /// Build the form a user sees for a selection of photos.
    pub fn from_photos(photos: &[Photo]) -> Self {
        let total = photos.len();
        Self {
            title: aggregate(photos, String::new(), |p| p.title.clone()),
            caption: aggregate(photos, String::new(), |p| p.caption.clone()),
            day: aggregate(photos, MIXED, |p| p.day),
            month: aggregate(photos, MIXED, |p| p.month),
            year: aggregate(photos, MIXED, |p| p.year),
            time_zone: aggregate(photos, String::new(), |p| p.time_zone.clone()),
            lat: aggregate(photos, 0.0, |p| p.lat),
            lng: aggregate(photos, 0.0, |p| p.lng),
            altitude: aggregate(photos, 0, |p| p.altitude),
            country: aggregate(photos, String::new(), |p| p.country.clone()),
            favorite: aggregate(photos, false, |p| p.favorite),
            private: aggregate(photos, false, |p| p.private),
            iso: aggregate(photos, MIXED, |p| p.iso),
            focal_length: aggregate(photos, MIXED, |p| p.focal_length),
            f_number: aggregate(photos, 0.0, |p| p.f_number),
            exposure: aggregate(photos, String::new(), |p| p.exposure.clone()),
            subject: aggregate(photos, String::new(), |p| p.details.subject.clone()),
            artist: aggregate(photos, String::new(), |p| p.details.artist.clone()),
            copyright: aggregate(photos, String::new(), |p| p.details.copyright.clone()),
            license: aggregate(photos, String::new(), |p| p.details.license.clone()),
            notes: aggregate(photos, String::new(), |p| p.details.notes.clone()),
            albums: aggregate_items(
                total,
                photos
                    .iter()
                    .flat_map(|p| p.albums.iter().map(|a| (a.uid.as_str(), a.title.as_str()))),
            ),
            labels: aggregate_items(
                total,
                photos.iter().flat_map(|p| {
                    p.labels
                        .iter()
                        .filter(|l| !l.is_blocked())
                        .map(|l| (l.label_uid.as_str(), l.name.as_str()))
                }),
            ),
        }
    }

    /// Neutralize invalid fields and items before anything is written.
    ///
    /// Each rejected field or item has its action reset to `None` and yields
    /// one `Validation` error; the rest of the form stays usable. Clearing a
    /// date component stores it as unknown.
    pub fn sanitize(&mut self) -> Vec<Error> {
        let mut errors = Vec::new();

        for field in [&mut self.day, &mut self.month, &mut self.year] {
            if field.action == Action::Remove {
                *field = IntField::update(UNKNOWN);
            }
        }

        check_int(&mut errors, "day", &mut self.day, |v| v == UNKNOWN || (1..=31).contains(&v));
        check_int(&mut errors, "month", &mut self.month, |v| v == UNKNOWN || (1..=12).contains(&v));
        check_int(&mut errors, "year", &mut self.year, |v| {
            v == UNKNOWN || (1000..=9999).contains(&v)
        });
        check_int(&mut errors, "iso", &mut self.iso, |v| v >= 0);
        check_int(&mut errors, "focal_length", &mut self.focal_length, |v| v >= 0);

        check_float(&mut errors, "lat", &mut self.lat, |v| (-90.0..=90.0).contains(&v));
        check_float(&mut errors, "lng", &mut self.lng, |v| (-180.0..=180.0).contains(&v));
        check_float(&mut errors, "f_number", &mut self.f_number, |v| v >= 0.0);

        if self.country.action == Action::Update {
            let country = self.country.value.trim().to_ascii_lowercase();
            if country.is_empty() {
                self.country.value = "zz".to_string();
            } else if country.len() == 2 && country.bytes().all(|b| b.is_ascii_lowercase()) {
                self.country.value = country;
            } else {
                errors.push(Error::Validation(format!("invalid country code {:?}", self.country.value)));
                self.country.clear_action();
            }
        } else if self.country.action == Action::Remove {
            self.country = StringField::update("zz".to_string());
        }

        if self.time_zone.is_set() {
            self.time_zone.value = self.time_zone.value.trim().to_string();
        }

        check_items(&mut errors, "album", ALBUM_PREFIX, &mut self.albums);
        check_items(&mut errors, "label", LABEL_PREFIX, &mut self.labels);

        errors
    }
}

fn check_int(errors: &mut Vec<Error>, name: &str, field: &mut IntField, valid: impl Fn(i32) -> bool) {
    if field.action == Action::Update && !valid(field.value) {
        errors.push(Error::Validation(format!("{} out of range: {}", name, field.value)));
        field.clear_action();
    }
}

fn check_float(errors: &mut Vec<Error>, name: &str, field: &mut FloatField, valid: impl Fn(f64) -> bool) {
    if field.action == Action::Update && !(field.value.is_finite() && valid(field.value)) {
        errors.push(Error::Validation(format!("{} out of range: {}", name, field.value)));
        field.clear_action();
    }
}

fn check_items(errors: &mut Vec<Error>, kind: &str, prefix: char, items: &mut Items) {
    if !items.is_update() {
        return;
    }
    for item in items.items.iter_mut() {
        let valid = match item.action {
            Action::Add if item.value.is_empty() => !item.title.trim().is_empty(),
            Action::Add | Action::Remove => is_uid(&item.value, prefix),
            Action::None | Action::Update => true,
        };
        if !valid {
            errors.push(Error::Validation(format!(
                "invalid {} item {:?} {:?}",
                kind, item.value, item.title
            )));
            item.action = Action::None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Album, PhotoLabel, BLOCKED};
    use chrono::NaiveDate;

    fn photo(y: i32, m: u32, d: u32) -> Photo {
        Photo::taken(
            NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|d| d.and_hms_opt(9, 0, 0))
                .unwrap(),
        )
    }

    fn album(uid: &str, title: &str) -> Album {
        Album {
            id: 1,
            uid: uid.to_string(),
            slug: crate::db::slugify(title),
            title: title.to_string(),
            album_type: "album".to_string(),
            deleted_at: None,
        }
    }

    #[test]
    fn test_mixed_fields_use_placeholders() {
        let mut a = photo(2020, 5, 1);
        let mut b = photo(2020, 7, 1);
        a.title = "Beach".to_string();
        b.title = "Beach".to_string();
        a.iso = 100;
        b.iso = 200;
        a.lat = 52.5;

        let form = PhotosForm::from_photos(&[a, b]);
        assert_eq!(form.title.value, "Beach");
        assert!(!form.title.mixed);
        assert_eq!(form.year.value, 2020);
        assert!(form.month.mixed);
        assert_eq!(form.month.value, MIXED);
        assert_eq!(form.iso.value, MIXED);
        assert!(form.lat.mixed);
        assert_eq!(form.lat.value, 0.0);
        assert_eq!(form.day.value, 1);
    }

    #[test]
    fn test_unknown_day_is_not_mixed() {
        let mut a = photo(2020, 5, 1);
        let mut b = photo(2021, 5, 1);
        a.day = UNKNOWN;
        b.day = UNKNOWN;
        let form = PhotosForm::from_photos(&[a, b]);
        assert_eq!(form.day.value, UNKNOWN);
        assert!(!form.day.mixed);
        assert_eq!(form.year.value, MIXED);
    }

    #[test]
    fn test_relation_items_shared_first() {
        let mut a = photo(2020, 5, 1);
        let mut b = photo(2020, 5, 2);
        a.albums = vec![album("a000000000000002", "zoo"), album("a000000000000001", "Berlin")];
        b.albums = vec![album("a000000000000002", "zoo"), album("a000000000000003", "Alps")];
        a.labels = vec![PhotoLabel {
            photo_id: 1,
            label_id: 1,
            label_uid: "l000000000000001".to_string(),
            name: "Flower".to_string(),
            source: "batch".to_string(),
            uncertainty: BLOCKED,
        }];

        let form = PhotosForm::from_photos(&[a, b]);
        let titles: Vec<&str> = form.albums.items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["zoo", "Alps", "Berlin"]);
        assert!(!form.albums.items[0].mixed);
        assert!(form.albums.items[1].mixed);
        assert!(form.albums.mixed);
        assert!(form.labels.items.is_empty());
    }

    #[test]
    fn test_sanitize_neutralizes_invalid_values() {
        let mut form = PhotosForm {
            day: IntField::remove(),
            month: IntField::update(13),
            year: IntField::update(2021),
            lat: FloatField::update(95.0),
            country: StringField::update("DE".to_string()),
            labels: Items::update(vec![
                Item::add_title("Flower"),
                Item::add_uid("not-a-uid"),
                Item::remove_uid("a000000000000001"),
                Item::add_title("  "),
            ]),
            ..Default::default()
        };

        let errors = form.sanitize();
        assert_eq!(errors.len(), 5);
        assert_eq!(form.day, IntField::update(UNKNOWN));
        assert_eq!(form.month.action, Action::None);
        assert_eq!(form.year.action, Action::Update);
        assert_eq!(form.lat.action, Action::None);
        assert_eq!(form.country.value, "de");
        let actions: Vec<Action> = form.labels.items.iter().map(|i| i.action).collect();
        assert_eq!(actions, vec![Action::Add, Action::None, Action::None, Action::None]);
    }

    #[test]
    fn test_mixed_placeholder_cannot_be_written() {
        let mut form = PhotosForm {
            day: IntField::update(MIXED),
            ..Default::default()
        };
        assert_eq!(form.sanitize().len(), 1);
        assert!(!form.day.is_set());
    }
}
