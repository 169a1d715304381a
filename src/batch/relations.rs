//! Album and label membership changes for one photo.

use rusqlite::types::Value;
use tracing::{debug, error};

use super::action::{Action, Items};
use super::labels::{apply_removal, attach_label, decide_removal};
use crate::db::{with_retry, Photo, RetryPolicy, Store};
use crate::error::{Error, Result};
use crate::source::{PriorityTable, SRC_BATCH};

/// Changes and errors from applying one relation plan to one photo.
#[derive(Debug, Default)]
pub struct RelationOutcome {
    pub changed: usize,
    pub errors: Vec<Error>,
}

impl RelationOutcome {
    fn record(&mut self, photo: &Photo, what: &str, result: Result<bool>) {
        match result {
            Ok(true) => self.changed += 1,
            Ok(false) => {}
            Err(e) => {
                error!("{} failed for photo {}: {}", what, photo.uid, e);
                self.errors.push(e);
            }
        }
    }
}

/// Add the photo to, or hide it in, each album of the plan.
pub fn apply_albums(store: &dyn Store, retry: RetryPolicy, photo: &mut Photo, plan: &Items) -> RelationOutcome {
    let mut outcome = RelationOutcome::default();
    if !plan.is_update() {
        return outcome;
    }

    for item in &plan.items {
        match item.action {
            Action::Add => {
                let result = add_to_album(store, retry, photo, &item.value);
                outcome.record(photo, "Adding to album", result);
            }
            Action::Remove => {
                let result = with_retry("hide album membership", retry, || {
                    store.hide_photo_in_album(&item.value, &photo.uid)
                });
                if let Ok(true) = result {
                    photo.albums.retain(|a| a.uid != item.value);
                }
                outcome.record(photo, "Removing from album", result);
            }
            Action::None | Action::Update => {}
        }
    }
    outcome
}

fn add_to_album(store: &dyn Store, retry: RetryPolicy, photo: &mut Photo, album_uid: &str) -> Result<bool> {
    let mut album = store
        .find_album(album_uid)?
        .ok_or_else(|| Error::not_found("album", album_uid))?;
    if album.is_deleted() {
        store.restore_album(album.id)?;
        album.deleted_at = None;
    }

    let membership = with_retry("add album membership", retry, || {
        store.add_photo_to_album(&album.uid, &photo.uid)
    })?;
    debug!("Photo {} in album {}: {:?}", photo.uid, album.uid, membership);

    if !photo.albums.iter().any(|a| a.uid == album.uid) {
        photo.albums.push(album);
    }
    Ok(membership.changed())
}

/// Attach or remove each label of the plan.
///
/// Added labels are attached as `(batch, 0)` subject to the provenance of
/// the existing association. Removals go through the decision matrix. Once
/// the label list is refreshed, names of removed labels that are no longer
/// visible are dropped from the photo's keywords.
pub fn apply_labels(
    store: &dyn Store,
    priorities: &PriorityTable,
    retry: RetryPolicy,
    photo: &mut Photo,
    plan: &Items,
) -> RelationOutcome {
    let mut outcome = RelationOutcome::default();
    if !plan.is_update() {
        return outcome;
    }

    let mut removed = Vec::new();
    for item in &plan.items {
        match item.action {
            Action::Add => {
                let result = add_label(store, priorities, retry, photo, &item.value);
                outcome.record(photo, "Adding label", result);
            }
            Action::Remove => {
                let result = remove_label(store, priorities, retry, photo, &item.value);
                if let Ok(Some(name)) = &result {
                    removed.push(name.clone());
                }
                outcome.record(photo, "Removing label", result.map(|name| name.is_some()));
            }
            Action::None | Action::Update => {}
        }
    }

    if outcome.changed == 0 {
        return outcome;
    }

    match store.photo_labels(photo.id) {
        Ok(labels) => photo.labels = labels,
        Err(e) => {
            error!("Reloading labels of photo {} failed: {}", photo.uid, e);
            outcome.errors.push(e);
            return outcome;
        }
    }

    let result = drop_keywords(store, retry, photo, &removed);
    if let Err(e) = result {
        error!("Updating keywords of photo {} failed: {}", photo.uid, e);
        outcome.errors.push(e);
    }
    outcome
}

fn add_label(
    store: &dyn Store,
    priorities: &PriorityTable,
    retry: RetryPolicy,
    photo: &Photo,
    label_uid: &str,
) -> Result<bool> {
    let mut label = store
        .find_label(label_uid)?
        .ok_or_else(|| Error::not_found("label", label_uid))?;
    if label.is_deleted() {
        store.restore_label(label.id)?;
        label.deleted_at = None;
    }
    attach_label(
        store,
        priorities,
        retry,
        photo.id,
        photo.label(label.id),
        &label,
        SRC_BATCH,
        0,
    )
}

/// Returns the label name if the store was changed. A missing label or
/// association is not an error.
fn remove_label(
    store: &dyn Store,
    priorities: &PriorityTable,
    retry: RetryPolicy,
    photo: &Photo,
    label_uid: &str,
) -> Result<Option<String>> {
    let Some(label) = store.find_label(label_uid)? else {
        debug!("Label {} does not exist, nothing to remove", label_uid);
        return Ok(None);
    };
    let Some(assoc) = photo.label(label.id) else {
        return Ok(None);
    };

    let decision = decide_removal(priorities, Some(assoc));
    debug!("Removing {} from {}: {:?}", label.name, photo.uid, decision);
    if apply_removal(store, retry, assoc, decision)? {
        Ok(Some(label.name))
    } else {
        Ok(None)
    }
}

fn drop_keywords(store: &dyn Store, retry: RetryPolicy, photo: &mut Photo, removed: &[String]) -> Result<()> {
    let visible: Vec<String> = photo.label_names().iter().map(|n| n.to_lowercase()).collect();
    let mut changed = false;
    for name in removed {
        if !visible.contains(&name.to_lowercase()) {
            changed |= photo.details.remove_keyword(name);
        }
    }
    if !changed {
        return Ok(());
    }

    let columns = [("keywords", Value::Text(photo.details.keywords.clone()))];
    with_retry("update keywords", retry, || {
        store.update_details_columns(photo.id, &columns)
    })
}
