//! Title to UID resolution for albums and labels named in a batch form.
//!
//! One resolver lives for exactly one batch call. Each distinct
//! (kind, title, action) triple reaches the store at most once, so a name
//! referenced by many photos maps to a single album or label row.

use std::collections::HashMap;

use super::action::{Action, Items};
use crate::db::{slugify, Store};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Album,
    Label,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Album => "album",
            EntityKind::Label => "label",
        }
    }
}

pub struct TitleResolver<'a> {
    store: &'a dyn Store,
    album_type: &'a str,
    cache: HashMap<(EntityKind, String, Action), Option<String>>,
    lookups: usize,
}

impl<'a> TitleResolver<'a> {
    pub fn new(store: &'a dyn Store, album_type: &'a str) -> Self {
        Self {
            store,
            album_type,
            cache: HashMap::new(),
            lookups: 0,
        }
    }

    /// Number of times the store was consulted.
    pub fn lookups(&self) -> usize {
        self.lookups
    }

    /// UID for `title`, creating or restoring the entity if needed.
    ///
    /// Returns `None` unless `action` is `Add` and the title is non-empty, or
    /// when the store fails; callers treat `None` as "skip this item".
    pub fn resolve(&mut self, kind: EntityKind, title: &str, action: Action) -> Option<String> {
        let title = title.trim();
        if action != Action::Add || title.is_empty() {
            return None;
        }

        let key = (kind, title.to_string(), action);
        if let Some(uid) = self.cache.get(&key) {
            return uid.clone();
        }

        self.lookups += 1;
        let uid = match self.find_or_create(kind, title) {
            Ok(uid) => Some(uid),
            Err(e) => {
                tracing::warn!("Failed to resolve {} {:?}: {}", kind.as_str(), title, e);
                None
            }
        };
        self.cache.insert(key, uid.clone());
        uid
    }

    /// Fill in the UID of every `Add` item that only carries a title.
    ///
    /// Items that cannot be resolved are switched to `Action::None`; one
    /// error per such item is returned.
    pub fn resolve_items(&mut self, kind: EntityKind, items: &mut Items) -> Vec<Error> {
        let mut errors = Vec::new();
        if !items.is_update() {
            return errors;
        }
        for item in items.items.iter_mut() {
            if item.action != Action::Add || !item.value.is_empty() {
                continue;
            }
            match self.resolve(kind, &item.title, item.action) {
                Some(uid) => item.value = uid,
                None => {
                    item.action = Action::None;
                    errors.push(Error::Validation(format!(
                        "could not resolve {} {:?}",
                        kind.as_str(),
                        item.title
                    )));
                }
            }
        }
        errors
    }

    fn find_or_create(&self, kind: EntityKind, title: &str) -> Result<String> {
        let slug = slugify(title);
        if slug.is_empty() {
            return Err(Error::Validation(format!("{} title {:?} has no usable characters", kind.as_str(), title)));
        }
        match kind {
            EntityKind::Album => match self.store.find_album_by_slug(&slug)? {
                Some(album) => {
                    if album.is_deleted() {
                        tracing::info!("Restoring album {} ({})", album.title, album.uid);
                        self.store.restore_album(album.id)?;
                    }
                    Ok(album.uid)
                }
                None => {
                    let album = self.store.create_album(title, self.album_type)?;
                    tracing::info!("Created album {} ({})", album.title, album.uid);
                    Ok(album.uid)
                }
            },
            EntityKind::Label => Ok(find_or_create_label(self.store, title)?.uid),
        }
    }
}

/// Find a label by name, restoring it if soft-deleted, or create it.
pub fn find_or_create_label(store: &dyn Store, name: &str) -> Result<crate::db::Label> {
    let slug = slugify(name);
    if slug.is_empty() {
        return Err(Error::Validation(format!("label name {:?} has no usable characters", name)));
    }
    match store.find_label_by_slug(&slug)? {
        Some(mut label) => {
            if label.is_deleted() {
                tracing::info!("Restoring label {} ({})", label.name, label.uid);
                store.restore_label(label.id)?;
                label.deleted_at = None;
            }
            Ok(label)
        }
        None => {
            let label = store.create_label(name.trim(), 0)?;
            tracing::info!("Created label {} ({})", label.name, label.uid);
            Ok(label)
        }
    }
}
