//! Per-field edit actions shared by every photo in a batch.

use serde::{Deserialize, Serialize};

/// Placeholder for numeric fields whose value differs across the selection.
///
/// Distinct from [`crate::db::UNKNOWN`] (-1), which is a real stored value
/// meaning "this date component is unknown".
pub const MIXED: i32 = -2;

/// What a single form field asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    #[default]
    None,
    Update,
    Add,
    Remove,
}

/// A scalar form field.
///
/// `Update` writes `value`, an empty value clearing the field. `Remove` clears
/// the field. `None` leaves every photo untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Field<T> {
    pub value: T,
    pub mixed: bool,
    pub action: Action,
}

pub type StringField = Field<String>;
pub type IntField = Field<i32>;
pub type FloatField = Field<f64>;
pub type BoolField = Field<bool>;

impl<T: Clone + Default> Field<T> {
    pub fn update(value: T) -> Self {
        Self {
            value,
            mixed: false,
            action: Action::Update,
        }
    }

    pub fn remove() -> Self {
        Self {
            value: T::default(),
            mixed: false,
            action: Action::Remove,
        }
    }

    pub fn is_set(&self) -> bool {
        matches!(self.action, Action::Update | Action::Remove)
    }

    /// The value to write, or `None` if the field is not edited.
    pub fn target(&self) -> Option<T> {
        match self.action {
            Action::Update => Some(self.value.clone()),
            Action::Remove => Some(T::default()),
            Action::None | Action::Add => None,
        }
    }

    /// Stop editing this field.
    pub fn clear_action(&mut self) {
        self.action = Action::None;
    }
}

/// One album or label reference inside a batch form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Item {
    /// UID of an existing album or label; empty for new ones.
    pub value: String,
    /// Human-entered name.
    pub title: String,
    /// Only some of the selected photos have this relation.
    pub mixed: bool,
    pub action: Action,
}

impl Item {
    pub fn add_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            action: Action::Add,
            ..Default::default()
        }
    }

    pub fn add_uid(uid: impl Into<String>) -> Self {
        Self {
            value: uid.into(),
            action: Action::Add,
            ..Default::default()
        }
    }

    pub fn remove_uid(uid: impl Into<String>) -> Self {
        Self {
            value: uid.into(),
            action: Action::Remove,
            ..Default::default()
        }
    }
}

/// Relation-valued field. `action = Update` means "apply the per-item actions".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Items {
    pub items: Vec<Item>,
    pub mixed: bool,
    pub action: Action,
}

impl Items {
    pub fn update(items: Vec<Item>) -> Self {
        Self {
            items,
            mixed: false,
            action: Action::Update,
        }
    }

    pub fn is_update(&self) -> bool {
        self.action == Action::Update
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_target() {
        assert_eq!(StringField::update("Beach".into()).target(), Some("Beach".to_string()));
        assert_eq!(StringField::update(String::new()).target(), Some(String::new()));
        assert_eq!(StringField::remove().target(), Some(String::new()));
        assert_eq!(IntField::default().target(), None);
        assert!(!BoolField::default().is_set());
    }

    #[test]
    fn test_deserialize_form_field() {
        let field: IntField = serde_json::from_str(r#"{"value": 2021, "action": "update"}"#).unwrap();
        assert_eq!(field, IntField::update(2021));

        let items: Items = serde_json::from_str(
            r#"{"action": "update", "items": [{"title": "Flower", "action": "add"}]}"#,
        )
        .unwrap();
        assert!(items.is_update());
        assert_eq!(items.items, vec![Item::add_title("Flower")]);
    }
}
