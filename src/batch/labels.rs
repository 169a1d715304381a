//! Provenance-aware label attachment and removal.

use crate::db::{with_retry, Label, PhotoLabel, RetryPolicy, Store, BLOCKED};
use crate::error::Result;
use crate::source::{PriorityTable, SRC_BATCH, SRC_VISION};

/// What removing a label from a photo does to an existing association.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalDecision {
    /// Leave the association as it is.
    Keep,
    /// Rewrite it as `(batch, BLOCKED)` so indexers do not re-add the label.
    Block,
    /// Delete the association row.
    Delete,
}

/// Decide how a batch removal treats `assoc`.
///
/// A removal never overrides a source ranked above `batch`. Lower-ranked
/// associations are blocked rather than deleted, so the indexer that created
/// them cannot silently bring them back. Associations at batch rank are
/// deleted, except vision output which can be regenerated and is blocked.
pub fn decide_removal(priorities: &PriorityTable, assoc: Option<&PhotoLabel>) -> RemovalDecision {
    let Some(assoc) = assoc else {
        return RemovalDecision::Keep;
    };

    let current = priorities.priority(&assoc.source);
    let batch = priorities.priority(SRC_BATCH);

    if current > batch {
        RemovalDecision::Keep
    } else if current == batch && assoc.uncertainty == BLOCKED {
        RemovalDecision::Keep
    } else if current < batch || assoc.source == SRC_VISION {
        RemovalDecision::Block
    } else {
        RemovalDecision::Delete
    }
}

/// Carry out a removal decision. Returns true if the store was changed.
pub fn apply_removal(
    store: &dyn Store,
    retry: RetryPolicy,
    assoc: &PhotoLabel,
    decision: RemovalDecision,
) -> Result<bool> {
    match decision {
        RemovalDecision::Keep => Ok(false),
        RemovalDecision::Block => {
            let blocked = PhotoLabel {
                source: SRC_BATCH.to_string(),
                uncertainty: BLOCKED,
                ..assoc.clone()
            };
            with_retry("block photo label", retry, || store.save_photo_label(&blocked))?;
            Ok(true)
        }
        RemovalDecision::Delete => {
            with_retry("delete photo label", retry, || {
                store.delete_photo_label(assoc.photo_id, assoc.label_id)
            })?;
            Ok(true)
        }
    }
}

/// Attach `label` to a photo as `(source, uncertainty)`.
///
/// A missing association is created. One from a lower-ranked source is
/// taken over. One from an equally ranked source is updated in place: a
/// blocked row is unblocked, otherwise the lower uncertainty wins. A
/// higher-ranked association is left alone. Returns true if the store was
/// changed.
#[allow(clippy::too_many_arguments)]
pub fn attach_label(
    store: &dyn Store,
    priorities: &PriorityTable,
    retry: RetryPolicy,
    photo_id: i64,
    current: Option<&PhotoLabel>,
    label: &Label,
    source: &str,
    uncertainty: i32,
) -> Result<bool> {
    let target = match current {
        None => PhotoLabel {
            photo_id,
            label_id: label.id,
            label_uid: label.uid.clone(),
            name: label.name.clone(),
            source: source.to_string(),
            uncertainty,
        },
        Some(existing) => {
            let existing_rank = priorities.priority(&existing.source);
            let rank = priorities.priority(source);
            if existing_rank > rank {
                return Ok(false);
            }
            let mut updated = existing.clone();
            if existing_rank < rank || existing.is_blocked() {
                updated.source = source.to_string();
                updated.uncertainty = uncertainty;
            } else {
                updated.uncertainty = existing.uncertainty.min(uncertainty);
            }
            if updated == *existing {
                return Ok(false);
            }
            updated
        }
    };

    with_retry("save photo label", retry, || store.save_photo_label(&target))?;
    Ok(true)
}
