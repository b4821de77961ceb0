//! Tag reconciliation: which product/tag associations to add and remove.
//!
//! Given the tags a product currently has and the tags a request asks for:
//!
//! ```text
//! to_create = desired  - existing
//! to_remove = existing - desired
//! ```
//!
//! Both sides are treated as sets: duplicates are collapsed before diffing and
//! an absent desired list is the empty set. Outputs are sorted ascending so
//! the result does not depend on input order.

use std::collections::BTreeSet;

use storefront_core::TagId;

use crate::tag::ProductTag;

/// Tag-id level diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagDiff {
    pub to_create: Vec<TagId>,
    pub to_remove: Vec<TagId>,
}

impl TagDiff {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_remove.is_empty()
    }
}

/// Row level diff: ids to insert, existing association rows to delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssociationDiff {
    pub to_create: Vec<TagId>,
    pub to_remove: Vec<ProductTag>,
}

/// Distinct tag ids in ascending order. `None` yields an empty list.
pub fn dedup_tag_ids(ids: Option<&[TagId]>) -> Vec<TagId> {
    ids.unwrap_or_default()
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Diff two tag-id sets.
pub fn reconcile_tag_ids<I>(existing: I, desired: Option<&[TagId]>) -> TagDiff
where
    I: IntoIterator<Item = TagId>,
{
    let existing: BTreeSet<TagId> = existing.into_iter().collect();
    let desired: BTreeSet<TagId> = desired.unwrap_or_default().iter().copied().collect();

    TagDiff {
        to_create: desired.difference(&existing).copied().collect(),
        to_remove: existing.difference(&desired).copied().collect(),
    }
}

/// Diff a product's association rows against the desired tag ids.
///
/// Every existing row whose tag is not desired is scheduled for removal, so
/// duplicate rows for an undesired tag are all removed.
pub fn reconcile_associations(
    existing: &[ProductTag],
    desired: Option<&[TagId]>,
) -> AssociationDiff {
    let diff = reconcile_tag_ids(existing.iter().map(|row| row.tag_id), desired);
    let removed_tags: BTreeSet<TagId> = diff.to_remove.into_iter().collect();

    let mut to_remove: Vec<ProductTag> = existing
        .iter()
        .filter(|row| removed_tags.contains(&row.tag_id))
        .copied()
        .collect();
    to_remove.sort_by_key(|row| row.id);

    AssociationDiff {
        to_create: diff.to_create,
        to_remove,
    }
}
