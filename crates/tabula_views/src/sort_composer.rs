//! Ordering composition for view sorts.

use tabula_core::{OrderKey, OrderTarget, ViewSort};
use tracing::warn;

/// Turns a view's sorts into ordering keys.
#[derive(Debug, Clone, Copy, Default)]
pub struct SortComposer;

impl SortComposer {
    /// One key per sort, in the given order, first = most significant.
    ///
    /// Sorts are unique per field when created through the handler. If a
    /// field still appears twice, the later sort replaces the earlier one in
    /// place: its direction is used at the earlier key's precedence.
    pub fn compose(&self, sorts: &[ViewSort]) -> Vec<OrderKey> {
        let mut keys: Vec<OrderKey> = Vec::with_capacity(sorts.len());
        for sort in sorts {
            let key = OrderKey::new(OrderTarget::Field(*sort.field_id()), *sort.direction());
            match keys.iter_mut().find(|k| *k.target() == *key.target()) {
                Some(existing) => {
                    warn!(
                        view_id = %sort.view_id(),
                        field_id = %sort.field_id(),
                        "Duplicate sort on field, later sort wins"
                    );
                    *existing = key;
                }
                None => keys.push(key),
            }
        }
        keys
    }

    /// [`compose`](Self::compose) followed by the row id tie-break.
    pub fn compose_total(&self, sorts: &[ViewSort]) -> Vec<OrderKey> {
        let mut keys = self.compose(sorts);
        keys.push(OrderKey::row_id_ascending());
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{FieldId, SortDirection, SortId, ViewId};

    fn sort(id: i64, field: i64, direction: SortDirection) -> ViewSort {
        ViewSort::new(SortId::from(id), ViewId::from(1), FieldId::from(field), direction)
    }

    #[test]
    fn test_creation_order_is_precedence() {
        let keys = SortComposer.compose(&[
            sort(1, 10, SortDirection::Ascending),
            sort(2, 20, SortDirection::Descending),
        ]);
        assert_eq!(keys.len(), 2);
        assert_eq!(*keys[0].target(), OrderTarget::Field(FieldId::from(10)));
        assert_eq!(*keys[1].direction(), SortDirection::Descending);
    }

    #[test]
    fn test_duplicate_field_later_wins() {
        let keys = SortComposer.compose(&[
            sort(1, 10, SortDirection::Ascending),
            sort(2, 20, SortDirection::Ascending),
            sort(3, 10, SortDirection::Descending),
        ]);
        assert_eq!(keys.len(), 2);
        assert_eq!(*keys[0].target(), OrderTarget::Field(FieldId::from(10)));
        assert_eq!(*keys[0].direction(), SortDirection::Descending);
    }

    #[test]
    fn test_total_ends_with_row_id() {
        let keys = SortComposer.compose_total(&[]);
        assert_eq!(keys, vec![OrderKey::row_id_ascending()]);
    }
}
