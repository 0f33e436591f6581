/// Dense ordering of items within a parent
///
/// Columns within a board and tasks within a column each carry an `order`
/// that must always form the sequence `0..n-1` for their parent. This module
/// holds that invariant in one place: an [`OrderedCollection`] is a list of
/// item ids where an item's index *is* its order. Every mutation re-derives
/// the indices, and [`OrderedCollection::changes_since`] reports which rows
/// actually need to be written back.
///
/// The collection is pure and synchronous. The models load sibling ids into
/// it inside a transaction, apply one operation, and persist the diff.
///
/// # Example
///
/// ```
/// use tremu_shared::ordering::OrderedCollection;
///
/// // Columns A(0), B(1), C(2)
/// let before = OrderedCollection::from_ids(vec![10, 11, 12]);
///
/// let mut after = before.clone();
/// after.move_to(12, 0).unwrap();
///
/// assert_eq!(after.ids(), &[12, 10, 11]);
/// assert_eq!(after.changes_since(&before), vec![(12, 0), (10, 1), (11, 2)]);
/// ```

use std::collections::{HashMap, HashSet};

/// Item identifier (primary key of the ordered row)
pub type ItemId = i64;

/// Error type for ordering operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderingError {
    /// Requested order is outside the valid range for the operation
    #[error("order {requested} is out of range (must be between 0 and {max})")]
    OutOfRange { requested: i64, max: i64 },

    /// Item is not in this collection
    #[error("item {0} is not part of this list")]
    UnknownItem(ItemId),

    /// Item is already in this collection
    #[error("item {0} is already part of this list")]
    DuplicateItem(ItemId),
}

/// Ids of a parent's children, indexed by their order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedCollection {
    items: Vec<ItemId>,
}

impl OrderedCollection {
    /// Creates an empty collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection from ids already sorted by their current order
    ///
    /// Stored orders are not consulted; the result is dense regardless of
    /// gaps in the source rows, which lets a write-back heal them.
    pub fn from_ids(ids: Vec<ItemId>) -> Self {
        Self { items: ids }
    }

    /// Number of items
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the collection has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Ids in order
    pub fn ids(&self) -> &[ItemId] {
        &self.items
    }

    /// Current order of an item
    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| *item == id)
    }

    /// Order the next appended item will receive
    pub fn next_order(&self) -> i32 {
        to_order(self.items.len())
    }

    /// Appends an item, returning the order it was assigned
    ///
    /// The assigned order equals the number of items that existed before.
    pub fn push(&mut self, id: ItemId) -> Result<i32, OrderingError> {
        if self.position_of(id).is_some() {
            return Err(OrderingError::DuplicateItem(id));
        }

        self.items.push(id);
        Ok(to_order(self.items.len() - 1))
    }

    /// Inserts an item coming from another parent at `target`
    ///
    /// Valid targets are `0..=len`: the destination has one more slot after
    /// the insert. Everything at or after `target` shifts up by one.
    pub fn insert_at(&mut self, id: ItemId, target: i64) -> Result<(), OrderingError> {
        let index = check_range(target, self.items.len())?;

        if self.position_of(id).is_some() {
            return Err(OrderingError::DuplicateItem(id));
        }

        self.items.insert(index, id);
        Ok(())
    }

    /// Moves an item to `target` within this collection
    ///
    /// Valid targets are `0..len`. The item is taken out and spliced back in
    /// at `target`; items between the old and new slot shift by one toward
    /// the vacated slot. Returns the item's previous order.
    pub fn move_to(&mut self, id: ItemId, target: i64) -> Result<usize, OrderingError> {
        let old = self
            .position_of(id)
            .ok_or(OrderingError::UnknownItem(id))?;
        let index = check_range(target, self.items.len() - 1)?;

        if old != index {
            let moved = self.items.remove(old);
            self.items.insert(index, moved);
        }

        Ok(old)
    }

    /// Removes an item, returning the order it had
    ///
    /// Every item after it shifts down by one.
    pub fn remove(&mut self, id: ItemId) -> Result<usize, OrderingError> {
        let old = self
            .position_of(id)
            .ok_or(OrderingError::UnknownItem(id))?;

        self.items.remove(old);
        Ok(old)
    }

    /// `(id, order)` for every item
    pub fn orders(&self) -> impl Iterator<Item = (ItemId, i32)> + '_ {
        self.items
            .iter()
            .enumerate()
            .map(|(index, id)| (*id, to_order(index)))
    }

    /// Rows whose order differs from `before`, or which are new
    ///
    /// Items removed since `before` are not reported; deleting them is the
    /// caller's primary mutation.
    pub fn changes_since(&self, before: &OrderedCollection) -> Vec<(ItemId, i32)> {
        let previous: HashMap<ItemId, i32> = before.orders().collect();

        self.orders()
            .filter(|(id, order)| previous.get(id) != Some(order))
            .collect()
    }

    /// Checks that `orders` is exactly `{0, 1, ..., n-1}`
    pub fn is_dense(orders: &[i32]) -> bool {
        let mut seen = HashSet::with_capacity(orders.len());
        orders.iter().all(|order| {
            *order >= 0 && (*order as usize) < orders.len() && seen.insert(*order)
        })
    }
}

/// Validates `target` against `0..=max` and converts it to an index
///
/// `max` is inclusive. A move within `n` items passes `n - 1`, an insert
/// into `n` items passes `n`.
fn check_range(target: i64, max: usize) -> Result<usize, OrderingError> {
    let max = max as i64;
    if target < 0 || target > max {
        return Err(OrderingError::OutOfRange {
            requested: target,
            max,
        });
    }

    Ok(target as usize)
}

fn to_order(index: usize) -> i32 {
    // Positions are stored as INTEGER
    index as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn collection(ids: &[ItemId]) -> OrderedCollection {
        OrderedCollection::from_ids(ids.to_vec())
    }

    fn order_values(c: &OrderedCollection) -> Vec<i32> {
        c.orders().map(|(_, order)| order).collect()
    }

    #[test]
    fn test_push_assigns_count_of_existing_items() {
        let mut c = OrderedCollection::new();
        assert_eq!(c.push(7).unwrap(), 0);
        assert_eq!(c.push(3).unwrap(), 1);
        assert_eq!(c.next_order(), 2);
        assert_eq!(c.push(9).unwrap(), 2);
        assert_eq!(c.ids(), &[7, 3, 9]);
        assert_eq!(c.next_order(), 3);
    }

    #[test]
    fn test_push_rejects_duplicate() {
        let mut c = collection(&[1, 2]);
        assert_eq!(c.push(2), Err(OrderingError::DuplicateItem(2)));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn test_move_to_lower_order_shifts_range_up() {
        // A(0) B(1) C(2) D(3); move D to 1 -> A(0) D(1) B(2) C(3)
        let before = collection(&[1, 2, 3, 4]);
        let mut after = before.clone();

        assert_eq!(after.move_to(4, 1).unwrap(), 3);
        assert_eq!(after.ids(), &[1, 4, 2, 3]);
        assert_eq!(after.changes_since(&before), vec![(4, 1), (2, 2), (3, 3)]);
    }

    #[test]
    fn test_move_to_higher_order_shifts_range_down() {
        // A(0) B(1) C(2) D(3); move A to 2 -> B(0) C(1) A(2) D(3)
        let before = collection(&[1, 2, 3, 4]);
        let mut after = before.clone();

        assert_eq!(after.move_to(1, 2).unwrap(), 0);
        assert_eq!(after.ids(), &[2, 3, 1, 4]);
        assert_eq!(after.changes_since(&before), vec![(2, 0), (3, 1), (1, 2)]);
    }

    #[test]
    fn test_move_to_same_order_is_noop() {
        let before = collection(&[1, 2, 3]);
        let mut after = before.clone();

        assert_eq!(after.move_to(2, 1).unwrap(), 1);
        assert_eq!(after, before);
        assert!(after.changes_since(&before).is_empty());
    }

    #[test]
    fn test_reorder_last_column_to_front() {
        // Columns A(0), B(1), C(2); C to 0 -> A(1), B(2), C(0)
        let (a, b, c) = (100, 200, 300);
        let mut columns = collection(&[a, b, c]);
        columns.move_to(c, 0).unwrap();

        let orders: HashMap<ItemId, i32> = columns.orders().collect();
        assert_eq!(orders[&a], 1);
        assert_eq!(orders[&b], 2);
        assert_eq!(orders[&c], 0);
    }

    #[test]
    fn test_move_rejects_out_of_range_without_mutation() {
        let before = collection(&[1, 2, 3]);
        let mut after = before.clone();

        assert_eq!(
            after.move_to(1, 3),
            Err(OrderingError::OutOfRange { requested: 3, max: 2 })
        );
        assert_eq!(
            after.move_to(1, -1),
            Err(OrderingError::OutOfRange { requested: -1, max: 2 })
        );
        assert_eq!(after, before);
    }

    #[test]
    fn test_move_unknown_item() {
        let mut c = collection(&[1, 2]);
        assert_eq!(c.move_to(5, 0), Err(OrderingError::UnknownItem(5)));
    }

    #[test]
    fn test_remove_compacts_following_items() {
        let before = collection(&[1, 2, 3, 4]);
        let mut after = before.clone();

        assert_eq!(after.remove(2).unwrap(), 1);
        assert_eq!(after.ids(), &[1, 3, 4]);
        assert_eq!(after.changes_since(&before), vec![(3, 1), (4, 2)]);
    }

    #[test]
    fn test_remove_last_changes_nothing_else() {
        let before = collection(&[1, 2, 3]);
        let mut after = before.clone();

        after.remove(3).unwrap();
        assert!(after.changes_since(&before).is_empty());
    }

    #[test]
    fn test_cross_parent_move() {
        // Source: 1 2 3, destination: 7 8. Move 2 into destination at 1.
        let source_before = collection(&[1, 2, 3]);
        let dest_before = collection(&[7, 8]);
        let mut source = source_before.clone();
        let mut dest = dest_before.clone();

        source.remove(2).unwrap();
        dest.insert_at(2, 1).unwrap();

        assert_eq!(source.ids(), &[1, 3]);
        assert_eq!(dest.ids(), &[7, 2, 8]);
        assert_eq!(source.changes_since(&source_before), vec![(3, 1)]);
        assert_eq!(dest.changes_since(&dest_before), vec![(2, 1), (8, 2)]);
    }

    #[test]
    fn test_insert_at_end_and_bounds() {
        let mut dest = collection(&[7, 8]);
        assert!(dest.insert_at(9, 2).is_ok());
        assert_eq!(dest.ids(), &[7, 8, 9]);

        assert_eq!(
            dest.insert_at(10, 4),
            Err(OrderingError::OutOfRange { requested: 4, max: 3 })
        );
        assert_eq!(dest.insert_at(8, 0), Err(OrderingError::DuplicateItem(8)));
    }

    #[test]
    fn test_insert_into_empty_collection() {
        let mut dest = OrderedCollection::new();
        assert!(dest.insert_at(1, 0).is_ok());
        assert!(dest.insert_at(2, 2).is_err());
    }

    #[test]
    fn test_from_ids_heals_gaps() {
        // Rows stored with positions 0, 2, 5 load in that order.
        let before = OrderedCollection::new();
        let c = collection(&[4, 5, 6]);
        assert_eq!(order_values(&c), vec![0, 1, 2]);
        assert_eq!(c.changes_since(&before).len(), 3);
    }

    #[test]
    fn test_is_dense() {
        assert!(OrderedCollection::is_dense(&[]));
        assert!(OrderedCollection::is_dense(&[2, 0, 1]));
        assert!(!OrderedCollection::is_dense(&[0, 2]));
        assert!(!OrderedCollection::is_dense(&[0, 0, 1]));
        assert!(!OrderedCollection::is_dense(&[-1, 0]));
    }

    #[test]
    fn test_error_messages() {
        let err = OrderingError::OutOfRange { requested: 5, max: 2 };
        assert_eq!(
            err.to_string(),
            "order 5 is out of range (must be between 0 and 2)"
        );
        assert!(OrderingError::UnknownItem(3).to_string().contains('3'));
    }

    #[test]
    fn test_random_operation_sequences_stay_dense() {
        let mut rng = StdRng::seed_from_u64(0x7e3a);

        for _ in 0..200 {
            let mut lists = vec![OrderedCollection::new(), OrderedCollection::new()];
            let mut next_id: ItemId = 1;

            for _ in 0..60 {
                let which = rng.gen_range(0..lists.len());
                match rng.gen_range(0..4) {
                    0 => {
                        lists[which].push(next_id).unwrap();
                        next_id += 1;
                    }
                    1 if !lists[which].is_empty() => {
                        let len = lists[which].len();
                        let id = lists[which].ids()[rng.gen_range(0..len)];
                        let target = rng.gen_range(0..len) as i64;
                        lists[which].move_to(id, target).unwrap();
                    }
                    2 if !lists[which].is_empty() => {
                        let len = lists[which].len();
                        let id = lists[which].ids()[rng.gen_range(0..len)];
                        lists[which].remove(id).unwrap();
                    }
                    3 if !lists[which].is_empty() => {
                        let other = 1 - which;
                        let len = lists[which].len();
                        let id = lists[which].ids()[rng.gen_range(0..len)];
                        let target = rng.gen_range(0..=lists[other].len()) as i64;
                        lists[which].remove(id).unwrap();
                        lists[other].insert_at(id, target).unwrap();
                    }
                    _ => {}
                }

                for list in &lists {
                    assert!(OrderedCollection::is_dense(&order_values(list)));
                }
            }
        }
    }

    #[test]
    fn test_changes_since_applied_to_rows_matches_result() {
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let len = rng.gen_range(1..12);
            let before = OrderedCollection::from_ids((1..=len as ItemId).collect());
            let mut after = before.clone();

            let id = rng.gen_range(1..=len as ItemId);
            let target = rng.gen_range(0..len) as i64;
            after.move_to(id, target).unwrap();

            // Simulate the write-back against the stored rows
            let mut rows: HashMap<ItemId, i32> = before.orders().collect();
            for (id, order) in after.changes_since(&before) {
                rows.insert(id, order);
            }

            let expected: HashMap<ItemId, i32> = after.orders().collect();
            assert_eq!(rows, expected);
        }
    }
}
