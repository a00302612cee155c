//! Sum tree over the priorities of the records in a replay buffer.
//!
//! [`PriorityTree`] is a complete binary tree stored in a flat array of
//! `2 * capacity - 1` nodes. Node `i` has its children at `2i + 1` and `2i + 2`
//! and its parent at `(i - 1) / 2`. The last `capacity` nodes are the leaves,
//! each holding the priority of one record slot, and every internal node holds
//! the sum of its two children. The root therefore holds the total priority.
//!
//! Node values are accumulated in `f64` so that incremental updates do not
//! drift away from the leaf sums over long runs; priorities enter and leave
//! the tree as `f32`. Minimum and maximum priorities are kept in segment trees
//! alongside the sums.
//!
//! The tree also owns the record slots, written in circular order by
//! [`PriorityTree::add`].
use crate::PerError;
use segment_tree::{
    ops::{MaxIgnoreNaN, MinIgnoreNaN},
    SegmentPoint,
};

/// A sum tree with a circular store of payloads attached to its leaves.
///
/// Leaf `ix` corresponds to slot `ix - (capacity - 1)`. Slots are populated
/// from slot 0 onwards, so the populated leaves are always the contiguous range
/// starting at [`PriorityTree::first_leaf`].
#[derive(Debug)]
pub struct PriorityTree<T> {
    /// Number of leaves.
    capacity: usize,

    /// Node values.
    tree: Vec<f64>,

    /// Minimum priority over slots.
    min_tree: SegmentPoint<f32, MinIgnoreNaN>,

    /// Maximum priority over slots.
    max_tree: SegmentPoint<f32, MaxIgnoreNaN>,

    /// Payloads of the slots.
    data: Vec<Option<T>>,

    /// Next slot to be written.
    i: usize,

    /// Number of populated slots.
    size: usize,
}

impl<T> PriorityTree<T> {
    /// Creates a tree with `capacity` leaves, all with priority zero.
    pub fn new(capacity: usize) -> Result<Self, PerError> {
        if capacity == 0 {
            return Err(PerError::InvalidConfig(
                "capacity of a priority tree must be positive".to_string(),
            ));
        }

        Ok(Self {
            capacity,
            tree: vec![0.; 2 * capacity - 1],
            min_tree: SegmentPoint::build(vec![f32::MAX; capacity], MinIgnoreNaN),
            max_tree: SegmentPoint::build(vec![0f32; capacity], MaxIgnoreNaN),
            data: (0..capacity).map(|_| None).collect(),
            i: 0,
            size: 0,
        })
    }

    /// Returns the number of leaves.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of populated slots.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if no slot has been written yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns `true` if every slot has been written at least once.
    pub fn is_full(&self) -> bool {
        self.size == self.capacity
    }

    /// Returns the slot that the next call of [`PriorityTree::add`] writes.
    pub fn cursor(&self) -> usize {
        self.i
    }

    /// Index of the first leaf in the node array.
    #[inline]
    pub fn first_leaf(&self) -> usize {
        self.capacity - 1
    }

    /// Returns the leaf index of a slot, or `None` if `slot >= capacity`.
    #[inline]
    pub fn leaf_of(&self, slot: usize) -> Option<usize> {
        (slot < self.capacity).then(|| slot + self.first_leaf())
    }

    /// Returns the slot of a leaf index, or `None` if `ix` is not a leaf.
    #[inline]
    pub fn slot_of(&self, ix: usize) -> Option<usize> {
        ix.checked_sub(self.first_leaf())
            .filter(|&slot| slot < self.capacity)
    }

    /// Total priority, i.e., the value of the root.
    #[inline]
    pub fn total_priority(&self) -> f32 {
        self.tree[0] as f32
    }

    /// Priorities of the populated leaves, in slot order.
    pub fn leaves(&self) -> Vec<f32> {
        let first = self.first_leaf();
        self.tree[first..first + self.size]
            .iter()
            .map(|&p| p as f32)
            .collect()
    }

    /// Maximum priority over the populated leaves, zero if there is none.
    pub fn max_priority(&self) -> f32 {
        if self.size == 0 {
            return 0.;
        }
        self.max_tree.query(0, self.size)
    }

    /// Minimum priority over the populated leaves, zero if there is none.
    pub fn min_priority(&self) -> f32 {
        if self.size == 0 {
            return 0.;
        }
        self.min_tree.query(0, self.size)
    }

    /// Returns the priority of a populated leaf.
    pub fn priority(&self, ix: usize) -> Result<f32, PerError> {
        self.check_leaf(ix)?;
        Ok(self.tree[ix] as f32)
    }

    /// Returns the payload in a slot, if the slot has been written.
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.data.get(slot).and_then(|d| d.as_ref())
    }

    /// Writes `payload` to the next slot with the given priority.
    ///
    /// Once the tree is full the oldest slot is overwritten. Returns the leaf
    /// index of the written slot.
    pub fn add(&mut self, priority: f32, payload: T) -> usize {
        let ix = self.first_leaf() + self.i;
        self.data[self.i] = Some(payload);
        self.set(ix, priority);

        self.i = (self.i + 1) % self.capacity;
        if self.size < self.capacity {
            self.size += 1;
        }

        ix
    }

    /// Sets the priority of a populated leaf.
    pub fn update(&mut self, ix: usize, priority: f32) -> Result<(), PerError> {
        self.check_leaf(ix)?;
        self.set(ix, priority);
        Ok(())
    }

    /// Finds the leaf such that the priorities of the preceding leaves sum up
    /// to at most `v` and, including the leaf itself, to more than `v`.
    ///
    /// `v` is expected to lie in `[0, total_priority)`. The descent never enters
    /// a subtree without priority mass, so the returned leaf is always
    /// populated. Returns `(leaf_index, priority, payload)`.
    ///
    /// A value equal to the sum of a left subtree (`v == left_sum`) goes to the
    /// right-hand leaf, e.g. `lookup(1.0)` over priorities `[1, 2]` returns the
    /// second leaf.
    ///
    /// When `capacity` is not a power of two, leaves live on two depths and the
    /// prefix sums follow the in-order sequence of the leaves rather than the
    /// slot order. Sampling probabilities are proportional to priority either way.
    pub fn lookup(&self, v: f32) -> Result<(usize, f32, &T), PerError> {
        if self.tree[0] <= 0. {
            return Err(PerError::EmptyBuffer);
        }

        let first_leaf = self.first_leaf();
        let mut ix = 0;
        let mut v = v as f64;

        while ix < first_leaf {
            let left = 2 * ix + 1;
            let right = left + 1;
            let left_sum = self.tree[left];

            if v < left_sum || self.tree[right] <= 0. {
                ix = left;
            } else {
                v -= left_sum;
                ix = right;
            }
        }

        let payload = self.data[ix - first_leaf]
            .as_ref()
            .ok_or(PerError::EmptyBuffer)?;

        Ok((ix, self.tree[ix] as f32, payload))
    }

    fn check_leaf(&self, ix: usize) -> Result<(), PerError> {
        let first_leaf = self.first_leaf();
        if ix < first_leaf || ix >= first_leaf + self.size {
            return Err(PerError::IndexOutOfRange {
                ix,
                first_leaf,
                n_leaves: self.size,
            });
        }
        Ok(())
    }

    /// Sets a leaf and propagates the change up to the root.
    fn set(&mut self, mut ix: usize, priority: f32) {
        let slot = ix - self.first_leaf();
        self.min_tree.modify(slot, priority);
        self.max_tree.modify(slot, priority);

        let priority = priority as f64;
        let change = priority - self.tree[ix];
        self.tree[ix] = priority;

        while ix != 0 {
            ix = (ix - 1) / 2;
            self.tree[ix] += change;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const TOL: f32 = 1e-4;

    fn tree_with(priorities: &[f32]) -> PriorityTree<usize> {
        let mut tree = PriorityTree::new(priorities.len()).unwrap();
        for (i, &p) in priorities.iter().enumerate() {
            tree.add(p, i);
        }
        tree
    }

    /// Checks every internal node against its children and the root against
    /// the exact sum of the leaves, relative to the total mass.
    fn assert_sums(tree: &PriorityTree<usize>, rel_tol: f64) {
        let leaf_sum: f64 = tree.tree[tree.first_leaf()..].iter().sum();
        let tol = rel_tol * leaf_sum.max(1.);
        for ix in 0..tree.first_leaf() {
            let sum = tree.tree[2 * ix + 1] + tree.tree[2 * ix + 2];
            assert!(
                (tree.tree[ix] - sum).abs() <= tol,
                "node {} holds {}, children sum up to {}",
                ix,
                tree.tree[ix],
                sum
            );
        }
        assert!(
            (tree.tree[0] - leaf_sum).abs() <= tol,
            "root {} against leaf sum {}",
            tree.tree[0],
            leaf_sum
        );
    }

    #[test]
    fn test_zero_capacity() {
        assert!(matches!(
            PriorityTree::<()>::new(0),
            Err(PerError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_layout() {
        let tree = PriorityTree::<()>::new(8).unwrap();
        assert_eq!(tree.tree.len(), 15);
        assert_eq!(tree.first_leaf(), 7);
        assert_eq!(tree.leaf_of(0), Some(7));
        assert_eq!(tree.slot_of(14), Some(7));
        assert_eq!(tree.total_priority(), 0.);
        assert!(tree.is_empty());
    }

    #[test]
    fn test_leaf_slot_conversion_out_of_range() {
        let tree = PriorityTree::<()>::new(8).unwrap();
        assert_eq!(tree.leaf_of(7), Some(14));
        assert_eq!(tree.leaf_of(8), None);
        assert_eq!(tree.leaf_of(usize::MAX), None);
        // Internal nodes have no slot.
        assert_eq!(tree.slot_of(0), None);
        assert_eq!(tree.slot_of(6), None);
        assert_eq!(tree.slot_of(7), Some(0));
        assert_eq!(tree.slot_of(15), None);
    }

    #[test]
    fn test_lookup_boundaries() {
        let tree = tree_with(&[1., 2., 3., 4.]);
        assert_eq!(tree.total_priority(), 10.);

        let slot = |v: f32| *tree.lookup(v).unwrap().2;
        assert_eq!(slot(0.), 0);
        assert_eq!(slot(0.999), 0);
        assert_eq!(slot(1.0), 1);
        assert_eq!(slot(2.999), 1);
        assert_eq!(slot(3.0), 2);
        assert_eq!(slot(6.0), 3);
        assert_eq!(slot(9.999), 3);

        let (ix, p, _) = tree.lookup(4.5).unwrap();
        assert_eq!(Some(ix), tree.leaf_of(2));
        assert_eq!(p, 3.);
    }

    #[test]
    fn test_lookup_tie_goes_right() {
        let tree = tree_with(&[1., 2.]);
        let (ix, p, slot) = tree.lookup(1.).unwrap();
        assert_eq!(ix, 2);
        assert_eq!(p, 2.);
        assert_eq!(*slot, 1);
    }

    #[test]
    fn test_lookup_matches_prefix_sums() {
        let priorities = [0.5, 0., 2., 0.25, 1., 0., 0., 3.];
        let tree = tree_with(&priorities);
        let total: f32 = priorities.iter().sum();

        let mut v = 0f32;
        while v < total {
            let (ix, _, _) = tree.lookup(v).unwrap();
            let i = tree.slot_of(ix).unwrap();
            let before: f32 = priorities[..i].iter().sum();
            let upto: f32 = priorities[..=i].iter().sum();
            assert!(before <= v && v < upto, "v = {} resolved to slot {}", v, i);
            v += 0.05;
        }
    }

    #[test]
    fn test_lookup_skips_zero_leaves() {
        let tree = tree_with(&[0., 1.]);
        assert_eq!(*tree.lookup(0.).unwrap().2, 1);

        // Only two of four slots are populated.
        let mut tree = PriorityTree::new(4).unwrap();
        tree.add(1., 'a');
        tree.add(1., 'b');
        assert_eq!(*tree.lookup(1.999).unwrap().2, 'b');
        assert_eq!(*tree.lookup(2.5).unwrap().2, 'b');
    }

    #[test]
    fn test_lookup_on_odd_capacity() {
        // Leaves sit on two depths; the hit mass of each leaf still equals its priority.
        let priorities = [1., 2., 3., 4., 5.];
        let tree = tree_with(&priorities);
        let total = tree.total_priority();
        let n_grid = 15_000;
        let mut hits = vec![0usize; priorities.len()];
        for k in 0..n_grid {
            let v = total * (k as f32 + 0.5) / n_grid as f32;
            hits[*tree.lookup(v).unwrap().2] += 1;
        }
        for (i, &p) in priorities.iter().enumerate() {
            let expected = n_grid as f32 * p / total;
            assert!((hits[i] as f32 - expected).abs() <= 2., "slot {}", i);
        }
    }

    #[test]
    fn test_lookup_empty() {
        let tree = PriorityTree::<()>::new(4).unwrap();
        assert_eq!(tree.lookup(0.).unwrap_err(), PerError::EmptyBuffer);
    }

    #[test]
    fn test_update_keeps_sums() {
        let mut tree = tree_with(&[1., 2., 3., 4., 5., 6., 7.]);
        assert_sums(&tree, 1e-12);

        let updates = [(6, 0.1), (12, 9.), (8, 0.), (6, 4.2), (10, 1.5), (9, 0.7)];
        for &(ix, p) in updates.iter() {
            tree.update(ix, p).unwrap();
            assert_eq!(tree.priority(ix).unwrap(), p);
            assert_sums(&tree, 1e-12);
        }
        assert!((tree.total_priority() - (4.2 + 2. + 0. + 0.7 + 1.5 + 6. + 9.)).abs() < TOL);
    }

    #[test]
    fn test_sums_stay_exact_over_long_runs() {
        // Batches of small priorities written over a large tree for a long time.
        let capacity = 20_000;
        let mut rng = StdRng::seed_from_u64(3);
        let mut tree = PriorityTree::new(capacity).unwrap();
        for i in 0..capacity {
            tree.add(rng.gen::<f32>(), i);
        }

        for _ in 0..20_000 {
            for _ in 0..32 {
                let ix = tree.first_leaf() + rng.gen_range(0..capacity);
                let p = rng.gen::<f32>().powf(0.6);
                tree.update(ix, p).unwrap();
            }
        }
        assert_sums(&tree, 1e-9);

        let exact: f64 = tree.leaves().iter().map(|&p| p as f64).sum();
        let total = tree.total_priority() as f64;
        assert!(
            (total - exact).abs() <= 1e-6 * exact,
            "root {} against leaf sum {}",
            total,
            exact
        );
    }

    #[test]
    fn test_update_out_of_range() {
        let mut tree = PriorityTree::new(4).unwrap();
        tree.add(1., ());
        tree.add(1., ());

        // Internal node.
        assert_eq!(
            tree.update(0, 1.),
            Err(PerError::IndexOutOfRange {
                ix: 0,
                first_leaf: 3,
                n_leaves: 2
            })
        );
        // Leaf of a slot not written yet.
        assert!(tree.update(5, 1.).is_err());
        // Past the end of the array.
        assert!(tree.update(7, 1.).is_err());
        assert!(tree.update(4, 2.).is_ok());
        assert_eq!(tree.total_priority(), 3.);
    }

    #[test]
    fn test_circular_add() {
        let mut tree = PriorityTree::new(3).unwrap();
        for i in 0..7 {
            let ix = tree.add(i as f32 + 1., i);
            assert_eq!(tree.slot_of(ix), Some(i % 3));
            assert!(tree.len() <= 3);
        }
        assert!(tree.is_full());
        assert_eq!(tree.cursor(), 1);

        let mut payloads = (0..3).map(|s| *tree.get(s).unwrap()).collect::<Vec<_>>();
        payloads.sort();
        assert_eq!(payloads, vec![4, 5, 6]);
        assert!((tree.total_priority() - (5. + 6. + 7.)).abs() < TOL);
        assert_eq!(tree.max_priority(), 7.);
        assert_eq!(tree.min_priority(), 5.);
    }

    #[test]
    fn test_min_max_over_populated() {
        let mut tree = PriorityTree::new(4).unwrap();
        assert_eq!(tree.max_priority(), 0.);
        assert_eq!(tree.min_priority(), 0.);
        tree.add(0.5, ());
        tree.add(0.25, ());
        assert_eq!(tree.max_priority(), 0.5);
        assert_eq!(tree.min_priority(), 0.25);
        assert_eq!(tree.leaves(), vec![0.5f32, 0.25]);
    }

    #[test]
    fn test_min_max_follow_updates() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut tree = PriorityTree::new(37).unwrap();
        for step in 0..500 {
            if step % 3 == 0 || tree.is_empty() {
                tree.add(rng.gen_range(0.01..2.), ());
            } else {
                let ix = tree.first_leaf() + rng.gen_range(0..tree.len());
                tree.update(ix, rng.gen_range(0.01..2.)).unwrap();
            }

            let leaves = tree.leaves();
            let max = leaves.iter().copied().fold(f32::MIN, f32::max);
            let min = leaves.iter().copied().fold(f32::MAX, f32::min);
            assert_eq!(tree.max_priority(), max, "step {}", step);
            assert_eq!(tree.min_priority(), min, "step {}", step);
        }
    }
}
