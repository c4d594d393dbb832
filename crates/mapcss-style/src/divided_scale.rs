//! Scale partition cache
//!
//! Splits the range of possible scale values (0 < scale < +inf) into
//! subranges and keeps one optional data object per subrange. Used for
//! caching computed styles per zoom range.
//!
//! The structure is persistent: `put` returns a new instance and never
//! touches the original, so readers holding a reference are undisturbed
//! while a writer publishes an updated copy.

use crate::error::RangeViolation;
use crate::range::Range;

/// Partition of `(0, +inf)` into subranges, each holding an optional `T`.
///
/// Invariant: `posts` is strictly ascending and
/// `data.len() == posts.len() + 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct DividedScale<T> {
    /// Subrange boundaries.
    posts: Vec<f64>,
    /// One slot per subrange; `data[i]` covers `(posts[i-1], posts[i]]`.
    data: Vec<Option<T>>,
}

impl<T> Default for DividedScale<T> {
    fn default() -> Self {
        DividedScale { posts: Vec::new(), data: vec![None] }
    }
}

impl<T: Clone> DividedScale<T> {
    /// Creates an empty partition covering the whole range with no data.
    pub fn new() -> Self {
        DividedScale::default()
    }

    /// Index of the subrange containing `scale`. A scale equal to a post
    /// belongs to the subrange below it.
    fn index_of(&self, scale: f64) -> usize {
        match self.posts.binary_search_by(|p| p.partial_cmp(&scale).expect("posts are ordered")) {
            Ok(i) => i,
            Err(i) => i,
        }
    }

    /// Data object at the given scale, if any has been stored.
    pub fn get(&self, scale: f64) -> Option<&T> {
        if scale <= 0.0 {
            return None;
        }
        self.data[self.index_of(scale)].as_ref()
    }

    /// Data object at the given scale together with the subrange it covers.
    pub fn get_with_range(&self, scale: f64) -> (Option<&T>, Range) {
        if scale <= 0.0 {
            return (None, Range::ZERO_TO_INFINITY);
        }
        let index = self.index_of(scale);
        let lower = if index == 0 { 0.0 } else { self.posts[index - 1] };
        let upper = self.posts.get(index).copied().unwrap_or(f64::INFINITY);
        (self.data[index].as_ref(), Range { lower, upper })
    }

    /// Returns a new partition with `value` stored for `range`.
    ///
    /// Only allowed if the whole target range is currently uncovered.
    /// Splitting an empty subrange inserts posts and empty slots; it never
    /// duplicates an existing value into a new slot. A `put` that overlaps
    /// stored data fails with [`RangeViolation`] and leaves `self` intact.
    pub fn put(&self, value: T, range: Range) -> Result<DividedScale<T>, RangeViolation> {
        let mut s = self.clone();
        s.put_impl(value, range.lower, range.upper)?;
        Ok(s)
    }

    fn put_impl(&mut self, value: T, lower: f64, upper: f64) -> Result<(), RangeViolation> {
        if lower >= upper {
            return Err(RangeViolation(format!("invalid range {lower}..{upper}")));
        }
        if upper > 0.0 && self.data[self.index_of(upper)].is_some() {
            return Err(RangeViolation(
                "the new range must be within a subrange that has no data".to_string(),
            ));
        }
        let lower_index = self.search_or_insert(lower);
        let upper_index = self.search_or_insert(upper);
        if lower_index + 1 != upper_index {
            return Err(RangeViolation(
                "the new range must be within a single subrange".to_string(),
            ));
        }
        self.data[lower_index + 1] = Some(value);
        Ok(())
    }

    /// Index of `key` in `posts`, inserting it (with a fresh empty data
    /// slot) if absent.
    fn search_or_insert(&mut self, key: f64) -> usize {
        match self.posts.binary_search_by(|p| p.partial_cmp(&key).expect("posts are ordered")) {
            Ok(i) => i,
            Err(i) => {
                self.posts.insert(i, key);
                self.data.insert(i + 1, None);
                i
            }
        }
    }

    #[cfg(test)]
    fn check_invariant(&self) {
        assert_eq!(self.data.len(), self.posts.len() + 1);
        assert!(self.posts.windows(2).all(|w| w[0] < w[1]));
    }
}
