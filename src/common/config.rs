//! Configuration for the index.

use crate::common::{Error, Result};
use crate::storage::page::{INTERNAL_CAPACITY, LEAF_CAPACITY};

/// Size of a page in bytes (4KB).
///
/// Every page, metadata and node alike, occupies exactly this many bytes
/// regardless of how much of it the payload uses.
pub const PAGE_SIZE: usize = 4096;

/// Page index of the metadata page holding the root pointer.
pub const META_PAGE_INDEX: u64 = 0;

/// Smallest usable order.
///
/// Below this an internal split would leave an empty half.
pub const MIN_ORDER: usize = 2;

/// Largest order whose leaf and internal nodes both fit in one page.
pub const MAX_ORDER: usize = if LEAF_CAPACITY < INTERNAL_CAPACITY {
    LEAF_CAPACITY
} else {
    INTERNAL_CAPACITY
};

/// Tree configuration.
///
/// The order is the maximum number of keys a node may hold before it must
/// split. It is fixed for the lifetime of an index file.
///
/// # Example
/// ```
/// use rowindex::IndexConfig;
///
/// let config = IndexConfig::new(3).unwrap();
/// assert_eq!(config.min_keys(), 1);
/// assert!(IndexConfig::new(100_000).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexConfig {
    order: usize,
}

impl IndexConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    /// Returns `Error::InvalidOrder` if `order` is outside
    /// `MIN_ORDER..=MAX_ORDER`.
    pub fn new(order: usize) -> Result<Self> {
        let config = Self { order };
        config.validate()?;
        Ok(config)
    }

    /// Check that the order fits the page layout.
    pub fn validate(&self) -> Result<()> {
        if (MIN_ORDER..=MAX_ORDER).contains(&self.order) {
            Ok(())
        } else {
            Err(Error::InvalidOrder {
                order: self.order,
                min: MIN_ORDER,
                max: MAX_ORDER,
            })
        }
    }

    /// Maximum keys per node.
    #[inline]
    pub fn order(&self) -> usize {
        self.order
    }

    /// Minimum keys for a non-root node: `ceil((order + 1) / 2) - 1`.
    #[inline]
    pub fn min_keys(&self) -> usize {
        (self.order + 1).div_ceil(2) - 1
    }

    /// Index at which an overflowing leaf is partitioned: `ceil((order + 1) / 2)`.
    ///
    /// The key at this index moves to the new right leaf.
    #[inline]
    pub fn leaf_split_index(&self) -> usize {
        (self.order + 1).div_ceil(2)
    }

    /// Index of the key an overflowing internal node promotes: `order / 2`.
    #[inline]
    pub fn internal_split_index(&self) -> usize {
        self.order / 2
    }
}
