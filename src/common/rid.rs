//! Row identifier type.

use std::fmt;

/// Locates a row in the external row store: a (page, slot) pair.
///
/// The index stores and returns RIDs verbatim and never dereferences them.
///
/// # Example
/// ```
/// use rowindex::Rid;
///
/// let rid = Rid::new(3, 17);
/// assert_eq!(rid.page_id, 3);
/// assert_eq!(rid.slot_id, 17);
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rid {
    /// Row-store page holding the row.
    pub page_id: u32,
    /// Slot within that page.
    pub slot_id: u16,
}

impl Rid {
    /// Create a new Rid.
    #[inline]
    pub fn new(page_id: u32, slot_id: u16) -> Self {
        Rid { page_id, slot_id }
    }
}

impl fmt::Display for Rid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}:{})", self.page_id, self.slot_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rid_equality() {
        assert_eq!(Rid::new(0, 3), Rid::new(0, 3));
        assert_ne!(Rid::new(0, 3), Rid::new(1, 3));
    }

    #[test]
    fn test_rid_display() {
        assert_eq!(format!("{}", Rid::new(12, 5)), "Rid(12:5)");
    }
}
