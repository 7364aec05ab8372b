//! Error types for the index.

use thiserror::Error;

use super::NodeId;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors raised by the page store and the tree engine.
///
/// A key that is absent is never an error: lookups report it through
/// `Option` and removals through `bool`.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk operations.
    ///
    /// This wraps `std::io::Error` from file open/read/write operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// On-disk bytes (or the resident node graph) are not a valid tree.
    ///
    /// The engine never attempts repair.
    #[error("corruption detected: {0}")]
    Corruption(String),

    /// The order parameter cannot be used with the fixed page size.
    #[error("invalid order {order}: must be between {min} and {max}")]
    InvalidOrder { order: usize, min: usize, max: usize },

    /// Attempted to write a node whose page was never allocated.
    #[error("{0} has no allocated page")]
    PageNotFound(NodeId),

    /// A node holds more keys than fit in one page.
    #[error("{node} holds {keys} keys but a page fits at most {capacity}")]
    NodeOverflow {
        node: NodeId,
        keys: usize,
        capacity: usize,
    },
}

impl Error {
    /// Shorthand for building a [`Error::Corruption`].
    pub(crate) fn corruption(reason: impl Into<String>) -> Self {
        Error::Corruption(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(NodeId::new(42));
        assert_eq!(format!("{}", err), "Node(42) has no allocated page");

        let err = Error::InvalidOrder {
            order: 1,
            min: 2,
            max: 340,
        };
        assert_eq!(
            format!("{}", err),
            "invalid order 1: must be between 2 and 340"
        );

        let err = Error::corruption("short read");
        assert_eq!(format!("{}", err), "corruption detected: short read");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_io_error_has_source() {
        use std::error::Error as _;

        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let err = Error::from(io_err);
        assert!(err.source().is_some());
        assert!(Error::corruption("x").source().is_none());
    }
}
