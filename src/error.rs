//! Error types for paged arrays and their controllers.
//!
//! There are two error families:
//!
//! - [`PagedArrayError`] - contract violations (bad index, bad page, wrong
//!   page length). These are returned synchronously to whoever made the call.
//! - [`LoadError`] - failures while loading a page from a data source. These
//!   never come back through a read; they are delivered to the controller's
//!   delegate through `did_change`.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Result type for paged array operations.
pub type Result<T> = std::result::Result<T, PagedArrayError>;

/// Contract violations raised by [`PagedArray`](crate::PagedArray) and the
/// read path of [`PagedArrayController`](crate::PagedArrayController).
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum PagedArrayError {
    /// An object index at or past the total count was used.
    #[error("index {index} out of range for count {count}")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Total object count of the array.
        count: usize,
    },
    /// A page index at or past the page count was used.
    #[error("page {page} out of range for page count {page_count}")]
    InvalidPage {
        /// The offending page.
        page: usize,
        /// Number of pages in the array.
        page_count: usize,
    },
    /// Page content did not have the length the page requires.
    #[error("page {page} expects {expected} objects, got {actual}")]
    SizeMismatch {
        /// The page being set.
        page: usize,
        /// Required number of objects for the page.
        expected: usize,
        /// Number of objects supplied.
        actual: usize,
    },
    /// A paged array was constructed with zero objects per page.
    #[error("objects per page must be greater than zero")]
    ZeroPageSize,
}

/// Numeric code carried by [`LoadError::MissingDataSource`].
pub const MISSING_DATA_SOURCE_CODE: u32 = 1;

/// Failure to load a page, reported to the delegate.
#[derive(Debug, Clone, Error)]
pub enum LoadError {
    /// A load was attempted with no data source configured (or the weak
    /// handle to it no longer upgrades).
    #[error("no data source configured")]
    MissingDataSource,
    /// The data source completed without objects and without an error.
    #[error("data source returned no result")]
    NoResult,
    /// The data source delivered a page of the wrong length.
    #[error("page {page} expects {expected} objects, data source delivered {actual}")]
    SizeMismatch {
        /// The page that was loaded.
        page: usize,
        /// Required number of objects for the page.
        expected: usize,
        /// Number of objects delivered.
        actual: usize,
    },
    /// An error reported by the data source itself.
    #[error("data source error: {0}")]
    Source(SourceError),
}

impl LoadError {
    /// Wraps an arbitrary data source error.
    pub fn from_source<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        LoadError::Source(SourceError(Arc::new(err)))
    }

    /// Stable numeric code for this failure kind.
    pub fn code(&self) -> u32 {
        match self {
            LoadError::MissingDataSource => MISSING_DATA_SOURCE_CODE,
            LoadError::NoResult => 2,
            LoadError::SizeMismatch { .. } => 3,
            LoadError::Source(_) => 4,
        }
    }

    /// Returns `true` for [`LoadError::MissingDataSource`].
    pub fn is_missing_data_source(&self) -> bool {
        matches!(self, LoadError::MissingDataSource)
    }
}

impl From<PagedArrayError> for LoadError {
    fn from(err: PagedArrayError) -> Self {
        match err {
            PagedArrayError::SizeMismatch {
                page,
                expected,
                actual,
            } => LoadError::SizeMismatch {
                page,
                expected,
                actual,
            },
            other => LoadError::from_source(other),
        }
    }
}

/// Shared, cloneable wrapper around a data source error.
#[derive(Clone)]
pub struct SourceError(Arc<dyn StdError + Send + Sync>);

impl SourceError {
    /// Borrows the wrapped error.
    pub fn inner(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self.0.as_ref()
    }
}

impl fmt::Debug for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}
