//! Lazily populated, fixed-size paged arrays.
//!
//! [`PagedArray`] is the data model: a fixed count of objects split into
//! equal pages whose content is set, replaced and removed one page at a time,
//! reading as a placeholder where nothing is loaded.
//! [`PagedArrayController`] fills one on demand from a [`DataSource`],
//! de-duplicating and cancelling requests and notifying a [`Delegate`].
//!
//! ```
//! use paged_array::{Completion, PagedArray, PagedArrayController};
//!
//! let array: PagedArray<Option<u32>> = PagedArray::new(10, 3)?;
//! let controller = PagedArrayController::with_request_handler(
//!     array,
//!     |page: usize, completion: Completion<Option<u32>>| {
//!         let len = if page == 3 { 1 } else { 3 };
//!         completion.succeed((0..len).map(|i| Some((page * 3 + i) as u32)).collect());
//!     },
//! );
//! assert_eq!(controller.object_at(4)?, Some(4));
//! # Ok::<(), paged_array::PagedArrayError>(())
//! ```

#![warn(missing_docs)]

pub mod array;
pub mod controller;
pub mod error;
pub mod logging;
pub mod options;

pub use array::PagedArray;
pub use controller::{
    Completion, ControllerBuilder, DataSource, Delegate, Dispatcher, InlineDispatcher,
    PagedArrayController, SerialQueue,
};
pub use error::{LoadError, PagedArrayError, Result};
pub use options::ControllerOptions;
