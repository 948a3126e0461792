//! On-demand page loading for a [`PagedArray`](crate::PagedArray).
//!
//! A [`PagedArrayController`] owns a private paged array, asks a
//! [`DataSource`] for pages as they are read, keeps at most one request per
//! page in flight, and reports progress to a [`Delegate`]. Results may arrive
//! on any thread and in any order; they are applied on the controller's
//! [`Dispatcher`].

mod controller;
mod dispatch;
mod source;
mod token;


pub use controller::{ControllerBuilder, PagedArrayController};
pub use dispatch::{Dispatcher, InlineDispatcher, SerialQueue, Task};
pub use source::{Completion, DataSource, Delegate};
