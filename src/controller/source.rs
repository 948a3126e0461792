use std::error::Error as StdError;
use std::fmt;
use std::sync::{Arc, Weak};

use tracing::warn;

use super::controller::{deliver_completion, PagedArrayController, Shared};
use super::token::RequestToken;
use crate::error::LoadError;

/// Supplies page contents to a [`PagedArrayController`].
///
/// `request_objects` may finish synchronously, before returning, or hand the
/// [`Completion`] to another thread and finish later. The completion must be
/// invoked eventually; until then the page stays in flight and further loads
/// for it are refused.
///
/// Any `Fn(usize, Completion<T>)` closure is a data source.
pub trait DataSource<T>: Send + Sync {
    /// Starts loading `page` and reports through `completion`.
    fn request_objects(&self, page: usize, completion: Completion<T>);
}

impl<T, F> DataSource<T> for F
where
    F: Fn(usize, Completion<T>) + Send + Sync,
{
    fn request_objects(&self, page: usize, completion: Completion<T>) {
        self(page, completion)
    }
}

/// Observer of a controller's load lifecycle.
///
/// Both hooks run on the controller's notification context. The controller
/// lock is not held, so hooks may call back into the controller.
pub trait Delegate<T>: Send + Sync {
    /// Called before the data source is asked for `page`.
    fn will_request(&self, controller: &PagedArrayController<T>, page: usize) {
        let _ = (controller, page);
    }

    /// Called after a load for `page` finished, successfully (`error` is
    /// `None`) or not. Never called for cancelled or de-duplicated requests.
    fn did_change(
        &self,
        controller: &PagedArrayController<T>,
        page: usize,
        error: Option<&LoadError>,
    ) {
        let _ = (controller, page, error);
    }
}

/// One-shot completion handle for a page request.
///
/// Consuming methods make a second invocation impossible. The handle keeps
/// only a weak reference to the controller, so holding it does not keep the
/// controller alive.
pub struct Completion<T> {
    shared: Weak<Shared<T>>,
    token: Option<Arc<RequestToken>>,
}

impl<T: Clone + Send + 'static> Completion<T> {
    pub(crate) fn new(shared: Weak<Shared<T>>, token: Arc<RequestToken>) -> Self {
        Self {
            shared,
            token: Some(token),
        }
    }

    /// Reports the outcome of the request.
    ///
    /// An error wins over objects. No error and no objects is a
    /// [`LoadError::NoResult`] failure.
    pub fn complete(mut self, objects: Option<Vec<T>>, error: Option<LoadError>) {
        if let Some(token) = self.token.take() {
            deliver_completion(&self.shared, token, objects, error);
        }
    }

    /// Reports success with the page's objects.
    pub fn succeed(self, objects: Vec<T>) {
        self.complete(Some(objects), None);
    }

    /// Reports failure with a data source error.
    pub fn fail<E>(self, err: E)
    where
        E: StdError + Send + Sync + 'static,
    {
        self.complete(None, Some(LoadError::from_source(err)));
    }
}

impl<T> Completion<T> {
    /// Page this completion belongs to.
    pub fn page(&self) -> usize {
        self.token.as_ref().map_or(0, |token| token.page())
    }

    /// Identifier of the request, unique per controller.
    pub fn request_id(&self) -> u64 {
        self.token.as_ref().map_or(0, |token| token.id())
    }

    /// Whether the request was cancelled. Data sources may use this to skip
    /// work whose result would be discarded anyway.
    pub fn is_cancelled(&self) -> bool {
        self.token.as_ref().map_or(true, |token| !token.is_live())
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if token.is_live() && self.shared.strong_count() > 0 {
                warn!(
                    page = token.page(),
                    request = token.id(),
                    "controller.completion.dropped_uninvoked"
                );
            }
        }
    }
}

impl<T> fmt::Debug for Completion<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("page", &self.page())
            .field("request_id", &self.request_id())
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}
