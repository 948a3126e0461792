use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use super::dispatch::{Dispatcher, InlineDispatcher};
use super::source::{Completion, DataSource, Delegate};
use super::token::RequestToken;
use crate::array::PagedArray;
use crate::error::{LoadError, PagedArrayError, Result};
use crate::options::ControllerOptions;

pub(crate) struct Shared<T> {
    state: Mutex<State<T>>,
    dispatcher: Arc<dyn Dispatcher>,
    next_request: AtomicU64,
}

struct State<T> {
    array: PagedArray<T>,
    in_flight: HashMap<usize, Arc<RequestToken>>,
    data_source: Option<Weak<dyn DataSource<T>>>,
    request_handler: Option<Arc<dyn DataSource<T>>>,
    delegate: Option<Weak<dyn Delegate<T>>>,
    options: ControllerOptions,
}

impl<T> State<T> {
    /// The weak data source wins while it is alive; the owned request handler
    /// is the fallback.
    fn resolve_data_source(&self) -> Option<Arc<dyn DataSource<T>>> {
        self.data_source
            .as_ref()
            .and_then(Weak::upgrade)
            .or_else(|| self.request_handler.clone())
    }

    fn resolve_delegate(&self) -> Option<Arc<dyn Delegate<T>>> {
        self.delegate.as_ref().and_then(Weak::upgrade)
    }
}

/// Loads the pages of a private [`PagedArray`] on demand.
///
/// The controller is a cheap handle; clones share the same array, in-flight
/// bookkeeping, data source and delegate. Data sources and delegates are held
/// weakly, except for a request handler passed to
/// [`ControllerBuilder::request_handler`], which the controller owns.
///
/// Completed loads are applied, and the delegate is notified, on the
/// controller's [`Dispatcher`].
pub struct PagedArrayController<T> {
    shared: Arc<Shared<T>>,
}

/// Builder for [`PagedArrayController`].
pub struct ControllerBuilder<T> {
    array: PagedArray<T>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    request_handler: Option<Arc<dyn DataSource<T>>>,
    options: ControllerOptions,
}

impl<T: Clone + Send + 'static> ControllerBuilder<T> {
    /// Sets the notification context. Defaults to [`InlineDispatcher`].
    pub fn dispatcher<D: Dispatcher + 'static>(mut self, dispatcher: D) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Sets a shared notification context.
    pub fn shared_dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Installs an owned data source, typically a closure. A data source set
    /// later with [`PagedArrayController::set_data_source`] overrides it while
    /// that source is alive.
    pub fn request_handler<S: DataSource<T> + 'static>(mut self, handler: S) -> Self {
        self.request_handler = Some(Arc::new(handler));
        self
    }

    /// Sets the initial options.
    pub fn options(mut self, options: ControllerOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the controller.
    pub fn build(self) -> PagedArrayController<T> {
        let dispatcher = self
            .dispatcher
            .unwrap_or_else(|| Arc::new(InlineDispatcher::new()));
        PagedArrayController {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    array: self.array,
                    in_flight: HashMap::new(),
                    data_source: None,
                    request_handler: self.request_handler,
                    delegate: None,
                    options: self.options,
                }),
                dispatcher,
                next_request: AtomicU64::new(1),
            }),
        }
    }
}

impl<T: Clone + Send + 'static> PagedArrayController<T> {
    /// Creates a controller over `array` with default options and an inline
    /// notification context.
    pub fn new(array: PagedArray<T>) -> Self {
        Self::builder(array).build()
    }

    /// Starts building a controller over `array`.
    pub fn builder(array: PagedArray<T>) -> ControllerBuilder<T> {
        ControllerBuilder {
            array,
            dispatcher: None,
            request_handler: None,
            options: ControllerOptions::default(),
        }
    }

    /// Creates a controller that owns `handler` as its data source.
    pub fn with_request_handler<S: DataSource<T> + 'static>(
        array: PagedArray<T>,
        handler: S,
    ) -> Self {
        Self::builder(array).request_handler(handler).build()
    }

    /// Sets the data source. Only a weak reference is kept.
    pub fn set_data_source<S: DataSource<T> + 'static>(&self, source: &Arc<S>) {
        let weak = Arc::downgrade(source);
        let weak: Weak<dyn DataSource<T>> = weak;
        self.shared.state.lock().data_source = Some(weak);
    }

    /// Removes the data source set with [`set_data_source`](Self::set_data_source).
    pub fn clear_data_source(&self) {
        self.shared.state.lock().data_source = None;
    }

    /// Whether a live data source or request handler is available.
    pub fn has_data_source(&self) -> bool {
        self.shared.state.lock().resolve_data_source().is_some()
    }

    /// Sets the delegate. Only a weak reference is kept.
    pub fn set_delegate<D: Delegate<T> + 'static>(&self, delegate: &Arc<D>) {
        let weak = Arc::downgrade(delegate);
        let weak: Weak<dyn Delegate<T>> = weak;
        self.shared.state.lock().delegate = Some(weak);
    }

    /// Removes the delegate.
    pub fn clear_delegate(&self) {
        self.shared.state.lock().delegate = None;
    }

    /// Current options.
    pub fn options(&self) -> ControllerOptions {
        self.shared.state.lock().options
    }

    /// Replaces all options.
    pub fn set_options(&self, options: ControllerOptions) {
        self.shared.state.lock().options = options;
    }

    /// Whether reads of unset indexes trigger loads. Defaults to `true`.
    pub fn load_pages_automatically(&self) -> bool {
        self.options().load_pages_automatically
    }

    /// Enables or disables automatic loading on read.
    pub fn set_load_pages_automatically(&self, enabled: bool) {
        self.shared.state.lock().options.load_pages_automatically = enabled;
    }

    /// Forward offset used to preload during reads. Defaults to `0`.
    pub fn preload_margin(&self) -> usize {
        self.options().preload_margin
    }

    /// Sets the preload margin. Zero disables preloading. Reads from loaded
    /// pages also preload.
    pub fn set_preload_margin(&self, margin: usize) {
        self.shared.state.lock().options.preload_margin = margin;
    }

    /// Total number of objects.
    pub fn count(&self) -> usize {
        self.shared.state.lock().array.count()
    }

    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.shared.state.lock().array.page_count()
    }

    /// Page owning `index`, or `None` if out of range.
    pub fn page_for_index(&self, index: usize) -> Option<usize> {
        self.shared.state.lock().array.page_for(index)
    }

    /// Global indexes covered by `page`.
    pub fn indexes_for(&self, page: usize) -> Result<Range<usize>> {
        self.shared.state.lock().array.indexes_for(page)
    }

    /// Independent snapshot of the backing array.
    pub fn paged_array(&self) -> PagedArray<T> {
        self.shared.state.lock().array.clone()
    }

    /// Pages with a request in flight, in ascending order.
    pub fn loading_pages(&self) -> Vec<usize> {
        let mut pages: Vec<usize> = self.shared.state.lock().in_flight.keys().copied().collect();
        pages.sort_unstable();
        pages
    }

    /// Returns the object at `index`, or the placeholder if its page is not
    /// loaded.
    ///
    /// With automatic loading enabled, reading an index whose page is unset
    /// requests that page, and a non-zero preload margin also requests the
    /// unset page owning `index + margin`. The preload is considered even
    /// when the page owning `index` is already loaded. Load failures never
    /// surface here.
    pub fn object_at(&self, index: usize) -> Result<T> {
        let (load_current, preload) = {
            let state = self.shared.state.lock();
            let page = page_or_err(&state.array, index)?;
            let options = state.options;
            if !options.load_pages_automatically {
                (false, None)
            } else {
                let load_current = !state.array.is_content_set(page)?;
                let preload = index
                    .checked_add(options.preload_margin)
                    .filter(|_| options.preload_margin > 0)
                    .and_then(|ahead| Some((ahead, state.array.page_for(ahead)?)))
                    .filter(|&(_, ahead_page)| ahead_page != page)
                    .filter(|&(_, ahead_page)| {
                        !state.array.is_content_set(ahead_page).unwrap_or(true)
                    })
                    .map(|(ahead, _)| ahead);
                (load_current, preload)
            }
        };
        if load_current {
            self.load_object_at_index(index)?;
        }
        if let Some(ahead) = preload {
            self.load_object_at_index(ahead)?;
        }
        let state = self.shared.state.lock();
        state.array.object_at(index).cloned()
    }

    /// Whether a request for the page owning `index` is in flight.
    pub fn is_loading_object_at_index(&self, index: usize) -> bool {
        let state = self.shared.state.lock();
        state
            .array
            .page_for(index)
            .is_some_and(|page| state.in_flight.contains_key(&page))
    }

    /// Asks the data source for the page owning `index`.
    ///
    /// Returns `Ok(true)` if a request was dispatched. Returns `Ok(false)` if
    /// the page already has a request in flight, or if there is no data
    /// source; the latter is reported to the delegate as
    /// [`LoadError::MissingDataSource`]. Pages that already hold content are
    /// requested again, which is how a page is reloaded.
    pub fn load_object_at_index(&self, index: usize) -> Result<bool> {
        let (page, source, token) = {
            let mut state = self.shared.state.lock();
            let page = page_or_err(&state.array, index)?;
            if state.in_flight.contains_key(&page) {
                trace!(page, "controller.load.deduplicated");
                return Ok(false);
            }
            let Some(source) = state.resolve_data_source() else {
                drop(state);
                warn!(page, "controller.load.missing_data_source");
                self.notify_did_change(page, Some(LoadError::MissingDataSource));
                return Ok(false);
            };
            let id = self.shared.next_request.fetch_add(1, AtomicOrdering::Relaxed);
            let token = Arc::new(RequestToken::new(id, page));
            state.in_flight.insert(page, Arc::clone(&token));
            (page, source, token)
        };
        debug!(page, request = token.id(), "controller.load.dispatch");
        self.notify_will_request(page);
        let completion = Completion::new(Arc::downgrade(&self.shared), token);
        source.request_objects(page, completion);
        Ok(true)
    }

    /// Cancels the in-flight request for the page owning `index`.
    ///
    /// The data source is not told; its eventual completion is discarded.
    /// Returns `true` if a request was cancelled. The delegate is not
    /// notified.
    pub fn cancel_loading_object_at_index(&self, index: usize) -> bool {
        let mut state = self.shared.state.lock();
        let Some(page) = state.array.page_for(index) else {
            return false;
        };
        match state.in_flight.remove(&page) {
            Some(token) => {
                token.invalidate();
                debug!(page, request = token.id(), "controller.load.cancelled");
                true
            }
            None => false,
        }
    }

    fn delegate(&self) -> Option<Arc<dyn Delegate<T>>> {
        self.shared.state.lock().resolve_delegate()
    }

    fn notify_will_request(&self, page: usize) {
        let weak = Arc::downgrade(&self.shared);
        self.shared.dispatcher.dispatch(Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let controller = PagedArrayController { shared };
            if let Some(delegate) = controller.delegate() {
                delegate.will_request(&controller, page);
            }
        }));
    }

    fn notify_did_change(&self, page: usize, error: Option<LoadError>) {
        let weak = Arc::downgrade(&self.shared);
        self.shared.dispatcher.dispatch(Box::new(move || {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let controller = PagedArrayController { shared };
            if let Some(delegate) = controller.delegate() {
                delegate.did_change(&controller, page, error.as_ref());
            }
        }));
    }

    /// Applies a completion. Runs on the notification context.
    fn finish_request(
        &self,
        token: &Arc<RequestToken>,
        objects: Option<Vec<T>>,
        error: Option<LoadError>,
    ) {
        let page = token.page();
        let (failure, delegate) = {
            let mut state = self.shared.state.lock();
            let current = state
                .in_flight
                .get(&page)
                .is_some_and(|entry| Arc::ptr_eq(entry, token));
            if !current || !token.is_live() {
                trace!(page, request = token.id(), "controller.completion.stale");
                return;
            }
            let outcome = match (objects, error) {
                (_, Some(err)) => Err(err),
                (None, None) => Err(LoadError::NoResult),
                (Some(objects), None) => state
                    .array
                    .set_objects(objects, page)
                    .map_err(LoadError::from),
            };
            state.in_flight.remove(&page);
            token.invalidate();
            (outcome.err(), state.resolve_delegate())
        };
        match &failure {
            None => debug!(page, request = token.id(), "controller.load.applied"),
            Some(err) => debug!(
                page,
                request = token.id(),
                error = %err,
                "controller.load.failed"
            ),
        }
        if let Some(delegate) = delegate {
            delegate.did_change(self, page, failure.as_ref());
        }
    }
}

/// Entry point for [`Completion`]: drops cancelled completions, otherwise
/// marshals the result onto the notification context.
pub(crate) fn deliver_completion<T: Clone + Send + 'static>(
    shared: &Weak<Shared<T>>,
    token: Arc<RequestToken>,
    objects: Option<Vec<T>>,
    error: Option<LoadError>,
) {
    if !token.is_live() {
        trace!(
            page = token.page(),
            request = token.id(),
            "controller.completion.discarded"
        );
        return;
    }
    let Some(strong) = shared.upgrade() else {
        return;
    };
    let dispatcher = Arc::clone(&strong.dispatcher);
    drop(strong);
    let weak = shared.clone();
    dispatcher.dispatch(Box::new(move || {
        if let Some(shared) = weak.upgrade() {
            PagedArrayController { shared }.finish_request(&token, objects, error);
        }
    }));
}

fn page_or_err<T>(array: &PagedArray<T>, index: usize) -> Result<usize> {
    array
        .page_for(index)
        .ok_or(PagedArrayError::IndexOutOfRange {
            index,
            count: array.count(),
        })
}

impl<T> Clone for PagedArrayController<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T> fmt::Debug for PagedArrayController<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("PagedArrayController")
            .field("count", &state.array.count())
            .field("objects_per_page", &state.array.objects_per_page())
            .field("loaded_pages", &state.array.loaded_page_count())
            .field("in_flight", &state.in_flight.len())
            .field("options", &state.options)
            .finish()
    }
}

impl<T> fmt::Debug for ControllerBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBuilder")
            .field("count", &self.array.count())
            .field("has_dispatcher", &self.dispatcher.is_some())
            .field("has_request_handler", &self.request_handler.is_some())
            .field("options", &self.options)
            .finish()
    }
}
