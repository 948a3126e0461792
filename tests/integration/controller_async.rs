#![allow(missing_docs)]

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use paged_array::{
    Completion, DataSource, Delegate, InlineDispatcher, LoadError, PagedArray,
    PagedArrayController, SerialQueue,
};
use parking_lot::Mutex;

const COUNT: usize = 100;
const PER_PAGE: usize = 10;

/// Completes each request on its own thread after a delay that shrinks with
/// the page number, so later pages finish first.
struct ReverseLatency {
    base: Duration,
    page_count: usize,
}

impl DataSource<u64> for ReverseLatency {
    fn request_objects(&self, page: usize, completion: Completion<u64>) {
        let delay = self.base * self.page_count.saturating_sub(page) as u32;
        thread::spawn(move || {
            thread::sleep(delay);
            let start = (page * PER_PAGE) as u64;
            completion.succeed((start..start + PER_PAGE as u64).collect());
        });
    }
}

#[derive(Default)]
struct Arrivals {
    order: Mutex<Vec<usize>>,
    failures: Mutex<Vec<(usize, String)>>,
    context: Mutex<Option<thread::ThreadId>>,
    off_context: Mutex<u32>,
}

impl Arrivals {
    fn note_thread(&self) {
        let current = thread::current().id();
        let context = self.context.lock();
        if let Some(expected) = *context {
            if expected != current {
                *self.off_context.lock() += 1;
            }
        }
    }
}

impl Delegate<u64> for Arrivals {
    fn will_request(&self, _controller: &PagedArrayController<u64>, _page: usize) {
        self.note_thread();
    }

    fn did_change(
        &self,
        controller: &PagedArrayController<u64>,
        page: usize,
        error: Option<&LoadError>,
    ) {
        self.note_thread();
        match error {
            None => {
                let first = controller.indexes_for(page).unwrap().start;
                assert_eq!(controller.object_at(first).unwrap(), first as u64);
                self.order.lock().push(page);
            }
            Some(err) => self.failures.lock().push((page, err.to_string())),
        }
    }
}

fn drive_until<F>(queue: &SerialQueue, mut done: F)
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(10);
    while !done() {
        assert!(Instant::now() < deadline, "loads did not finish in time");
        queue.wait_and_run(Duration::from_millis(20));
    }
}

#[test]
fn out_of_order_completions_apply_on_the_queue_thread() {
    let queue = SerialQueue::new();
    let array = PagedArray::with_placeholder(COUNT, PER_PAGE, u64::MAX).unwrap();
    let controller = PagedArrayController::builder(array)
        .dispatcher(queue.clone())
        .build();
    let source = Arc::new(ReverseLatency {
        base: Duration::from_millis(5),
        page_count: COUNT / PER_PAGE,
    });
    let arrivals = Arc::new(Arrivals::default());
    *arrivals.context.lock() = Some(thread::current().id());
    controller.set_data_source(&source);
    controller.set_delegate(&arrivals);

    for index in (0..COUNT).step_by(PER_PAGE) {
        assert_eq!(controller.object_at(index).unwrap(), u64::MAX);
    }
    assert_eq!(controller.loading_pages(), (0..10).collect::<Vec<_>>());

    drive_until(&queue, || arrivals.order.lock().len() == 10);

    let order = arrivals.order.lock().clone();
    let mut sorted = order.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, (0..10).collect::<Vec<_>>());
    assert_ne!(order, sorted, "later pages should have arrived first");
    assert_eq!(*arrivals.off_context.lock(), 0);
    assert!(arrivals.failures.lock().is_empty());
    assert!(controller.loading_pages().is_empty());

    let snapshot = controller.paged_array();
    let values: Vec<u64> = snapshot.iter().copied().collect();
    assert_eq!(values, (0..COUNT as u64).collect::<Vec<_>>());
}

#[test]
fn cancellation_races_with_background_completion() {
    let queue = SerialQueue::new();
    let array = PagedArray::with_placeholder(COUNT, PER_PAGE, u64::MAX).unwrap();
    let controller = PagedArrayController::builder(array)
        .dispatcher(queue.clone())
        .build();
    let (tx, rx) = mpsc::channel::<Completion<u64>>();
    let tx = Mutex::new(tx);
    let source = Arc::new(move |_page: usize, completion: Completion<u64>| {
        tx.lock().send(completion).unwrap();
    });
    let arrivals = Arc::new(Arrivals::default());
    controller.set_data_source(&source);
    controller.set_delegate(&arrivals);
    controller.set_load_pages_automatically(false);

    assert!(controller.load_object_at_index(55).unwrap());
    let first = rx.recv().unwrap();
    assert!(controller.cancel_loading_object_at_index(55));
    assert!(controller.load_object_at_index(55).unwrap());
    let second = rx.recv().unwrap();

    let late = thread::spawn(move || first.succeed(vec![7; PER_PAGE]));
    late.join().unwrap();
    queue.run_until_idle();
    assert!(controller.is_loading_object_at_index(55));
    assert!(arrivals.order.lock().is_empty());

    let fresh = thread::spawn(move || {
        let start = 50u64;
        second.succeed((start..start + PER_PAGE as u64).collect());
    });
    fresh.join().unwrap();
    queue.run_until_idle();
    assert_eq!(*arrivals.order.lock(), vec![5]);
    assert_eq!(controller.object_at(55).unwrap(), 55);
}

#[test]
fn inline_dispatcher_serializes_concurrent_completions() {
    let array = PagedArray::with_placeholder(COUNT, PER_PAGE, u64::MAX).unwrap();
    let controller = PagedArrayController::builder(array)
        .dispatcher(InlineDispatcher::new())
        .build();
    let in_hook = Arc::new(Mutex::new(0u32));
    let overlaps = Arc::new(Mutex::new(0u32));

    struct Exclusive {
        in_hook: Arc<Mutex<u32>>,
        overlaps: Arc<Mutex<u32>>,
        changed: Mutex<u32>,
    }

    impl Delegate<u64> for Exclusive {
        fn did_change(
            &self,
            _controller: &PagedArrayController<u64>,
            _page: usize,
            error: Option<&LoadError>,
        ) {
            assert!(error.is_none());
            {
                let mut active = self.in_hook.lock();
                *active += 1;
                if *active > 1 {
                    *self.overlaps.lock() += 1;
                }
            }
            thread::sleep(Duration::from_millis(2));
            *self.in_hook.lock() -= 1;
            *self.changed.lock() += 1;
        }
    }

    let delegate = Arc::new(Exclusive {
        in_hook: Arc::clone(&in_hook),
        overlaps: Arc::clone(&overlaps),
        changed: Mutex::new(0),
    });
    let source = Arc::new(ReverseLatency {
        base: Duration::from_millis(1),
        page_count: 1,
    });
    controller.set_data_source(&source);
    controller.set_delegate(&delegate);

    for index in (0..COUNT).step_by(PER_PAGE) {
        controller.load_object_at_index(index).unwrap();
    }
    let deadline = Instant::now() + Duration::from_secs(10);
    while *delegate.changed.lock() < 10 {
        assert!(Instant::now() < deadline, "loads did not finish in time");
        thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(*overlaps.lock(), 0);
    assert_eq!(controller.paged_array().loaded_page_count(), 10);
}
