//! Simulated scrolling over a lazily loaded paged array.
#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, ValueEnum};
use paged_array::{
    logging::init_logging, Completion, ControllerOptions, DataSource, Delegate, LoadError,
    PagedArray, PagedArrayController, SerialQueue,
};
use parking_lot::Mutex;
use rand::Rng;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "paged-demo",
    version,
    about = "Scrolls through a paged array backed by a slow, simulated data source"
)]
struct Cli {
    #[arg(long, default_value_t = 200, help = "Total number of rows")]
    count: usize,

    #[arg(long, default_value_t = 20, help = "Rows per page")]
    per_page: usize,

    #[arg(long, default_value_t = 10, help = "Rows visible at once")]
    rows: usize,

    #[arg(long, default_value_t = 150, help = "Base load latency (ms)")]
    delay_ms: u64,

    #[arg(long, default_value_t = 100, help = "Extra random latency (ms)")]
    jitter_ms: u64,

    #[arg(long, value_enum, default_value_t = Mode::Fluent, help = "Paging style")]
    mode: Mode,

    #[arg(long, help = "Preload margin for fluent mode (defaults to --per-page)")]
    preload_margin: Option<usize>,

    #[arg(
        long,
        value_name = "FILE",
        help = "TOML controller options; overrides --mode and --preload-margin"
    )]
    config: Option<PathBuf>,

    #[arg(long, default_value_t = 30, help = "Give up after this many seconds")]
    timeout_secs: u64,

    #[arg(long, env = "PAGED_DEMO_LOG", default_value = "info", help = "Log filter")]
    log_level: String,

    #[arg(long, help = "Print the final array as JSON")]
    json: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Rows are loaded only when a placeholder row is "tapped".
    Manual,
    /// Reading a placeholder row loads its page.
    Automatic,
    /// Like automatic, and the page ahead is preloaded.
    Fluent,
}

type Row = Option<String>;

/// Answers every request from a background thread after a randomized delay.
struct SlowSource {
    count: usize,
    per_page: usize,
    delay: Duration,
    jitter_ms: u64,
    loaded: Arc<Mutex<BTreeSet<usize>>>,
}

impl DataSource<Row> for SlowSource {
    fn request_objects(&self, page: usize, completion: Completion<Row>) {
        let start = page * self.per_page;
        let end = (start + self.per_page).min(self.count);
        let jitter = if self.jitter_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=self.jitter_ms)
        };
        let delay = self.delay + Duration::from_millis(jitter);
        let loaded = Arc::clone(&self.loaded);
        debug!(page, delay_ms = delay.as_millis() as u64, "demo.source.request");
        thread::spawn(move || {
            thread::sleep(delay);
            if completion.is_cancelled() {
                return;
            }
            loaded.lock().extend(start..end);
            completion.succeed((start..end).map(|i| Some(format!("row {i}"))).collect());
        });
    }
}

struct Printer {
    started: Instant,
}

impl Delegate<Row> for Printer {
    fn will_request(&self, _controller: &PagedArrayController<Row>, page: usize) {
        println!("{:>6}ms  request page {page}", self.started.elapsed().as_millis());
    }

    fn did_change(
        &self,
        controller: &PagedArrayController<Row>,
        page: usize,
        error: Option<&LoadError>,
    ) {
        let elapsed = self.started.elapsed().as_millis();
        match error {
            None => {
                let range = controller.indexes_for(page).unwrap_or(0..0);
                println!(
                    "{elapsed:>6}ms  loaded page {page} (rows {}..{})",
                    range.start, range.end
                );
            }
            Some(err) => println!("{elapsed:>6}ms  page {page} failed: {err}"),
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    let options = match &cli.config {
        Some(path) => ControllerOptions::from_toml_str(&fs::read_to_string(path)?)?,
        None => options_for_mode(cli.mode, cli.preload_margin.unwrap_or(cli.per_page)),
    };
    info!(
        count = cli.count,
        per_page = cli.per_page,
        auto = options.load_pages_automatically,
        preload_margin = options.preload_margin,
        "demo.start"
    );

    let queue = SerialQueue::new();
    let array: PagedArray<Row> = PagedArray::new(cli.count, cli.per_page)?;
    let controller = PagedArrayController::builder(array)
        .dispatcher(queue.clone())
        .options(options)
        .build();
    let loaded = Arc::new(Mutex::new(BTreeSet::new()));
    let source = Arc::new(SlowSource {
        count: cli.count,
        per_page: cli.per_page,
        delay: Duration::from_millis(cli.delay_ms),
        jitter_ms: cli.jitter_ms,
        loaded: Arc::clone(&loaded),
    });
    let printer = Arc::new(Printer {
        started: Instant::now(),
    });
    controller.set_data_source(&source);
    controller.set_delegate(&printer);

    let rows = cli.rows.max(1);
    let deadline = Instant::now() + Duration::from_secs(cli.timeout_secs);
    let mut top = 0;
    while top < cli.count {
        if Instant::now() > deadline {
            return Err(format!("timed out with viewport at row {top}").into());
        }
        let bottom = (top + rows).min(cli.count);
        let mut visible_loaded = true;
        for index in top..bottom {
            if controller.object_at(index)?.is_none() {
                visible_loaded = false;
                if !options.load_pages_automatically
                    && !controller.is_loading_object_at_index(index)
                {
                    controller.load_object_at_index(index)?;
                }
            }
        }
        if visible_loaded {
            top += (rows / 2).max(1);
        } else {
            queue.wait_and_run(Duration::from_millis(25));
        }
    }

    while !controller.loading_pages().is_empty() && Instant::now() < deadline {
        queue.wait_and_run(Duration::from_millis(25));
    }

    let loaded = loaded.lock();
    println!(
        "done in {}ms: {} of {} rows loaded",
        printer.started.elapsed().as_millis(),
        loaded.len(),
        cli.count
    );
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&controller.paged_array())?);
    }
    Ok(())
}

fn options_for_mode(mode: Mode, margin: usize) -> ControllerOptions {
    match mode {
        Mode::Manual => ControllerOptions::default().load_pages_automatically(false),
        Mode::Automatic => ControllerOptions::default(),
        Mode::Fluent => ControllerOptions::default().preload_margin(margin),
    }
}
