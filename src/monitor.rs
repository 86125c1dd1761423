//! The poll loop: a background worker that re-runs the pipeline on a fixed interval.
//!
//! The worker moves `Validating -> Active <-> Sleeping` and ends in `Stopped`
//! or `Failed`. While sleeping it counts ticks up to a threshold, reporting the
//! counter on every tick, and goes back to `Active` when the threshold is hit.
//! A stop request is only looked at on tick boundaries.
//!
//! The worker owns the report file and both table snapshots for its run. The
//! controller only starts and stops it and reads the live counter; everything
//! else arrives as [`PollEvent`]s on a channel.

use crate::error::{Error, Result};
use crate::layout::ResultLayout;
use crate::pipeline::{persist_paths, validate, Cycle, CycleReport};
use crate::settings::WatchPaths;
use futures::channel::mpsc::UnboundedSender;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// Default number of ticks between cycles.
pub const DEFAULT_THRESHOLD: u32 = 5;
/// Default length of one tick.
pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

/// Where the worker is in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Validating,
    Active,
    Sleeping,
    Stopped,
    Failed,
}

impl PollState {
    /// Whether the worker is between a successful start and a stop or failure.
    pub fn is_running(self) -> bool {
        matches!(self, PollState::Active | PollState::Sleeping)
    }
}

/// Notifications from the worker.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// Counter after a tick, in `[0, threshold)`
    Tick(u32),
    /// A cycle recomputed the table
    OutputReady(CycleReport),
    /// A cycle found the result export unchanged and did nothing
    Unchanged,
    /// The run stopped on a fatal error
    Failed(String),
    /// The run stopped on request or because validation failed
    Stopped,
}

/// Everything a run needs.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub paths: WatchPaths,
    pub layout: ResultLayout,
    pub tick: Duration,
    /// Ticks between cycles
    pub threshold: u32,
    /// Where to keep the path record; `None` keeps nothing
    pub settings_file: Option<PathBuf>,
}

impl MonitorConfig {
    pub fn new(paths: WatchPaths) -> Self {
        Self {
            paths,
            layout: ResultLayout::default(),
            tick: DEFAULT_TICK,
            threshold: DEFAULT_THRESHOLD,
            settings_file: None,
        }
    }
}

#[derive(Debug)]
struct Shared {
    stop: AtomicBool,
    counter: AtomicU32,
    state: Mutex<PollState>,
}

impl Shared {
    fn state(&self) -> PollState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: PollState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }
}

/// Handle to a running poll loop.
///
/// Dropping the handle stops the worker and waits for it.
#[derive(Debug)]
pub struct Monitor {
    shared: Arc<Shared>,
    handle: Option<JoinHandle<()>>,
}

impl Monitor {
    /// Start a run, blocking until the worker is `Active`.
    ///
    /// Fails without starting when a path is empty, and with the validation
    /// error when the worker stops in `Validating`.
    pub fn start(config: MonitorConfig, events: UnboundedSender<PollEvent>) -> Result<Self> {
        config.paths.check_non_empty()?;

        let shared = Arc::new(Shared {
            stop: AtomicBool::new(false),
            counter: AtomicU32::new(0),
            state: Mutex::new(PollState::Idle),
        });
        let (started_tx, started_rx) = mpsc::channel();

        let worker_shared = shared.clone();
        let handle = std::thread::Builder::new()
            .name("cs-adjust-monitor".to_string())
            .spawn(move || run_worker(config, &worker_shared, &events, started_tx))?;

        match started_rx.recv() {
            Ok(Ok(())) => Ok(Monitor {
                shared,
                handle: Some(handle),
            }),
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(Error::Io(std::io::Error::other(
                    "monitor thread exited before starting",
                )))
            }
        }
    }

    /// Live tick counter.
    pub fn counter(&self) -> u32 {
        self.shared.counter.load(Ordering::Relaxed)
    }

    pub fn state(&self) -> PollState {
        self.shared.state()
    }

    /// Request a stop and wait for the worker, at most about one tick.
    ///
    /// Returns the final state: `Stopped`, or `Failed` if the run had already
    /// failed.
    pub fn stop(mut self) -> PollState {
        self.halt();
        self.state()
    }

    fn halt(&mut self) {
        self.shared.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Monitor thread panicked");
                self.shared.set_state(PollState::Failed);
            }
        }
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        self.halt();
    }
}

fn run_worker(
    config: MonitorConfig,
    shared: &Shared,
    events: &UnboundedSender<PollEvent>,
    started: mpsc::Sender<Result<()>>,
) {
    let send = |event: PollEvent| {
        let _ = events.unbounded_send(event);
    };

    shared.set_state(PollState::Validating);
    persist_paths(config.settings_file.as_deref(), &config.paths);
    if let Err(e) = validate(&config.paths) {
        log::warn!("Not starting: {}", e);
        shared.set_state(PollState::Stopped);
        let _ = started.send(Err(e));
        send(PollEvent::Stopped);
        return;
    }

    shared.set_state(PollState::Active);
    let _ = started.send(Ok(()));
    log::info!(
        "Watching {} every {} x {:?}",
        config.paths.results.display(),
        config.threshold,
        config.tick
    );

    let threshold = config.threshold.max(1);
    let mut cycle = Cycle::new(config.paths, config.layout, config.settings_file);
    loop {
        match cycle.run() {
            Ok(Some(report)) => send(PollEvent::OutputReady(report)),
            Ok(None) => send(PollEvent::Unchanged),
            Err(e) => {
                log::error!("Cycle {} failed, stopping: {}", cycle.count(), e);
                shared.set_state(PollState::Failed);
                send(PollEvent::Failed(e.to_string()));
                return;
            }
        }

        shared.set_state(PollState::Sleeping);
        let mut counter = 0u32;
        loop {
            if shared.stop.load(Ordering::Relaxed) {
                break;
            }
            std::thread::sleep(config.tick);
            // A stop raised during the sleep wins over the tick, including the
            // one that would start the next cycle
            if shared.stop.load(Ordering::Relaxed) {
                break;
            }

            counter += 1;
            if counter >= threshold {
                counter = 0;
            }
            shared.counter.store(counter, Ordering::Relaxed);
            send(PollEvent::Tick(counter));
            if counter == 0 {
                break;
            }
        }
        if shared.stop.load(Ordering::Relaxed) {
            log::info!("Monitor stopped after {} cycles", cycle.count());
            shared.set_state(PollState::Stopped);
            send(PollEvent::Stopped);
            return;
        }
        shared.set_state(PollState::Active);
    }
}
