// Movement facade: one interface over interchangeable movement backends.
//
// Architecture: every position update — from any backend — flows through a
// single `mpsc` channel whose sole consumer is the session's event loop.
// The discrete stepper sends synchronously from the session thread; the
// continuous backend runs a worker thread that samples a pluggable
// `PositionProvider` on a fixed cadence, debounces unchanged positions,
// and sends the rest. The session drains the channel with `poll`, handling
// each update to completion before taking the next.
//
// Exactly one backend is active at a time. `activate` stops the current
// backend **completely** before starting the new one: stopping the stream
// sets a shared flag and joins the worker thread, so once `activate` (or
// `stop`) returns, no further update from the old backend can ever be
// delivered. Updates already queued from before the swap are discarded by
// `activate` so a swap never double-delivers (the session drains the
// channel first, so nothing pending is dropped in practice).
//
// If the continuous source cannot be started, the facade stays on the
// discrete stepper and reports the failure — movement is never fatal.
//
// See also: `session.rs` for the consumer loop, `config.rs` for
// `stream_interval_ms` and `cell_size`.

use crate::config::GameConfig;
use crate::types::WorldPos;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// The interchangeable movement sources.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BackendKind {
    /// Button-style stepping: one cell width per invocation, one axis.
    Discrete,
    /// Asynchronous position stream (e.g. a location service).
    Continuous,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Discrete => write!(f, "discrete"),
            BackendKind::Continuous => write!(f, "continuous"),
        }
    }
}

/// Why a backend could not be activated.
#[derive(Debug, PartialEq, Eq, Error)]
pub enum MovementError {
    #[error("continuous position source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("no position provider installed")]
    NoProvider,
}

/// A source of continuous positions, supplied by the host.
///
/// `start` runs on the session thread before the worker spawns, so a
/// source that cannot initialize fails the activation synchronously.
/// `sample` is called from the worker thread at the configured cadence.
pub trait PositionProvider: Send {
    fn start(&mut self) -> Result<(), MovementError>;

    /// The current position, or `None` when the source has no fix (or, for
    /// finite sources, nothing further to report).
    fn sample(&mut self) -> Option<WorldPos>;
}

/// A provider that plays back a fixed sequence of positions, one per
/// sample. The in-repo continuous source; hosts with real location
/// hardware implement `PositionProvider` themselves.
#[derive(Debug, Default)]
pub struct ScriptedProvider {
    positions: std::collections::VecDeque<WorldPos>,
}

impl ScriptedProvider {
    pub fn new(positions: impl IntoIterator<Item = WorldPos>) -> Self {
        Self {
            positions: positions.into_iter().collect(),
        }
    }
}

impl PositionProvider for ScriptedProvider {
    fn start(&mut self) -> Result<(), MovementError> {
        Ok(())
    }

    fn sample(&mut self) -> Option<WorldPos> {
        self.positions.pop_front()
    }
}

/// Handle to the running stream worker.
struct StreamWorker {
    keep_running: Arc<AtomicBool>,
    handle: thread::JoinHandle<Box<dyn PositionProvider>>,
}

/// The continuous backend: provider + worker thread.
struct StreamBackend {
    interval: Duration,
    provider: Option<Box<dyn PositionProvider>>,
    worker: Option<StreamWorker>,
}

impl StreamBackend {
    fn start(&mut self, tx: Sender<WorldPos>) -> Result<(), MovementError> {
        let mut provider = self.provider.take().ok_or(MovementError::NoProvider)?;
        if let Err(err) = provider.start() {
            self.provider = Some(provider);
            return Err(err);
        }
        let keep_running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&keep_running);
        let interval = self.interval;
        let handle = thread::spawn(move || {
            let mut last: Option<WorldPos> = None;
            while flag.load(Ordering::SeqCst) {
                if let Some(pos) = provider.sample()
                    && last != Some(pos)
                {
                    if tx.send(pos).is_err() {
                        break;
                    }
                    last = Some(pos);
                }
                thread::sleep(interval);
            }
            // The provider survives the worker so the backend can restart.
            provider
        });
        self.worker = Some(StreamWorker {
            keep_running,
            handle,
        });
        Ok(())
    }

    /// Synchronous stop: joins the worker, so no update can be sent after
    /// this returns.
    fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.keep_running.store(false, Ordering::SeqCst);
            if let Ok(provider) = worker.handle.join() {
                self.provider = Some(provider);
            }
        }
    }

    fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

/// Uniform interface over the movement backends. Owns the position-update
/// channel; the session is the sole consumer.
pub struct MovementFacade {
    active: BackendKind,
    cell_size: f64,
    stream: StreamBackend,
    tx: Sender<WorldPos>,
    rx: Receiver<WorldPos>,
}

impl MovementFacade {
    pub fn new(config: &GameConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            active: BackendKind::Discrete,
            cell_size: config.cell_size,
            stream: StreamBackend {
                interval: Duration::from_millis(config.stream_interval_ms),
                provider: None,
                worker: None,
            },
            tx,
            rx,
        }
    }

    /// Install (or replace) the continuous backend's position source. If
    /// the stream is running it is stopped first; the facade falls back to
    /// the discrete stepper until the next `activate`.
    pub fn set_position_provider(&mut self, provider: Box<dyn PositionProvider>) {
        if self.stream.is_running() {
            self.stream.stop();
            self.active = BackendKind::Discrete;
        }
        self.stream.provider = Some(provider);
    }

    pub fn active(&self) -> BackendKind {
        self.active
    }

    /// Switch to the given backend. The current backend is fully stopped
    /// before the new one starts; stale queued updates are discarded.
    ///
    /// On failure the facade remains on the discrete stepper and the error
    /// describes why — the caller surfaces it as a warning, never a crash.
    pub fn activate(&mut self, kind: BackendKind) -> Result<BackendKind, MovementError> {
        if self.stream.is_running() {
            self.stream.stop();
        }
        while self.rx.try_recv().is_ok() {}
        match kind {
            BackendKind::Discrete => {
                self.active = BackendKind::Discrete;
                Ok(self.active)
            }
            BackendKind::Continuous => match self.stream.start(self.tx.clone()) {
                Ok(()) => {
                    self.active = BackendKind::Continuous;
                    Ok(self.active)
                }
                Err(err) => {
                    self.active = BackendKind::Discrete;
                    Err(err)
                }
            },
        }
    }

    /// Discrete step: exactly one cell width along one axis. When both
    /// deltas are nonzero the i axis wins; magnitudes beyond 1 are clamped.
    /// Returns whether an update was emitted (the stepper is inert while
    /// the continuous backend is active).
    pub fn step(&mut self, di: i32, dj: i32, current: WorldPos) -> bool {
        if self.active != BackendKind::Discrete {
            return false;
        }
        let (si, sj) = if di != 0 {
            (di.signum(), 0)
        } else {
            (0, dj.signum())
        };
        if si == 0 && sj == 0 {
            return false;
        }
        let next = WorldPos::new(
            current.x + si as f64 * self.cell_size,
            current.y + sj as f64 * self.cell_size,
        );
        let _ = self.tx.send(next);
        true
    }

    /// Emit a direct position update outside any backend (the developer
    /// relocation path).
    pub fn relocate(&mut self, position: WorldPos) {
        let _ = self.tx.send(position);
    }

    /// Next pending position update, if any. Non-blocking.
    pub fn poll(&mut self) -> Option<WorldPos> {
        self.rx.try_recv().ok()
    }

    /// Stop whatever is running. Synchronous, like `activate`'s stop.
    pub fn shutdown(&mut self) {
        self.stream.stop();
        self.active = BackendKind::Discrete;
    }
}

impl Drop for MovementFacade {
    fn drop(&mut self) {
        self.stream.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn facade(interval_ms: u64) -> MovementFacade {
        MovementFacade::new(&GameConfig {
            stream_interval_ms: interval_ms,
            ..GameConfig::default()
        })
    }

    /// Drain updates until `n` arrive or the deadline passes.
    fn collect_updates(facade: &mut MovementFacade, n: usize, deadline_ms: u64) -> Vec<WorldPos> {
        let deadline = Instant::now() + Duration::from_millis(deadline_ms);
        let mut got = Vec::new();
        while got.len() < n && Instant::now() < deadline {
            match facade.poll() {
                Some(pos) => got.push(pos),
                None => thread::sleep(Duration::from_millis(1)),
            }
        }
        got
    }

    #[test]
    fn stepper_moves_exactly_one_cell_width() {
        let mut facade = facade(200);
        assert!(facade.step(1, 0, WorldPos::new(0.0, 0.0)));
        assert_eq!(facade.poll(), Some(WorldPos::new(1.0, 0.0)));

        assert!(facade.step(0, -1, WorldPos::new(1.0, 0.0)));
        assert_eq!(facade.poll(), Some(WorldPos::new(1.0, -1.0)));
    }

    #[test]
    fn stepper_clamps_to_a_single_axis_step() {
        let mut facade = facade(200);
        assert!(facade.step(5, 7, WorldPos::new(0.0, 0.0)));
        assert_eq!(facade.poll(), Some(WorldPos::new(1.0, 0.0)));
        assert!(!facade.step(0, 0, WorldPos::new(0.0, 0.0)));
        assert_eq!(facade.poll(), None);
    }

    #[test]
    fn stream_plays_back_provider_positions_in_order() {
        let a = WorldPos::new(1.0, 1.0);
        let b = WorldPos::new(2.0, 2.0);
        let mut facade = facade(2);
        facade.set_position_provider(Box::new(ScriptedProvider::new([a, b])));
        assert_eq!(facade.activate(BackendKind::Continuous), Ok(BackendKind::Continuous));

        assert_eq!(collect_updates(&mut facade, 2, 1000), vec![a, b]);
    }

    #[test]
    fn stream_debounces_unchanged_positions() {
        struct ConstantProvider(WorldPos);
        impl PositionProvider for ConstantProvider {
            fn start(&mut self) -> Result<(), MovementError> {
                Ok(())
            }
            fn sample(&mut self) -> Option<WorldPos> {
                Some(self.0)
            }
        }

        let pos = WorldPos::new(3.0, 3.0);
        let mut facade = facade(2);
        facade.set_position_provider(Box::new(ConstantProvider(pos)));
        facade.activate(BackendKind::Continuous).unwrap();

        assert_eq!(collect_updates(&mut facade, 1, 1000), vec![pos]);
        // Give the worker plenty of cycles to (wrongly) re-send.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(facade.poll(), None, "identical samples must be suppressed");
    }

    #[test]
    fn deactivation_is_synchronous_and_final() {
        let mut facade = facade(2);
        facade.set_position_provider(Box::new(ScriptedProvider::new(
            (0..10_000).map(|k| WorldPos::new(k as f64, 0.0)),
        )));
        facade.activate(BackendKind::Continuous).unwrap();
        // Let a few updates through, then switch away.
        let _ = collect_updates(&mut facade, 3, 1000);
        facade.activate(BackendKind::Discrete).unwrap();

        // The swap discards anything queued before the stop and no new
        // update can arrive: the worker thread has been joined.
        thread::sleep(Duration::from_millis(50));
        assert_eq!(facade.poll(), None);
        assert_eq!(facade.active(), BackendKind::Discrete);
    }

    #[test]
    fn failed_source_falls_back_to_the_stepper() {
        struct BrokenProvider;
        impl PositionProvider for BrokenProvider {
            fn start(&mut self) -> Result<(), MovementError> {
                Err(MovementError::SourceUnavailable("no hardware".into()))
            }
            fn sample(&mut self) -> Option<WorldPos> {
                None
            }
        }

        let mut facade = facade(200);
        facade.set_position_provider(Box::new(BrokenProvider));
        let err = facade.activate(BackendKind::Continuous).unwrap_err();
        assert_eq!(
            err,
            MovementError::SourceUnavailable("no hardware".into())
        );
        assert_eq!(facade.active(), BackendKind::Discrete);
        // The stepper still works after the failed activation.
        assert!(facade.step(1, 0, WorldPos::new(0.0, 0.0)));
    }

    #[test]
    fn activating_without_a_provider_reports_it() {
        let mut facade = facade(200);
        assert_eq!(
            facade.activate(BackendKind::Continuous),
            Err(MovementError::NoProvider)
        );
        assert_eq!(facade.active(), BackendKind::Discrete);
    }

    #[test]
    fn stream_can_restart_after_a_stop() {
        struct CountingProvider(u64);
        impl PositionProvider for CountingProvider {
            fn start(&mut self) -> Result<(), MovementError> {
                Ok(())
            }
            fn sample(&mut self) -> Option<WorldPos> {
                self.0 += 1;
                Some(WorldPos::new(self.0 as f64, 0.0))
            }
        }

        let mut facade = facade(2);
        facade.set_position_provider(Box::new(CountingProvider(0)));

        facade.activate(BackendKind::Continuous).unwrap();
        assert!(!collect_updates(&mut facade, 1, 1000).is_empty());
        facade.activate(BackendKind::Discrete).unwrap();

        // The provider survived the stop; the stream starts again.
        facade.activate(BackendKind::Continuous).unwrap();
        assert!(!collect_updates(&mut facade, 1, 1000).is_empty());
    }
}
