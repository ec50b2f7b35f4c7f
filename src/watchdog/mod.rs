//! Execution watchdog.
//!
//! A [`Watchdog`] kills the process it monitors once a configured timeout
//! elapses, unless [`Watchdog::stop`] is called first.
//!
//! # States
//!
//! ```text
//! Idle --start--> Armed --deadline--> (destroy) --> Idle   latch = TimedOut
//!                   |
//!                   +----stop-------------------> Idle     latch = Stopped
//! ```
//!
//! The timer thread and `stop` both run under the same mutex, so a stop that
//! returns guarantees no kill is still in flight. The latch only moves away
//! from `NotTriggered` by compare-and-set, which makes the first of the two
//! transitions win. A timer that finds the process already exited does not
//! destroy it and leaves the latch alone.
//!
//! The watchdog holds only a weak reference to the process and can be
//! reused for sequential executions; each [`Watchdog::start`] resets the
//! latch. It watches one live process at a time: starting it again while
//! that process still runs is refused.


use crate::error::{ExecError, Result};
use crate::process::ProcessHandle;
use std::io;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const NOT_TRIGGERED: u8 = 0;
const TIMED_OUT: u8 = 1;
const STOPPED: u8 = 2;

/// Outcome recorded for the most recent execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogLatch {
    /// Still armed, or never armed.
    NotTriggered,
    /// The timeout fired and destroyed the process.
    TimedOut,
    /// `stop` was called before the timeout fired.
    Stopped,
}

enum Phase {
    Idle,
    Armed {
        process: Weak<ProcessHandle>,
        deadline: Option<Instant>,
        generation: u64,
    },
}

struct State {
    phase: Phase,
    generation: u64,
    /// Arming whose timer delivered the most recent kill.
    killed_generation: Option<u64>,
}

struct Shared {
    state: Mutex<State>,
    wake: Condvar,
    latch: AtomicU8,
    error: Mutex<Option<io::Error>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn set_error(&self, err: Option<io::Error>) {
        *self.error.lock().unwrap_or_else(|poison| poison.into_inner()) = err;
    }

    fn latch(&self, to: u8) -> bool {
        self.latch
            .compare_exchange(NOT_TRIGGERED, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Timer thread body for one arming.
    fn run_timer(&self, generation: u64) {
        let mut state = self.lock();
        loop {
            let deadline = match &state.phase {
                Phase::Armed {
                    generation: armed,
                    deadline: Some(deadline),
                    ..
                } if *armed == generation => *deadline,
                // Stopped, cancelled, or superseded by a newer start.
                _ => return,
            };

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            state = self
                .wake
                .wait_timeout(state, deadline - now)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|poison| poison.into_inner().0);
        }

        let Phase::Armed { process, .. } = std::mem::replace(&mut state.phase, Phase::Idle) else {
            return;
        };

        // Destroy while holding the lock: `stop` waits for this to finish.
        let Some(process) = process.upgrade() else {
            debug!("watchdog deadline passed after the execution ended");
            return;
        };

        match process.destroy() {
            Ok(true) => {
                state.killed_generation = Some(generation);
                self.latch(TIMED_OUT);
                warn!(pid = process.id(), "process killed by watchdog timeout");
            }
            Ok(false) => {
                debug!(pid = process.id(), "process exited before watchdog fired");
            }
            Err(e) => {
                warn!(pid = process.id(), error = %e, "watchdog failed to destroy process");
                self.set_error(Some(e));
            }
        }
    }
}

/// Kills a monitored process after a timeout.
pub struct Watchdog {
    timeout: Option<Duration>,
    shared: Arc<Shared>,
}

impl Watchdog {
    /// Watchdog that fires after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self::with_timeout(Some(timeout))
    }

    /// Watchdog that never fires but still supports
    /// [`destroy_process`](Self::destroy_process).
    pub fn unbounded() -> Self {
        Self::with_timeout(None)
    }

    /// `None` means no timeout.
    pub fn with_timeout(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    phase: Phase::Idle,
                    generation: 0,
                    killed_generation: None,
                }),
                wake: Condvar::new(),
                latch: AtomicU8::new(NOT_TRIGGERED),
                error: Mutex::new(None),
            }),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Start monitoring `process`.
    ///
    /// Resets the latch. Fails with [`ExecError::WatchdogBusy`] while a
    /// previous arming still watches a running process; an arming whose
    /// process already exited (or was dropped) is replaced. With no timeout,
    /// no timer thread is started.
    pub fn start(&self, process: &Arc<ProcessHandle>) -> Result<()> {
        self.arm(process).map(|_| ())
    }

    /// Like [`start`](Self::start), returning the arming's generation for
    /// [`disarm`](Self::disarm).
    pub(crate) fn arm(&self, process: &Arc<ProcessHandle>) -> Result<u64> {
        let mut state = self.shared.lock();
        if let Phase::Armed { process: armed, .. } = &state.phase
            && let Some(armed) = armed.upgrade()
            && !matches!(armed.try_wait(), Ok(Some(_)))
        {
            return Err(ExecError::WatchdogBusy { pid: armed.id() });
        }

        state.generation += 1;
        let generation = state.generation;
        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);

        self.shared.latch.store(NOT_TRIGGERED, Ordering::Release);
        self.shared.set_error(None);
        state.phase = Phase::Armed {
            process: Arc::downgrade(process),
            deadline,
            generation,
        };
        // Lets a timer from a previous arming notice it was superseded.
        self.shared.wake.notify_all();
        drop(state);

        debug!(pid = process.id(), timeout = ?self.timeout, "watchdog armed");

        if deadline.is_none() {
            return Ok(generation);
        }

        let shared = Arc::clone(&self.shared);
        let spawned = thread::Builder::new()
            .name("runexec-watchdog".to_string())
            .spawn(move || shared.run_timer(generation));

        if let Err(source) = spawned {
            self.disarm(generation);
            return Err(ExecError::Spawn {
                name: "watchdog",
                source,
            });
        }
        Ok(generation)
    }

    /// Stop arming `generation` if it is still current, leaving any later
    /// arming alone. Returns whether that arming's timer killed its process.
    pub(crate) fn disarm(&self, generation: u64) -> bool {
        let mut state = self.shared.lock();
        if matches!(state.phase, Phase::Armed { generation: armed, .. } if armed == generation) {
            state.phase = Phase::Idle;
            self.shared.latch(STOPPED);
            self.shared.wake.notify_all();
            debug!("watchdog stopped");
        }
        state.killed_generation == Some(generation)
    }

    /// Stop monitoring without touching the process.
    ///
    /// Idempotent. If the timeout already fired this is a no-op and
    /// [`killed_process`](Self::killed_process) stays true. When this returns,
    /// no kill from the current arming can still happen.
    pub fn stop(&self) {
        let mut state = self.shared.lock();
        if matches!(state.phase, Phase::Armed { .. }) {
            state.phase = Phase::Idle;
            self.shared.latch(STOPPED);
            self.shared.wake.notify_all();
            debug!("watchdog stopped");
        }
    }

    /// Kill the monitored process now, without latching a timeout.
    ///
    /// Returns `Ok(true)` if a running process was killed.
    pub fn destroy_process(&self) -> io::Result<bool> {
        let mut state = self.shared.lock();
        let Phase::Armed { process, .. } = std::mem::replace(&mut state.phase, Phase::Idle) else {
            return Ok(false);
        };
        self.shared.wake.notify_all();

        match process.upgrade() {
            Some(process) => process.destroy(),
            None => Ok(false),
        }
    }

    /// Whether a process is currently monitored.
    pub fn is_watching(&self) -> bool {
        matches!(self.shared.lock().phase, Phase::Armed { .. })
    }

    /// Whether the timeout fired and killed the process.
    ///
    /// Meaningful once the monitored execution has ended.
    pub fn killed_process(&self) -> bool {
        self.latch() == WatchdogLatch::TimedOut
    }

    pub fn latch(&self) -> WatchdogLatch {
        match self.shared.latch.load(Ordering::Acquire) {
            TIMED_OUT => WatchdogLatch::TimedOut,
            STOPPED => WatchdogLatch::Stopped,
            _ => WatchdogLatch::NotTriggered,
        }
    }

    /// Error raised while destroying the process on timeout, if any.
    pub fn take_error(&self) -> Option<io::Error> {
        self.shared
            .error
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .take()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Watchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watchdog")
            .field("timeout", &self.timeout)
            .field("latch", &self.latch())
            .finish()
    }
}
