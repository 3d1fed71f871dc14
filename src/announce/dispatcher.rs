//! Voice dispatcher: a bounded queue and one serializing worker.
//!
//! Announcements are enqueued without blocking and spoken strictly one
//! at a time; the queue bound keeps commentary close to live by shedding
//! load instead of buffering a backlog. A stalled speech backend can
//! never stall ingestion — the policy side only ever calls `enqueue`.

use crate::defaults;
use crate::error::{RacecallError, Result};
use crate::speech::{SpeechBackend, SpeechChain};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Instant;

/// Dispatcher lifecycle: STOPPED → RUNNING → STOPPING → STOPPED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    Stopped,
    Running,
    Stopping,
}

const STATE_STOPPED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;

enum QueueItem {
    Announce(String),
    /// Reserved sentinel telling the worker to exit.
    Shutdown,
}

pub struct VoiceDispatcher {
    tx: Sender<QueueItem>,
    state: Arc<AtomicU8>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl VoiceDispatcher {
    /// Spawn the worker and enter RUNNING.
    pub fn start(chain: SpeechChain, language: &str, queue_capacity: usize) -> Self {
        let (tx, rx) = bounded(queue_capacity.max(1));
        let state = Arc::new(AtomicU8::new(STATE_RUNNING));

        let worker_state = state.clone();
        let language = language.to_string();
        let handle = thread::spawn(move || {
            run_worker(rx, chain, &language, worker_state);
        });

        Self {
            tx,
            state,
            worker: Mutex::new(Some(handle)),
        }
    }

    pub fn state(&self) -> DispatcherState {
        match self.state.load(Ordering::SeqCst) {
            STATE_RUNNING => DispatcherState::Running,
            STATE_STOPPING => DispatcherState::Stopping,
            _ => DispatcherState::Stopped,
        }
    }

    /// Queue an announcement without blocking.
    ///
    /// A full queue drops the request with a warning — bounded latency
    /// beats stale commentary. Errors are returned for tests; callers in
    /// the ingest path ignore them, the warning has already been logged.
    pub fn enqueue(&self, text: &str) -> Result<()> {
        if self.state() != DispatcherState::Running {
            return Err(RacecallError::DispatcherStopped);
        }
        match self.tx.try_send(QueueItem::Announce(text.to_string())) {
            Ok(()) => Ok(()),
            Err(_) => {
                eprintln!("racecall: announcement queue full, dropping: {text}");
                Err(RacecallError::QueueFull)
            }
        }
    }

    /// Stop the worker: sentinel, then a bounded join.
    ///
    /// Proceeds regardless of the outcome — shutdown must never hang the
    /// host. Safe to call more than once.
    pub fn shutdown(&self) {
        if self
            .state
            .compare_exchange(
                STATE_RUNNING,
                STATE_STOPPING,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_err()
        {
            return;
        }

        // Best effort: on a full queue the worker notices STOPPING on its
        // next poll timeout instead.
        let _ = self.tx.try_send(QueueItem::Shutdown);

        let handle = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(handle) = handle {
            let deadline = Instant::now() + defaults::DISPATCHER_JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(std::time::Duration::from_millis(50));
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    eprintln!("racecall: voice worker panicked during shutdown");
                }
            } else {
                // Dropping the handle detaches the worker; it dies with
                // the process.
                eprintln!("racecall: voice worker did not stop in time, detaching");
            }
        }

        self.state.store(STATE_STOPPED, Ordering::SeqCst);
    }
}

impl Drop for VoiceDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(
    rx: Receiver<QueueItem>,
    chain: SpeechChain,
    language: &str,
    state: Arc<AtomicU8>,
) {
    loop {
        match rx.recv_timeout(defaults::ANNOUNCE_POLL_TIMEOUT) {
            Ok(QueueItem::Announce(text)) => {
                speak_one(&chain, &text, language);
            }
            Ok(QueueItem::Shutdown) => break,
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                if state.load(Ordering::SeqCst) == STATE_STOPPING {
                    break;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    chain.primary.shutdown();
    if let Some(fallback) = &chain.fallback {
        fallback.shutdown();
    }
}

/// Speak one utterance, falling back to the command-line tier on failure.
///
/// Fail-open: a lost announcement is logged and forgotten, never
/// escalated.
fn speak_one(chain: &SpeechChain, text: &str, language: &str) {
    if let Err(primary_err) = chain.primary.speak(text, language) {
        eprintln!(
            "racecall: {} failed ({primary_err}), trying fallback",
            chain.primary.name()
        );
        match &chain.fallback {
            Some(fallback) => {
                if let Err(fallback_err) = fallback.speak(text, language) {
                    eprintln!(
                        "racecall: fallback {} also failed ({fallback_err}), announcement lost: {text}",
                        fallback.name()
                    );
                }
            }
            None => {
                eprintln!("racecall: no fallback engine, announcement lost: {text}");
            }
        }
    }
}
