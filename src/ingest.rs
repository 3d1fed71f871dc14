//! Ingestion loop: polls the event source and drives the aggregation
//! store and the announcement side.
//!
//! One background task owns the loop. Source I/O happens outside the
//! store lock; the lock only covers the in-memory state update. Source
//! failures leave the cursor untouched and retry on the next interval,
//! forever — the poll interval is the backoff.

use crate::announce::{AnnouncementPolicy, VoiceDispatcher};
use crate::error::Result;
use crate::source::EventSource;
use crate::timing::TimingStore;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Handle to the running ingest loop.
pub struct IngestHandle {
    running: Arc<AtomicBool>,
    task: tokio::task::JoinHandle<()>,
}

impl IngestHandle {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Cooperative stop: the flag is checked once per poll iteration.
    pub async fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        if self.task.await.is_err() {
            eprintln!("racecall: ingest task panicked");
        }
    }
}

/// Everything one poll iteration needs, bundled for the spawn call.
pub struct IngestContext {
    pub source: Arc<dyn EventSource>,
    pub store: Arc<TimingStore>,
    pub policy: Arc<Mutex<AnnouncementPolicy>>,
    pub dispatcher: Option<Arc<VoiceDispatcher>>,
}

/// Rebuild aggregation state from the source's full history.
///
/// Runs the same derivation path as live ingestion but bypasses the
/// announcement policy: replaying a whole race through the speakers on
/// restart is never wanted. Returns the number of passes processed.
pub async fn backfill(source: &dyn EventSource, store: &TimingStore) -> Result<usize> {
    let events = source.fetch_since(store.cursor()).await?;
    let laps = store.ingest(&events);
    if !events.is_empty() {
        eprintln!(
            "racecall: backfill processed {} passes ({} laps) from {}",
            events.len(),
            laps.len(),
            source.describe()
        );
    }
    Ok(events.len())
}

/// Spawn the polling loop on the current runtime.
pub fn start(context: IngestContext, poll_interval: Duration) -> IngestHandle {
    let running = Arc::new(AtomicBool::new(true));
    let loop_running = running.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while loop_running.load(Ordering::SeqCst) {
            ticker.tick().await;
            if !loop_running.load(Ordering::SeqCst) {
                break;
            }
            poll_once(&context).await;
        }
    });

    IngestHandle { running, task }
}

/// One poll iteration: fetch (outside the lock), ingest, announce.
async fn poll_once(context: &IngestContext) {
    let cursor = context.store.cursor();
    let events = match context.source.fetch_since(cursor).await {
        Ok(events) => events,
        Err(e) => {
            eprintln!("racecall: event source poll failed: {e}");
            return;
        }
    };

    let laps = if events.is_empty() {
        Vec::new()
    } else {
        context.store.ingest(&events)
    };

    let Some(dispatcher) = &context.dispatcher else {
        return;
    };

    let mut policy = context
        .policy
        .lock()
        .unwrap_or_else(|e| e.into_inner());

    for lap in &laps {
        for text in policy.on_new_lap(lap) {
            let _ = dispatcher.enqueue(&text);
        }
    }

    // Standings are time-gated, so the check runs every tick even when
    // no lap landed in this batch.
    let rows = context.store.snapshot_leaderboard();
    if let Some(text) = policy.standings(&rows, Instant::now()) {
        let _ = dispatcher.enqueue(&text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::AnnounceSettings;
    use crate::source::MockEventSource;
    use crate::speech::{MockSpeech, SpeechChain};
    use crate::timing::PassEvent;

    const SEC: u64 = 1_000_000;

    fn pass(transponder_id: u32, rtc_secs: f64) -> PassEvent {
        PassEvent {
            transponder_id,
            rtc_time: (rtc_secs * SEC as f64) as u64,
            decoder_id: 1,
            strength: 80,
            car_number: None,
        }
    }

    fn context(
        source: MockEventSource,
        dispatcher: Option<Arc<VoiceDispatcher>>,
    ) -> IngestContext {
        IngestContext {
            source: Arc::new(source),
            store: Arc::new(TimingStore::default()),
            policy: Arc::new(Mutex::new(AnnouncementPolicy::new(
                AnnounceSettings::default(),
            ))),
            dispatcher,
        }
    }

    async fn wait_until(
        deadline: Duration,
        mut predicate: impl FnMut() -> bool,
    ) -> bool {
        let end = Instant::now() + deadline;
        while Instant::now() < end {
            if predicate() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        predicate()
    }

    #[tokio::test]
    async fn backfill_rebuilds_state_silently() {
        let source = MockEventSource::new().with_batch(vec![
            pass(1, 0.0),
            pass(1, 12.0),
            pass(1, 25.0),
        ]);
        let store = TimingStore::default();

        let processed = backfill(&source, &store).await.unwrap();
        assert_eq!(processed, 3);

        let view = store.snapshot_transponder(1).unwrap();
        assert_eq!(view.lap_count, 2);
        assert_eq!(store.cursor(), 25 * SEC);
    }

    #[tokio::test]
    async fn backfill_propagates_source_errors() {
        let source = MockEventSource::new().with_failure();
        let store = TimingStore::default();
        assert!(backfill(&source, &store).await.is_err());
    }

    #[tokio::test]
    async fn loop_ingests_batches_and_stops() {
        let source = MockEventSource::new()
            .with_batch(vec![pass(1, 0.0), pass(1, 12.0)])
            .with_batch(vec![pass(1, 25.0)]);
        let context = context(source, None);
        let store = context.store.clone();

        let handle = start(context, Duration::from_millis(10));
        assert!(handle.is_running());

        assert!(
            wait_until(Duration::from_secs(2), || {
                store
                    .snapshot_transponder(1)
                    .is_some_and(|v| v.lap_count == 2)
            })
            .await
        );

        handle.stop().await;
    }

    #[tokio::test]
    async fn loop_passes_advancing_cursor_to_source() {
        let mock = Arc::new(
            MockEventSource::new().with_batch(vec![pass(1, 0.0), pass(1, 12.0)]),
        );
        let context = IngestContext {
            source: mock.clone(),
            store: Arc::new(TimingStore::default()),
            policy: Arc::new(Mutex::new(AnnouncementPolicy::new(
                AnnounceSettings::default(),
            ))),
            dispatcher: None,
        };

        let handle = start(context, Duration::from_millis(10));

        assert!(
            wait_until(Duration::from_secs(2), || mock.cursors().len() >= 3).await
        );
        handle.stop().await;

        let cursors = mock.cursors();
        assert_eq!(cursors[0], 0);
        // After the first batch lands, every later poll carries the
        // high-water mark.
        assert!(cursors[1..].iter().all(|&c| c == 12 * SEC));
    }

    #[tokio::test]
    async fn loop_survives_source_failure() {
        let source = MockEventSource::new()
            .with_failure()
            .with_batch(vec![pass(1, 0.0), pass(1, 12.0)]);
        let context = context(source, None);
        let store = context.store.clone();

        let handle = start(context, Duration::from_millis(10));

        assert!(
            wait_until(Duration::from_secs(2), || {
                store
                    .snapshot_transponder(1)
                    .is_some_and(|v| v.lap_count == 1)
            })
            .await
        );

        handle.stop().await;
    }

    #[tokio::test]
    async fn loop_announces_new_laps() {
        let speech = Arc::new(MockSpeech::new());
        let dispatcher = Arc::new(VoiceDispatcher::start(
            SpeechChain::single(speech.clone()),
            "ja",
            8,
        ));

        let source = MockEventSource::new()
            .with_batch(vec![pass(1, 0.0)])
            .with_batch(vec![pass(1, 12.5)]);
        let context = context(source, Some(dispatcher.clone()));

        let handle = start(context, Duration::from_millis(10));

        assert!(
            wait_until(Duration::from_secs(2), || speech.texts().len() >= 2).await
        );
        assert_eq!(speech.texts(), vec!["レース開始！", "12.500秒、ベストラップ！"]);

        handle.stop().await;
        dispatcher.shutdown();
    }

    #[tokio::test]
    async fn stop_is_prompt() {
        let context = context(MockEventSource::new(), None);
        let handle = start(context, Duration::from_millis(10));

        let started = Instant::now();
        handle.stop().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
