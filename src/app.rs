//! Composition root: wires the store, policy, dispatcher and ingest loop
//! together and backs the CLI commands.

use crate::announce::{AnnounceSettings, AnnouncementPolicy, VoiceDispatcher};
use crate::announce::format::clock_time;
use crate::config::Config;
use crate::error::Result;
use crate::ingest::{self, IngestContext};
use crate::source::{EventSource, JsonlEventSource};
use crate::speech::{self, SpeechBackend, SpeechChain};
use crate::timing::{LeaderboardRow, TimingStore, TransponderView};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The aggregation core plus announcement side, owned as one object and
/// passed explicitly to the ingest loop and to query callers.
pub struct RaceService {
    store: Arc<TimingStore>,
    policy: Arc<Mutex<AnnouncementPolicy>>,
    dispatcher: Option<Arc<VoiceDispatcher>>,
    backends: Vec<Arc<dyn SpeechBackend>>,
}

impl RaceService {
    /// Build without voice output (replay, tests, `--no-voice`).
    pub fn new(config: &Config) -> Self {
        Self::build(config, None)
    }

    /// Build with a speech chain; the dispatcher worker starts
    /// immediately.
    pub fn with_voice(config: &Config, chain: SpeechChain) -> Self {
        Self::build(config, Some(chain))
    }

    fn build(config: &Config, chain: Option<SpeechChain>) -> Self {
        let store = Arc::new(TimingStore::new(
            config.timing.min_lap_secs,
            config.timing.max_lap_secs,
        ));
        let policy = Arc::new(Mutex::new(AnnouncementPolicy::new(AnnounceSettings {
            car_numbers: config.announce.car_numbers,
            lap_numbers: config.announce.lap_numbers,
            all_times: config.announce.all_times,
            all_times_interval: config.all_times_interval(),
        })));

        let mut backends = Vec::new();
        let dispatcher = chain.map(|chain| {
            backends.push(chain.primary.clone());
            if let Some(fallback) = &chain.fallback {
                backends.push(fallback.clone());
            }
            Arc::new(VoiceDispatcher::start(
                chain,
                &config.voice.language,
                config.voice.queue_capacity,
            ))
        });

        Self {
            store,
            policy,
            dispatcher,
            backends,
        }
    }

    pub fn store(&self) -> Arc<TimingStore> {
        self.store.clone()
    }

    /// Context for the ingest loop; cheap to produce.
    pub fn ingest_context(&self, source: Arc<dyn EventSource>) -> IngestContext {
        IngestContext {
            source,
            store: self.store.clone(),
            policy: self.policy.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }

    // ── Query surface exposed to the dashboard ─────────────────────────

    pub fn snapshot_leaderboard(&self) -> Vec<LeaderboardRow> {
        self.store.snapshot_leaderboard()
    }

    pub fn snapshot_transponder(&self, transponder_id: u32) -> Option<TransponderView> {
        self.store.snapshot_transponder(transponder_id)
    }

    /// Race reset: clears aggregation state and re-arms the race-start
    /// announcement.
    pub fn reset(&self) {
        self.store.reset();
        self.lock_policy().reset();
    }

    pub fn set_voice_enabled(&self, transponder_id: u32, enabled: bool) {
        self.store.set_voice_enabled(transponder_id, enabled);
    }

    pub fn set_nickname(&self, transponder_id: u32, nickname: &str) {
        self.store.set_nickname(transponder_id, nickname);
    }

    pub fn announcement_settings(&self) -> AnnounceSettings {
        self.lock_policy().settings().clone()
    }

    pub fn set_announcement_settings(&self, settings: AnnounceSettings) {
        self.lock_policy().set_settings(settings);
    }

    pub fn set_volume(&self, volume: f32) {
        for backend in &self.backends {
            backend.set_volume(volume);
        }
    }

    pub fn set_rate(&self, rate: u32) {
        for backend in &self.backends {
            backend.set_rate(rate);
        }
    }

    // ── Explicit announcement events ───────────────────────────────────

    /// Queue a free-form announcement.
    pub fn announce_text(&self, text: &str) {
        if let Some(dispatcher) = &self.dispatcher {
            let _ = dispatcher.enqueue(text);
        }
    }

    pub fn announce_race_finish(&self) {
        let text = self.lock_policy().race_finish();
        self.announce_text(&text);
    }

    pub fn announce_position_change(&self, position: usize) {
        if let Some(text) = self.lock_policy().position_change(position) {
            self.announce_text(&text);
        }
    }

    pub fn test_voice(&self) {
        let text = self.lock_policy().voice_test();
        self.announce_text(&text);
    }

    /// Stop the voice worker; idempotent, never hangs.
    pub fn shutdown(&self) {
        if let Some(dispatcher) = &self.dispatcher {
            dispatcher.shutdown();
        }
    }

    fn lock_policy(&self) -> std::sync::MutexGuard<'_, AnnouncementPolicy> {
        self.policy.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Build the speech chain off the async runtime.
///
/// Tier probing runs external commands; spawn_blocking keeps that off
/// the ingest loop's runtime threads.
pub async fn build_voice(config: &Config) -> SpeechChain {
    let voice = config.voice.clone();
    tokio::task::spawn_blocking(move || speech::build_chain(&voice))
        .await
        .unwrap_or_else(|_| {
            eprintln!("racecall: speech probe panicked, running in log-only mode");
            SpeechChain::single(Arc::new(crate::speech::NullSpeech::new()))
        })
}

/// Live commentary: backfill, then poll until Ctrl-C.
pub async fn run_race(config: Config, source: Arc<dyn EventSource>, quiet: bool) -> Result<()> {
    let service = if config.voice.enabled {
        let chain = build_voice(&config).await;
        if !quiet {
            eprintln!("racecall: speech engine: {}", chain.primary.name());
        }
        RaceService::with_voice(&config, chain)
    } else {
        RaceService::new(&config)
    };

    let processed = ingest::backfill(source.as_ref(), &service.store()).await?;
    if !quiet {
        eprintln!(
            "racecall: watching {} (backfilled {} passes)",
            source.describe(),
            processed
        );
    }

    let handle = ingest::start(service.ingest_context(source), config.poll_interval());

    tokio::signal::ctrl_c().await?;
    if !quiet {
        eprintln!("racecall: shutting down");
    }

    handle.stop().await;
    service.shutdown();
    Ok(())
}

/// Offline replay: run a JSONL pass file through the derivation path and
/// print the resulting standings.
pub async fn run_replay(config: Config, file: &Path, quiet: bool) -> Result<()> {
    let source = JsonlEventSource::open(file)?;
    if !quiet {
        eprintln!(
            "racecall: replaying {} events from {}",
            source.len(),
            file.display()
        );
    }

    let service = RaceService::new(&config);
    ingest::backfill(&source, &service.store()).await?;

    print_standings(&service.snapshot_leaderboard());
    Ok(())
}

/// One-shot utterance through the fallback chain.
pub async fn run_speak(config: Config, text: &str) -> Result<()> {
    let chain = build_voice(&config).await;
    eprintln!("racecall: speaking via {}", chain.primary.name());

    let dispatcher = VoiceDispatcher::start(
        chain,
        &config.voice.language,
        config.voice.queue_capacity,
    );
    dispatcher.enqueue(text)?;
    // Shutdown queues the sentinel behind the utterance, so the speech
    // finishes first.
    dispatcher.shutdown();
    Ok(())
}

/// Probe each TTS tier and report availability.
pub async fn run_engines() {
    let probes = tokio::task::spawn_blocking(speech::probe_engines)
        .await
        .unwrap_or_default();
    for probe in probes {
        let status = if probe.available { "ok" } else { "unavailable" };
        println!("{:<20} {:<12} {}", probe.name, status, probe.detail);
    }
}

/// Render the final standings table for replay output.
fn print_standings(rows: &[LeaderboardRow]) {
    let mut ranked: Vec<&LeaderboardRow> = rows.iter().collect();
    ranked.sort_by(|a, b| {
        b.lap_count.cmp(&a.lap_count).then_with(|| {
            a.best_lap_time
                .unwrap_or(f64::MAX)
                .total_cmp(&b.best_lap_time.unwrap_or(f64::MAX))
        })
    });

    println!(
        "{:<4} {:<12} {:<8} {:>6} {:>10} {:>10} {:>10} {:>8}",
        "Pos", "Transponder", "Car", "Laps", "Last", "Best", "Avg10", "StdDev"
    );
    for (i, row) in ranked.iter().enumerate() {
        println!(
            "{:<4} {:<12} {:<8} {:>6} {:>10} {:>10} {:>10} {:>8.3}",
            i + 1,
            row.transponder_id,
            row.car_number.as_deref().unwrap_or("-"),
            row.lap_count,
            row.last_lap_time.map(clock_time).unwrap_or_else(|| "-".to_string()),
            row.best_lap_time.map(clock_time).unwrap_or_else(|| "-".to_string()),
            clock_time(row.moving_avg_10),
            row.std_dev,
        );
    }
}
