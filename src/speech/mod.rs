//! Speech output: the backend capability trait, one implementation per
//! engine tier and the startup fallback chain.
//!
//! Tier order is remote HTTP TTS → speech-dispatcher → espeak → log-only.
//! Any tier that fails to initialize falls through to the next; ending up
//! in log-only mode is a degradation, never an error.

pub mod backend;
pub mod espeak;
pub mod executor;
#[cfg(feature = "remote-tts")]
pub mod remote;
pub mod settings;
pub mod spd;

pub use backend::{MockSpeech, NullSpeech, SpeechBackend};
pub use espeak::EspeakSpeech;
pub use executor::{CommandExecutor, SystemCommandExecutor};
#[cfg(feature = "remote-tts")]
pub use remote::RemoteSpeech;
pub use spd::SpdSpeech;

use crate::config::{EnginePreference, VoiceConfig};
use std::sync::Arc;

/// The selected primary engine plus the per-utterance fallback.
///
/// The fallback is the command-line espeak tier, used when the primary
/// fails mid-utterance; it is absent when the primary already is espeak
/// (or log-only), or when espeak itself is unavailable.
pub struct SpeechChain {
    pub primary: Arc<dyn SpeechBackend>,
    pub fallback: Option<Arc<dyn SpeechBackend>>,
}

impl SpeechChain {
    /// A chain around a single backend, without an utterance fallback.
    /// Used by tests and the log-only path.
    pub fn single(primary: Arc<dyn SpeechBackend>) -> Self {
        Self {
            primary,
            fallback: None,
        }
    }
}

/// Evaluate the engine fallback chain once at startup.
///
/// With `Auto`, tiers are tried in preference order; an explicit
/// preference tries only that tier. Either way an unavailable engine
/// degrades toward log-only mode instead of failing.
pub fn build_chain(config: &VoiceConfig) -> SpeechChain {
    let volume = config.volume;
    let rate = config.rate;

    let primary: Arc<dyn SpeechBackend> = match config.engine {
        EnginePreference::None => Arc::new(NullSpeech::new()),
        EnginePreference::Remote => try_remote(volume, rate)
            .unwrap_or_else(|| log_only("remote")),
        EnginePreference::Spd => try_spd(volume, rate).unwrap_or_else(|| log_only("spd")),
        EnginePreference::Espeak => {
            try_espeak(volume, rate).unwrap_or_else(|| log_only("espeak"))
        }
        EnginePreference::Auto => try_remote(volume, rate)
            .or_else(|| try_spd(volume, rate))
            .or_else(|| try_espeak(volume, rate))
            .unwrap_or_else(|| {
                eprintln!("racecall: no speech engine available, running in log-only mode");
                Arc::new(NullSpeech::new())
            }),
    };

    let fallback = if primary.name() == "espeak" || primary.name() == "log-only" {
        None
    } else {
        EspeakSpeech::system(volume, rate)
            .ok()
            .map(|e| Arc::new(e) as Arc<dyn SpeechBackend>)
    };

    SpeechChain { primary, fallback }
}

fn log_only(wanted: &str) -> Arc<dyn SpeechBackend> {
    eprintln!("racecall: requested engine '{wanted}' unavailable, running in log-only mode");
    Arc::new(NullSpeech::new())
}

#[cfg(feature = "remote-tts")]
fn try_remote(volume: f32, rate: u32) -> Option<Arc<dyn SpeechBackend>> {
    match RemoteSpeech::system(volume, rate) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(e) => {
            eprintln!("racecall: remote TTS unavailable ({e})");
            None
        }
    }
}

#[cfg(not(feature = "remote-tts"))]
fn try_remote(_volume: f32, _rate: u32) -> Option<Arc<dyn SpeechBackend>> {
    None
}

fn try_spd(volume: f32, rate: u32) -> Option<Arc<dyn SpeechBackend>> {
    match SpdSpeech::system(volume, rate) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(e) => {
            eprintln!("racecall: speech-dispatcher unavailable ({e})");
            None
        }
    }
}

fn try_espeak(volume: f32, rate: u32) -> Option<Arc<dyn SpeechBackend>> {
    match EspeakSpeech::system(volume, rate) {
        Ok(engine) => Some(Arc::new(engine)),
        Err(e) => {
            eprintln!("racecall: espeak unavailable ({e})");
            None
        }
    }
}

/// Availability report for one engine tier.
pub struct EngineProbe {
    pub name: &'static str,
    pub available: bool,
    pub detail: String,
}

/// Probe every tier for the `engines` diagnostics command.
pub fn probe_engines() -> Vec<EngineProbe> {
    let mut probes = Vec::new();

    #[cfg(feature = "remote-tts")]
    probes.push(match RemoteSpeech::system(0.9, 150) {
        Ok(_) => EngineProbe {
            name: "remote",
            available: true,
            detail: "translate TTS + mpg123".to_string(),
        },
        Err(e) => EngineProbe {
            name: "remote",
            available: false,
            detail: e.to_string(),
        },
    });

    probes.push(match SpdSpeech::system(0.9, 150) {
        Ok(_) => EngineProbe {
            name: "speech-dispatcher",
            available: true,
            detail: "spd-say".to_string(),
        },
        Err(e) => EngineProbe {
            name: "speech-dispatcher",
            available: false,
            detail: e.to_string(),
        },
    });

    probes.push(match EspeakSpeech::system(0.9, 150) {
        Ok(_) => EngineProbe {
            name: "espeak",
            available: true,
            detail: "espeak".to_string(),
        },
        Err(e) => EngineProbe {
            name: "espeak",
            available: false,
            detail: e.to_string(),
        },
    });

    probes.push(EngineProbe {
        name: "log-only",
        available: true,
        detail: "always available".to_string(),
    });

    probes
}
