//! The speech backend capability contract and the degraded/test
//! implementations.

use crate::error::{RacecallError, Result};
use std::sync::Mutex;

/// Capability interface every TTS tier implements.
///
/// `speak` is synchronous and blocks until playback completes; the voice
/// dispatcher relies on this to serialize announcements. Volume and rate
/// updates may arrive from other threads mid-utterance.
pub trait SpeechBackend: Send + Sync {
    /// Render and play `text`; `language` is a synthesis hint ("ja").
    fn speak(&self, text: &str, language: &str) -> Result<()>;

    /// Set playback volume, 0.0 to 1.0.
    fn set_volume(&self, volume: f32);

    /// Set speaking rate in words per minute.
    fn set_rate(&self, rate: u32);

    /// Release engine resources. Safe to call more than once.
    fn shutdown(&self);

    /// Engine name for diagnostics.
    fn name(&self) -> &'static str;
}

/// Log-only degraded mode: the terminal tier of the fallback chain.
///
/// Never fails; announcements are printed instead of spoken so a missing
/// sound stack can never take the timing pipeline down with it.
#[derive(Debug, Default)]
pub struct NullSpeech;

impl NullSpeech {
    pub fn new() -> Self {
        Self
    }
}

impl SpeechBackend for NullSpeech {
    fn speak(&self, text: &str, _language: &str) -> Result<()> {
        eprintln!("racecall: (voice unavailable) {text}");
        Ok(())
    }

    fn set_volume(&self, _volume: f32) {}

    fn set_rate(&self, _rate: u32) {}

    fn shutdown(&self) {}

    fn name(&self) -> &'static str {
        "log-only"
    }
}

/// Mock backend for testing: records utterances, optionally fails.
#[derive(Debug, Default)]
pub struct MockSpeech {
    spoken: Mutex<Vec<(String, String)>>,
    fail: Mutex<bool>,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `speak` fail.
    pub fn with_failure(self) -> Self {
        *self.fail.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self
    }

    /// All `(text, language)` pairs spoken so far.
    pub fn spoken(&self) -> Vec<(String, String)> {
        self.spoken.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Just the texts, for terser assertions.
    pub fn texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }
}

impl SpeechBackend for MockSpeech {
    fn speak(&self, text: &str, language: &str) -> Result<()> {
        if *self.fail.lock().unwrap_or_else(|e| e.into_inner()) {
            return Err(RacecallError::SpeechSynthesis {
                engine: "mock".to_string(),
                message: "mock synthesis failure".to_string(),
            });
        }
        self.spoken
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((text.to_string(), language.to_string()));
        Ok(())
    }

    fn set_volume(&self, _volume: f32) {}

    fn set_rate(&self, _rate: u32) {}

    fn shutdown(&self) {}

    fn name(&self) -> &'static str {
        "mock"
    }
}
