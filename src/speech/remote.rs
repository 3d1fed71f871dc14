//! Networked TTS tier.
//!
//! Fetches synthesized speech from the translate TTS endpoint (the best
//! Japanese prosody of the available tiers), writes it to a scratch file
//! and plays it with mpg123, blocking until playback completes. Needs
//! both network and a player, so it probes the player up front and is
//! the first tier to fall away at a track with no connectivity.

use crate::error::{RacecallError, Result};
use crate::speech::backend::SpeechBackend;
use crate::speech::executor::{CommandExecutor, SystemCommandExecutor};
use crate::speech::settings::SpeechSettings;
use std::io::Write;
use std::time::Duration;

const TTS_ENDPOINT: &str = "https://translate.google.com/translate_tts";
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct RemoteSpeech<E: CommandExecutor> {
    executor: E,
    settings: SpeechSettings,
    endpoint: String,
}

impl<E: CommandExecutor> RemoteSpeech<E> {
    /// Probe the audio player and build the backend.
    pub fn new(executor: E, volume: f32, rate: u32) -> Result<Self> {
        Self::with_endpoint(executor, volume, rate, TTS_ENDPOINT)
    }

    pub fn with_endpoint(executor: E, volume: f32, rate: u32, endpoint: &str) -> Result<Self> {
        executor.execute("mpg123", &["--version"])?;
        Ok(Self {
            executor,
            settings: SpeechSettings::new(volume, rate),
            endpoint: endpoint.to_string(),
        })
    }

    /// Fetch synthesized audio for one utterance.
    ///
    /// Builds a throwaway single-thread runtime: speak() only ever runs
    /// on the voice worker thread (or inside spawn_blocking), never on a
    /// runtime of its own, so both block_on and the runtime drop are
    /// legal here. One utterance per lap makes the setup cost noise.
    fn fetch_audio(&self, text: &str, language: &str) -> Result<Vec<u8>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RacecallError::SpeechSynthesis {
                engine: "remote".to_string(),
                message: e.to_string(),
            })?;

        let endpoint = self.endpoint.clone();
        runtime.block_on(async move {
            let client = reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .map_err(|e| RacecallError::SpeechSynthesis {
                    engine: "remote".to_string(),
                    message: e.to_string(),
                })?;

            let response = client
                .get(&endpoint)
                .query(&[
                    ("ie", "UTF-8"),
                    ("client", "tw-ob"),
                    ("tl", language),
                    ("q", text),
                ])
                .send()
                .await
                .map_err(|e| RacecallError::SpeechSynthesis {
                    engine: "remote".to_string(),
                    message: e.to_string(),
                })?;

            if !response.status().is_success() {
                return Err(RacecallError::SpeechSynthesis {
                    engine: "remote".to_string(),
                    message: format!("TTS endpoint returned {}", response.status()),
                });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| RacecallError::SpeechSynthesis {
                    engine: "remote".to_string(),
                    message: e.to_string(),
                })?;
            Ok(bytes.to_vec())
        })
    }
}

impl RemoteSpeech<SystemCommandExecutor> {
    pub fn system(volume: f32, rate: u32) -> Result<Self> {
        Self::new(SystemCommandExecutor::new(), volume, rate)
    }
}

/// mpg123 -f scale factor for a 0.0–1.0 volume.
fn mpg123_scale(volume: f32) -> u32 {
    (volume.clamp(0.0, 1.0) * 32768.0).round() as u32
}

impl<E: CommandExecutor> SpeechBackend for RemoteSpeech<E> {
    fn speak(&self, text: &str, language: &str) -> Result<()> {
        let audio = self.fetch_audio(text, language)?;

        let mut scratch = tempfile::Builder::new()
            .prefix("racecall-tts-")
            .suffix(".mp3")
            .tempfile()?;
        scratch.write_all(&audio)?;
        scratch.flush()?;

        let path = scratch.path().to_string_lossy().to_string();
        let scale = mpg123_scale(self.settings.volume()).to_string();
        // mpg123 blocks until playback finishes; the scratch file is
        // removed when `scratch` drops.
        self.executor
            .execute("mpg123", &["-q", "-f", &scale, &path])?;
        Ok(())
    }

    fn set_volume(&self, volume: f32) {
        self.settings.set_volume(volume);
    }

    fn set_rate(&self, rate: u32) {
        // The remote endpoint has fixed prosody; the value is kept so a
        // later fallback to a local tier starts from the caller's choice.
        self.settings.set_rate(rate);
    }

    fn shutdown(&self) {}

    fn name(&self) -> &'static str {
        "remote"
    }
}
