//! speech-dispatcher tier (`spd-say`).
//!
//! The local synthesis engine: speaks through whatever voice the desktop
//! speech-dispatcher daemon is configured with. Better Japanese output
//! than raw espeak when a decent voice module is installed.

use crate::error::Result;
use crate::speech::backend::SpeechBackend;
use crate::speech::executor::{CommandExecutor, SystemCommandExecutor};
use crate::speech::settings::{MAX_RATE_WPM, MIN_RATE_WPM, SpeechSettings};

pub struct SpdSpeech<E: CommandExecutor> {
    executor: E,
    settings: SpeechSettings,
}

impl<E: CommandExecutor> SpdSpeech<E> {
    /// Probe spd-say and build the backend.
    pub fn new(executor: E, volume: f32, rate: u32) -> Result<Self> {
        executor.execute("spd-say", &["--version"])?;
        Ok(Self {
            executor,
            settings: SpeechSettings::new(volume, rate),
        })
    }
}

impl SpdSpeech<SystemCommandExecutor> {
    pub fn system(volume: f32, rate: u32) -> Result<Self> {
        Self::new(SystemCommandExecutor::new(), volume, rate)
    }
}

/// Map a 0.0–1.0 volume onto spd-say's -100..100 scale.
fn spd_volume(volume: f32) -> i32 {
    ((volume * 200.0) - 100.0).round() as i32
}

/// Map words-per-minute onto spd-say's -100..100 rate scale.
///
/// The midpoint of the accepted WPM window maps to 0.
fn spd_rate(rate: u32) -> i32 {
    let mid = (MIN_RATE_WPM + MAX_RATE_WPM) as f32 / 2.0;
    let half_span = (MAX_RATE_WPM - MIN_RATE_WPM) as f32 / 2.0;
    (((rate as f32 - mid) / half_span) * 100.0).round() as i32
}

impl<E: CommandExecutor> SpeechBackend for SpdSpeech<E> {
    fn speak(&self, text: &str, language: &str) -> Result<()> {
        // -w waits for the utterance to finish, which is what keeps
        // announcements from overlapping.
        self.executor.execute(
            "spd-say",
            &[
                "-w",
                "-l",
                language,
                "-i",
                &spd_volume(self.settings.volume()).to_string(),
                "-r",
                &spd_rate(self.settings.rate()).to_string(),
                "--",
                text,
            ],
        )?;
        Ok(())
    }

    fn set_volume(&self, volume: f32) {
        self.settings.set_volume(volume);
    }

    fn set_rate(&self, rate: u32) {
        self.settings.set_rate(rate);
    }

    fn shutdown(&self) {}

    fn name(&self) -> &'static str {
        "speech-dispatcher"
    }
}
