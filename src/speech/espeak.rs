//! Command-line espeak tier.
//!
//! The last synthesizing tier in the fallback chain and the per-utterance
//! fallback when a higher tier fails mid-race. espeak's Japanese voice is
//! rough but it is installed nearly everywhere and never needs a network.

use crate::error::Result;
use crate::speech::backend::SpeechBackend;
use crate::speech::executor::{CommandExecutor, SystemCommandExecutor};
use crate::speech::settings::SpeechSettings;

pub struct EspeakSpeech<E: CommandExecutor> {
    executor: E,
    settings: SpeechSettings,
}

impl<E: CommandExecutor> EspeakSpeech<E> {
    /// Probe espeak and build the backend.
    ///
    /// Fails when the espeak binary is missing so the chain constructor
    /// can fall through to log-only mode.
    pub fn new(executor: E, volume: f32, rate: u32) -> Result<Self> {
        executor.execute("espeak", &["--version"])?;
        Ok(Self {
            executor,
            settings: SpeechSettings::new(volume, rate),
        })
    }
}

impl EspeakSpeech<SystemCommandExecutor> {
    pub fn system(volume: f32, rate: u32) -> Result<Self> {
        Self::new(SystemCommandExecutor::new(), volume, rate)
    }
}

impl<E: CommandExecutor> SpeechBackend for EspeakSpeech<E> {
    fn speak(&self, text: &str, language: &str) -> Result<()> {
        // -a amplitude is 0..200, -s is words per minute
        let amplitude = (self.settings.volume() * 200.0).round() as u32;
        self.executor.execute(
            "espeak",
            &[
                "-v",
                language,
                "-a",
                &amplitude.to_string(),
                "-s",
                &self.settings.rate().to_string(),
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
        "espeak"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RacecallError;
    use crate::speech::executor::testing::MockCommandExecutor;

    #[test]
    fn new_probes_espeak_version() {
        let mock = MockCommandExecutor::new().with_response("eSpeak NG 1.51");
        let speech = EspeakSpeech::new(mock, 0.9, 150).unwrap();

        let calls = speech.executor.calls();
        assert_eq!(calls[0].0, "espeak");
        assert_eq!(calls[0].1, vec!["--version"]);
    }

    #[test]
    fn new_fails_when_espeak_missing() {
        let mock = MockCommandExecutor::new().with_error(RacecallError::SpeechToolNotFound {
            tool: "espeak".to_string(),
        });
        assert!(EspeakSpeech::new(mock, 0.9, 150).is_err());
    }

    #[test]
    fn speak_passes_language_volume_and_rate() {
        let mock = MockCommandExecutor::new();
        let speech = EspeakSpeech::new(mock, 0.9, 150).unwrap();

        speech.speak("12.500秒", "ja").unwrap();

        let calls = speech.executor.calls();
        assert_eq!(
            calls[1].1,
            vec!["-v", "ja", "-a", "180", "-s", "150", "12.500秒"]
        );
    }

    #[test]
    fn volume_and_rate_are_live_updatable() {
        let mock = MockCommandExecutor::new();
        let speech = EspeakSpeech::new(mock, 0.9, 150).unwrap();

        speech.set_volume(0.5);
        speech.set_rate(200);
        speech.speak("テスト", "ja").unwrap();

        let calls = speech.executor.calls();
        assert_eq!(calls[1].1[3], "100");
        assert_eq!(calls[1].1[5], "200");
    }

    #[test]
    fn speak_propagates_synthesis_failure() {
        let mock = MockCommandExecutor::new()
            .with_response("probe ok")
            .with_error(RacecallError::SpeechSynthesis {
                engine: "espeak".to_string(),
                message: "exit 1".to_string(),
            });
        let speech = EspeakSpeech::new(mock, 0.9, 150).unwrap();
        assert!(speech.speak("x", "ja").is_err());
    }
}
