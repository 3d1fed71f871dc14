//! Shared live-updatable volume/rate settings for speech backends.
//!
//! Volume and rate arrive from dashboard callers while the voice worker
//! is mid-utterance, so they sit behind locks inside each backend.

use std::sync::RwLock;

/// Lowest accepted speaking rate in words per minute.
pub const MIN_RATE_WPM: u32 = 50;
/// Highest accepted speaking rate in words per minute.
pub const MAX_RATE_WPM: u32 = 300;

#[derive(Debug)]
pub struct SpeechSettings {
    volume: RwLock<f32>,
    rate: RwLock<u32>,
}

impl SpeechSettings {
    pub fn new(volume: f32, rate: u32) -> Self {
        Self {
            volume: RwLock::new(clamp_volume(volume)),
            rate: RwLock::new(clamp_rate(rate)),
        }
    }

    pub fn volume(&self) -> f32 {
        *self.volume.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn rate(&self) -> u32 {
        *self.rate.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_volume(&self, volume: f32) {
        *self.volume.write().unwrap_or_else(|e| e.into_inner()) = clamp_volume(volume);
    }

    pub fn set_rate(&self, rate: u32) {
        *self.rate.write().unwrap_or_else(|e| e.into_inner()) = clamp_rate(rate);
    }
}

fn clamp_volume(volume: f32) -> f32 {
    volume.clamp(0.0, 1.0)
}

fn clamp_rate(rate: u32) -> u32 {
    rate.clamp(MIN_RATE_WPM, MAX_RATE_WPM)
}
