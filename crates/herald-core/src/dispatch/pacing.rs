//! Human-like send cadence

use async_trait::async_trait;
use herald_common::config::DispatchConfig;
use herald_storage::models::CampaignSettings;
use rand::Rng;
use std::sync::Mutex;
use std::time::Duration;

/// Why a worker is pausing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pause {
    /// Jittered delay ahead of every send
    BeforeSend,
    /// Extra rest after a pulse of successful sends
    PulseRest,
}

/// Suspends a worker between sends
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, kind: Pause, duration: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, _kind: Pause, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

/// Records requested pauses without sleeping
#[derive(Debug, Default)]
pub struct RecordingPacer {
    pauses: Mutex<Vec<(Pause, Duration)>>,
}

impl RecordingPacer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pause requested so far, in order
    pub fn pauses(&self) -> Vec<(Pause, Duration)> {
        match self.pauses.lock() {
            Ok(pauses) => pauses.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn pause(&self, kind: Pause, duration: Duration) {
        match self.pauses.lock() {
            Ok(mut pauses) => pauses.push((kind, duration)),
            Err(poisoned) => poisoned.into_inner().push((kind, duration)),
        }
    }
}

/// Jitter window for pulse rests, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseWindow {
    pub min_secs: u64,
    pub max_secs: u64,
}

impl PulseWindow {
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self { min_secs, max_secs }
    }

    /// A zero upper bound means "use the campaign's pause duration"
    pub fn is_disabled(&self) -> bool {
        self.max_secs == 0
    }
}

impl Default for PulseWindow {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for PulseWindow {
    fn from(config: &DispatchConfig) -> Self {
        Self::new(config.pulse_rest_min_secs, config.pulse_rest_max_secs)
    }
}

/// Delay and rest policy for one campaign run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cadence {
    delay_min: u64,
    delay_max: u64,
    /// `None` disables pulse rests
    pulse_every: Option<u64>,
    rest_min: u64,
    rest_max: u64,
}

impl Cadence {
    pub fn new(settings: &CampaignSettings, window: PulseWindow) -> Self {
        let delay_min = settings.delay_min.max(0) as u64;
        let delay_max = (settings.delay_max.max(0) as u64).max(delay_min);
        let pulse_every = (settings.pause_every_x_messages > 0)
            .then_some(settings.pause_every_x_messages as u64);

        let (rest_min, rest_max) = if window.is_disabled() {
            let fallback = settings.pause_duration_seconds.max(0) as u64;
            (fallback, fallback)
        } else {
            (window.min_secs.min(window.max_secs), window.max_secs)
        };

        Self {
            delay_min,
            delay_max,
            pulse_every,
            rest_min,
            rest_max,
        }
    }

    /// Uniform delay in `[delay_min, delay_max]`
    pub fn send_delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        uniform_secs(rng, self.delay_min, self.delay_max)
    }

    /// Whether `successes` closes a pulse
    pub fn rest_due(&self, successes: u64) -> bool {
        match self.pulse_every {
            Some(every) => successes > 0 && successes % every == 0,
            None => false,
        }
    }

    /// Uniform rest inside the pulse window
    pub fn rest<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        uniform_secs(rng, self.rest_min, self.rest_max)
    }
}

/// Continuous uniform draw over `[min, max]` seconds
fn uniform_secs<R: Rng + ?Sized>(rng: &mut R, min: u64, max: u64) -> Duration {
    if min >= max {
        return Duration::from_secs(max);
    }
    Duration::from_secs_f64(rng.random_range(min as f64..=max as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    fn settings(delay_min: i32, delay_max: i32, every: i32) -> CampaignSettings {
        CampaignSettings {
            delay_min,
            delay_max,
            pause_every_x_messages: every,
            ..CampaignSettings::defaults_for(Uuid::new_v4())
        }
    }

    #[test]
    fn test_delays_stay_in_bounds() {
        let cadence = Cadence::new(&settings(8, 12, 5), PulseWindow::new(2, 5));
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let delay = cadence.send_delay(&mut rng).as_secs();
            assert!((8..=12).contains(&delay));
            let rest = cadence.rest(&mut rng).as_secs();
            assert!((2..=5).contains(&rest));
        }
    }

    #[test]
    fn test_delays_are_not_whole_seconds() {
        let cadence = Cadence::new(&settings(8, 12, 5), PulseWindow::new(2, 5));
        let mut rng = StdRng::seed_from_u64(3);

        let delays: Vec<Duration> = (0..50).map(|_| cadence.send_delay(&mut rng)).collect();
        assert!(delays
            .iter()
            .all(|d| *d >= Duration::from_secs(8) && *d <= Duration::from_secs(12)));
        assert!(delays.iter().any(|d| d.subsec_nanos() != 0));

        let rests: Vec<Duration> = (0..50).map(|_| cadence.rest(&mut rng)).collect();
        assert!(rests.iter().any(|d| d.subsec_nanos() != 0));
    }

    #[test]
    fn test_zero_width_delay_is_exact() {
        let cadence = Cadence::new(&settings(0, 0, 0), PulseWindow::new(2, 5));
        let mut rng = StdRng::seed_from_u64(5);
        assert_eq!(cadence.send_delay(&mut rng), Duration::ZERO);
    }

    #[test]
    fn test_rest_due_on_multiples_only() {
        let cadence = Cadence::new(&settings(0, 0, 3), PulseWindow::new(2, 5));
        let due: Vec<u64> = (0..10).filter(|n| cadence.rest_due(*n)).collect();
        assert_eq!(due, vec![3, 6, 9]);
    }

    #[test]
    fn test_disabled_window_uses_pause_duration() {
        let campaign_settings = CampaignSettings {
            pause_duration_seconds: 30,
            ..settings(0, 0, 5)
        };
        let cadence = Cadence::new(&campaign_settings, PulseWindow::new(0, 0));
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(cadence.rest(&mut rng), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_recording_pacer_keeps_order() {
        let pacer = RecordingPacer::new();
        pacer.pause(Pause::BeforeSend, Duration::from_secs(1)).await;
        pacer.pause(Pause::PulseRest, Duration::from_secs(3)).await;

        assert_eq!(
            pacer.pauses(),
            vec![
                (Pause::BeforeSend, Duration::from_secs(1)),
                (Pause::PulseRest, Duration::from_secs(3)),
            ]
        );
    }
}
