use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AdUnit {
    Interstitial,
    Rewarded,
}

/// Lifecycle of one ad unit as seen by the session controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum_macros::Display)]
pub enum AdState {
    #[default]
    Unrequested,
    Loading,
    Ready,
    Shown,
    Failed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdEvent {
    Loaded,
    LoadFailed(String),
    /// The ad is on screen.
    Opened,
    Closed,
    ShowFailed(String),
    RewardEarned,
}

/// An asynchronous callback from the ad network.
#[derive(Debug, Clone, PartialEq)]
pub struct AdNotice {
    pub unit: AdUnit,
    pub event: AdEvent,
}

impl AdNotice {
    pub fn new(unit: AdUnit, event: AdEvent) -> Self {
        Self { unit, event }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdError {
    #[error("{0} ad is not loaded")]
    NotReady(AdUnit),
    #[error("another ad is already on screen")]
    AlreadyShowing,
    #[error("consent check failed: {0}")]
    Consent(String),
    #[error("ad network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsentInfo {
    pub can_request_ads: bool,
}

/// The advertisement collaborator. Results of `load` and `show` arrive later through `poll`.
pub trait AdProvider {
    fn request_consent(&mut self) -> Result<ConsentInfo, AdError>;
    fn load(&mut self, unit: AdUnit);
    /// Fails synchronously when the unit cannot be presented.
    fn show(&mut self, unit: AdUnit) -> Result<(), AdError>;
    /// Drains callbacks that became due after `elapsed` more time.
    fn poll(&mut self, elapsed: Duration) -> Vec<AdNotice>;
    /// Dismisses the ad currently on screen, if any.
    fn skip(&mut self) {}
    /// The unit on screen and how long until it closes on its own.
    fn showing(&self) -> Option<(AdUnit, Duration)> {
        None
    }
}

impl<P: AdProvider + ?Sized> AdProvider for Box<P> {
    fn request_consent(&mut self) -> Result<ConsentInfo, AdError> {
        (**self).request_consent()
    }

    fn load(&mut self, unit: AdUnit) {
        (**self).load(unit)
    }

    fn show(&mut self, unit: AdUnit) -> Result<(), AdError> {
        (**self).show(unit)
    }

    fn poll(&mut self, elapsed: Duration) -> Vec<AdNotice> {
        (**self).poll(elapsed)
    }

    fn skip(&mut self) {
        (**self).skip()
    }

    fn showing(&self) -> Option<(AdUnit, Duration)> {
        (**self).showing()
    }
}

/// Ad provider for tests: callbacks are queued by hand and every call is recorded.
#[derive(Debug)]
pub struct ScriptedAds {
    pub loads: Vec<AdUnit>,
    pub shows: Vec<AdUnit>,
    pub consent: Result<ConsentInfo, AdError>,
    failing_shows: HashSet<AdUnit>,
    queue: VecDeque<AdNotice>,
}

impl ScriptedAds {
    pub fn new() -> Self {
        Self {
            loads: Vec::new(),
            shows: Vec::new(),
            consent: Ok(ConsentInfo {
                can_request_ads: true,
            }),
            failing_shows: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    /// Makes `show(unit)` fail synchronously.
    pub fn fail_show(&mut self, unit: AdUnit) {
        self.failing_shows.insert(unit);
    }

    pub fn push(&mut self, unit: AdUnit, event: AdEvent) {
        self.queue.push_back(AdNotice::new(unit, event));
    }
}

impl Default for ScriptedAds {
    fn default() -> Self {
        Self::new()
    }
}

impl AdProvider for ScriptedAds {
    fn request_consent(&mut self) -> Result<ConsentInfo, AdError> {
        self.consent.clone()
    }

    fn load(&mut self, unit: AdUnit) {
        self.loads.push(unit);
    }

    fn show(&mut self, unit: AdUnit) -> Result<(), AdError> {
        self.shows.push(unit);
        if self.failing_shows.contains(&unit) {
            return Err(AdError::Network(format!("{unit} show rejected")));
        }
        Ok(())
    }

    fn poll(&mut self, _elapsed: Duration) -> Vec<AdNotice> {
        self.queue.drain(..).collect()
    }
}

/// Tuning for the built-in simulated ad network.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AdNetworkConfig {
    /// Fraction of load requests that are filled, 0.0..=1.0.
    pub fill_rate: f64,
    pub load_secs: f64,
    pub interstitial_secs: f64,
    pub rewarded_secs: f64,
    pub interstitial_unit_id: String,
    pub rewarded_unit_id: String,
}

impl Default for AdNetworkConfig {
    fn default() -> Self {
        Self {
            fill_rate: 0.9,
            load_secs: 1.5,
            interstitial_secs: 3.0,
            rewarded_secs: 4.0,
            // public AdMob sample units
            interstitial_unit_id: "ca-app-pub-3940256099942544/1033173712".to_string(),
            rewarded_unit_id: "ca-app-pub-3940256099942544/5224354917".to_string(),
        }
    }
}

impl AdNetworkConfig {
    /// Short load and display times, keeping fill rate and unit ids.
    pub fn quick(self) -> Self {
        Self {
            load_secs: 0.2,
            interstitial_secs: 1.0,
            rewarded_secs: 1.0,
            ..self
        }
    }
}

// NaN counts as never filling
fn fill_probability(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

// Negative and NaN become zero, values past the Duration range saturate.
fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Empty,
    Loading { remaining: Duration, fills: bool },
    Loaded,
    Used,
}

#[derive(Debug, Clone, Copy)]
struct OnScreen {
    unit: AdUnit,
    remaining: Duration,
}

/// Local stand-in for a mobile ad SDK: loads take time, some requests go unfilled
/// and a shown ad stays on screen until it runs out or is skipped.
#[derive(Debug)]
pub struct SimulatedAdNetwork<R: Rng = StdRng> {
    config: AdNetworkConfig,
    rng: R,
    interstitial: Slot,
    rewarded: Slot,
    on_screen: Option<OnScreen>,
    outbox: Vec<AdNotice>,
}

impl SimulatedAdNetwork<StdRng> {
    pub fn new(config: AdNetworkConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    pub fn with_seed(config: AdNetworkConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> SimulatedAdNetwork<R> {
    pub fn with_rng(config: AdNetworkConfig, rng: R) -> Self {
        Self {
            config,
            rng,
            interstitial: Slot::Empty,
            rewarded: Slot::Empty,
            on_screen: None,
            outbox: Vec::new(),
        }
    }

    fn slot_mut(&mut self, unit: AdUnit) -> &mut Slot {
        match unit {
            AdUnit::Interstitial => &mut self.interstitial,
            AdUnit::Rewarded => &mut self.rewarded,
        }
    }

    fn unit_id(&self, unit: AdUnit) -> &str {
        match unit {
            AdUnit::Interstitial => &self.config.interstitial_unit_id,
            AdUnit::Rewarded => &self.config.rewarded_unit_id,
        }
    }

    fn display_time(&self, unit: AdUnit) -> Duration {
        let secs = match unit {
            AdUnit::Interstitial => self.config.interstitial_secs,
            AdUnit::Rewarded => self.config.rewarded_secs,
        };
        secs_to_duration(secs)
    }

    fn advance_load(&mut self, unit: AdUnit, elapsed: Duration) {
        let slot = self.slot_mut(unit);
        if let Slot::Loading { remaining, fills } = *slot {
            let remaining = remaining.saturating_sub(elapsed);
            if !remaining.is_zero() {
                *slot = Slot::Loading { remaining, fills };
                return;
            }
            if fills {
                *slot = Slot::Loaded;
                self.outbox.push(AdNotice::new(unit, AdEvent::Loaded));
            } else {
                *slot = Slot::Empty;
                self.outbox
                    .push(AdNotice::new(unit, AdEvent::LoadFailed("no fill".into())));
            }
        }
    }

    fn close(&mut self, rewarded: bool) {
        if let Some(screen) = self.on_screen.take() {
            if rewarded && screen.unit == AdUnit::Rewarded {
                self.outbox
                    .push(AdNotice::new(screen.unit, AdEvent::RewardEarned));
            }
            self.outbox.push(AdNotice::new(screen.unit, AdEvent::Closed));
        }
    }
}

impl<R: Rng> AdProvider for SimulatedAdNetwork<R> {
    fn request_consent(&mut self) -> Result<ConsentInfo, AdError> {
        Ok(ConsentInfo {
            can_request_ads: true,
        })
    }

    fn load(&mut self, unit: AdUnit) {
        let fills = self.rng.gen_bool(fill_probability(self.config.fill_rate));
        let remaining = secs_to_duration(self.config.load_secs);
        debug!(%unit, id = self.unit_id(unit), fills, "ad load requested");
        *self.slot_mut(unit) = Slot::Loading { remaining, fills };
        if remaining.is_zero() {
            self.advance_load(unit, Duration::ZERO);
        }
    }

    fn show(&mut self, unit: AdUnit) -> Result<(), AdError> {
        if self.on_screen.is_some() {
            return Err(AdError::AlreadyShowing);
        }
        let slot = self.slot_mut(unit);
        if *slot != Slot::Loaded {
            return Err(AdError::NotReady(unit));
        }
        *slot = Slot::Used;
        info!(%unit, id = self.unit_id(unit), "showing ad");
        self.on_screen = Some(OnScreen {
            unit,
            remaining: self.display_time(unit),
        });
        self.outbox.push(AdNotice::new(unit, AdEvent::Opened));
        Ok(())
    }

    fn poll(&mut self, elapsed: Duration) -> Vec<AdNotice> {
        self.advance_load(AdUnit::Interstitial, elapsed);
        self.advance_load(AdUnit::Rewarded, elapsed);

        if let Some(screen) = self.on_screen.as_mut() {
            screen.remaining = screen.remaining.saturating_sub(elapsed);
            if screen.remaining.is_zero() {
                self.close(true);
            }
        }

        std::mem::take(&mut self.outbox)
    }

    fn skip(&mut self) {
        if self.on_screen.is_some() {
            debug!("ad skipped");
            self.close(false);
        }
    }

    fn showing(&self) -> Option<(AdUnit, Duration)> {
        self.on_screen.map(|s| (s.unit, s.remaining))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn always_fill() -> AdNetworkConfig {
        AdNetworkConfig {
            fill_rate: 1.0,
            load_secs: 0.5,
            interstitial_secs: 1.0,
            rewarded_secs: 1.0,
            ..AdNetworkConfig::default()
        }
    }

    fn poll_for(network: &mut SimulatedAdNetwork, ticks: u32) -> Vec<AdNotice> {
        let mut notices = Vec::new();
        for _ in 0..ticks {
            notices.extend(network.poll(Duration::from_millis(100)));
        }
        notices
    }

    #[test]
    fn test_load_completes_after_latency() {
        let mut network = SimulatedAdNetwork::with_seed(always_fill(), 7);
        network.load(AdUnit::Interstitial);

        assert!(poll_for(&mut network, 4).is_empty());
        assert_eq!(
            poll_for(&mut network, 1),
            vec![AdNotice::new(AdUnit::Interstitial, AdEvent::Loaded)]
        );
    }

    #[test]
    fn test_unfilled_load_fails() {
        let config = AdNetworkConfig {
            fill_rate: 0.0,
            ..always_fill()
        };
        let mut network = SimulatedAdNetwork::with_seed(config, 7);
        network.load(AdUnit::Rewarded);

        let notices = poll_for(&mut network, 5);
        assert_eq!(notices.len(), 1);
        assert_matches!(notices[0].event, AdEvent::LoadFailed(_));
        assert_matches!(
            network.show(AdUnit::Rewarded),
            Err(AdError::NotReady(AdUnit::Rewarded))
        );
    }

    #[test]
    fn test_show_requires_load() {
        let mut network = SimulatedAdNetwork::with_seed(always_fill(), 1);
        assert_matches!(
            network.show(AdUnit::Interstitial),
            Err(AdError::NotReady(AdUnit::Interstitial))
        );
    }

    #[test]
    fn test_rewarded_watched_to_end_earns_reward_before_close() {
        let mut network = SimulatedAdNetwork::with_seed(always_fill(), 3);
        network.load(AdUnit::Rewarded);
        poll_for(&mut network, 5);

        assert!(network.show(AdUnit::Rewarded).is_ok());
        assert_matches!(network.showing(), Some((AdUnit::Rewarded, _)));

        let notices = poll_for(&mut network, 10);
        assert_eq!(
            notices,
            vec![
                AdNotice::new(AdUnit::Rewarded, AdEvent::Opened),
                AdNotice::new(AdUnit::Rewarded, AdEvent::RewardEarned),
                AdNotice::new(AdUnit::Rewarded, AdEvent::Closed),
            ]
        );
        assert!(network.showing().is_none());
    }

    #[test]
    fn test_skipped_rewarded_closes_without_reward() {
        let mut network = SimulatedAdNetwork::with_seed(always_fill(), 3);
        network.load(AdUnit::Rewarded);
        poll_for(&mut network, 5);
        network.show(AdUnit::Rewarded).unwrap();

        network.skip();
        assert_eq!(
            network.poll(Duration::ZERO),
            vec![
                AdNotice::new(AdUnit::Rewarded, AdEvent::Opened),
                AdNotice::new(AdUnit::Rewarded, AdEvent::Closed),
            ]
        );
    }

    #[test]
    fn test_ad_cannot_be_shown_twice() {
        let mut network = SimulatedAdNetwork::with_seed(always_fill(), 3);
        network.load(AdUnit::Interstitial);
        network.load(AdUnit::Rewarded);
        poll_for(&mut network, 5);

        network.show(AdUnit::Interstitial).unwrap();
        assert_matches!(
            network.show(AdUnit::Rewarded),
            Err(AdError::AlreadyShowing)
        );
        network.skip();
        assert_matches!(
            network.show(AdUnit::Interstitial),
            Err(AdError::NotReady(AdUnit::Interstitial))
        );
    }

    #[test]
    fn test_nan_fill_rate_never_fills() {
        let config = AdNetworkConfig {
            fill_rate: f64::NAN,
            ..always_fill()
        };
        let mut network = SimulatedAdNetwork::with_seed(config, 1);
        network.load(AdUnit::Interstitial);

        let notices = poll_for(&mut network, 5);
        assert_eq!(notices.len(), 1);
        assert_matches!(notices[0].event, AdEvent::LoadFailed(_));
    }

    #[test]
    fn test_out_of_range_timings_saturate() {
        let config = AdNetworkConfig {
            load_secs: 1e30,
            interstitial_secs: f64::INFINITY,
            rewarded_secs: f64::NAN,
            ..always_fill()
        };
        let mut network = SimulatedAdNetwork::with_seed(config, 1);
        network.load(AdUnit::Interstitial);
        assert!(poll_for(&mut network, 50).is_empty());

        assert_eq!(secs_to_duration(1e30), Duration::MAX);
        assert_eq!(secs_to_duration(f64::INFINITY), Duration::MAX);
        assert_eq!(secs_to_duration(f64::NAN), Duration::ZERO);
        assert_eq!(secs_to_duration(-3.0), Duration::ZERO);
        assert_eq!(fill_probability(4.0), 1.0);
        assert_eq!(fill_probability(-1.0), 0.0);
    }

    #[test]
    fn test_scripted_ads_records_calls() {
        let mut ads = ScriptedAds::new();
        ads.fail_show(AdUnit::Interstitial);
        ads.load(AdUnit::Interstitial);
        ads.push(AdUnit::Interstitial, AdEvent::Loaded);

        assert!(ads.show(AdUnit::Interstitial).is_err());
        assert!(ads.show(AdUnit::Rewarded).is_ok());
        assert_eq!(ads.loads, vec![AdUnit::Interstitial]);
        assert_eq!(ads.shows, vec![AdUnit::Interstitial, AdUnit::Rewarded]);
        assert_eq!(ads.poll(Duration::ZERO).len(), 1);
        assert!(ads.poll(Duration::ZERO).is_empty());
    }

    #[test]
    fn test_unit_display() {
        assert_eq!(AdUnit::Interstitial.to_string(), "interstitial");
        assert_eq!(AdUnit::Rewarded.to_string(), "rewarded");
    }
}
