//! Game session controller.
//!
//! Owns the countdown, the tap counter, the one-time revive and the hand-off to the
//! results screen. Ad callbacks and timer expiry are fed in as events; nothing here
//! blocks, and every input after navigation or teardown is ignored.

use crate::ads::{AdEvent, AdNotice, AdProvider, AdState, AdUnit};
use crate::navigation::{Navigator, Route};
use crate::session::{GameMode, GameResult, Session, TICK_PERIOD};
use crate::timers::{FallbackTimers, TimerKind, END_FALLBACK, SHOW_FALLBACK};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum Phase {
    Idle,
    Running,
    AwaitingRevive,
    PresentingAd,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ControllerError {
    #[error("cannot {action} while {phase}")]
    InvalidPhase { action: &'static str, phase: Phase },
    #[error("session controller was torn down")]
    TornDown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviveAttempt {
    /// The rewarded ad is on screen; the outcome arrives with its callbacks.
    Showing,
    /// No rewarded ad could be shown and the session ended instead.
    Unavailable,
}

#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub ads_enabled: bool,
    pub offer_revive: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            ads_enabled: true,
            offer_revive: true,
        }
    }
}

/// Listener for the rewarded ad shown during a revive.
#[derive(Debug, Clone, Copy, Default)]
struct ReviveWatch {
    earned: bool,
    closed: bool,
}

/// Active callback subscriptions. Dropping one detaches it.
#[derive(Debug, Default)]
struct Subscriptions {
    interstitial_close: bool,
    revive: Option<ReviveWatch>,
}

impl Subscriptions {
    fn clear(&mut self) {
        self.interstitial_close = false;
        self.revive = None;
    }
}

pub struct GameController<A: AdProvider, N: Navigator> {
    session: Session,
    phase: Phase,
    result: Option<GameResult>,
    options: ControllerOptions,
    ads: A,
    navigator: N,
    interstitial: AdState,
    rewarded: AdState,
    subscriptions: Subscriptions,
    timers: FallbackTimers,
    navigated: bool,
    torn_down: bool,
}

impl<A: AdProvider, N: Navigator> GameController<A, N> {
    pub fn new(ads: A, navigator: N, options: ControllerOptions) -> Self {
        Self {
            session: Session::new(GameMode::default()),
            phase: Phase::Idle,
            result: None,
            options,
            ads,
            navigator,
            interstitial: AdState::Unrequested,
            rewarded: AdState::Unrequested,
            subscriptions: Subscriptions::default(),
            timers: FallbackTimers::new(),
            navigated: false,
            torn_down: false,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn result(&self) -> Option<&GameResult> {
        self.result.as_ref()
    }

    pub fn ad_state(&self, unit: AdUnit) -> AdState {
        match unit {
            AdUnit::Interstitial => self.interstitial,
            AdUnit::Rewarded => self.rewarded,
        }
    }

    pub fn has_navigated(&self) -> bool {
        self.navigated
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// True while the rewarded ad for a revive is on screen.
    pub fn is_watching_revive(&self) -> bool {
        self.subscriptions.revive.is_some()
    }

    pub fn ads(&self) -> &A {
        &self.ads
    }

    pub fn ads_mut(&mut self) -> &mut A {
        &mut self.ads
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    /// Begins a session of `mode` and starts preloading both ad units.
    pub fn start(&mut self, mode: GameMode) -> Result<(), ControllerError> {
        self.ensure_live()?;
        if self.phase != Phase::Idle {
            return Err(ControllerError::InvalidPhase {
                action: "start",
                phase: self.phase,
            });
        }

        self.session = Session::new(mode);
        self.session.started = true;
        self.result = None;
        self.phase = Phase::Running;
        info!(secs = mode.secs(), "session started");

        self.preload_ads();
        Ok(())
    }

    fn preload_ads(&mut self) {
        if !self.options.ads_enabled {
            debug!("ads disabled, skipping preload");
            return;
        }

        match self.ads.request_consent() {
            Ok(info) if !info.can_request_ads => {
                info!("ad consent not granted, skipping preload");
                return;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "consent check failed, loading ads anyway"),
        }

        for unit in [AdUnit::Interstitial, AdUnit::Rewarded] {
            if self.ad_state(unit) == AdState::Unrequested {
                self.set_ad_state(unit, AdState::Loading);
                self.ads.load(unit);
            }
        }
    }

    fn set_ad_state(&mut self, unit: AdUnit, state: AdState) {
        match unit {
            AdUnit::Interstitial => self.interstitial = state,
            AdUnit::Rewarded => self.rewarded = state,
        }
    }

    /// One step of the runtime clock: countdown, ad callbacks, fallback deadlines.
    pub fn step(&mut self) {
        if self.torn_down {
            return;
        }

        self.tick();
        self.settle_revive();

        for notice in self.ads.poll(TICK_PERIOD) {
            self.handle_ad_event(notice);
        }

        for kind in self.timers.advance(TICK_PERIOD) {
            self.on_fallback(kind);
        }
    }

    /// Decrements the countdown by one fixed period. Only acts while running.
    pub fn tick(&mut self) {
        if self.torn_down || self.phase != Phase::Running {
            return;
        }
        if !self.session.tick() {
            return;
        }

        if self.session.revived || !self.options.offer_revive {
            info!("time's up");
            self.end();
        } else {
            info!("time's up, offering revive");
            self.phase = Phase::AwaitingRevive;
        }
    }

    /// Counts a tap. Returns false when the tap was dropped.
    pub fn record_tap(&mut self) -> bool {
        if self.torn_down || self.phase != Phase::Running {
            return false;
        }
        self.session.tap_count += 1;
        true
    }

    pub fn request_revive(&mut self) -> Result<ReviveAttempt, ControllerError> {
        self.ensure_live()?;
        if self.phase != Phase::AwaitingRevive || self.subscriptions.revive.is_some() {
            return Err(ControllerError::InvalidPhase {
                action: "revive",
                phase: self.phase,
            });
        }

        if self.rewarded != AdState::Ready {
            info!(state = %self.rewarded, "rewarded ad not ready, skipping revive");
            self.end();
            return Ok(ReviveAttempt::Unavailable);
        }

        match self.ads.show(AdUnit::Rewarded) {
            Ok(()) => {
                self.rewarded = AdState::Shown;
                self.subscriptions.revive = Some(ReviveWatch::default());
                Ok(ReviveAttempt::Showing)
            }
            Err(e) => {
                warn!(error = %e, "rewarded ad failed to show");
                self.rewarded = AdState::Failed;
                self.end();
                Ok(ReviveAttempt::Unavailable)
            }
        }
    }

    pub fn decline_revive(&mut self) -> Result<(), ControllerError> {
        self.ensure_live()?;
        if self.phase != Phase::AwaitingRevive {
            return Err(ControllerError::InvalidPhase {
                action: "decline revive",
                phase: self.phase,
            });
        }
        info!("revive declined");
        self.subscriptions.revive = None;
        self.end();
        Ok(())
    }

    /// Finishes the session once; later calls do nothing.
    pub fn end(&mut self) {
        if self.torn_down || self.session.ended {
            return;
        }
        self.session.ended = true;
        self.subscriptions.revive = None;

        let result = self.session.result();
        info!(
            taps = result.tap_count,
            speed = result.speed,
            secs = result.duration.secs(),
            "session ended"
        );
        self.result = Some(result);
        self.phase = Phase::PresentingAd;

        self.timers.arm(TimerKind::EndFallback, END_FALLBACK);
        self.show_interstitial();
    }

    fn show_interstitial(&mut self) {
        if self.interstitial != AdState::Ready {
            debug!(state = %self.interstitial, "no interstitial to show");
            self.navigate_to_results();
            return;
        }

        match self.ads.show(AdUnit::Interstitial) {
            Ok(()) => {
                self.interstitial = AdState::Shown;
                self.subscriptions.interstitial_close = true;
                // until the ad reports it is on screen
                self.timers.arm(TimerKind::ShowFallback, SHOW_FALLBACK);
            }
            Err(e) => {
                warn!(error = %e, "interstitial failed to show");
                self.interstitial = AdState::Failed;
                self.navigate_to_results();
            }
        }
    }

    /// Feeds one ad callback into the state machine.
    pub fn handle_ad_event(&mut self, notice: AdNotice) {
        if self.torn_down || self.navigated {
            debug!(unit = %notice.unit, event = ?notice.event, "ignoring stale ad event");
            return;
        }

        let AdNotice { unit, event } = notice;
        match event {
            AdEvent::Loaded => {
                if self.ad_state(unit) == AdState::Loading {
                    debug!(%unit, "ad loaded");
                    self.set_ad_state(unit, AdState::Ready);
                }
            }
            AdEvent::LoadFailed(reason) => {
                warn!(%unit, reason = %reason, "ad failed to load");
                if self.ad_state(unit) == AdState::Loading {
                    self.set_ad_state(unit, AdState::Failed);
                }
            }
            AdEvent::Opened => {
                if unit == AdUnit::Interstitial && self.subscriptions.interstitial_close {
                    debug!("interstitial on screen, waiting for close");
                    self.timers.cancel(TimerKind::ShowFallback);
                }
            }
            AdEvent::RewardEarned => {
                if let Some(watch) = self.subscriptions.revive.as_mut() {
                    watch.earned = true;
                }
            }
            AdEvent::Closed => match unit {
                AdUnit::Interstitial if self.subscriptions.interstitial_close => {
                    info!("interstitial closed");
                    self.navigate_to_results();
                }
                AdUnit::Rewarded => {
                    if let Some(watch) = self.subscriptions.revive.as_mut() {
                        watch.closed = true;
                    }
                }
                _ => {}
            },
            AdEvent::ShowFailed(reason) => {
                warn!(%unit, reason = %reason, "ad failed while on screen");
                self.set_ad_state(unit, AdState::Failed);
                match unit {
                    AdUnit::Interstitial if self.subscriptions.interstitial_close => {
                        self.navigate_to_results();
                    }
                    AdUnit::Rewarded if self.subscriptions.revive.is_some() => {
                        self.subscriptions.revive = None;
                        self.end();
                    }
                    _ => {}
                }
            }
        }
    }

    // A closed rewarded ad is settled one tick later so a trailing reward still counts.
    fn settle_revive(&mut self) {
        let Some(watch) = self.subscriptions.revive else {
            return;
        };
        if !watch.closed {
            return;
        }
        self.subscriptions.revive = None;

        if watch.earned {
            info!("reward confirmed, extending session");
            self.session.grant_revive();
            self.phase = Phase::Running;
        } else {
            info!("rewarded ad closed without reward");
            self.end();
        }
    }

    fn on_fallback(&mut self, kind: TimerKind) {
        if self.navigated {
            return;
        }
        warn!(%kind, "ad callbacks did not arrive in time, forcing navigation");
        self.navigate_to_results();
    }

    fn navigate_to_results(&mut self) {
        if self.navigated {
            return;
        }
        let Some(result) = self.result else {
            warn!("no result to navigate with");
            return;
        };

        self.navigated = true;
        self.timers.cancel_all();
        self.subscriptions.clear();
        self.phase = Phase::Done;

        info!(
            taps = result.tap_count,
            speed = %format!("{:.2}", result.speed),
            "navigating to results"
        );
        self.navigator.navigate(Route::results(&result));
    }

    /// Detaches from timers and ad callbacks. The controller is inert afterwards.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        debug!(phase = %self.phase, "session torn down");
        self.torn_down = true;
        self.timers.cancel_all();
        self.subscriptions.clear();
    }

    fn ensure_live(&self) -> Result<(), ControllerError> {
        if self.torn_down {
            Err(ControllerError::TornDown)
        } else {
            Ok(())
        }
    }
}
