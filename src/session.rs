use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Fixed countdown period. Time advances in these steps regardless of wall clock.
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// Ticks per second of countdown.
pub const TICKS_PER_SEC: u32 = 10;

/// Time granted by a revive, in seconds.
pub const REVIVE_BONUS_SECS: u32 = 5;

/// Supported session lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GameMode {
    Five,
    Ten,
    #[default]
    Fifteen,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameModeError {
    #[error("unsupported session length {0}s (expected 5, 10 or 15)")]
    Unsupported(u32),
    #[error("invalid session length {0:?}")]
    Invalid(String),
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [GameMode::Five, GameMode::Ten, GameMode::Fifteen];

    pub fn secs(self) -> u32 {
        match self {
            GameMode::Five => 5,
            GameMode::Ten => 10,
            GameMode::Fifteen => 15,
        }
    }

    pub fn next(self) -> Self {
        match self {
            GameMode::Five => GameMode::Ten,
            GameMode::Ten => GameMode::Fifteen,
            GameMode::Fifteen => GameMode::Five,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            GameMode::Five => GameMode::Fifteen,
            GameMode::Ten => GameMode::Five,
            GameMode::Fifteen => GameMode::Ten,
        }
    }
}

impl TryFrom<u32> for GameMode {
    type Error = GameModeError;

    fn try_from(secs: u32) -> Result<Self, Self::Error> {
        match secs {
            5 => Ok(GameMode::Five),
            10 => Ok(GameMode::Ten),
            15 => Ok(GameMode::Fifteen),
            other => Err(GameModeError::Unsupported(other)),
        }
    }
}

impl FromStr for GameMode {
    type Err = GameModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let secs = s
            .trim()
            .trim_end_matches('s')
            .parse::<u32>()
            .map_err(|_| GameModeError::Invalid(s.to_string()))?;
        GameMode::try_from(secs)
    }
}

impl fmt::Display for GameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.secs())
    }
}

/// Counters for one play-through.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub mode: GameMode,
    pub ticks_remaining: u32,
    pub tap_count: u32,
    pub started: bool,
    pub ended: bool,
    pub revived: bool,
}

impl Session {
    pub fn new(mode: GameMode) -> Self {
        Self {
            mode,
            ticks_remaining: mode.secs() * TICKS_PER_SEC,
            tap_count: 0,
            started: false,
            ended: false,
            revived: false,
        }
    }

    pub fn time_remaining(&self) -> f64 {
        self.ticks_remaining as f64 / TICKS_PER_SEC as f64
    }

    /// Whole seconds shown on the countdown.
    pub fn seconds_display(&self) -> u32 {
        self.ticks_remaining.div_ceil(TICKS_PER_SEC)
    }

    pub fn progress(&self) -> f64 {
        (self.time_remaining() / self.mode.secs() as f64).clamp(0.0, 1.0)
    }

    /// Steps the countdown once; returns true when it hits zero on this step.
    pub fn tick(&mut self) -> bool {
        if self.ticks_remaining == 0 {
            return false;
        }
        self.ticks_remaining -= 1;
        self.ticks_remaining == 0
    }

    pub fn grant_revive(&mut self) {
        self.ticks_remaining = REVIVE_BONUS_SECS * TICKS_PER_SEC;
        self.revived = true;
    }

    pub fn result(&self) -> GameResult {
        GameResult::new(self.tap_count, self.mode)
    }
}

/// Outcome of a finished session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameResult {
    pub tap_count: u32,
    /// taps per second over the configured duration, unrounded
    pub speed: f64,
    pub duration: GameMode,
}

impl GameResult {
    pub fn new(tap_count: u32, duration: GameMode) -> Self {
        Self {
            tap_count,
            speed: tap_count as f64 / duration.secs() as f64,
            duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_mode_conversions() {
        assert_eq!(GameMode::try_from(5), Ok(GameMode::Five));
        assert_eq!(GameMode::try_from(10), Ok(GameMode::Ten));
        assert_eq!(GameMode::try_from(15), Ok(GameMode::Fifteen));
        assert_matches!(GameMode::try_from(7), Err(GameModeError::Unsupported(7)));

        assert_eq!("10".parse::<GameMode>(), Ok(GameMode::Ten));
        assert_eq!("15s".parse::<GameMode>(), Ok(GameMode::Fifteen));
        assert_matches!("ten".parse::<GameMode>(), Err(GameModeError::Invalid(_)));
        assert_eq!(GameMode::Five.to_string(), "5");
    }

    #[test]
    fn test_mode_cycling() {
        for mode in GameMode::ALL {
            assert_eq!(mode.next().prev(), mode);
        }
        assert_eq!(GameMode::Fifteen.next(), GameMode::Five);
    }

    #[test]
    fn test_new_session() {
        let session = Session::new(GameMode::Ten);
        assert_eq!(session.ticks_remaining, 100);
        assert_eq!(session.time_remaining(), 10.0);
        assert_eq!(session.seconds_display(), 10);
        assert_eq!(session.progress(), 1.0);
        assert_eq!(session.tap_count, 0);
        assert!(!session.revived);
    }

    #[test]
    fn test_tick_clamps_at_zero() {
        let mut session = Session::new(GameMode::Five);
        let mut zero_hits = 0;
        for _ in 0..60 {
            if session.tick() {
                zero_hits += 1;
            }
        }
        assert_eq!(zero_hits, 1);
        assert_eq!(session.ticks_remaining, 0);
        assert_eq!(session.time_remaining(), 0.0);
        assert_eq!(session.progress(), 0.0);
    }

    #[test]
    fn test_seconds_display_rounds_up() {
        let mut session = Session::new(GameMode::Five);
        session.tick();
        assert_eq!(session.time_remaining(), 4.9);
        assert_eq!(session.seconds_display(), 5);
    }

    #[test]
    fn test_revive_sets_bonus() {
        let mut session = Session::new(GameMode::Ten);
        session.ticks_remaining = 0;
        session.grant_revive();
        assert_eq!(session.time_remaining(), 5.0);
        assert_eq!(session.progress(), 0.5);
        assert!(session.revived);
    }

    #[test]
    fn test_result_speed() {
        let result = GameResult::new(47, GameMode::Ten);
        assert_eq!(result.tap_count, 47);
        assert_eq!(result.speed, 4.7);
        assert_eq!(result.duration, GameMode::Ten);

        assert_eq!(GameResult::new(0, GameMode::Fifteen).speed, 0.0);
    }
}
