use crate::session::{GameMode, GameResult};
use std::collections::HashMap;
use std::sync::mpsc::Sender;
use tracing::warn;

/// Duration assumed when a route carries an unusable mode or duration.
pub const FALLBACK_MODE: GameMode = GameMode::Ten;

/// Results as they travel between screens: every field is a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultParams {
    pub tap_count: String,
    pub speed: String,
    pub duration: String,
}

impl From<&GameResult> for ResultParams {
    fn from(result: &GameResult) -> Self {
        Self {
            tap_count: result.tap_count.to_string(),
            speed: format!("{:.2}", result.speed),
            duration: result.duration.to_string(),
        }
    }
}

impl ResultParams {
    /// Re-reads the parameters on the receiving side, substituting defaults for garbage.
    pub fn parse(&self) -> GameResult {
        let tap_count = self.tap_count.trim().parse::<u32>().unwrap_or(0);
        let speed = self
            .speed
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|s| s.is_finite() && *s >= 0.0)
            .unwrap_or(0.0);
        let duration = parse_mode_or_fallback(&self.duration);

        GameResult {
            tap_count,
            speed,
            duration,
        }
    }
}

pub fn parse_mode_or_fallback(raw: &str) -> GameMode {
    raw.parse::<GameMode>().unwrap_or_else(|e| {
        warn!(raw, error = %e, "unusable mode parameter, falling back to {}s", FALLBACK_MODE);
        FALLBACK_MODE
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Game { mode: GameMode },
    Results(ResultParams),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("unknown route {0:?}")]
    UnknownPath(String),
}

impl Route {
    pub fn results(result: &GameResult) -> Self {
        Route::Results(ResultParams::from(result))
    }

    pub fn to_path(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::Game { mode } => format!("/game?mode={mode}"),
            Route::Results(p) => format!(
                "/results?tapCount={}&speed={}&duration={}",
                p.tap_count, p.speed, p.duration
            ),
        }
    }

    /// Parses a path produced by [`Route::to_path`]. Query values are kept as strings
    /// for results; the game mode falls back to the default length when malformed.
    pub fn from_path(path: &str) -> Result<Self, NavigationError> {
        let (base, query) = path.split_once('?').unwrap_or((path, ""));
        let params: HashMap<&str, &str> = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .collect();
        let param = |key: &str| params.get(key).copied().unwrap_or("").to_string();

        match base {
            "/" | "" => Ok(Route::Home),
            "/game" => Ok(Route::Game {
                mode: parse_mode_or_fallback(&param("mode")),
            }),
            "/results" => Ok(Route::Results(ResultParams {
                tap_count: param("tapCount"),
                speed: param("speed"),
                duration: param("duration"),
            })),
            other => Err(NavigationError::UnknownPath(other.to_string())),
        }
    }
}

/// The navigation boundary.
pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

impl Navigator for Vec<Route> {
    fn navigate(&mut self, route: Route) {
        self.push(route);
    }
}

/// Sends routes across as paths; the receiving side re-parses them.
impl Navigator for Sender<String> {
    fn navigate(&mut self, route: Route) {
        if self.send(route.to_path()).is_err() {
            warn!("route dropped: receiver gone");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_params_from_result() {
        let params = ResultParams::from(&GameResult::new(47, GameMode::Ten));
        assert_eq!(params.tap_count, "47");
        assert_eq!(params.speed, "4.70");
        assert_eq!(params.duration, "10");
    }

    #[test]
    fn test_params_parse_back() {
        let result = GameResult::new(47, GameMode::Ten);
        let parsed = ResultParams::from(&result).parse();
        assert_eq!(parsed, result);

        let parsed = ResultParams::from(&GameResult::new(22, GameMode::Fifteen)).parse();
        assert_eq!(parsed.speed, 1.47);
        assert_eq!(parsed.duration, GameMode::Fifteen);
    }

    #[test]
    fn test_params_parse_fallbacks() {
        let params = ResultParams {
            tap_count: "lots".into(),
            speed: "NaN".into(),
            duration: "7".into(),
        };
        let parsed = params.parse();
        assert_eq!(parsed.tap_count, 0);
        assert_eq!(parsed.speed, 0.0);
        assert_eq!(parsed.duration, FALLBACK_MODE);

        let empty = ResultParams {
            tap_count: String::new(),
            speed: String::new(),
            duration: String::new(),
        };
        assert_eq!(empty.parse(), GameResult::new(0, GameMode::Ten));
    }

    #[test]
    fn test_duration_round_trips_exactly() {
        for mode in GameMode::ALL {
            let route = Route::results(&GameResult::new(3, mode));
            let parsed = Route::from_path(&route.to_path()).unwrap();
            match parsed {
                Route::Results(p) => assert_eq!(p.parse().duration, mode),
                other => panic!("expected results route, got {other:?}"),
            }

            let game = Route::Game { mode };
            assert_eq!(Route::from_path(&game.to_path()), Ok(game));
        }
    }

    #[test]
    fn test_paths() {
        assert_eq!(Route::Home.to_path(), "/");
        assert_eq!(
            Route::Game {
                mode: GameMode::Five
            }
            .to_path(),
            "/game?mode=5"
        );
        assert_eq!(
            Route::results(&GameResult::new(47, GameMode::Ten)).to_path(),
            "/results?tapCount=47&speed=4.70&duration=10"
        );
    }

    #[test]
    fn test_malformed_paths() {
        assert_eq!(
            Route::from_path("/game?mode=abc"),
            Ok(Route::Game {
                mode: FALLBACK_MODE
            })
        );
        assert_eq!(
            Route::from_path("/game"),
            Ok(Route::Game {
                mode: FALLBACK_MODE
            })
        );
        assert_eq!(Route::from_path("/"), Ok(Route::Home));
        assert_matches!(
            Route::from_path("/settings"),
            Err(NavigationError::UnknownPath(_))
        );
    }

    #[test]
    fn test_sender_navigator() {
        let (mut tx, rx) = std::sync::mpsc::channel::<String>();
        let route = Route::results(&GameResult::new(47, GameMode::Ten));
        tx.navigate(route.clone());

        let path = rx.try_recv().unwrap();
        assert_eq!(path, "/results?tapCount=47&speed=4.70&duration=10");
        assert_eq!(Route::from_path(&path), Ok(route));

        drop(rx);
        tx.navigate(Route::Home);
    }
}
