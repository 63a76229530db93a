use crate::navigation::{ResultParams, Route};
use crate::session::GameResult;
use crate::store::{KeyValueStore, Storage};

/// What the results screen shows for one finished session.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsView {
    pub result: GameResult,
    pub high_score: f64,
    pub is_new_high_score: bool,
}

impl ResultsView {
    /// Reads the incoming parameters and records a new best if this run beat it.
    pub fn open<K: KeyValueStore>(params: &ResultParams, storage: &Storage<K>) -> Self {
        let result = params.parse();
        let is_new_high_score = storage.update_high_score(result.speed);
        Self {
            result,
            high_score: storage.high_score(),
            is_new_high_score,
        }
    }

    pub fn motivational_message(&self) -> &'static str {
        let speed = self.result.speed;
        if self.is_new_high_score {
            "New record! Amazing! 🎉"
        } else if speed >= 8.0 {
            "Lightning fingers! ⚡"
        } else if speed >= 6.0 {
            "You're a tapping pro! 👏"
        } else if speed >= 4.0 {
            "Great job! Keep it up! 💪"
        } else if speed >= 2.0 {
            "Not bad! Keep practicing! 👍"
        } else {
            "Keep practicing! 💪"
        }
    }

    pub fn play_again(&self) -> Route {
        Route::Game {
            mode: self.result.duration,
        }
    }

    pub fn home(&self) -> Route {
        Route::Home
    }
}
