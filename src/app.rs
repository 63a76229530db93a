use crate::ads::{AdProvider, SimulatedAdNetwork};
use crate::celebration::Celebration;
use crate::config::Config;
use crate::controller::{ControllerOptions, GameController, Phase};
use crate::navigation::Route;
use crate::results::ResultsView;
use crate::session::{GameMode, TICK_PERIOD};
use crate::store::{KeyValueStore, Storage};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::mpsc::{self, Receiver, Sender};
use tracing::{info, warn};

pub type Controller = GameController<Box<dyn AdProvider>, Sender<String>>;

/// Builds the ad provider for each new session.
pub type AdFactory = fn(&Config) -> Box<dyn AdProvider>;

fn simulated_ads(config: &Config) -> Box<dyn AdProvider> {
    Box::new(SimulatedAdNetwork::new(config.ad_network.clone()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AppState {
    Home,
    Game,
    Results,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

pub struct App<K: KeyValueStore> {
    pub state: AppState,
    pub config: Config,
    pub storage: Storage<K>,
    /// mode selected on the home screen
    pub mode: GameMode,
    pub high_score: f64,
    pub game: Option<Controller>,
    pub results: Option<ResultsView>,
    pub celebration: Celebration,
    pub viewport: (u16, u16),
    ad_factory: AdFactory,
    route_tx: Sender<String>,
    route_rx: Receiver<String>,
}

impl<K: KeyValueStore> App<K> {
    pub fn new(config: Config, storage: Storage<K>) -> Self {
        let (route_tx, route_rx) = mpsc::channel();
        Self {
            state: AppState::Home,
            mode: storage.game_mode(),
            high_score: storage.high_score(),
            config,
            storage,
            game: None,
            results: None,
            celebration: Celebration::new(),
            viewport: (80, 24),
            ad_factory: simulated_ads,
            route_tx,
            route_rx,
        }
    }

    pub fn with_ad_factory(mut self, ad_factory: AdFactory) -> Self {
        self.ad_factory = ad_factory;
        self
    }

    pub fn select_mode(&mut self, mode: GameMode) {
        if self.mode != mode {
            self.mode = mode;
            self.storage.save_game_mode(mode);
        }
    }

    /// Switches screens. The outgoing game session is torn down first.
    pub fn navigate(&mut self, route: Route) {
        if let Some(mut game) = self.game.take() {
            game.teardown();
        }
        info!(path = %route.to_path(), "navigate");

        match route {
            Route::Home => {
                self.results = None;
                self.celebration.stop();
                self.mode = self.storage.game_mode();
                self.high_score = self.storage.high_score();
                self.state = AppState::Home;
            }
            Route::Game { mode } => {
                self.results = None;
                self.celebration.stop();
                let ads = (self.ad_factory)(&self.config);
                let mut game = GameController::new(
                    ads,
                    self.route_tx.clone(),
                    ControllerOptions::from(&self.config),
                );
                if let Err(e) = game.start(mode) {
                    warn!(error = %e, "could not start session");
                }
                self.game = Some(game);
                self.state = AppState::Game;
            }
            Route::Results(params) => {
                let view = ResultsView::open(&params, &self.storage);
                if view.is_new_high_score {
                    self.celebration.start(self.viewport.0, self.viewport.1);
                }
                self.high_score = view.high_score;
                self.results = Some(view);
                self.state = AppState::Results;
            }
        }
    }

    fn pump_routes(&mut self) {
        while let Ok(path) = self.route_rx.try_recv() {
            match Route::from_path(&path) {
                Ok(route) => self.navigate(route),
                Err(e) => warn!(error = %e, "dropping route"),
            }
        }
    }

    pub fn on_tick(&mut self) {
        if let Some(game) = self.game.as_mut() {
            game.step();
        }
        self.pump_routes();
        self.celebration.update(TICK_PERIOD.as_secs_f64());
    }

    pub fn on_key(&mut self, key: KeyEvent) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }

        let control = match self.state {
            AppState::Home => self.on_home_key(key),
            AppState::Game => self.on_game_key(key),
            AppState::Results => self.on_results_key(key),
        };
        self.pump_routes();
        control
    }

    fn on_home_key(&mut self, key: KeyEvent) -> Control {
        match key.code {
            KeyCode::Left | KeyCode::Char('h') => self.select_mode(self.mode.prev()),
            KeyCode::Right | KeyCode::Char('l') => self.select_mode(self.mode.next()),
            KeyCode::Char('1') => self.select_mode(GameMode::Five),
            KeyCode::Char('2') => self.select_mode(GameMode::Ten),
            KeyCode::Char('3') => self.select_mode(GameMode::Fifteen),
            KeyCode::Enter | KeyCode::Char(' ') => self.navigate(Route::Game { mode: self.mode }),
            KeyCode::Esc | KeyCode::Char('q') => return Control::Quit,
            _ => {}
        }
        Control::Continue
    }

    fn on_game_key(&mut self, key: KeyEvent) -> Control {
        let Some(game) = self.game.as_mut() else {
            return Control::Continue;
        };

        if game.ads().showing().is_some() {
            if matches!(key.code, KeyCode::Esc | KeyCode::Char('s')) {
                game.ads_mut().skip();
            }
            return Control::Continue;
        }

        match game.phase() {
            Phase::Running => match key.code {
                KeyCode::Esc => self.navigate(Route::Home),
                KeyCode::Char(_) | KeyCode::Enter => {
                    game.record_tap();
                }
                _ => {}
            },
            Phase::AwaitingRevive => {
                let outcome = match key.code {
                    KeyCode::Char('w') | KeyCode::Char('y') | KeyCode::Enter => {
                        game.request_revive().map(|_| ())
                    }
                    KeyCode::Char('n') | KeyCode::Char('g') | KeyCode::Esc => {
                        game.decline_revive()
                    }
                    _ => Ok(()),
                };
                if let Err(e) = outcome {
                    warn!(error = %e, "revive input ignored");
                }
            }
            Phase::Idle | Phase::PresentingAd | Phase::Done => {}
        }
        Control::Continue
    }

    fn on_results_key(&mut self, key: KeyEvent) -> Control {
        let Some(view) = self.results.as_ref() else {
            return Control::Continue;
        };
        match key.code {
            KeyCode::Char('r') | KeyCode::Enter => {
                let route = view.play_again();
                self.navigate(route);
            }
            KeyCode::Char('h') => {
                let route = view.home();
                self.navigate(route);
            }
            KeyCode::Esc | KeyCode::Char('q') => return Control::Quit,
            _ => {}
        }
        Control::Continue
    }
}
