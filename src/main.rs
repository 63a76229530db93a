use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    sync::Mutex,
};
use tapr::{
    app::{App, Control},
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    runtime::{CrosstermEventSource, FixedTicker, Runner, TapEvent},
    session::{GameMode, TICK_PERIOD},
    store::{KeyValueStore, MemoryStore, SqliteStore, Storage},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// how fast can you tap? a terminal tap-speed test
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "Tap any key as fast as you can before the clock runs out. Optionally watch an ad for five extra seconds, then compare against your best."
)]
pub struct Cli {
    /// session length in seconds (5, 10 or 15); also saved as the default
    #[clap(short = 'm', long)]
    mode: Option<GameMode>,

    /// never request or show ads
    #[clap(long)]
    no_ads: bool,

    /// end sessions without offering a revive
    #[clap(long)]
    no_revive: bool,

    /// fraction of simulated ad requests that fill, 0.0 to 1.0
    #[clap(long, value_parser = parse_fill_rate)]
    fill_rate: Option<f64>,

    /// shorten simulated ad load and display times
    #[clap(short = 'q', long)]
    quick: bool,

    /// print the stored best speed and exit
    #[clap(long)]
    high_score: bool,
}

fn parse_fill_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !rate.is_finite() {
        return Err(format!("{s} is not a finite number"));
    }
    Ok(rate.clamp(0.0, 1.0))
}

impl Cli {
    /// Applies flags on top of the file configuration for this run only.
    fn apply(&self, mut config: Config) -> Config {
        if self.no_ads {
            config.ads_enabled = false;
        }
        if self.no_revive {
            config.offer_revive = false;
        }
        if let Some(rate) = self.fill_rate {
            config.ad_network.fill_rate = rate;
        }
        if self.quick {
            config.ad_network = config.ad_network.quick();
        }
        config
    }
}

fn init_logging() {
    let Some(path) = AppDirs::log_path() else {
        return;
    };
    if let Some(parent) = path.parent() {
        if fs::create_dir_all(parent).is_err() {
            return;
        }
    }
    let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) else {
        return;
    };

    let filter = EnvFilter::try_from_env("TAPR_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn open_storage() -> Storage<Box<dyn KeyValueStore>> {
    let kv: Box<dyn KeyValueStore> = match SqliteStore::new() {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(error = %e, "high scores will not persist this run");
            Box::new(MemoryStore::new())
        }
    };
    Storage::new(kv)
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging();

    let storage = open_storage();

    if cli.high_score {
        println!("{:.1}", storage.high_score());
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(mode) = cli.mode {
        storage.save_game_mode(mode);
    }
    let config = cli.apply(FileConfigStore::new().load());
    info!(?config, "starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, storage);
    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    outcome
}

fn start_tui<B: Backend, K: KeyValueStore>(
    terminal: &mut Terminal<B>,
    app: &mut App<K>,
) -> Result<(), Box<dyn Error>> {
    let mut runner = Runner::new(CrosstermEventSource::new(), FixedTicker::new(TICK_PERIOD));

    loop {
        let size = terminal.size()?;
        app.viewport = (size.width, size.height);
        terminal.draw(|f| f.render_widget(&*app, f.area()))?;

        match runner.step() {
            TapEvent::Tick => app.on_tick(),
            TapEvent::Resize => {}
            TapEvent::Key(key) => {
                if app.on_key(key) == Control::Quit {
                    break;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["tapr"]);

        assert_eq!(cli.mode, None);
        assert!(!cli.no_ads);
        assert!(!cli.no_revive);
        assert_eq!(cli.fill_rate, None);
        assert!(!cli.quick);
        assert!(!cli.high_score);
    }

    #[test]
    fn test_cli_mode() {
        let cli = Cli::parse_from(["tapr", "-m", "5"]);
        assert_eq!(cli.mode, Some(GameMode::Five));

        let cli = Cli::parse_from(["tapr", "--mode", "15s"]);
        assert_eq!(cli.mode, Some(GameMode::Fifteen));
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["tapr", "--mode", "7"]).is_err());
        assert!(Cli::try_parse_from(["tapr", "--mode", "ten"]).is_err());
    }

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["tapr", "--no-ads", "--no-revive", "--fill-rate", "1.7"]);
        let config = cli.apply(Config::default());

        assert!(!config.ads_enabled);
        assert!(!config.offer_revive);
        assert_eq!(config.ad_network.fill_rate, 1.0);
    }

    #[test]
    fn test_cli_rejects_non_finite_fill_rate() {
        for bad in ["NaN", "nan", "inf", "-inf", "lots"] {
            let arg = format!("--fill-rate={bad}");
            assert!(
                Cli::try_parse_from(["tapr", arg.as_str()]).is_err(),
                "{bad} accepted"
            );
        }
        let cli = Cli::parse_from(["tapr", "--fill-rate=-0.5"]);
        assert_eq!(cli.fill_rate, Some(0.0));
    }

    #[test]
    fn test_quick_shortens_ads() {
        let cli = Cli::parse_from(["tapr", "--quick", "--fill-rate", "0.5"]);
        let config = cli.apply(Config::default());

        assert_eq!(config.ad_network.load_secs, 0.2);
        assert_eq!(config.ad_network.interstitial_secs, 1.0);
        assert_eq!(config.ad_network.rewarded_secs, 1.0);
        assert_eq!(config.ad_network.fill_rate, 0.5);
    }

    #[test]
    fn test_no_flags_keep_file_config() {
        let mut file = Config::default();
        file.offer_revive = false;
        let config = Cli::parse_from(["tapr"]).apply(file.clone());
        assert_eq!(config, file);
    }

    #[test]
    fn test_draw_app_on_test_backend() {
        use ratatui::backend::TestBackend;

        let app = App::new(Config::default(), Storage::new(MemoryStore::new()));
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| f.render_widget(&app, f.area())).unwrap();

        let content: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(content.contains("How fast can you tap?"));
    }
}
