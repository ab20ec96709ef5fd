use clap::Parser;
use color_eyre::Result;
use gifscroll::app::App;
use gifscroll::config::Config;
use gifscroll::types::Action;
use gifscroll::utils::{get_config_dir, initialize_panic_handler};
use std::path::PathBuf;
use std::{env, fs};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
/// Browse, search and hide GIFs from the terminal.
struct Args {
    /// Search query to start with. Shows the trending feed if omitted.
    query: Option<String>,
    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Giphy API key. Falls back to the config file and `GIPHY_API_KEY`.
    #[arg(long)]
    api_key: Option<String>,
    /// Never touch the network; only the hidden items are shown.
    #[arg(long)]
    offline: bool,
    /// Start with the hidden items.
    #[arg(short, long)]
    blocked: bool,
    /// Number of grid columns.
    #[arg(short = 'n', long)]
    columns: Option<usize>,
}

impl Args {
    fn config_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.config {
            Ok(path.clone())
        } else {
            Self::default_config_path()
        }
    }
    fn default_config_path() -> Result<PathBuf> {
        let config_dir = get_config_dir()?;
        fs::create_dir_all(&config_dir)?;
        Ok(config_dir.join("gifscroll.toml"))
    }
    fn initial_action(&self) -> Action {
        match &self.query {
            _ if self.blocked => Action::ShowBlocked,
            Some(query) => Action::Search(query.clone()),
            None => Action::Open,
        }
    }
}

fn init_logger() {
    let mut builder = env_logger::Builder::from_default_env();
    if env::var("RUST_LOG").is_err() {
        builder.filter_level(log::LevelFilter::Off);
    }
    builder.init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut config = if args.config_path()?.exists() {
        toml::from_str(&fs::read_to_string(args.config_path()?)?)?
    } else {
        Config::default()
    };
    if let Some(api_key) = args.api_key.clone().or_else(|| env::var("GIPHY_API_KEY").ok()) {
        config.api_key = Some(api_key);
    }
    if let Some(columns) = args.columns {
        config.layout.columns = columns;
    }
    config.offline |= args.offline;

    init_logger();

    initialize_panic_handler()?;

    App::new(config).run(args.initial_action()).await
}
