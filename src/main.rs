use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use virtualgpt_core::{ClientVariant, Config, HttpBackend};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "virtualgpt")]
#[command(version, about = "Terminal client for the VirtualGPT chat assistant")]
struct Cli {
    /// Chat without an account; nothing is saved on the server
    #[arg(short, long)]
    guest: bool,

    /// Server address, overriding the configured one
    #[arg(short, long)]
    url: Option<String>,

    /// Read settings from this file instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the default config file path and exit
    #[arg(long)]
    config_path: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.config_path {
        println!("{}", Config::get_config_path()?.display());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = Config::load_from(path)
                .with_context(|| format!("reading config from {}", path.display()))?;
            config.apply_env();
            config
        }
        None => Config::load()?,
    };
    if let Some(url) = cli.url {
        config.base_url = url;
    }

    let log_path = logging::init(&config)?;

    let variant = if cli.guest {
        ClientVariant::Guest
    } else {
        ClientVariant::Authenticated
    };
    log::info!("starting {} client against {}", variant.display_name(), config.base_url);

    let backend = HttpBackend::new(
        &config.base_url,
        config.session_cookie.as_deref(),
        config.request_timeout(),
    )?;

    if variant == ClientVariant::Authenticated {
        match backend.open_session().await {
            Ok(initial) => {
                // A configured initial wins over the one the server shows
                if config.user_initial.is_none() {
                    config.user_initial = initial;
                }
            }
            Err(e) => {
                log::error!("could not open session: {}", e);
                eprintln!("No se pudo abrir la sesión en {}: {}", backend.base_url(), e);
                eprintln!("Configura session_cookie en {} o usa --guest.", Config::get_config_path()?.display());
                eprintln!("Registro: {}", log_path.display());
                std::process::exit(1);
            }
        }
    }

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let mut app = App::new(&config, variant, Arc::new(backend), events.sender());
    if let Ok((width, _)) = crossterm::terminal::size() {
        app.view.viewport_width = width;
    }
    app.start();

    let result = run(&mut terminal, &mut app, &mut events).await;

    tui::restore()?;
    result
}

async fn run(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    log::info!("exiting");
    Ok(())
}
