//! Pokedex TUI - paginated PokeAPI catalog browser

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing_subscriber::EnvFilter;
use tui_dispatch::{
    EffectContext, EffectStoreLike, EffectStoreWithMiddleware, EventOutcome, RenderContext,
};
use tui_dispatch_debug::debug::DebugLayer;
use tui_dispatch_debug::{
    DebugCliArgs, DebugRunOutput, DebugSession, DebugSessionError, ReplayItem,
};

use pokedex::action::Action;
use pokedex::api::{ClientConfig, PokeApiClient, API_BASE};
use pokedex::connectivity::{Connectivity, FixedConnectivity, SystemConnectivity};
use pokedex::effect::Effect;
use pokedex::loader::Loader;
use pokedex::reducer::reducer;
use pokedex::state::AppState;
use pokedex::ui;

const TICK_MS: u64 = 120;

#[derive(Parser, Debug)]
#[command(name = "pokedex")]
#[command(about = "Browse the PokeAPI catalog page by page")]
struct Args {
    /// Catalog API base URL
    #[arg(long, default_value = API_BASE)]
    base_url: String,

    /// HTTP cache directory (defaults to the platform cache dir)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Serve only from the HTTP cache, never touch the network
    #[arg(long)]
    offline: bool,

    /// Write logs here (RUST_LOG controls the filter)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(flatten)]
    debug: DebugCliArgs,
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        let mut config = ClientConfig {
            base_url: self.base_url.clone(),
            ..ClientConfig::default()
        };
        if let Some(dir) = &self.cache_dir {
            config.cache_dir = dir.clone();
        }
        config
    }

    fn connectivity(&self) -> Arc<dyn Connectivity> {
        if self.offline {
            Arc::new(FixedConnectivity(false))
        } else {
            Arc::new(SystemConnectivity::new())
        }
    }
}

#[tokio::main]
async fn main() -> io::Result<()> {
    let args = Args::parse();
    if let Some(path) = &args.log_file {
        init_logging(path)?;
    }

    let config = args.client_config();
    let client = PokeApiClient::new(&config, args.connectivity())
        .map_err(|err| io::Error::other(err.to_string()))?;
    tracing::info!(
        base_url = %config.base_url,
        cache_dir = %client.cache().dir().display(),
        offline = args.offline,
        "starting"
    );
    let loader = Loader::new(Arc::new(client));

    let debug = DebugSession::new(args.debug);
    let state = debug
        .load_state_or_else_async(|| async { Ok::<AppState, io::Error>(AppState::default()) })
        .await
        .map_err(debug_error)?;
    let replay_actions = debug.load_replay_items().map_err(debug_error)?;
    let (middleware, recorder) = debug.middleware_with_recorder();
    let store = EffectStoreWithMiddleware::new(state, reducer, middleware);

    let use_alt_screen = debug.use_alt_screen();
    let mut stdout = io::stdout();
    if use_alt_screen {
        enable_raw_mode()?;
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &debug, store, replay_actions, loader).await;

    if use_alt_screen {
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;
    }

    let run_output = result?;
    run_output.write_render_output()?;
    debug.save_actions(recorder.as_ref()).map_err(debug_error)?;
    Ok(())
}

fn init_logging(path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("pokedex=info"))
        .map_err(|err| io::Error::other(err.to_string()))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn debug_error(error: DebugSessionError) -> io::Error {
    io::Error::other(format!("debug session error: {error}"))
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    debug: &DebugSession,
    store: impl EffectStoreLike<AppState, Action, Effect>,
    replay_actions: Vec<ReplayItem<Action>>,
    loader: Loader,
) -> io::Result<DebugRunOutput<AppState>> {
    debug
        .run_effect_app(
            terminal,
            store,
            DebugLayer::simple(),
            replay_actions,
            Some(Action::Init),
            Some(Action::Quit),
            |runtime| {
                if debug.render_once() {
                    return;
                }
                runtime
                    .subscriptions()
                    .interval("tick", Duration::from_millis(TICK_MS), || Action::Tick);
            },
            |frame, area, state, render_ctx: RenderContext| {
                ui::render(frame, area, state, render_ctx);
            },
            |event, state| -> EventOutcome<Action> { ui::handle_event(event, state) },
            |action| matches!(action, Action::Quit),
            move |effect: Effect, ctx: &mut EffectContext<Action>| loader.spawn(effect, ctx),
        )
        .await
}
