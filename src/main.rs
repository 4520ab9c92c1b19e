use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use windowkill::platform::{MonitorInfo, WindowEvent, WindowPlatform};
use windowkill::session::{
    spawn_session, Phase, Role, SessionCommand, SessionConfig, SessionHandle,
};
use windowkill::store::Store;
use windowkill::ui::{NullUi, TraceUi, UiSurface};
use windowkill::{config, create_primary_window, FsStore, HeadlessPlatform, SyncBus, Vec2};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

#[tokio::main]
async fn main() {
    // Load .env locally; safe to ignore when not present.
    let _ = dotenvy::dotenv();
    init_tracing();

    let platform = HeadlessPlatform::new(MonitorInfo {
        width: 1920.0,
        height: 1080.0,
    });
    let store: Arc<dyn Store> = Arc::new(FsStore::new(config::data_dir()));
    let options = windowkill::Options::load(store.as_ref());
    let settings = options.difficulty.settings();
    info!(difficulty = %options.difficulty, "starting");

    // Window creation needs a monitor; without one there is nothing to play on.
    let bootstrap = match create_primary_window(platform.as_ref()).await {
        Ok(bootstrap) => bootstrap,
        Err(e) => {
            error!(error = %e, "cannot create the game window");
            std::process::exit(1);
        }
    };

    let bus = SyncBus::new();

    // Supervisor: every satellite window the primary opens gets its own
    // session task attached.
    {
        let mut events = platform.subscribe_windows();
        let platform = Arc::clone(&platform);
        let bus = bus.clone();
        let store = Arc::clone(&store);
        let bootstrap = bootstrap.clone();
        let player_color = options.player_color.clone();
        tokio::spawn(async move {
            // Handles stay alive here; a dropped command channel would tear
            // the session down.
            let mut satellites: Vec<SessionHandle> = Vec::new();
            while let Ok(event) = events.recv().await {
                let WindowEvent::Created { id } = event else {
                    continue;
                };
                if !id.starts_with("win_") {
                    continue;
                }
                let ui: Arc<dyn UiSurface> = Arc::new(NullUi);
                let handle = spawn_session(
                    SessionConfig {
                        window_id: id,
                        role: Role::Satellite,
                        settings,
                        screen_multiplier: bootstrap.screen_multiplier,
                        player_color: player_color.clone(),
                        base_width: bootstrap.base_width,
                        global_target: bootstrap.global_target,
                    },
                    Arc::clone(&platform) as Arc<dyn WindowPlatform>,
                    bus.clone(),
                    Arc::clone(&store),
                    ui,
                );
                satellites.retain(|h| !h.task.is_finished());
                satellites.push(handle);
            }
        });
    }

    let primary = spawn_session(
        SessionConfig {
            window_id: bootstrap.window_id.clone(),
            role: Role::Primary,
            settings,
            screen_multiplier: bootstrap.screen_multiplier,
            player_color: options.player_color.clone(),
            base_width: bootstrap.base_width,
            global_target: bootstrap.global_target,
        },
        Arc::clone(&platform) as Arc<dyn WindowPlatform>,
        bus.clone(),
        Arc::clone(&store),
        Arc::new(TraceUi),
    );

    // Demo autopilot: fire in a random direction a few times a second so a
    // headless run actually plays out.
    tokio::spawn(autopilot(primary.commands.clone()));

    let mut phase = primary.phase.clone();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                let _ = primary.commands.send(SessionCommand::Quit).await;
                break;
            }
            changed = phase.changed() => {
                if changed.is_err() {
                    warn!("session ended without a game-over report");
                    break;
                }
                let current = phase.borrow().clone();
                if let Phase::GameOver { final_score, new_high_score } = current {
                    info!(final_score, new_high_score, "run finished");
                    break;
                }
            }
        }
    }

    let _ = primary.task.await;
}

async fn autopilot(commands: mpsc::Sender<SessionCommand>) {
    let mut rng = StdRng::from_entropy();
    let mut ticker = tokio::time::interval(Duration::from_millis(250));
    loop {
        ticker.tick().await;
        let angle = rng.gen_range(0.0..std::f64::consts::TAU);
        let target = Vec2::new(300.0 + angle.cos() * 200.0, 300.0 + angle.sin() * 200.0);
        if commands
            .send(SessionCommand::Fire { target })
            .await
            .is_err()
        {
            return;
        }
    }
}
