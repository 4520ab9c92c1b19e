//! End-to-end session behavior over the headless platform, driven on a
//! paused tokio clock.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::{sleep, timeout};

use windowkill::geometry::{Vec2, WindowRect};
use windowkill::platform::{
    HeadlessPlatform, MonitorInfo, PlatformError, WindowEvent, WindowPlatform, WindowSpec,
};
use windowkill::session::{
    create_primary_window, spawn_session, Phase, Role, SessionCommand, SessionConfig,
    SessionHandle,
};
use windowkill::store::{load_high_score, MemStore, Store, StoreError, HIGH_SCORE_KEY};
use windowkill::sync::{SyncBus, SyncPayload};
use windowkill::tuning::Tier;
use windowkill::ui::NullUi;
use windowkill::Entity;

const LONG: Duration = Duration::from_secs(120);

fn platform() -> Arc<HeadlessPlatform> {
    HeadlessPlatform::new(MonitorInfo {
        width: 1920.0,
        height: 1080.0,
    })
}

async fn make_window(platform: &Arc<HeadlessPlatform>, id: &str, rect: WindowRect) {
    platform
        .create_window(WindowSpec {
            id: id.into(),
            rect,
            title: "test".into(),
            decorations: false,
            focused: false,
        })
        .await
        .unwrap();
}

fn session_config(window_id: &str, role: Role, base_width: f64) -> SessionConfig {
    SessionConfig {
        window_id: window_id.to_string(),
        role,
        settings: Tier::Normal.settings(),
        screen_multiplier: 1.0,
        player_color: "#ffffff".to_string(),
        base_width,
        global_target: Vec2::new(960.0, 540.0),
    }
}

fn start(
    platform: &Arc<HeadlessPlatform>,
    bus: &SyncBus,
    store: &Arc<dyn Store>,
    cfg: SessionConfig,
) -> SessionHandle {
    spawn_session(
        cfg,
        Arc::clone(platform) as Arc<dyn WindowPlatform>,
        bus.clone(),
        Arc::clone(store),
        Arc::new(NullUi),
    )
}

async fn wait_for_phase(
    handle: &mut SessionHandle,
    pred: impl Fn(&Phase) -> bool,
) -> Phase {
    timeout(LONG, handle.phase.wait_for(|p| pred(p)))
        .await
        .expect("phase deadline")
        .expect("session dropped its phase channel")
        .clone()
}

/// A 100px primary window shrinks to the player diameter in well under a
/// second, ends the run, and is restored to its starting size and center.
#[tokio::test(start_paused = true)]
async fn shrinking_window_ends_the_run_and_restores_geometry() {
    let platform = platform();
    let rect = WindowRect::new(910.0, 490.0, 100.0, 100.0);
    make_window(&platform, "main", rect).await;
    let bus = SyncBus::new();
    let store: Arc<dyn Store> = Arc::new(MemStore::default());

    let mut handle = start(&platform, &bus, &store, session_config("main", Role::Primary, 100.0));
    let phase = wait_for_phase(&mut handle, |p| matches!(p, Phase::GameOver { .. })).await;

    let Phase::GameOver {
        final_score,
        new_high_score,
    } = phase
    else {
        unreachable!();
    };
    // No kills: score stays zero, and no high score blob appears.
    assert_eq!(final_score, 0);
    assert!(!new_high_score);
    assert!(!store.exists(HIGH_SCORE_KEY));

    handle.task.await.unwrap();
    assert_eq!(platform.inner_size("main").await.unwrap(), (100.0, 100.0));
    let pos = platform.outer_position("main").await.unwrap();
    assert_eq!((pos.x, pos.y), (910.0, 490.0));
}

/// Pausing freezes the shrink loop; a second pause is a no-op; resuming
/// picks the loop back up.
#[tokio::test(start_paused = true)]
async fn pause_freezes_shrinking_and_resume_continues() {
    let platform = platform();
    make_window(&platform, "main", WindowRect::new(660.0, 240.0, 600.0, 600.0)).await;
    let bus = SyncBus::new();
    let store: Arc<dyn Store> = Arc::new(MemStore::default());

    let mut handle = start(&platform, &bus, &store, session_config("main", Role::Primary, 600.0));
    sleep(Duration::from_millis(300)).await;
    let (w_before, _) = platform.inner_size("main").await.unwrap();
    assert!(w_before < 600.0);

    handle.commands.send(SessionCommand::Pause).await.unwrap();
    wait_for_phase(&mut handle, |p| *p == Phase::Paused).await;
    sleep(Duration::from_millis(100)).await;
    let (w_paused, _) = platform.inner_size("main").await.unwrap();

    handle.commands.send(SessionCommand::Pause).await.unwrap();
    sleep(Duration::from_secs(2)).await;
    let (w_still, _) = platform.inner_size("main").await.unwrap();
    assert_eq!(w_paused, w_still);

    handle.commands.send(SessionCommand::Resume).await.unwrap();
    wait_for_phase(&mut handle, |p| *p == Phase::Running).await;
    sleep(Duration::from_secs(1)).await;
    let (w_after, _) = platform.inner_size("main").await.unwrap();
    assert!(w_after < w_still);

    handle.commands.send(SessionCommand::Quit).await.unwrap();
    handle.task.await.unwrap();
}

struct CountingStore {
    inner: MemStore,
    score_writes: AtomicUsize,
}

impl Store for CountingStore {
    fn exists(&self, key: &str) -> bool {
        self.inner.exists(key)
    }

    fn read_text(&self, key: &str) -> Result<String, StoreError> {
        self.inner.read_text(key)
    }

    fn write_text(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if key == HIGH_SCORE_KEY {
            self.score_writes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.write_text(key, value)
    }
}

/// A transferred enemy is adopted, shot down, and the resulting score is
/// persisted exactly once at game over.
#[tokio::test(start_paused = true)]
async fn adopted_enemy_killed_and_high_score_persisted_once() {
    let platform = platform();
    make_window(&platform, "main", WindowRect::new(910.0, 490.0, 100.0, 100.0)).await;
    let bus = SyncBus::new();
    let counting = Arc::new(CountingStore {
        inner: MemStore::default(),
        score_writes: AtomicUsize::new(0),
    });
    let store: Arc<dyn Store> = counting.clone();

    let mut handle = start(&platform, &bus, &store, session_config("main", Role::Primary, 100.0));

    // Enemy enters from above the player (monitor space), player fires
    // straight up; they meet within a handful of ticks.
    bus.publish(SyncPayload::EnemyTransfer {
        enemy: Entity::enemy(Vec2::new(960.0, 495.0), 14.0, "#ff0000", Vec2::default()),
    });
    handle
        .commands
        .send(SessionCommand::Fire {
            target: Vec2::new(50.0, 0.0),
        })
        .await
        .unwrap();

    // Stretch the run with a pause so the elapsed-time factor is non-zero.
    sleep(Duration::from_millis(300)).await;
    handle.commands.send(SessionCommand::Pause).await.unwrap();
    sleep(Duration::from_secs(5)).await;
    handle.commands.send(SessionCommand::Resume).await.unwrap();

    let phase = wait_for_phase(&mut handle, |p| matches!(p, Phase::GameOver { .. })).await;
    let Phase::GameOver {
        final_score,
        new_high_score,
    } = phase
    else {
        unreachable!();
    };
    assert!(new_high_score);
    assert!(final_score >= 1);
    assert_eq!(load_high_score(store.as_ref()), final_score);
    assert_eq!(counting.score_writes.load(Ordering::SeqCst), 1);

    handle.task.await.unwrap();
}

/// A satellite with nothing alive in it closes itself and announces the
/// closure on the bus.
#[tokio::test(start_paused = true)]
async fn drained_satellite_closes_itself() {
    let platform = platform();
    make_window(&platform, "win_a", WindowRect::new(0.0, 0.0, 200.0, 200.0)).await;
    let bus = SyncBus::new();
    let store: Arc<dyn Store> = Arc::new(MemStore::default());
    let mut observer = bus.subscribe();

    let mut handle = start(&platform, &bus, &store, session_config("win_a", Role::Satellite, 100.0));
    // Boss cap already reached elsewhere, and the game starts paused, so the
    // satellite idles empty past its grace period.
    bus.publish(SyncPayload::BossSpawned {
        window_id: "other".to_string(),
        count: 3,
    });
    bus.publish(SyncPayload::Paused { value: true });
    sleep(Duration::from_secs(3)).await;
    bus.publish(SyncPayload::Paused { value: false });

    let phase = wait_for_phase(&mut handle, |p| *p == Phase::Closed).await;
    assert_eq!(phase, Phase::Closed);
    handle.task.await.unwrap();
    assert!(matches!(
        platform.inner_size("win_a").await,
        Err(PlatformError::WindowNotFound(_))
    ));

    let closed = timeout(LONG, async {
        loop {
            if let Some(msg) = observer.try_next() {
                if let SyncPayload::WindowClosed { id } = msg.payload {
                    return id;
                }
                continue;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("expected a window_closed broadcast");
    assert_eq!(closed, "win_a");
}

/// Enemies leaving a satellite canvas are broadcast in monitor space with
/// the transfer flag set.
#[tokio::test(start_paused = true)]
async fn satellite_enemies_transfer_out_in_monitor_space() {
    let platform = platform();
    let rect = WindowRect::new(0.0, 0.0, 100.0, 100.0);
    make_window(&platform, "win_b", rect).await;
    let bus = SyncBus::new();
    let store: Arc<dyn Store> = Arc::new(MemStore::default());
    let mut observer = bus.subscribe();

    let handle = start(&platform, &bus, &store, session_config("win_b", Role::Satellite, 100.0));
    bus.publish(SyncPayload::BossSpawned {
        window_id: "other".to_string(),
        count: 3,
    });

    let enemy = timeout(LONG, async {
        loop {
            if let Some(msg) = observer.try_next() {
                if let SyncPayload::EnemyTransfer { enemy } = msg.payload {
                    return enemy;
                }
                continue;
            }
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("expected an enemy transfer broadcast");

    assert!(enemy.cross_window);
    assert!(!rect.contains(enemy.pos));
    handle.task.abort();
}

/// Startup centers the primary window on the monitor; with no monitor at
/// all, startup fails outright.
#[tokio::test]
async fn primary_window_is_centered_or_startup_fails() {
    let platform = platform();
    let bootstrap = create_primary_window(platform.as_ref()).await.unwrap();
    assert_eq!(bootstrap.window_id, "main");
    assert_eq!(bootstrap.base_width, 600.0);
    assert_eq!(bootstrap.global_target, Vec2::new(960.0, 540.0));
    let pos = platform.outer_position("main").await.unwrap();
    assert_eq!((pos.x, pos.y), (660.0, 240.0));
    assert_eq!(platform.inner_size("main").await.unwrap(), (600.0, 600.0));

    let blind = BlindPlatform;
    let err = create_primary_window(&blind).await.unwrap_err();
    assert!(matches!(err, PlatformError::NoMonitor));
}

/// Platform that sees no monitors and holds no windows.
struct BlindPlatform;

#[async_trait]
impl WindowPlatform for BlindPlatform {
    async fn create_window(&self, _spec: WindowSpec) -> Result<(), PlatformError> {
        Err(PlatformError::Backend("no display".into()))
    }

    async fn close_window(&self, id: &str) -> Result<(), PlatformError> {
        Err(PlatformError::WindowNotFound(id.to_string()))
    }

    async fn outer_position(&self, id: &str) -> Result<Vec2, PlatformError> {
        Err(PlatformError::WindowNotFound(id.to_string()))
    }

    async fn inner_size(&self, id: &str) -> Result<(f64, f64), PlatformError> {
        Err(PlatformError::WindowNotFound(id.to_string()))
    }

    async fn set_size(&self, id: &str, _w: f64, _h: f64) -> Result<(), PlatformError> {
        Err(PlatformError::WindowNotFound(id.to_string()))
    }

    async fn set_position(&self, id: &str, _x: f64, _y: f64) -> Result<(), PlatformError> {
        Err(PlatformError::WindowNotFound(id.to_string()))
    }

    async fn window_rects(&self) -> Result<Vec<WindowRect>, PlatformError> {
        Ok(Vec::new())
    }

    async fn current_monitor(&self) -> Option<MonitorInfo> {
        None
    }

    fn subscribe_windows(&self) -> broadcast::Receiver<WindowEvent> {
        broadcast::channel(1).1
    }
}
