//! Per-window game session controller.
//!
//! Every OS window runs one `GameSession` as its own tokio task: a fixed-step
//! tick loop that drains inbound commands and bus messages, advances physics,
//! and drives the window animator. The primary window owns the player, the
//! shrink loop and the satellite-window spawner; satellite windows host only
//! enemies/bosses and hand entities leaving their canvas to the bus.
//!
//! Sessions never touch each other's state directly; everything cross-window
//! goes through the sync bus.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant, MissedTickBehavior};
use tracing::{info, warn};
use uuid::Uuid;

use crate::achievements::{AchievementTracker, GameOverReport};
use crate::animator::{Anchor, WindowAnimator};
use crate::config::{
    BOSS_CAP, BOSS_SHOOT_INTERVAL, COMMAND_CHANNEL_CAPACITY, DEFAULT_WINDOW_WIDTH,
    EXPAND_ANIMATION, GAMEOVER_ANIMATION, MAX_SATELLITE_WINDOWS, PLAYER_RADIUS, PROJECTILE_RADIUS,
    PROJECTILE_SPEED, SATELLITE_SPAWN_INTERVAL, SHRINK_ANIMATION, SHRINK_INTERVAL, TICK_INTERVAL,
};
use crate::entity::Entity;
use crate::geometry::{canvas_to_monitor, monitor_to_canvas, Vec2, WindowRect};
use crate::platform::{PlatformError, WindowPlatform, WindowSpec};
use crate::store::{load_high_score, save_high_score, Options, Store};
use crate::sync::{SyncBus, SyncMessage, SyncPayload, SyncSubscriber};
use crate::systems::{
    advance_all, collides, exit_side, player_touches_edge, resolve_projectile_hits, Exit,
};
use crate::tuning::{screen_multiplier, DifficultySettings};
use crate::ui::UiSurface;

/// A satellite with nothing left alive after this long self-closes.
const SATELLITE_GRACE: Duration = Duration::from_secs(2);

/// Minimum spawn distance from the aim target, before the enemy radius.
const SPAWN_KEEPOUT: f64 = 100.0;

const SPAWN_ATTEMPTS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Hosts the player and the shrinking arena.
    Primary,
    /// Auxiliary window hosting transferred/spawned enemies and bosses.
    Satellite,
}

#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// Fire a projectile from the player toward a canvas-local point.
    Fire { target: Vec2 },
    Pause,
    Resume,
    Quit,
}

/// High-level session state, published on a watch channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Phase {
    Running,
    Paused,
    /// Terminal; only a fresh session leaves this state.
    GameOver { final_score: u64, new_high_score: bool },
    /// A satellite window closed itself.
    Closed,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub window_id: String,
    pub role: Role,
    pub settings: DifficultySettings,
    /// Reference-resolution over actual monitor width; px constants divide
    /// by this.
    pub screen_multiplier: f64,
    pub player_color: String,
    /// Window side length at session start and after game over, already
    /// resolution-scaled.
    pub base_width: f64,
    /// Monitor-space point satellite enemies aim at (the arena center).
    pub global_target: Vec2,
}

/// Mutable per-window game state. Owned exclusively by the session task.
pub struct SessionState {
    pub player: Option<Entity>,
    pub enemies: Vec<Entity>,
    pub projectiles: Vec<Entity>,
    pub kill_count: u32,
    pub high_score: u64,
    pub paused: bool,
    pub game_over: bool,
    /// Ids of satellite windows this (primary) session opened.
    pub satellite_windows: Vec<String>,
    /// Process-wide boss count, maintained from authoritative bus messages.
    pub boss_count: u32,
    pub has_local_boss: bool,
    /// Current per-step shrink amount; grows each step, survives pause.
    pub decrease_amount: f64,
    /// Current enemy spawn interval; shrinks toward the floor, survives pause.
    pub spawn_interval: Duration,
}

pub struct GameSession {
    cfg: SessionConfig,
    platform: Arc<dyn WindowPlatform>,
    bus: SyncBus,
    sub: SyncSubscriber,
    store: Arc<dyn Store>,
    ui: Arc<dyn UiSurface>,
    animator: WindowAnimator,
    tracker: Option<AchievementTracker>,
    state: SessionState,
    rng: StdRng,
    started_at: Instant,
    next_shrink: Instant,
    next_spawn: Instant,
    next_satellite: Instant,
    next_boss_shot: Instant,
    score_persisted: bool,
}

/// Channels for talking to a spawned session task.
pub struct SessionHandle {
    pub commands: mpsc::Sender<SessionCommand>,
    pub phase: watch::Receiver<Phase>,
    pub task: JoinHandle<()>,
}

/// Spawns a session on its own task and returns the control handle.
pub fn spawn_session(
    cfg: SessionConfig,
    platform: Arc<dyn WindowPlatform>,
    bus: SyncBus,
    store: Arc<dyn Store>,
    ui: Arc<dyn UiSurface>,
) -> SessionHandle {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (phase_tx, phase_rx) = watch::channel(Phase::Running);
    let session = GameSession::new(cfg, platform, bus, store, ui);
    let task = tokio::spawn(session.run(command_rx, phase_tx));
    SessionHandle {
        commands: command_tx,
        phase: phase_rx,
        task,
    }
}

/// Everything `main` needs to start the primary session, derived from the
/// monitor at startup.
#[derive(Debug, Clone)]
pub struct PrimaryBootstrap {
    pub window_id: String,
    pub screen_multiplier: f64,
    pub base_width: f64,
    pub global_target: Vec2,
}

/// Creates and centers the primary window. Missing monitor information here
/// is the one fatal startup error in the core.
pub async fn create_primary_window(
    platform: &dyn WindowPlatform,
) -> Result<PrimaryBootstrap, PlatformError> {
    let monitor = platform
        .current_monitor()
        .await
        .ok_or(PlatformError::NoMonitor)?;
    let sm = screen_multiplier(monitor.width);
    let base_width = DEFAULT_WINDOW_WIDTH / sm;
    let rect = WindowRect::new(
        (monitor.width - base_width) / 2.0,
        (monitor.height - base_width) / 2.0,
        base_width,
        base_width,
    );
    platform
        .create_window(WindowSpec {
            id: "main".to_string(),
            rect,
            title: "WindowKill".to_string(),
            decorations: false,
            focused: true,
        })
        .await?;
    Ok(PrimaryBootstrap {
        window_id: "main".to_string(),
        screen_multiplier: sm,
        base_width,
        global_target: monitor.center(),
    })
}

/// `elapsed_seconds × round(kill_count × multiplier)`; zero kills, zero score.
pub fn final_score(elapsed_seconds: u64, kill_count: u32, score_multiplier: f64) -> u64 {
    let kill_factor = (f64::from(kill_count) * score_multiplier).round();
    elapsed_seconds * kill_factor as u64
}

/// Next per-step shrink amount: grows geometrically, capped at the scaled
/// tier maximum.
fn next_decrease_amount(current: f64, settings: &DifficultySettings, sm: f64) -> f64 {
    (current * settings.decrease_multiplier).min(settings.decrease_max / sm)
}

/// Next enemy spawn interval: shrinks linearly down to the tier floor.
fn next_spawn_interval(current: Duration, settings: &DifficultySettings) -> Duration {
    let decreased = current.saturating_sub(Duration::from_millis(settings.enemy_spawn_decrease_ms));
    decreased.max(Duration::from_millis(settings.enemy_min_spawn_ms))
}

fn random_hex_color(rng: &mut StdRng) -> String {
    format!("#{:06x}", rng.gen_range(0..0x100_0000))
}

impl GameSession {
    pub fn new(
        cfg: SessionConfig,
        platform: Arc<dyn WindowPlatform>,
        bus: SyncBus,
        store: Arc<dyn Store>,
        ui: Arc<dyn UiSurface>,
    ) -> Self {
        let sub = bus.subscribe();
        let animator = WindowAnimator::new(Arc::clone(&platform), cfg.window_id.clone());
        let player = match cfg.role {
            Role::Primary => Some(Entity::player(
                Vec2::new(cfg.base_width / 2.0, cfg.base_width / 2.0),
                PLAYER_RADIUS / cfg.screen_multiplier,
                &cfg.player_color,
            )),
            Role::Satellite => None,
        };
        let tracker = match cfg.role {
            Role::Primary => Some(AchievementTracker::load(store.as_ref())),
            Role::Satellite => None,
        };
        let state = SessionState {
            player,
            enemies: Vec::new(),
            projectiles: Vec::new(),
            kill_count: 0,
            high_score: load_high_score(store.as_ref()),
            paused: false,
            game_over: false,
            satellite_windows: Vec::new(),
            boss_count: 0,
            has_local_boss: false,
            decrease_amount: cfg.settings.decrease_power / cfg.screen_multiplier,
            spawn_interval: Duration::from_millis(
                (1000.0 * cfg.settings.enemy_spawn_speed) as u64,
            ),
        };
        let now = Instant::now();
        Self {
            cfg,
            platform,
            bus,
            sub,
            store,
            ui,
            animator,
            tracker,
            state,
            rng: StdRng::from_entropy(),
            started_at: now,
            next_shrink: now,
            next_spawn: now,
            next_satellite: now,
            next_boss_shot: now,
            score_persisted: false,
        }
    }

    pub async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        phase_tx: watch::Sender<Phase>,
    ) {
        info!(window = %self.cfg.window_id, role = ?self.cfg.role, "session started");
        self.arm_timers();
        // Catch up on anything broadcast since subscription, so the boss cap
        // decision below sees the current count.
        while let Some(msg) = self.sub.try_next() {
            self.apply_sync(msg, &phase_tx).await;
        }
        if self.cfg.role == Role::Satellite {
            self.maybe_spawn_boss().await;
        }

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            loop {
                match commands.try_recv() {
                    Ok(SessionCommand::Fire { target }) => self.fire(target),
                    Ok(SessionCommand::Pause) => self.pause(&phase_tx),
                    Ok(SessionCommand::Resume) => self.resume(&phase_tx),
                    Ok(SessionCommand::Quit) => return,
                    Err(mpsc::error::TryRecvError::Empty) => break,
                    // Handle dropped; nobody is driving this session anymore.
                    Err(mpsc::error::TryRecvError::Disconnected) => return,
                }
            }

            while let Some(msg) = self.sub.try_next() {
                self.apply_sync(msg, &phase_tx).await;
            }

            if self.state.game_over {
                return;
            }
            // Timers that fired just before a pause land here and do nothing.
            if self.state.paused {
                continue;
            }

            let now = Instant::now();
            match self.cfg.role {
                Role::Primary => {
                    if now >= self.next_shrink {
                        self.shrink_step(&phase_tx).await;
                        if self.state.game_over {
                            return;
                        }
                    }
                    if now >= self.next_spawn {
                        self.spawn_enemy().await;
                    }
                    if now >= self.next_satellite {
                        self.maybe_open_satellite().await;
                    }
                }
                Role::Satellite => {
                    if now >= self.next_spawn {
                        self.spawn_enemy().await;
                    }
                    if self.state.has_local_boss && now >= self.next_boss_shot {
                        self.boss_shoot().await;
                    }
                }
            }

            self.step_tick(&phase_tx).await;
            if self.state.game_over {
                return;
            }

            if self.cfg.role == Role::Satellite
                && self.state.enemies.is_empty()
                && !self.state.has_local_boss
                && self.started_at.elapsed() >= SATELLITE_GRACE
            {
                self.self_close().await;
                let _ = phase_tx.send(Phase::Closed);
                return;
            }
        }
    }

    fn arm_timers(&mut self) {
        let now = Instant::now();
        self.next_shrink = now + SHRINK_INTERVAL;
        self.next_spawn = now + self.state.spawn_interval;
        self.next_satellite = now + SATELLITE_SPAWN_INTERVAL;
        self.next_boss_shot = now + BOSS_SHOOT_INTERVAL;
    }

    fn fire(&mut self, target: Vec2) {
        if self.state.paused || self.state.game_over {
            return;
        }
        let Some(player) = &self.state.player else {
            return;
        };
        let dir = player.pos.direction_to(target);
        let mut projectile = Entity::projectile(
            player.pos,
            PROJECTILE_RADIUS,
            &player.color,
            Vec2::new(dir.x * PROJECTILE_SPEED, dir.y * PROJECTILE_SPEED),
        );
        // With satellite windows around, projectiles hop between windows
        // instead of stretching the arena.
        projectile.cross_window = !self.state.satellite_windows.is_empty();
        self.state.projectiles.push(projectile);
    }

    fn pause(&mut self, phase_tx: &watch::Sender<Phase>) {
        if self.state.game_over || self.state.paused {
            return;
        }
        self.state.paused = true;
        self.animator.cancel();
        let id = self.bus.publish(SyncPayload::Paused { value: true });
        self.sub.mark_seen(&id);
        self.ui.toggle_visibility("pauseMenu");
        let _ = phase_tx.send(Phase::Paused);
    }

    fn resume(&mut self, phase_tx: &watch::Sender<Phase>) {
        if self.state.game_over || !self.state.paused {
            return;
        }
        self.state.paused = false;
        // Deadlines re-arm; progressive rate state carries over untouched.
        self.arm_timers();
        let id = self.bus.publish(SyncPayload::Paused { value: false });
        self.sub.mark_seen(&id);
        self.ui.toggle_visibility("pauseMenu");
        let _ = phase_tx.send(Phase::Running);
    }

    async fn apply_sync(&mut self, msg: SyncMessage, phase_tx: &watch::Sender<Phase>) {
        match msg.payload {
            SyncPayload::Paused { value } => {
                if self.state.game_over || self.state.paused == value {
                    return;
                }
                self.state.paused = value;
                if value {
                    self.animator.cancel();
                    let _ = phase_tx.send(Phase::Paused);
                } else {
                    self.arm_timers();
                    let _ = phase_tx.send(Phase::Running);
                }
            }
            SyncPayload::WindowClosed { id } => {
                self.state.satellite_windows.retain(|w| w != &id);
            }
            SyncPayload::EnemyTransfer { enemy } => self.adopt_enemy(enemy).await,
            SyncPayload::TransferProjectile { projectile } => {
                self.adopt_projectile(projectile).await
            }
            SyncPayload::BossSpawned { count, .. } | SyncPayload::BossRemoved { count, .. } => {
                self.state.boss_count = count;
            }
            SyncPayload::KillcountIncrease { amount } => {
                if self.cfg.role == Role::Primary {
                    self.state.kill_count += amount;
                    self.ui
                        .set_text("killCount", &self.state.kill_count.to_string());
                }
            }
            SyncPayload::TutorialSeen => {
                if self.cfg.role == Role::Primary {
                    let mut options = Options::load(self.store.as_ref());
                    if !options.tutorial_seen {
                        options.tutorial_seen = true;
                        options.save(self.store.as_ref());
                    }
                }
            }
        }
    }

    /// Materializes a transferred enemy if its monitor-space position lies
    /// inside this window; everyone else drops the message.
    async fn adopt_enemy(&mut self, mut enemy: Entity) {
        let Some(rect) = self.window_rect().await else {
            return;
        };
        if !rect.contains(enemy.pos) {
            return;
        }
        enemy.pos = monitor_to_canvas(enemy.pos, rect.position());
        let target = self.local_target(rect.position());
        enemy.velocity = enemy.pos.direction_to(target);
        enemy.cross_window = self.cfg.role == Role::Satellite;
        self.state.enemies.push(enemy);
    }

    async fn adopt_projectile(&mut self, mut projectile: Entity) {
        let Some(rect) = self.window_rect().await else {
            return;
        };
        if !rect.contains(projectile.pos) {
            return;
        }
        projectile.pos = monitor_to_canvas(projectile.pos, rect.position());
        projectile.cross_window = true;
        self.state.projectiles.push(projectile);
    }

    /// Canvas-local point enemies steer toward: the player here, or the
    /// shared global target re-expressed locally in a satellite.
    fn local_target(&self, window_pos: Vec2) -> Vec2 {
        match &self.state.player {
            Some(player) => player.pos,
            None => monitor_to_canvas(self.cfg.global_target, window_pos),
        }
    }

    async fn window_rect(&self) -> Option<WindowRect> {
        let pos = match self.platform.outer_position(&self.cfg.window_id).await {
            Ok(pos) => pos,
            Err(e) => {
                warn!(window = %self.cfg.window_id, error = %e, "cannot read window position");
                return None;
            }
        };
        let (w, h) = match self.platform.inner_size(&self.cfg.window_id).await {
            Ok(size) => size,
            Err(e) => {
                warn!(window = %self.cfg.window_id, error = %e, "cannot read window size");
                return None;
            }
        };
        Some(WindowRect::new(pos.x, pos.y, w, h))
    }

    async fn shrink_step(&mut self, phase_tx: &watch::Sender<Phase>) {
        self.next_shrink = Instant::now() + SHRINK_INTERVAL;
        let Some(rect) = self.window_rect().await else {
            return;
        };
        let amount = self.state.decrease_amount;
        let player_diameter = self
            .state
            .player
            .as_ref()
            .map(|p| p.radius * 2.0)
            .unwrap_or(0.0);
        if rect.w - amount <= player_diameter || rect.h - amount <= player_diameter {
            self.finish(true, phase_tx).await;
            return;
        }
        self.animator
            .start(-amount, -amount, SHRINK_ANIMATION, Anchor::Center)
            .await;
        self.state.decrease_amount =
            next_decrease_amount(amount, &self.cfg.settings, self.cfg.screen_multiplier);
    }

    async fn spawn_enemy(&mut self) {
        self.state.spawn_interval =
            next_spawn_interval(self.state.spawn_interval, &self.cfg.settings);
        self.next_spawn = Instant::now() + self.state.spawn_interval;

        // A live boss owns the window; regular spawns hold off but the timer
        // stays armed.
        let boss_gate = match self.cfg.role {
            Role::Primary => self.state.boss_count > 0,
            Role::Satellite => self.state.has_local_boss,
        };
        if boss_gate {
            return;
        }

        let Some(rect) = self.window_rect().await else {
            return;
        };
        let target = self.local_target(rect.position());
        let radius = self.rng.gen_range(4.0..30.0) / self.cfg.screen_multiplier;

        let mut pos = Vec2::default();
        for attempt in 0..SPAWN_ATTEMPTS {
            pos = if self.rng.gen_bool(0.5) {
                Vec2::new(
                    if self.rng.gen_bool(0.5) { -radius } else { rect.w + radius },
                    self.rng.gen_range(0.0..rect.h.max(1.0)),
                )
            } else {
                Vec2::new(
                    self.rng.gen_range(0.0..rect.w.max(1.0)),
                    if self.rng.gen_bool(0.5) { -radius } else { rect.h + radius },
                )
            };
            if pos.distance(target) >= SPAWN_KEEPOUT + radius || attempt == SPAWN_ATTEMPTS - 1 {
                break;
            }
        }

        let mut color = random_hex_color(&mut self.rng);
        while color.eq_ignore_ascii_case(&self.cfg.player_color) {
            color = random_hex_color(&mut self.rng);
        }

        let mut enemy = Entity::enemy(pos, radius, &color, pos.direction_to(target));
        enemy.cross_window = self.cfg.role == Role::Satellite;
        self.state.enemies.push(enemy);
    }

    async fn maybe_open_satellite(&mut self) {
        self.next_satellite = Instant::now() + SATELLITE_SPAWN_INTERVAL;
        if self.state.satellite_windows.len() >= MAX_SATELLITE_WINDOWS {
            return;
        }
        let Some(monitor) = self.platform.current_monitor().await else {
            return;
        };
        let rects = match self.platform.window_rects().await {
            Ok(rects) => rects,
            Err(e) => {
                warn!(error = %e, "cannot enumerate windows");
                return;
            }
        };

        let mut placed = None;
        for _ in 0..SPAWN_ATTEMPTS {
            let w = self.rng.gen_range(300.0..500.0);
            let h = self.rng.gen_range(300.0..500.0);
            let x = self.rng.gen_range(0.0..(monitor.width - w).max(1.0));
            let y = self.rng.gen_range(0.0..(monitor.height - h).max(1.0));
            let candidate = WindowRect::new(x, y, w, h);
            if !rects.iter().any(|r| r.overlaps(&candidate)) {
                placed = Some(candidate);
                break;
            }
        }
        let Some(rect) = placed else {
            // No free spot this round; try again next interval.
            return;
        };

        let id = format!("win_{}", Uuid::new_v4().simple());
        let spec = WindowSpec {
            id: id.clone(),
            rect,
            title: "Canvas".to_string(),
            decorations: false,
            focused: false,
        };
        match self.platform.create_window(spec).await {
            Ok(()) => {
                info!(window = %id, "satellite window opened");
                self.state.satellite_windows.push(id);
            }
            Err(e) => warn!(window = %id, error = %e, "satellite window creation failed"),
        }
    }

    async fn maybe_spawn_boss(&mut self) {
        if self.state.boss_count >= BOSS_CAP || !self.rng.gen_bool(0.3) {
            return;
        }
        let Some(rect) = self.window_rect().await else {
            return;
        };
        let sides = self.rng.gen_range(3..=8);
        let rotation = self.rng.gen_range(0.0..std::f64::consts::TAU);
        let color = random_hex_color(&mut self.rng);
        let radius = 50.0 / self.cfg.screen_multiplier;
        let boss = Entity::boss(
            Vec2::new(rect.w / 2.0, rect.h / 2.0),
            radius,
            &color,
            sides,
            rotation,
        );
        self.state.enemies.push(boss);
        self.state.has_local_boss = true;
        self.state.boss_count += 1;
        let id = self.bus.publish(SyncPayload::BossSpawned {
            window_id: self.cfg.window_id.clone(),
            count: self.state.boss_count,
        });
        self.sub.mark_seen(&id);
        info!(window = %self.cfg.window_id, bosses = self.state.boss_count, "boss spawned");
    }

    /// The boss periodically fires a small cross-window enemy at the shared
    /// target point.
    async fn boss_shoot(&mut self) {
        self.next_boss_shot = Instant::now() + BOSS_SHOOT_INTERVAL;
        let Some(rect) = self.window_rect().await else {
            return;
        };
        let Some(boss) = self.state.enemies.iter().find(|e| e.is_boss()) else {
            return;
        };
        let target = self.local_target(rect.position());
        let pos = boss.pos;
        let color = boss.color.clone();
        let mut shot = Entity::enemy(
            pos,
            8.0 / self.cfg.screen_multiplier,
            &color,
            pos.direction_to(target),
        );
        shot.velocity_multiplier = 2.0;
        shot.cross_window = true;
        self.state.enemies.push(shot);
    }

    async fn step_tick(&mut self, phase_tx: &watch::Sender<Phase>) {
        // Geometry reads are best-effort; a failed read skips the tick.
        let Some(rect) = self.window_rect().await else {
            return;
        };
        let window_pos = rect.position();

        // The player stays pinned to the monitor center as the window moves
        // and shrinks around it.
        if self.state.player.is_some() {
            if let Some(monitor) = self.platform.current_monitor().await {
                let centered = monitor_to_canvas(monitor.center(), window_pos);
                if let Some(player) = &mut self.state.player {
                    player.pos = centered;
                }
            }
        }

        if let Some(player) = &mut self.state.player {
            player.advance();
        }
        advance_all(&mut self.state.projectiles);
        advance_all(&mut self.state.enemies);

        // Projectiles leaving the canvas either transfer or stretch the
        // window on the side they left through.
        for pi in (0..self.state.projectiles.len()).rev() {
            let Some(exit) = exit_side(&self.state.projectiles[pi], rect.w, rect.h) else {
                continue;
            };
            let projectile = self.state.projectiles.remove(pi);
            if projectile.cross_window {
                let mut out = projectile;
                out.pos = canvas_to_monitor(out.pos, window_pos);
                let id = self
                    .bus
                    .publish(SyncPayload::TransferProjectile { projectile: out });
                self.sub.mark_seen(&id);
            } else {
                let amount = self.cfg.settings.increase_power / self.cfg.screen_multiplier;
                let (dw, dh, anchor) = match exit {
                    Exit::Left => (amount, 0.0, Anchor::Left),
                    Exit::Right => (amount, 0.0, Anchor::Free),
                    Exit::Top => (0.0, amount, Anchor::Top),
                    Exit::Bottom => (0.0, amount, Anchor::Free),
                };
                self.animator.start(dw, dh, EXPAND_ANIMATION, anchor).await;
            }
        }

        // Enemy resolution. Player touch ends the run immediately.
        for ei in (0..self.state.enemies.len()).rev() {
            let player_hit = self
                .state
                .player
                .as_ref()
                .is_some_and(|p| collides(p, &self.state.enemies[ei]));
            if player_hit {
                self.finish(false, phase_tx).await;
                return;
            }
            if self.cfg.role == Role::Satellite
                && !self.state.enemies[ei].is_boss()
                && exit_side(&self.state.enemies[ei], rect.w, rect.h).is_some()
            {
                let mut enemy = self.state.enemies.remove(ei);
                enemy.pos = canvas_to_monitor(enemy.pos, window_pos);
                let id = self.bus.publish(SyncPayload::EnemyTransfer { enemy });
                self.sub.mark_seen(&id);
            }
        }

        let kills = resolve_projectile_hits(&mut self.state.enemies, &mut self.state.projectiles);
        if kills > 0 {
            self.state.kill_count += kills;
            match self.cfg.role {
                Role::Primary => self
                    .ui
                    .set_text("killCount", &self.state.kill_count.to_string()),
                Role::Satellite => {
                    let id = self
                        .bus
                        .publish(SyncPayload::KillcountIncrease { amount: kills });
                    self.sub.mark_seen(&id);
                }
            }
        }

        if self.state.has_local_boss && !self.state.enemies.iter().any(|e| e.is_boss()) {
            self.state.has_local_boss = false;
            self.state.boss_count = self.state.boss_count.saturating_sub(1);
            let id = self.bus.publish(SyncPayload::BossRemoved {
                window_id: self.cfg.window_id.clone(),
                count: self.state.boss_count,
            });
            self.sub.mark_seen(&id);
            info!(window = %self.cfg.window_id, bosses = self.state.boss_count, "boss removed");
        }

        let edge_hit = self
            .state
            .player
            .as_ref()
            .is_some_and(|p| player_touches_edge(p, rect.w, rect.h));
        if edge_hit {
            self.finish(true, phase_tx).await;
        }
    }

    /// Terminal game-over sequence: cancel animations, close satellites,
    /// re-center, score, persist, report.
    async fn finish(&mut self, ended_by_boundary: bool, phase_tx: &watch::Sender<Phase>) {
        self.state.game_over = true;
        self.state.paused = false;
        self.animator.cancel();

        for id in std::mem::take(&mut self.state.satellite_windows) {
            if let Err(e) = self.platform.close_window(&id).await {
                warn!(window = %id, error = %e, "failed to close satellite window");
            }
        }

        // Smoothly restore the original size, centered on the monitor.
        if let Some(monitor) = self.platform.current_monitor().await {
            if let Ok((w, h)) = self.platform.inner_size(&self.cfg.window_id).await {
                self.animator
                    .start(
                        self.cfg.base_width - w,
                        self.cfg.base_width - h,
                        GAMEOVER_ANIMATION,
                        Anchor::Free,
                    )
                    .await;
                self.animator.join().await;
            }
            let x = (monitor.width - self.cfg.base_width) / 2.0;
            let y = (monitor.height - self.cfg.base_width) / 2.0;
            if let Err(e) = self.platform.set_position(&self.cfg.window_id, x, y).await {
                warn!(error = %e, "failed to re-center window");
            }
        }

        let elapsed_seconds =
            (self.started_at.elapsed().as_secs_f64() * self.cfg.settings.time_multiplier) as u64;
        let score = final_score(
            elapsed_seconds,
            self.state.kill_count,
            self.cfg.settings.score_multiplier,
        );
        let new_high_score = score > self.state.high_score;
        if new_high_score && !self.score_persisted {
            self.state.high_score = score;
            save_high_score(self.store.as_ref(), score);
            self.score_persisted = true;
            self.ui
                .set_text("score", &format!("Your new high score is: {score}"));
            self.ui.set_text("gameEnd", "New High Score!");
        } else {
            self.ui.set_text("score", &format!("Your score is: {score}"));
            self.ui.set_text(
                "scoreBest",
                &format!("Your best score is: {}", self.state.high_score),
            );
        }
        self.ui.toggle_visibility("timer");
        self.ui.toggle_visibility("killCount");
        self.ui.toggle_visibility("gameEnd");

        if let Some(tracker) = &mut self.tracker {
            let report = GameOverReport {
                ended_by_boundary,
                player_color: self.cfg.player_color.clone(),
                kill_count: self.state.kill_count,
                elapsed_seconds,
                final_score: score,
                monitor_count: self.platform.monitor_count().await,
            };
            tracker.handle(&report, self.ui.as_ref(), self.store.as_ref());
        }

        info!(
            window = %self.cfg.window_id,
            score,
            kills = self.state.kill_count,
            elapsed_seconds,
            ended_by_boundary,
            "game over"
        );
        let _ = phase_tx.send(Phase::GameOver {
            final_score: score,
            new_high_score,
        });
    }

    /// A drained satellite tears itself down and tells everyone.
    async fn self_close(&mut self) {
        if self.state.has_local_boss {
            return;
        }
        let id = self.bus.publish(SyncPayload::WindowClosed {
            id: self.cfg.window_id.clone(),
        });
        self.sub.mark_seen(&id);
        if let Err(e) = self.platform.close_window(&self.cfg.window_id).await {
            warn!(window = %self.cfg.window_id, error = %e, "satellite close failed");
        }
        info!(window = %self.cfg.window_id, "satellite window self-closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{HeadlessPlatform, MonitorInfo};
    use crate::store::MemStore;
    use crate::tuning::Tier;
    use crate::ui::NullUi;

    fn config(role: Role) -> SessionConfig {
        SessionConfig {
            window_id: "main".to_string(),
            role,
            settings: Tier::Normal.settings(),
            screen_multiplier: 1.0,
            player_color: "#ffffff".to_string(),
            base_width: 600.0,
            global_target: Vec2::new(960.0, 540.0),
        }
    }

    #[tokio::test]
    async fn pause_and_resume_keep_progressive_rate_state() {
        let platform = HeadlessPlatform::new(MonitorInfo {
            width: 1920.0,
            height: 1080.0,
        });
        let store: Arc<dyn Store> = Arc::new(MemStore::default());
        let mut session = GameSession::new(
            config(Role::Primary),
            platform as Arc<dyn WindowPlatform>,
            SyncBus::new(),
            store,
            Arc::new(NullUi),
        );
        let (phase_tx, phase_rx) = watch::channel(Phase::Running);

        // Several shrink/spawn steps have already advanced the rate state.
        session.state.decrease_amount = 5.12;
        session.state.spawn_interval = Duration::from_millis(1230);

        session.pause(&phase_tx);
        assert_eq!(*phase_rx.borrow(), Phase::Paused);
        // A second pause is a no-op, not a double-cancel.
        session.pause(&phase_tx);
        assert!(session.state.paused);

        session.resume(&phase_tx);
        assert_eq!(*phase_rx.borrow(), Phase::Running);
        assert!(!session.state.paused);
        // The grown amounts carry over; resume never resets them to the
        // tier's starting values.
        assert_eq!(session.state.decrease_amount, 5.12);
        assert_eq!(session.state.spawn_interval, Duration::from_millis(1230));
    }

    #[test]
    fn score_formula_matches_expected_values() {
        assert_eq!(final_score(120, 10, 0.5), 600);
        assert_eq!(final_score(120, 0, 0.5), 0);
        assert_eq!(final_score(45, 3, 0.25), 45); // round(0.75) == 1
        assert_eq!(final_score(10, 1, 0.25), 0); // round(0.25) == 0
    }

    #[test]
    fn shrink_amount_grows_to_the_scaled_cap() {
        let settings = Tier::Normal.settings();
        let mut amount = settings.decrease_power; // sm == 1
        for _ in 0..32 {
            amount = next_decrease_amount(amount, &settings, 1.0);
        }
        assert_eq!(amount, settings.decrease_max);

        // Halved multiplier (wider monitor) doubles the px cap.
        let mut amount = settings.decrease_power / 0.5;
        for _ in 0..32 {
            amount = next_decrease_amount(amount, &settings, 0.5);
        }
        assert_eq!(amount, settings.decrease_max / 0.5);
    }

    #[test]
    fn spawn_interval_decreases_to_floor() {
        let settings = Tier::Impossible.settings();
        let mut interval = Duration::from_millis(2000);
        for _ in 0..100 {
            interval = next_spawn_interval(interval, &settings);
        }
        assert_eq!(interval, Duration::from_millis(settings.enemy_min_spawn_ms));
    }

    #[test]
    fn random_colors_are_hex_shaped() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..32 {
            let c = random_hex_color(&mut rng);
            assert_eq!(c.len(), 7);
            assert!(c.starts_with('#'));
            assert!(c[1..].chars().all(|ch| ch.is_ascii_hexdigit()));
        }
    }
}
