//! Core of a multi-window arcade game: the playfield is a set of real OS
//! windows. The primary window hosts the player and shrinks continuously;
//! satellite windows host enemies and bosses, and entities crossing a window
//! boundary are handed to whichever window contains them via a broadcast
//! sync bus. Everything talks to the OS through the [`platform`] seam, so the
//! whole game runs headless in tests.

pub mod achievements;
pub mod animator;
pub mod config;
pub mod entity;
pub mod geometry;
pub mod platform;
pub mod session;
pub mod store;
pub mod sync;
pub mod systems;
pub mod tuning;
pub mod ui;

pub use entity::Entity;
pub use geometry::{Vec2, WindowRect};
pub use platform::{HeadlessPlatform, MonitorInfo, WindowPlatform};
pub use session::{
    create_primary_window, spawn_session, GameSession, Phase, Role, SessionCommand, SessionConfig,
    SessionHandle,
};
pub use store::{FsStore, MemStore, Options, Store};
pub use sync::{SyncBus, SyncMessage, SyncPayload};
pub use tuning::Tier;
