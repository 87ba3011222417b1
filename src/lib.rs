pub mod config;
pub mod ecs;
pub mod error;
pub mod headless;
pub mod interfaces;
pub mod modes;
pub mod player;
pub mod presentation;
pub mod rng;
pub mod safe_zone;
pub mod session;
pub mod spawn;

pub use config::{ConfigLoader, GameConfig};
pub use ecs::{Component, ComponentContext, Entity, EntityId, EntityManager, Event};
pub use modes::{GameMode, GameModeManager, ModeEvent};
pub use session::{FrameReport, Session, SessionBuilder};
