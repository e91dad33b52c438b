// Library root: draft turn rotation and its durable persistence.

pub mod db;
pub mod draft;
pub mod error;
pub mod store;

pub use draft::engine::DraftRotationEngine;
pub use draft::order::{Direction, DraftOrderEntry, DraftType};
pub use draft::state::{PausedSnapshot, RotationState, TurnSignal};
pub use error::RotationError;
pub use store::{KeyValueStore, MemoryStore, RotationStateStore};
