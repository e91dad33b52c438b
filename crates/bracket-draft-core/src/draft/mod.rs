pub mod engine;
pub mod order;
pub mod state;
