// Library root: re-exports all modules so integration tests and the binary
// share one public API.

pub mod api;
pub mod app;
pub mod autodraft;
pub mod config;
pub mod console;
pub mod players;
pub mod protocol;
