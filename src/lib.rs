pub mod app;
pub mod busy;
pub mod cache;
pub mod calendar;
pub mod config;
pub mod confirm;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod preferences;
pub mod reconciler;
pub mod session;
pub mod state;
pub mod stats;
pub mod store;
#[cfg(test)]
mod testing;
pub mod ui;

pub use app::router;
pub use config::Config;
pub use reconciler::Reconciler;
pub use state::AppState;
pub use store::{DocumentStore, JsonFileStore};
