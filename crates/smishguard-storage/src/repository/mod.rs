//! Database repositories for each table.

pub mod app_state;

pub use app_state::AppStateRepo;
