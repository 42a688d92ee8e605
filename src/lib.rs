pub mod app;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod images;
pub mod profiles;
pub mod state;
pub mod storage;

pub use app::build_app;
pub use error::{AppError, AppResult};
pub use state::AppState;
