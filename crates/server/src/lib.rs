pub mod app;
pub mod errors;
pub mod models;
pub mod state;

pub use app::create_app;
pub use errors::ApiError;
pub use state::AppState;
