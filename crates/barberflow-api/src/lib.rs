pub mod analytics;
pub mod appointments;
pub mod auth;
pub mod billing;
pub mod clients;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use state::{AppState, AppStateInner};
