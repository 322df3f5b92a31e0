pub mod bootstrap;
pub mod config;
pub mod error;
pub mod locks;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use router::build_router;
pub use state::AppState;
