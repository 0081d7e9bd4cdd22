pub mod body;
pub mod error;
pub mod handlers;
pub mod server;

// Re-exports: stable API surface
pub use error::HttpError;
pub use server::{AppState, build_router, run};
