pub mod routes;
pub mod server;

pub use routes::{build_router, AppState};
pub use server::WorkloadServer;
