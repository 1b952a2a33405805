pub mod logging;
pub mod timing;

pub use logging::{init_tracing, log_requests, LogLevel, LoggingMiddleware};
pub use timing::{time_requests, TimingMiddleware};
