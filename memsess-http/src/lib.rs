pub mod apis;
pub mod binding;
pub mod error;
pub mod http;

pub use binding::SessionBinder;
pub use error::{ApiJson, BindError, ErrorResponse};
pub use http::{router, start_server, ServerConfig, ServerState};
