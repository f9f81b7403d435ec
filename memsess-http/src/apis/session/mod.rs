pub mod types;
pub mod handler;

pub use types::{AttributeView, HealthResponse, SessionView};
pub use handler::{
    handle_delete_attribute, handle_get_attribute, handle_get_session, handle_health,
    handle_login, handle_logout, handle_put_attribute,
};
