pub mod attribute;
pub mod error;
pub mod id;
pub mod manager;
pub mod session;
pub mod store;

pub use attribute::{AttributeValue, Principal};
pub use error::SessionError;
pub use id::{IdGenerator, UuidGenerator};
pub use manager::{SessionManager, SessionManagerConfig};
pub use session::Session;
pub use store::KvStore;
