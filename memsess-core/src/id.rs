use uuid::Uuid;

use crate::SessionError;

/// Source of fresh session identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> Result<String, SessionError>;
}

/// Random v4 UUIDs in hyphenated form. These are already cookie-safe, so
/// no further encoding is applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> Result<String, SessionError> {
        Ok(Uuid::new_v4().to_string())
    }
}
