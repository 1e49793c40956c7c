use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resolved identity attached to a request after the session credential has
/// been verified. Constructed once per request; handlers receive it by
/// value, never through shared mutable state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
}
