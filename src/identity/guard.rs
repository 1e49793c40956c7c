//! Ownership guard: a pure comparison between a resource's owner and the
//! acting identity. Callers must confirm the resource exists before asking;
//! a missing resource is `NotFound`, never `Forbidden`.

use uuid::Uuid;

use crate::error::{AppError, AppResult};

use super::principal::Principal;

/// Allow the mutation iff the resource's owner id equals the session's
/// subject id. Uuid value equality, so differing textual representations of
/// the same identifier compare equal.
pub fn authorize_owner(resource_owner: Uuid, principal: &Principal) -> AppResult<()> {
    if resource_owner == principal.user_id {
        Ok(())
    } else {
        Err(AppError::forbidden("Not allowed"))
    }
}
