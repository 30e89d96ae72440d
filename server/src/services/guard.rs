//! Owner-or-admin capability check for catalog mutation.

use uuid::Uuid;

use crate::models::{Actor, Event};
use crate::utils::error::AppError;

/// Owner-or-admin predicate over an event's owner id.
pub fn can_edit(actor: &Actor, owner_id: Option<Uuid>) -> bool {
    actor.is_admin() || owner_id == Some(actor.id)
}

pub fn can_mutate(actor: &Actor, event: &Event) -> bool {
    can_edit(actor, event.owner_id)
}

pub fn authorize_mutation(actor: &Actor, event: &Event) -> Result<(), AppError> {
    if can_mutate(actor, event) {
        Ok(())
    } else {
        Err(AppError::PermissionDenied)
    }
}
