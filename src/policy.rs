use crate::models::event::Event;
use crate::models::user::User;
use crate::utils::error::AppError;

/// Ownership is the whole policy: only the owner may see an event's
/// detail view or mutate it. `visibility = public` is stored data with
/// no access effect here.
pub fn can_view_detail(requester: &User, event: &Event) -> bool {
    event.owner_id == requester.id
}

pub fn can_update(requester: &User, event: &Event) -> bool {
    event.owner_id == requester.id
}

pub fn can_delete(requester: &User, event: &Event) -> bool {
    event.owner_id == requester.id
}

fn deny() -> AppError {
    AppError::Forbidden("This action is unauthorized".to_string())
}

pub fn authorize_view_detail(requester: &User, event: &Event) -> Result<(), AppError> {
    if can_view_detail(requester, event) {
        Ok(())
    } else {
        Err(deny())
    }
}

pub fn authorize_update(requester: &User, event: &Event) -> Result<(), AppError> {
    if can_update(requester, event) {
        Ok(())
    } else {
        Err(deny())
    }
}

pub fn authorize_delete(requester: &User, event: &Event) -> Result<(), AppError> {
    if can_delete(requester, event) {
        Ok(())
    } else {
        Err(deny())
    }
}
