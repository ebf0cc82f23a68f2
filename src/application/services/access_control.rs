//! Authorization rules for owners and superusers.
//!
//! Authentication (turning a bearer token into an [`Account`]) lives in
//! [`super::auth_service::AuthService`]; this module only answers whether an
//! already-authenticated account may perform an action.

use crate::domain::entities::{Account, Link};
use crate::error::AppError;
use serde_json::json;

/// Operations guarded by [`authorize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ReadLink,
    DeleteLink,
    ExtendLink,
    ListAllLinks,
    ListExpiredLinks,
    ListAccounts,
    UpdateAccount,
    DeleteAccount,
    ViewSiteStats,
    ListSubmissions,
    DeleteSubmission,
    CloseOwnAccount,
}

/// What an [`Action`] targets.
#[derive(Debug, Clone, Copy)]
pub enum Resource<'a> {
    Link(&'a Link),
    Account(&'a Account),
    Site,
}

/// Decides whether `actor` may perform `action` on `resource`.
///
/// - Link read/delete: the owner or a superuser.
/// - Everything else: superusers only.
/// - Closing an account: only the account itself, and never a superuser.
/// - A superuser can never update or delete their own account.
///
/// # Errors
///
/// Returns [`AppError::Forbidden`] when the action is not allowed.
pub fn authorize(actor: &Account, action: Action, resource: Resource<'_>) -> Result<(), AppError> {
    if !actor.is_active {
        return Err(forbidden(action, "Account is inactive"));
    }

    match (action, resource) {
        (Action::ReadLink | Action::DeleteLink, Resource::Link(link)) => {
            if link.owner_id == actor.id || actor.is_superuser {
                Ok(())
            } else {
                Err(forbidden(action, "Not the owner of this link"))
            }
        }
        (Action::UpdateAccount | Action::DeleteAccount, Resource::Account(target)) => {
            if !actor.is_superuser {
                Err(forbidden(action, "Superuser privileges required"))
            } else if target.id == actor.id {
                Err(forbidden(action, "Superusers cannot modify their own account"))
            } else {
                Ok(())
            }
        }
        (Action::CloseOwnAccount, Resource::Account(target)) => {
            if target.id != actor.id {
                Err(forbidden(action, "Not your account"))
            } else if actor.is_superuser {
                Err(forbidden(action, "Superusers cannot delete their own account"))
            } else {
                Ok(())
            }
        }
        _ if actor.is_superuser => Ok(()),
        _ => Err(forbidden(action, "Superuser privileges required")),
    }
}

fn forbidden(action: Action, reason: &str) -> AppError {
    AppError::forbidden(reason, json!({ "action": format!("{action:?}") }))
}
