use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Account, FamilyId, UserId};
use crate::error::{SubtrackError, SubtrackResult};

/// Who an entity belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Owner {
    System,
    Family(FamilyId),
    Personal(UserId),
}

impl Owner {
    pub fn family_id(&self) -> Option<&FamilyId> {
        match self {
            Owner::Family(family_id) => Some(family_id),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        match self {
            Owner::Personal(user_id) => Some(user_id),
            _ => None,
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Owner::System)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::System => write!(f, "system"),
            Owner::Family(family_id) => write!(f, "family:{family_id}"),
            Owner::Personal(user_id) => write!(f, "personal:{user_id}"),
        }
    }
}

/// Whether `account` may act on an entity owned by `owner`.
///
/// Admins pass unconditionally. Otherwise system-owned entities are denied,
/// family-owned ones need a matching family and personal ones a matching user.
pub fn check_permission(account: &Account, owner: &Owner) -> SubtrackResult<()> {
    if account.is_admin() {
        return Ok(());
    }

    let allowed = match owner {
        Owner::System => false,
        Owner::Family(family_id) => account.family_id.as_ref() == Some(family_id),
        Owner::Personal(user_id) => &account.user_id == user_id,
    };

    if allowed {
        Ok(())
    } else {
        tracing::debug!(user_id = %account.user_id, owner = %owner, "Ownership check denied");
        Err(SubtrackError::Unauthorized(format!(
            "user {} may not access {owner} resource",
            account.user_id
        )))
    }
}
