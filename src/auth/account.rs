use serde::{Deserialize, Serialize};

use crate::entitlement::PlanId;
use crate::macros::string_id;

string_id!(
    /// Identity-provider user id
    UserId
);

string_id!(
    /// Family (household) id
    FamilyId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// An authenticated identity with its plan and optional family, as produced
/// by upstream authentication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub user_id: UserId,
    pub role: Role,
    pub plan: Option<PlanId>,
    pub family_id: Option<FamilyId>,
}

impl Account {
    pub fn new(user_id: impl Into<UserId>, plan: impl Into<PlanId>) -> Self {
        Self {
            user_id: user_id.into(),
            role: Role::User,
            plan: Some(plan.into()),
            family_id: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn with_family(mut self, family_id: impl Into<FamilyId>) -> Self {
        self.family_id = Some(family_id.into());
        self
    }

    pub fn without_plan(mut self) -> Self {
        self.plan = None;
        self
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
