use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::macros::string_id;

string_id!(
    /// Identifier of a gated product capability
    FeatureId
);

string_id!(
    /// Identifier of a subscription plan
    PlanId
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureType {
    Boolean,
    Quota,
}

/// A capability the product gates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: FeatureId,
    pub feature_type: FeatureType,
    pub description: String,
    pub gated_by: Option<FeatureId>,
}

impl Feature {
    pub fn boolean(id: impl Into<FeatureId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            feature_type: FeatureType::Boolean,
            description: description.into(),
            gated_by: None,
        }
    }

    pub fn quota(id: impl Into<FeatureId>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            feature_type: FeatureType::Quota,
            description: description.into(),
            gated_by: None,
        }
    }

    pub fn gated_by(mut self, gate: impl Into<FeatureId>) -> Self {
        self.gated_by = Some(gate.into());
        self
    }
}

/// What a plan grants for one feature. The variant must match the feature's
/// type; `Limit(None)` is an unlimited quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grant {
    Allowed(bool),
    Limit(Option<i64>),
}

impl Grant {
    pub fn feature_type(&self) -> FeatureType {
        match self {
            Grant::Allowed(_) => FeatureType::Boolean,
            Grant::Limit(_) => FeatureType::Quota,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanEntitlement {
    pub plan: PlanId,
    pub feature: FeatureId,
    pub grant: Grant,
}

impl PlanEntitlement {
    pub fn allowed(&self) -> Option<bool> {
        match self.grant {
            Grant::Allowed(allowed) => Some(allowed),
            Grant::Limit(_) => None,
        }
    }

    /// Quota limit; `None` for boolean grants and for unlimited quotas
    pub fn limit(&self) -> Option<i64> {
        match self.grant {
            Grant::Limit(limit) => limit,
            Grant::Allowed(_) => None,
        }
    }
}

/// Consumption of a quota feature by one account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounter {
    pub feature: FeatureId,
    pub used: i64,
    pub updated_at: DateTime<Utc>,
}

/// Derived state of one feature for one account. Never persisted.
///
/// `used` and `remaining` are only populated for quota features;
/// `remaining` is `None` for unlimited quotas and never negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveEntitlement {
    pub feature: FeatureId,
    pub feature_type: FeatureType,
    pub enabled: bool,
    pub limit: Option<i64>,
    pub used: Option<i64>,
    pub remaining: Option<i64>,
}

impl EffectiveEntitlement {
    /// Entry for a feature the plan says nothing about
    pub fn disabled(feature: &Feature) -> Self {
        Self {
            feature: feature.id.clone(),
            feature_type: feature.feature_type,
            enabled: false,
            limit: None,
            used: None,
            remaining: None,
        }
    }

    pub fn boolean(feature: &Feature, allowed: bool) -> Self {
        Self {
            feature: feature.id.clone(),
            feature_type: FeatureType::Boolean,
            enabled: allowed,
            limit: None,
            used: None,
            remaining: None,
        }
    }

    pub fn quota(feature: &Feature, limit: Option<i64>, used: i64) -> Self {
        let (enabled, remaining) = match limit {
            None => (true, None),
            Some(limit) => {
                let remaining = limit.saturating_sub(used).max(0);
                (remaining > 0, Some(remaining))
            }
        };
        Self {
            feature: feature.id.clone(),
            feature_type: FeatureType::Quota,
            enabled,
            limit,
            used: Some(used),
            remaining,
        }
    }

    pub fn is_unlimited(&self) -> bool {
        self.feature_type == FeatureType::Quota && self.limit.is_none() && self.used.is_some()
    }
}
