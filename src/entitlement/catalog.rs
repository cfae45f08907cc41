//! Static plan catalog: features, plans and what each plan grants.
//!
//! Built once at startup through [`PlanCatalogBuilder`], which rejects
//! dangling references, grant/type mismatches and gating cycles so that
//! resolution never has to.

use std::collections::{HashMap, HashSet};
use tracing::info;

use super::feature::{Feature, FeatureId, FeatureType, Grant, PlanEntitlement, PlanId};
use crate::constants::{features, plans};
use crate::error::{SubtrackError, SubtrackResult};

#[derive(Debug, Clone, Default)]
pub struct PlanCatalog {
    features: HashMap<FeatureId, Feature>,
    plans: HashMap<PlanId, HashMap<FeatureId, PlanEntitlement>>,
}

impl PlanCatalog {
    pub fn builder() -> PlanCatalogBuilder {
        PlanCatalogBuilder::default()
    }

    /// The product's `free` and `premium` plans
    pub fn standard() -> SubtrackResult<Self> {
        let free = PlanId::from_static(plans::FREE);
        let premium = PlanId::from_static(plans::PREMIUM);

        Self::builder()
            .feature(Feature::quota(features::ACTIVE_SUBSCRIPTIONS, "Active subscriptions"))
            .feature(Feature::boolean(features::CUSTOM_PROVIDERS, "Custom providers"))
            .feature(
                Feature::quota(features::CUSTOM_PROVIDERS_COUNT, "Number of custom providers")
                    .gated_by(features::CUSTOM_PROVIDERS),
            )
            .feature(Feature::boolean(features::CUSTOM_LABELS, "Custom labels"))
            .feature(
                Feature::quota(features::CUSTOM_LABELS_COUNT, "Number of custom labels")
                    .gated_by(features::CUSTOM_LABELS),
            )
            .feature(Feature::quota(features::FAMILY_MEMBERS_COUNT, "Family members"))
            .feature(Feature::boolean(features::CURRENCY_CONVERSION, "Currency conversion"))
            .grant(free.clone(), features::ACTIVE_SUBSCRIPTIONS, Grant::Limit(Some(10)))
            .grant(free.clone(), features::CUSTOM_PROVIDERS, Grant::Allowed(true))
            .grant(free.clone(), features::CUSTOM_PROVIDERS_COUNT, Grant::Limit(Some(5)))
            .grant(free.clone(), features::CUSTOM_LABELS, Grant::Allowed(true))
            .grant(free.clone(), features::CUSTOM_LABELS_COUNT, Grant::Limit(Some(5)))
            .grant(free.clone(), features::FAMILY_MEMBERS_COUNT, Grant::Limit(Some(0)))
            .grant(free, features::CURRENCY_CONVERSION, Grant::Allowed(false))
            .grant(premium.clone(), features::ACTIVE_SUBSCRIPTIONS, Grant::Limit(None))
            .grant(premium.clone(), features::CUSTOM_PROVIDERS, Grant::Allowed(true))
            .grant(premium.clone(), features::CUSTOM_PROVIDERS_COUNT, Grant::Limit(None))
            .grant(premium.clone(), features::CUSTOM_LABELS, Grant::Allowed(true))
            .grant(premium.clone(), features::CUSTOM_LABELS_COUNT, Grant::Limit(None))
            .grant(premium.clone(), features::FAMILY_MEMBERS_COUNT, Grant::Limit(Some(10)))
            .grant(premium, features::CURRENCY_CONVERSION, Grant::Allowed(true))
            .build()
    }

    pub fn feature(&self, id: &FeatureId) -> Option<&Feature> {
        self.features.get(id)
    }

    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    /// Ids of every quota feature, sorted
    pub fn quota_features(&self) -> Vec<FeatureId> {
        let mut ids: Vec<FeatureId> = self
            .features
            .values()
            .filter(|feature| feature.feature_type == FeatureType::Quota)
            .map(|feature| feature.id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn has_plan(&self, plan: &PlanId) -> bool {
        self.plans.contains_key(plan)
    }

    /// Entitlement table of a plan, `None` for unknown plans
    pub fn plan(&self, plan: &PlanId) -> Option<&HashMap<FeatureId, PlanEntitlement>> {
        self.plans.get(plan)
    }

    pub fn entitlement(&self, plan: &PlanId, feature: &FeatureId) -> Option<&PlanEntitlement> {
        self.plans.get(plan)?.get(feature)
    }
}

#[derive(Debug, Default)]
pub struct PlanCatalogBuilder {
    features: Vec<Feature>,
    plans: Vec<PlanId>,
    entitlements: Vec<PlanEntitlement>,
}

impl PlanCatalogBuilder {
    pub fn feature(mut self, feature: Feature) -> Self {
        self.features.push(feature);
        self
    }

    /// Declare a plan, which may grant nothing
    pub fn plan(mut self, plan: impl Into<PlanId>) -> Self {
        self.plans.push(plan.into());
        self
    }

    pub fn grant(
        mut self,
        plan: impl Into<PlanId>,
        feature: impl Into<FeatureId>,
        grant: Grant,
    ) -> Self {
        self.entitlements.push(PlanEntitlement {
            plan: plan.into(),
            feature: feature.into(),
            grant,
        });
        self
    }

    pub fn build(self) -> SubtrackResult<PlanCatalog> {
        let mut features = HashMap::with_capacity(self.features.len());
        for feature in self.features {
            if features.contains_key(&feature.id) {
                return Err(SubtrackError::Configuration(format!(
                    "feature '{}' declared twice",
                    feature.id
                )));
            }
            features.insert(feature.id.clone(), feature);
        }

        for feature in features.values() {
            if let Some(gate) = &feature.gated_by {
                if !features.contains_key(gate) {
                    return Err(SubtrackError::Configuration(format!(
                        "feature '{}' is gated by unknown feature '{gate}'",
                        feature.id
                    )));
                }
            }
        }
        detect_gate_cycles(&features)?;

        let mut plans: HashMap<PlanId, HashMap<FeatureId, PlanEntitlement>> = self
            .plans
            .into_iter()
            .map(|plan| (plan, HashMap::new()))
            .collect();

        for entitlement in self.entitlements {
            let feature = features.get(&entitlement.feature).ok_or_else(|| {
                SubtrackError::Configuration(format!(
                    "plan '{}' grants unknown feature '{}'",
                    entitlement.plan, entitlement.feature
                ))
            })?;
            if entitlement.grant.feature_type() != feature.feature_type {
                return Err(SubtrackError::Configuration(format!(
                    "plan '{}' grants {:?} for {:?} feature '{}'",
                    entitlement.plan,
                    entitlement.grant,
                    feature.feature_type,
                    feature.id
                )));
            }
            plans
                .entry(entitlement.plan.clone())
                .or_default()
                .insert(entitlement.feature.clone(), entitlement);
        }

        info!(
            features = features.len(),
            plans = plans.len(),
            "Plan catalog loaded"
        );
        Ok(PlanCatalog { features, plans })
    }
}

/// Each feature has at most one gate, so the gate graph is a set of chains;
/// walking every chain with a visited set finds any loop.
fn detect_gate_cycles(features: &HashMap<FeatureId, Feature>) -> SubtrackResult<()> {
    for start in features.values() {
        let mut path = vec![start.id.clone()];
        let mut seen: HashSet<&FeatureId> = HashSet::from([&start.id]);
        let mut gate = start.gated_by.as_ref();

        while let Some(id) = gate {
            path.push(id.clone());
            if !seen.insert(id) {
                let cycle: Vec<&str> = path.iter().map(FeatureId::as_str).collect();
                return Err(SubtrackError::Configuration(format!(
                    "feature gating cycle: {}",
                    cycle.join(" -> ")
                )));
            }
            gate = features.get(id).and_then(|feature| feature.gated_by.as_ref());
        }
    }
    Ok(())
}
