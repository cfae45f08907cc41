//! Effective entitlement resolution.
//!
//! For one feature under the account's plan:
//!
//! - no grant: disabled
//! - boolean grant: enabled when allowed
//! - quota grant: `remaining = max(0, limit - used)`, enabled while
//!   `remaining > 0`; an unlimited quota is always enabled
//! - gated feature: additionally requires the gate to be effectively enabled
//!
//! Results are memoized in the REQUEST cache under
//! `entitlement:<user_id>:<feature>`, so a request reads each counter once.

use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::catalog::PlanCatalog;
use super::feature::{EffectiveEntitlement, Feature, FeatureId, FeatureType, Grant, PlanEntitlement};
use super::usage::UsageStore;
use crate::auth::Account;
use crate::cache::{CacheLeveledExt, CacheOptions};
use crate::constants::ENTITLEMENT_CACHE_PREFIX;
use crate::context::RequestContext;
use crate::error::{SubtrackError, SubtrackResult};

/// REQUEST cache key for a resolved entitlement
pub fn entitlement_cache_key(account: &Account, feature: &FeatureId) -> String {
    format!("{ENTITLEMENT_CACHE_PREFIX}:{}:{feature}", account.user_id)
}

#[derive(Clone)]
pub struct EntitlementEngine {
    catalog: Arc<PlanCatalog>,
    usage: Arc<dyn UsageStore>,
}

impl std::fmt::Debug for EntitlementEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntitlementEngine")
            .field("catalog", &self.catalog)
            .finish_non_exhaustive()
    }
}

impl EntitlementEngine {
    pub fn new(catalog: Arc<PlanCatalog>, usage: Arc<dyn UsageStore>) -> Self {
        Self { catalog, usage }
    }

    pub fn catalog(&self) -> &Arc<PlanCatalog> {
        &self.catalog
    }

    /// Effective entitlement of one feature for `account`
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        account: &Account,
        feature: &FeatureId,
    ) -> SubtrackResult<EffectiveEntitlement> {
        let mut visiting = HashSet::new();
        self.resolve_gated(ctx, account, feature.clone(), &mut visiting)
            .await
    }

    /// Effective entitlements for a set of features, in input order
    pub async fn resolve_all(
        &self,
        ctx: &RequestContext,
        account: &Account,
        features: &[FeatureId],
    ) -> SubtrackResult<Vec<EffectiveEntitlement>> {
        let mut resolved = Vec::with_capacity(features.len());
        for feature in features {
            resolved.push(self.resolve(ctx, account, feature).await?);
        }
        Ok(resolved)
    }

    /// Effective entitlements for every quota feature in the catalog
    pub async fn resolve_quotas(
        &self,
        ctx: &RequestContext,
        account: &Account,
    ) -> SubtrackResult<Vec<EffectiveEntitlement>> {
        let quotas = self.catalog.quota_features();
        self.resolve_all(ctx, account, &quotas).await
    }

    /// Resolve and require the feature to be enabled
    pub async fn check(
        &self,
        ctx: &RequestContext,
        account: &Account,
        feature: &FeatureId,
    ) -> SubtrackResult<EffectiveEntitlement> {
        let entitlement = self.resolve(ctx, account, feature).await?;
        if entitlement.enabled {
            return Ok(entitlement);
        }

        let reason = match (entitlement.feature_type, entitlement.limit, entitlement.used) {
            (FeatureType::Quota, Some(limit), Some(used)) if used >= limit => {
                format!("quota for '{feature}' exhausted ({used}/{limit})")
            }
            _ => format!("feature '{feature}' is not enabled for this plan"),
        };
        debug!(user_id = %account.user_id, feature = %feature, reason = %reason, "Entitlement check denied");
        Err(SubtrackError::Unauthorized(reason))
    }

    fn resolve_gated<'a>(
        &'a self,
        ctx: &'a RequestContext,
        account: &'a Account,
        feature_id: FeatureId,
        visiting: &'a mut HashSet<FeatureId>,
    ) -> BoxFuture<'a, SubtrackResult<EffectiveEntitlement>> {
        async move {
            let feature = self
                .catalog
                .feature(&feature_id)
                .ok_or_else(|| SubtrackError::FeatureNotFound(feature_id.clone()))?;

            let key = entitlement_cache_key(account, &feature_id);
            if let Some(memo) = ctx.request_cache().get_as::<EffectiveEntitlement>(&key).await {
                return Ok(memo);
            }

            if !visiting.insert(feature_id.clone()) {
                // Unreachable for a catalog that passed validation
                warn!(feature = %feature_id, "Feature gating cycle at resolve time, treating gate as closed");
                return Ok(EffectiveEntitlement::disabled(feature));
            }

            let mut entitlement = self.resolve_own(ctx, account, feature).await?;
            if let Some(gate) = &feature.gated_by {
                let gate_state = self
                    .resolve_gated(ctx, account, gate.clone(), visiting)
                    .await?;
                entitlement.enabled &= gate_state.enabled;
            }

            ctx.request_cache()
                .set_as(&key, &entitlement, CacheOptions::default())
                .await;
            debug!(
                user_id = %account.user_id,
                feature = %feature_id,
                enabled = entitlement.enabled,
                remaining = ?entitlement.remaining,
                "Resolved entitlement"
            );
            Ok(entitlement)
        }
        .boxed()
    }

    /// State of the feature from its own grant and counter, ignoring gates
    async fn resolve_own(
        &self,
        ctx: &RequestContext,
        account: &Account,
        feature: &Feature,
    ) -> SubtrackResult<EffectiveEntitlement> {
        let Some(grant) = self.plan_grant(account, &feature.id)? else {
            return Ok(EffectiveEntitlement::disabled(feature));
        };

        match (feature.feature_type, grant.grant) {
            (FeatureType::Boolean, Grant::Allowed(allowed)) => {
                Ok(EffectiveEntitlement::boolean(feature, allowed))
            }
            (FeatureType::Quota, Grant::Limit(limit)) => {
                ctx.ensure_active()?;
                let used = ctx
                    .run(self.usage.get(account, &feature.id))
                    .await?
                    .map_or(0, |counter| counter.used);
                Ok(EffectiveEntitlement::quota(feature, limit, used))
            }
            (feature_type, grant) => Err(SubtrackError::Configuration(format!(
                "grant {grant:?} does not match {feature_type:?} feature '{}'",
                feature.id
            ))),
        }
    }

    fn plan_grant(
        &self,
        account: &Account,
        feature: &FeatureId,
    ) -> SubtrackResult<Option<&PlanEntitlement>> {
        let plan = account
            .plan
            .as_ref()
            .ok_or_else(|| SubtrackError::PlanNotFound("<none>".to_string()))?;
        let table = self
            .catalog
            .plan(plan)
            .ok_or_else(|| SubtrackError::PlanNotFound(plan.to_string()))?;
        Ok(table.get(feature))
    }
}
