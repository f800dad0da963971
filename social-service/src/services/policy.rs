//! Role / resource / action policy decisions, backed by casbin.
//!
//! The model (`config/rbac.conf`) and the rule table (`config/policy.csv`)
//! are loaded once at startup:
//!
//! ```text
//! p, <role>, <resource>, <action>
//! ```
//!
//! A resource is matched with `keyMatch`, so it is an exact route template
//! (`/v1/user/:id`) or a prefix ending in `*` (`/swagger*`, or `*` for
//! everything). An action is an HTTP verb or `*`. Anything not explicitly
//! allowed is denied.

use casbin::{CoreApi, DefaultModel, Enforcer, FileAdapter, MemoryAdapter, MgmtApi};
use std::path::Path;
use thiserror::Error;

/// The request/policy model shipped next to the rule table.
pub const RBAC_MODEL: &str = include_str!("../../config/rbac.conf");

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Failed to load policy from {path}: {source}")]
    Load {
        path: String,
        #[source]
        source: casbin::Error,
    },
    #[error("Policy evaluation failed: {0}")]
    Casbin(#[from] casbin::Error),
}

/// Answers "may `role` perform `action` on `resource`?".
pub trait PolicyEngine: Send + Sync {
    fn enforce(&self, role: &str, resource: &str, action: &str) -> Result<bool, PolicyError>;
}

pub struct CasbinPolicy {
    enforcer: Enforcer,
}

impl CasbinPolicy {
    /// Build the enforcer from a model file and a CSV rule table.
    pub async fn load(
        model_path: impl AsRef<Path>,
        policy_path: impl AsRef<Path>,
    ) -> Result<Self, PolicyError> {
        let model_path = model_path.as_ref();
        let policy_path = policy_path.as_ref();

        let model = DefaultModel::from_file(model_path)
            .await
            .map_err(|source| PolicyError::Load {
                path: model_path.display().to_string(),
                source,
            })?;
        let adapter = FileAdapter::new(policy_path.to_path_buf());
        let enforcer = Enforcer::new(model, adapter)
            .await
            .map_err(|source| PolicyError::Load {
                path: policy_path.display().to_string(),
                source,
            })?;

        tracing::info!(
            model = %model_path.display(),
            policy = %policy_path.display(),
            rules = enforcer.get_policy().len(),
            "Policy loaded"
        );
        Ok(Self { enforcer })
    }

    /// Build the enforcer over the shipped model and an in-memory table.
    pub async fn from_rules(rules: &[[&str; 3]]) -> Result<Self, PolicyError> {
        let model = DefaultModel::from_str(RBAC_MODEL).await?;
        let mut enforcer = Enforcer::new(model, MemoryAdapter::default()).await?;
        if !rules.is_empty() {
            let rules = rules
                .iter()
                .map(|rule| rule.iter().map(|field| field.to_string()).collect())
                .collect();
            enforcer.add_policies(rules).await?;
        }
        Ok(Self { enforcer })
    }

    pub fn len(&self) -> usize {
        self.enforcer.get_policy().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PolicyEngine for CasbinPolicy {
    fn enforce(&self, role: &str, resource: &str, action: &str) -> Result<bool, PolicyError> {
        Ok(self.enforcer.enforce((role, resource, action))?)
    }
}
