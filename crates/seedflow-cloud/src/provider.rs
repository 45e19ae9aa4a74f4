//! Control-plane trait definition

use crate::error::Result;
use async_trait::async_trait;
use seedflow_core::{OrgPolicy, ServiceAccount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Resource-management control plane
///
/// Every provisioning call the sequencer makes goes through this trait.
/// Existence checks return `Ok(false)` for absent resources; only real
/// failures are errors.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Returns the control-plane name (e.g., "gcloud")
    fn name(&self) -> &str;

    /// Check if the control plane is reachable and authenticated
    async fn check_auth(&self) -> Result<AuthStatus>;

    // ========== Projects ==========

    async fn project_exists(&self, project_id: &str) -> Result<bool>;

    async fn create_project(&self, project_id: &str, folder_id: &str) -> Result<()>;

    async fn link_billing(&self, project_id: &str, billing_account: &str) -> Result<()>;

    /// Make `project_id` the default project for subsequent calls
    async fn set_active_project(&self, project_id: &str) -> Result<()>;

    async fn enable_services(&self, project_id: &str, services: &[&str]) -> Result<()>;

    async fn enabled_services(&self, project_id: &str) -> Result<Vec<String>>;

    async fn grant_project_role(&self, project_id: &str, member: &str, role: &str) -> Result<()>;

    async fn set_org_policy(&self, policy: &OrgPolicy) -> Result<()>;

    // ========== Storage ==========

    async fn bucket_exists(&self, bucket: &str) -> Result<bool>;

    async fn create_bucket(&self, project_id: &str, bucket: &BucketSpec) -> Result<()>;

    async fn enable_bucket_versioning(&self, bucket: &str) -> Result<()>;

    async fn grant_bucket_role(&self, bucket: &str, member: &str, role: &str) -> Result<()>;

    // ========== Service accounts ==========

    async fn service_account_exists(&self, account: &ServiceAccount) -> Result<bool>;

    async fn create_service_account(&self, account: &ServiceAccount) -> Result<()>;

    /// Add an IAM binding on the service account resource itself
    async fn grant_service_account_role(
        &self,
        account: &ServiceAccount,
        member: &str,
        role: &str,
    ) -> Result<()>;

    // ========== Workload Identity Federation ==========

    async fn pool_exists(&self, project_id: &str, pool_id: &str) -> Result<bool>;

    async fn create_pool(&self, project_id: &str, pool_id: &str, display_name: &str)
    -> Result<()>;

    async fn provider_exists(
        &self,
        project_id: &str,
        pool_id: &str,
        provider_id: &str,
    ) -> Result<bool>;

    async fn create_oidc_provider(
        &self,
        project_id: &str,
        provider: &OidcProviderSpec,
    ) -> Result<()>;

    /// Canonical resource name of the pool as reported by the control plane
    async fn describe_pool(&self, project_id: &str, pool_id: &str) -> Result<String>;

    // ========== Artifact Registry ==========

    async fn registry_exists(&self, project_id: &str, location: &str, name: &str)
    -> Result<bool>;

    async fn create_registry(&self, project_id: &str, registry: &RegistrySpec) -> Result<()>;

    // ========== Readiness ==========

    /// Whether the resource behind `probe` is visible yet
    async fn is_ready(&self, probe: &Probe) -> Result<bool> {
        match probe {
            Probe::Project(project_id) => self.project_exists(project_id).await,
            Probe::ServiceAccount(account) => self.service_account_exists(account).await,
            Probe::Pool {
                project_id,
                pool_id,
            } => self.pool_exists(project_id, pool_id).await,
            Probe::Services {
                project_id,
                services,
            } => {
                let enabled = self.enabled_services(project_id).await?;
                Ok(services.iter().all(|s| enabled.iter().any(|e| e == s)))
            }
        }
    }
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Account information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}

/// State bucket to create
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub name: String,
    pub location: String,
    pub uniform_access: bool,
}

/// OIDC provider beneath a workload identity pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcProviderSpec {
    pub provider_id: String,
    pub pool_id: String,
    pub display_name: String,
    pub issuer_uri: String,
    pub attribute_mapping: String,
    pub attribute_condition: String,
}

/// Container image registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySpec {
    pub name: String,
    pub location: String,
    pub format: String,
    pub description: String,
}

/// Condition awaited after an asynchronous create
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Project(String),
    ServiceAccount(ServiceAccount),
    Pool { project_id: String, pool_id: String },
    Services {
        project_id: String,
        services: Vec<String>,
    },
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Project(id) => write!(f, "project {}", id),
            Probe::ServiceAccount(account) => write!(f, "service account {}", account.email()),
            Probe::Pool {
                project_id,
                pool_id,
            } => write!(f, "pool {} in {}", pool_id, project_id),
            Probe::Services {
                project_id,
                services,
            } => write!(f, "{} services on {}", services.len(), project_id),
        }
    }
}

/// Retry configuration for readiness polling
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of attempts
    pub max_attempts: u32,

    /// Initial delay between attempts
    pub initial_delay: std::time::Duration,

    /// Maximum delay between attempts
    pub max_delay: std::time::Duration,

    /// Backoff multiplier
    pub backoff_multiplier: f64,
}

impl RetryConfig {
    /// Delay before the attempt following `attempt` (0-based), capped at `max_delay`
    pub fn delay_for_attempt(&self, attempt: u32) -> std::time::Duration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let millis = (self.initial_delay.as_millis() as f64 * factor) as u128;
        let capped = millis.min(self.max_delay.as_millis());
        std::time::Duration::from_millis(capped as u64)
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            initial_delay: std::time::Duration::from_secs(2),
            max_delay: std::time::Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}
