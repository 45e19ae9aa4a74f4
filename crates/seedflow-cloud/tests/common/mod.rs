use async_trait::async_trait;
use seedflow_cloud::{
    AuthStatus, BucketSpec, CloudError, ControlPlane, OidcProviderSpec, RegistrySpec, Result,
};
use seedflow_core::{BootstrapConfig, OrgPolicy, ServiceAccount, parse_kdl_string};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub const POOL_NAME: &str = "projects/314159265358/locations/global/workloadIdentityPools/github-pool";

pub fn sample_config() -> BootstrapConfig {
    parse_kdl_string(
        r#"
        organization "123456789012"
        folder "987654321098"
        billing-account "01ABCD-234567-89EFAB"
        domain "example.com"
        repository "my-org/infra"
        project "acme"
        region "asia-northeast1"
        "#,
    )
    .unwrap()
}

/// In-memory control plane that records every call
pub struct MockControlPlane {
    calls: Mutex<Vec<String>>,
    existing: Mutex<HashSet<String>>,
    /// Remaining existence checks before a freshly created resource shows up
    hidden: Mutex<HashMap<String, u32>>,
    enabled: Mutex<HashMap<String, Vec<String>>>,
    policies: Mutex<Vec<OrgPolicy>>,
    visibility_delay: u32,
    /// IAM bindings still rejected before the new identities propagate
    binding_rejections: Mutex<u32>,
    fail_on: Option<String>,
}

impl MockControlPlane {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            existing: Mutex::new(HashSet::new()),
            hidden: Mutex::new(HashMap::new()),
            enabled: Mutex::new(HashMap::new()),
            policies: Mutex::new(Vec::new()),
            visibility_delay: 0,
            binding_rejections: Mutex::new(0),
            fail_on: None,
        }
    }

    /// Fail every call whose log line contains `needle`
    pub fn failing_on(mut self, needle: &str) -> Self {
        self.fail_on = Some(needle.to_string());
        self
    }

    /// Created resources stay invisible for `checks` existence checks
    pub fn with_visibility_delay(mut self, checks: u32) -> Self {
        self.visibility_delay = checks;
        self
    }

    /// The first `count` bucket/service-account bindings fail as if the
    /// member had not propagated yet
    pub fn rejecting_bindings(self, count: u32) -> Self {
        *self.binding_rejections.lock().unwrap() = count;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    pub fn policies(&self) -> Vec<OrgPolicy> {
        self.policies.lock().unwrap().clone()
    }

    fn call(&self, line: String) -> Result<()> {
        self.calls.lock().unwrap().push(line.clone());
        match &self.fail_on {
            Some(needle) if line.contains(needle.as_str()) => {
                Err(CloudError::CommandFailed(format!("PERMISSION_DENIED: {}", line)))
            }
            _ => Ok(()),
        }
    }

    fn bind(&self, line: String) -> Result<()> {
        self.call(line.clone())?;
        let mut remaining = self.binding_rejections.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            return Err(CloudError::CommandFailed(format!(
                "INVALID_ARGUMENT: member does not exist: {}",
                line
            )));
        }
        Ok(())
    }

    fn exists(&self, key: String) -> Result<bool> {
        self.call(format!("exists {}", key))?;
        let mut hidden = self.hidden.lock().unwrap();
        if let Some(remaining) = hidden.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(false);
            }
            hidden.remove(&key);
        }
        Ok(self.existing.lock().unwrap().contains(&key))
    }

    fn create(&self, key: String, line: String) -> Result<()> {
        self.call(line)?;
        if self.visibility_delay > 0 {
            self.hidden
                .lock()
                .unwrap()
                .insert(key.clone(), self.visibility_delay);
        }
        self.existing.lock().unwrap().insert(key);
        Ok(())
    }
}

#[async_trait]
impl ControlPlane for MockControlPlane {
    fn name(&self) -> &str {
        "mock"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        Ok(AuthStatus::ok("ops@example.com"))
    }

    async fn project_exists(&self, project_id: &str) -> Result<bool> {
        self.exists(format!("project:{}", project_id))
    }

    async fn create_project(&self, project_id: &str, folder_id: &str) -> Result<()> {
        self.create(
            format!("project:{}", project_id),
            format!("create_project {} folder={}", project_id, folder_id),
        )
    }

    async fn link_billing(&self, project_id: &str, billing_account: &str) -> Result<()> {
        self.call(format!("link_billing {} {}", project_id, billing_account))
    }

    async fn set_active_project(&self, project_id: &str) -> Result<()> {
        self.call(format!("set_active_project {}", project_id))
    }

    async fn enable_services(&self, project_id: &str, services: &[&str]) -> Result<()> {
        self.call(format!("enable_services {} {}", project_id, services.join(",")))?;
        self.enabled
            .lock()
            .unwrap()
            .entry(project_id.to_string())
            .or_default()
            .extend(services.iter().map(|s| s.to_string()));
        Ok(())
    }

    async fn enabled_services(&self, project_id: &str) -> Result<Vec<String>> {
        self.call(format!("enabled_services {}", project_id))?;
        Ok(self
            .enabled
            .lock()
            .unwrap()
            .get(project_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn grant_project_role(&self, project_id: &str, member: &str, role: &str) -> Result<()> {
        self.call(format!("grant_project_role {} {} {}", project_id, member, role))
    }

    async fn set_org_policy(&self, policy: &OrgPolicy) -> Result<()> {
        self.call(format!("set_org_policy {}", policy.name))?;
        self.policies.lock().unwrap().push(policy.clone());
        Ok(())
    }

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        self.exists(format!("bucket:{}", bucket))
    }

    async fn create_bucket(&self, project_id: &str, bucket: &BucketSpec) -> Result<()> {
        self.create(
            format!("bucket:{}", bucket.name),
            format!(
                "create_bucket {} {} location={} uniform={}",
                project_id, bucket.name, bucket.location, bucket.uniform_access
            ),
        )
    }

    async fn enable_bucket_versioning(&self, bucket: &str) -> Result<()> {
        self.call(format!("enable_bucket_versioning {}", bucket))
    }

    async fn grant_bucket_role(&self, bucket: &str, member: &str, role: &str) -> Result<()> {
        self.bind(format!("grant_bucket_role {} {} {}", bucket, member, role))
    }

    async fn service_account_exists(&self, account: &ServiceAccount) -> Result<bool> {
        self.exists(format!("service-account:{}", account.email()))
    }

    async fn create_service_account(&self, account: &ServiceAccount) -> Result<()> {
        self.create(
            format!("service-account:{}", account.email()),
            format!(
                "create_service_account {} {}",
                account.email(),
                account.display_name
            ),
        )
    }

    async fn grant_service_account_role(
        &self,
        account: &ServiceAccount,
        member: &str,
        role: &str,
    ) -> Result<()> {
        self.bind(format!(
            "grant_service_account_role {} {} {}",
            account.email(),
            member,
            role
        ))
    }

    async fn pool_exists(&self, project_id: &str, pool_id: &str) -> Result<bool> {
        self.exists(format!("pool:{}/{}", project_id, pool_id))
    }

    async fn create_pool(&self, project_id: &str, pool_id: &str, display_name: &str) -> Result<()> {
        self.create(
            format!("pool:{}/{}", project_id, pool_id),
            format!("create_pool {} {} {}", project_id, pool_id, display_name),
        )
    }

    async fn provider_exists(
        &self,
        project_id: &str,
        pool_id: &str,
        provider_id: &str,
    ) -> Result<bool> {
        self.exists(format!("provider:{}/{}/{}", project_id, pool_id, provider_id))
    }

    async fn create_oidc_provider(
        &self,
        project_id: &str,
        provider: &OidcProviderSpec,
    ) -> Result<()> {
        self.create(
            format!(
                "provider:{}/{}/{}",
                project_id, provider.pool_id, provider.provider_id
            ),
            format!(
                "create_oidc_provider {} {} condition={}",
                project_id, provider.provider_id, provider.attribute_condition
            ),
        )
    }

    async fn describe_pool(&self, project_id: &str, pool_id: &str) -> Result<String> {
        self.call(format!("describe_pool {} {}", project_id, pool_id))?;
        Ok(POOL_NAME.to_string())
    }

    async fn registry_exists(&self, project_id: &str, location: &str, name: &str) -> Result<bool> {
        self.exists(format!("registry:{}/{}/{}", project_id, location, name))
    }

    async fn create_registry(&self, project_id: &str, registry: &RegistrySpec) -> Result<()> {
        self.create(
            format!(
                "registry:{}/{}/{}",
                project_id, registry.location, registry.name
            ),
            format!(
                "create_registry {} {} format={}",
                project_id, registry.name, registry.format
            ),
        )
    }
}
