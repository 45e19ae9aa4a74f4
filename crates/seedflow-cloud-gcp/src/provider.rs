//! Google Cloud control plane
//!
//! Implements the ControlPlane trait on top of the gcloud CLI.

use crate::error::GcpError;
use crate::gcloud::Gcloud;
use async_trait::async_trait;
use seedflow_cloud::{
    AuthStatus, BucketSpec, ControlPlane, OidcProviderSpec, RegistrySpec, Result,
};
use seedflow_core::{IDENTITY_LOCATION, OrgPolicy, ServiceAccount};
use std::io::Write;

/// Google Cloud control plane
pub struct GcpControlPlane {
    gcloud: Gcloud,
}

impl GcpControlPlane {
    pub fn new() -> Self {
        Self {
            gcloud: Gcloud::new(),
        }
    }

    /// A control plane that only records what it would run
    pub fn dry_run() -> Self {
        Self {
            gcloud: Gcloud::dry_run(),
        }
    }

    /// Commands recorded in dry-run mode, in execution order
    pub fn recorded_commands(&self) -> Vec<String> {
        self.gcloud.recorded()
    }
}

impl Default for GcpControlPlane {
    fn default() -> Self {
        Self::new()
    }
}

fn flag(name: &str, value: &str) -> String {
    format!("--{}={}", name, value)
}

fn bucket_url(bucket: &str) -> String {
    format!("gs://{}", bucket)
}

#[async_trait]
impl ControlPlane for GcpControlPlane {
    fn name(&self) -> &str {
        "gcloud"
    }

    async fn check_auth(&self) -> Result<AuthStatus> {
        match self.gcloud.check_auth().await {
            Ok(account) => Ok(AuthStatus::ok(account.account)),
            Err(e) => Ok(AuthStatus::failed(e.to_string())),
        }
    }

    // ========== Projects ==========

    async fn project_exists(&self, project_id: &str) -> Result<bool> {
        let found = self
            .gcloud
            .probe(&["projects", "describe", project_id, "--format=value(projectId)"])
            .await?;
        Ok(found.is_some())
    }

    async fn create_project(&self, project_id: &str, folder_id: &str) -> Result<()> {
        let folder = flag("folder", folder_id);
        self.gcloud
            .mutate(&["projects", "create", project_id, &folder])
            .await?;
        Ok(())
    }

    async fn link_billing(&self, project_id: &str, billing_account: &str) -> Result<()> {
        let account = flag("billing-account", billing_account);
        self.gcloud
            .mutate(&["billing", "projects", "link", project_id, &account])
            .await?;
        Ok(())
    }

    async fn set_active_project(&self, project_id: &str) -> Result<()> {
        self.gcloud
            .mutate(&["config", "set", "project", project_id])
            .await?;
        Ok(())
    }

    async fn enable_services(&self, project_id: &str, services: &[&str]) -> Result<()> {
        let project = flag("project", project_id);
        let mut args = vec!["services", "enable"];
        args.extend_from_slice(services);
        args.push(&project);

        self.gcloud.mutate(&args).await?;
        Ok(())
    }

    async fn enabled_services(&self, project_id: &str) -> Result<Vec<String>> {
        let project = flag("project", project_id);
        let output = self
            .gcloud
            .read(&[
                "services",
                "list",
                "--enabled",
                &project,
                "--format=value(config.name)",
            ])
            .await?;

        Ok(output
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    async fn grant_project_role(&self, project_id: &str, member: &str, role: &str) -> Result<()> {
        let member = flag("member", member);
        let role = flag("role", role);
        self.gcloud
            .mutate(&[
                "projects",
                "add-iam-policy-binding",
                project_id,
                &member,
                &role,
                "--condition=None",
                "--format=none",
            ])
            .await?;
        Ok(())
    }

    async fn set_org_policy(&self, policy: &OrgPolicy) -> Result<()> {
        let yaml = policy.to_yaml()?;

        if self.gcloud.is_dry_run() {
            // 一時ファイルのパスは毎回変わるのでポリシー名から表示用の名前を作る
            let label = format!("{}.yaml", policy.name.replace('/', "_"));
            self.gcloud
                .mutate(&["org-policies", "set-policy", &label])
                .await?;
            return Ok(());
        }

        let mut file = tempfile::Builder::new()
            .prefix("seedflow-policy-")
            .suffix(".yaml")
            .tempfile()?;
        file.write_all(yaml.as_bytes())?;
        file.flush()?;

        let path = file.path().to_string_lossy().to_string();
        tracing::debug!("Applying org policy {} from {}", policy.name, path);
        self.gcloud
            .mutate(&["org-policies", "set-policy", &path])
            .await?;
        Ok(())
    }

    // ========== Storage ==========

    async fn bucket_exists(&self, bucket: &str) -> Result<bool> {
        let url = bucket_url(bucket);
        let found = self
            .gcloud
            .probe(&["storage", "buckets", "describe", &url, "--format=value(name)"])
            .await?;
        Ok(found.is_some())
    }

    async fn create_bucket(&self, project_id: &str, bucket: &BucketSpec) -> Result<()> {
        let url = bucket_url(&bucket.name);
        let project = flag("project", project_id);
        let location = flag("location", &bucket.location);

        let mut args = vec![
            "storage",
            "buckets",
            "create",
            url.as_str(),
            project.as_str(),
            location.as_str(),
        ];
        if bucket.uniform_access {
            args.push("--uniform-bucket-level-access");
        }

        self.gcloud.mutate(&args).await?;
        Ok(())
    }

    async fn enable_bucket_versioning(&self, bucket: &str) -> Result<()> {
        let url = bucket_url(bucket);
        self.gcloud
            .mutate(&["storage", "buckets", "update", &url, "--versioning"])
            .await?;
        Ok(())
    }

    async fn grant_bucket_role(&self, bucket: &str, member: &str, role: &str) -> Result<()> {
        let url = bucket_url(bucket);
        let member = flag("member", member);
        let role = flag("role", role);
        self.gcloud
            .mutate(&[
                "storage",
                "buckets",
                "add-iam-policy-binding",
                &url,
                &member,
                &role,
            ])
            .await?;
        Ok(())
    }

    // ========== Service accounts ==========

    async fn service_account_exists(&self, account: &ServiceAccount) -> Result<bool> {
        let email = account.email();
        let project = flag("project", &account.project_id);
        let found = self
            .gcloud
            .probe(&[
                "iam",
                "service-accounts",
                "describe",
                &email,
                &project,
                "--format=value(email)",
            ])
            .await?;
        Ok(found.is_some())
    }

    async fn create_service_account(&self, account: &ServiceAccount) -> Result<()> {
        let project = flag("project", &account.project_id);
        let display_name = flag("display-name", &account.display_name);
        self.gcloud
            .mutate(&[
                "iam",
                "service-accounts",
                "create",
                &account.account_id,
                &project,
                &display_name,
            ])
            .await?;
        Ok(())
    }

    async fn grant_service_account_role(
        &self,
        account: &ServiceAccount,
        member: &str,
        role: &str,
    ) -> Result<()> {
        let email = account.email();
        let project = flag("project", &account.project_id);
        let role = flag("role", role);
        let member = flag("member", member);
        self.gcloud
            .mutate(&[
                "iam",
                "service-accounts",
                "add-iam-policy-binding",
                &email,
                &project,
                &role,
                &member,
            ])
            .await?;
        Ok(())
    }

    // ========== Workload Identity Federation ==========

    async fn pool_exists(&self, project_id: &str, pool_id: &str) -> Result<bool> {
        let project = flag("project", project_id);
        let location = flag("location", IDENTITY_LOCATION);
        let found = self
            .gcloud
            .probe(&[
                "iam",
                "workload-identity-pools",
                "describe",
                pool_id,
                &project,
                &location,
                "--format=value(name)",
            ])
            .await?;
        Ok(found.is_some())
    }

    async fn create_pool(&self, project_id: &str, pool_id: &str, display_name: &str) -> Result<()> {
        let project = flag("project", project_id);
        let location = flag("location", IDENTITY_LOCATION);
        let display_name = flag("display-name", display_name);
        self.gcloud
            .mutate(&[
                "iam",
                "workload-identity-pools",
                "create",
                pool_id,
                &project,
                &location,
                &display_name,
            ])
            .await?;
        Ok(())
    }

    async fn provider_exists(
        &self,
        project_id: &str,
        pool_id: &str,
        provider_id: &str,
    ) -> Result<bool> {
        let project = flag("project", project_id);
        let location = flag("location", IDENTITY_LOCATION);
        let pool = flag("workload-identity-pool", pool_id);
        let found = self
            .gcloud
            .probe(&[
                "iam",
                "workload-identity-pools",
                "providers",
                "describe",
                provider_id,
                &project,
                &location,
                &pool,
                "--format=value(name)",
            ])
            .await?;
        Ok(found.is_some())
    }

    async fn create_oidc_provider(
        &self,
        project_id: &str,
        provider: &OidcProviderSpec,
    ) -> Result<()> {
        let project = flag("project", project_id);
        let location = flag("location", IDENTITY_LOCATION);
        let pool = flag("workload-identity-pool", &provider.pool_id);
        let display_name = flag("display-name", &provider.display_name);
        let issuer = flag("issuer-uri", &provider.issuer_uri);
        let mapping = flag("attribute-mapping", &provider.attribute_mapping);
        let condition = flag("attribute-condition", &provider.attribute_condition);
        self.gcloud
            .mutate(&[
                "iam",
                "workload-identity-pools",
                "providers",
                "create-oidc",
                &provider.provider_id,
                &project,
                &location,
                &pool,
                &display_name,
                &issuer,
                &mapping,
                &condition,
            ])
            .await?;
        Ok(())
    }

    async fn describe_pool(&self, project_id: &str, pool_id: &str) -> Result<String> {
        if self.gcloud.is_dry_run() {
            // 実際の名前はプロジェクト番号を含むが、ドライランでは ID で代用する
            return Ok(format!(
                "projects/{}/locations/{}/workloadIdentityPools/{}",
                project_id, IDENTITY_LOCATION, pool_id
            ));
        }

        let project = flag("project", project_id);
        let location = flag("location", IDENTITY_LOCATION);
        let name = self
            .gcloud
            .read(&[
                "iam",
                "workload-identity-pools",
                "describe",
                pool_id,
                &project,
                &location,
                "--format=value(name)",
            ])
            .await?;

        let name = name.trim();
        if name.is_empty() {
            return Err(GcpError::UnexpectedOutput(format!(
                "workload identity pool {} returned an empty name",
                pool_id
            ))
            .into());
        }
        Ok(name.to_string())
    }

    // ========== Artifact Registry ==========

    async fn registry_exists(&self, project_id: &str, location: &str, name: &str) -> Result<bool> {
        let project = flag("project", project_id);
        let location = flag("location", location);
        let found = self
            .gcloud
            .probe(&[
                "artifacts",
                "repositories",
                "describe",
                name,
                &project,
                &location,
                "--format=value(name)",
            ])
            .await?;
        Ok(found.is_some())
    }

    async fn create_registry(&self, project_id: &str, registry: &RegistrySpec) -> Result<()> {
        let project = flag("project", project_id);
        let location = flag("location", &registry.location);
        let format = flag("repository-format", &registry.format);
        let description = flag("description", &registry.description);
        self.gcloud
            .mutate(&[
                "artifacts",
                "repositories",
                "create",
                &registry.name,
                &project,
                &location,
                &format,
                &description,
            ])
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_reads_report_nothing() {
        let plane = GcpControlPlane::dry_run();

        assert!(!plane.project_exists("acme-dev").await.unwrap());
        assert!(!plane.bucket_exists("acme-terraform-state").await.unwrap());
        assert!(plane.enabled_services("acme-dev").await.unwrap().is_empty());
        assert!(plane.recorded_commands().is_empty());
    }

    #[tokio::test]
    async fn test_dry_run_pool_name() {
        let plane = GcpControlPlane::dry_run();
        assert_eq!(
            plane.describe_pool("acme-shared", "github-pool").await.unwrap(),
            "projects/acme-shared/locations/global/workloadIdentityPools/github-pool"
        );
    }

    #[tokio::test]
    async fn test_bucket_creation_flags() {
        let plane = GcpControlPlane::dry_run();
        let spec = BucketSpec {
            name: "acme-terraform-state".to_string(),
            location: "asia-northeast1".to_string(),
            uniform_access: true,
        };

        plane.create_bucket("acme-shared", &spec).await.unwrap();
        plane
            .enable_bucket_versioning("acme-terraform-state")
            .await
            .unwrap();

        assert_eq!(
            plane.recorded_commands(),
            vec![
                "gcloud storage buckets create gs://acme-terraform-state --project=acme-shared --location=asia-northeast1 --uniform-bucket-level-access",
                "gcloud storage buckets update gs://acme-terraform-state --versioning",
            ]
        );
    }

    #[tokio::test]
    async fn test_org_policy_uses_stable_label() {
        let plane = GcpControlPlane::dry_run();
        let policy = OrgPolicy::allow_all_members("acme-prod");

        plane.set_org_policy(&policy).await.unwrap();

        assert_eq!(
            plane.recorded_commands(),
            vec![
                "gcloud org-policies set-policy projects_acme-prod_policies_iam.allowedPolicyMemberDomains.yaml"
            ]
        );
    }
}
