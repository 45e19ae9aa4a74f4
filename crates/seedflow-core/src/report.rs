//! CI への転記用レポート
//!
//! GitHub のリポジトリ変数・環境変数・環境シークレットに手で登録する値を
//! 登録先ごとにまとめる。シークレットの値は空欄（運用者が生成する）。

use crate::error::Result;
use crate::model::{BootstrapConfig, Environment, provider_resource_name};
use serde::Serialize;
use std::fmt;

/// プール名が取得できなかった場合の表示
pub const UNKNOWN_POOL: &str = "<未取得: `seed report` で再取得してください>";

/// 環境ごとに空欄で出力するシークレット
pub const ENVIRONMENT_SECRETS: &[&str] = &["DATABASE_PASSWORD", "SECRET_KEY"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportEntry {
    pub name: String,
    pub value: String,
}

impl ExportEntry {
    fn new(name: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentExport {
    pub environment: Environment,
    pub variables: Vec<ExportEntry>,
    pub secrets: Vec<ExportEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportReport {
    pub repository_variables: Vec<ExportEntry>,
    pub environments: Vec<EnvironmentExport>,
}

impl ExportReport {
    /// `pool_name` はプールを問い合わせて得た正規名
    pub fn build(config: &BootstrapConfig, pool_name: Option<&str>) -> Self {
        let provider = pool_name
            .map(|pool| provider_resource_name(pool, &config.identity_provider))
            .unwrap_or_else(|| UNKNOWN_POOL.to_string());

        let repository_variables = vec![
            ExportEntry::new("GCP_ORGANIZATION_ID", &config.organization_id),
            ExportEntry::new("GCP_SHARED_PROJECT_ID", &config.projects.shared),
            ExportEntry::new("GCP_REGION", &config.region),
            ExportEntry::new("GCP_WORKLOAD_IDENTITY_PROVIDER", provider),
            ExportEntry::new("TF_STATE_BUCKET", &config.state_bucket),
            ExportEntry::new("ARTIFACT_REGISTRY", config.registry_path()),
        ];

        let environments = Environment::ALL
            .iter()
            .map(|env| EnvironmentExport {
                environment: *env,
                variables: vec![
                    ExportEntry::new("GCP_PROJECT_ID", config.projects.for_env(*env)),
                    ExportEntry::new("GCP_SERVICE_ACCOUNT", config.service_account(*env).email()),
                    ExportEntry::new("DOMAIN", config.domain_for(*env)),
                ],
                secrets: ENVIRONMENT_SECRETS
                    .iter()
                    .map(|name| ExportEntry::new(name, ""))
                    .collect(),
            })
            .collect();

        Self {
            repository_variables,
            environments,
        }
    }

    pub fn environment(&self, env: Environment) -> Option<&EnvironmentExport> {
        self.environments.iter().find(|e| e.environment == env)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for ExportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Repository variables")?;
        for entry in &self.repository_variables {
            writeln!(f, "{}={}", entry.name, entry.value)?;
        }

        for env in &self.environments {
            writeln!(f)?;
            writeln!(f, "# Environment \"{}\" variables", env.environment)?;
            for entry in &env.variables {
                writeln!(f, "{}={}", entry.name, entry.value)?;
            }
            writeln!(f)?;
            writeln!(f, "# Environment \"{}\" secrets (値を生成して登録)", env.environment)?;
            for entry in &env.secrets {
                writeln!(f, "{}={}", entry.name, entry.value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_kdl_string;

    const POOL: &str = "projects/314159265358/locations/global/workloadIdentityPools/github-pool";

    fn config() -> BootstrapConfig {
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

    fn value<'a>(entries: &'a [ExportEntry], name: &str) -> &'a str {
        entries
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.value.as_str())
            .unwrap()
    }

    #[test]
    fn test_repository_variables() {
        let report = ExportReport::build(&config(), Some(POOL));
        let vars = &report.repository_variables;

        assert_eq!(value(vars, "GCP_SHARED_PROJECT_ID"), "acme-shared");
        assert_eq!(
            value(vars, "GCP_WORKLOAD_IDENTITY_PROVIDER"),
            format!("{}/providers/github-provider", POOL)
        );
        assert_eq!(value(vars, "TF_STATE_BUCKET"), "acme-terraform-state");
        assert_eq!(
            value(vars, "ARTIFACT_REGISTRY"),
            "asia-northeast1-docker.pkg.dev/acme-shared/containers"
        );
    }

    #[test]
    fn test_environment_variables_and_blank_secrets() {
        let report = ExportReport::build(&config(), Some(POOL));
        assert_eq!(report.environments.len(), 2);

        let dev = report.environment(Environment::Dev).unwrap();
        assert_eq!(value(&dev.variables, "GCP_PROJECT_ID"), "acme-dev");
        assert_eq!(
            value(&dev.variables, "GCP_SERVICE_ACCOUNT"),
            "terraform-dev@acme-shared.iam.gserviceaccount.com"
        );
        assert_eq!(value(&dev.variables, "DOMAIN"), "dev.example.com");

        let prod = report.environment(Environment::Prod).unwrap();
        assert_eq!(value(&prod.variables, "DOMAIN"), "example.com");

        for env in &report.environments {
            assert_eq!(env.secrets.len(), ENVIRONMENT_SECRETS.len());
            assert!(env.secrets.iter().all(|s| s.value.is_empty()));
        }
    }

    #[test]
    fn test_unknown_pool_placeholder() {
        let report = ExportReport::build(&config(), None);
        assert_eq!(
            value(&report.repository_variables, "GCP_WORKLOAD_IDENTITY_PROVIDER"),
            UNKNOWN_POOL
        );
    }

    #[test]
    fn test_text_rendering_groups() {
        let text = ExportReport::build(&config(), Some(POOL)).to_string();
        assert!(text.starts_with("# Repository variables\n"));
        assert!(text.contains("# Environment \"dev\" variables"));
        assert!(text.contains("# Environment \"prod\" secrets"));
        assert!(text.contains("DATABASE_PASSWORD=\n"));
    }

    #[test]
    fn test_json_rendering() {
        let json = ExportReport::build(&config(), Some(POOL)).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["environments"][0]["environment"], "dev");
        assert_eq!(value["repository_variables"][0]["name"], "GCP_ORGANIZATION_ID");
    }
}
