//! KDLパーサー
//!
//! `bootstrap.kdl` をパースして `BootstrapConfig` を生成します。
//!
//! ```kdl
//! organization "123456789012"
//! folder "987654321098"
//! billing-account "01ABCD-234567-89EFAB"
//! domain "example.com"
//! repository "my-org/infra"
//! project "acme"
//! region "asia-northeast1"
//! ```

mod wait;

use wait::parse_wait;

use crate::error::{CoreError, Result};
use crate::model::{
    BootstrapConfig, DEFAULT_IDENTITY_POOL, DEFAULT_IDENTITY_PROVIDER, DEFAULT_REGISTRY,
    ProjectIds, ServiceAccountNames, WaitSettings,
};
use kdl::{KdlDocument, KdlNode};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// KDLファイルをパース
pub fn parse_kdl_file<P: AsRef<Path>>(path: P) -> Result<BootstrapConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| CoreError::IoError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(path = %path.display(), "Parsing bootstrap file");
    parse_kdl_string(&content)
}

/// KDL文字列をパース
pub fn parse_kdl_string(content: &str) -> Result<BootstrapConfig> {
    let doc: KdlDocument = content.parse()?;

    let mut organization_id = None;
    let mut folder_id = None;
    let mut billing_account = None;
    let mut domain = None;
    let mut repository = None;
    let mut project_stem = None;
    let mut region = None;
    let mut state_bucket = None;
    let mut identity_pool = None;
    let mut identity_provider = None;
    let mut registry = None;
    let mut project_overrides = ProjectOverrides::default();
    let mut service_accounts = ServiceAccountNames::default();
    let mut wait = WaitSettings::default();

    for node in doc.nodes() {
        match node.name().value() {
            "organization" | "organization-id" => {
                organization_id = Some(string_arg(node, "organization")?);
            }
            "folder" | "folder-id" => folder_id = Some(string_arg(node, "folder")?),
            "billing-account" | "billing_account" => {
                billing_account = Some(string_arg(node, "billing-account")?);
            }
            "domain" => domain = Some(string_arg(node, "domain")?),
            "repository" | "github-repo" => repository = Some(string_arg(node, "repository")?),
            "project" => project_stem = Some(string_arg(node, "project")?),
            "region" => region = Some(string_arg(node, "region")?),
            "state-bucket" | "state_bucket" => {
                state_bucket = Some(string_arg(node, "state-bucket")?);
            }
            "identity-pool" | "pool" => identity_pool = Some(string_arg(node, "identity-pool")?),
            "identity-provider" | "provider" => {
                identity_provider = Some(string_arg(node, "identity-provider")?);
            }
            "registry" => registry = Some(string_arg(node, "registry")?),
            "projects" => parse_projects(node, &mut project_overrides)?,
            "service-accounts" | "service_accounts" => {
                parse_service_accounts(node, &mut service_accounts)?;
            }
            "wait" => wait = parse_wait(node)?,
            other => {
                warn!(node = other, "Unknown node in bootstrap file, ignoring");
            }
        }
    }

    let project_stem = project_stem.ok_or(CoreError::MissingField("project"))?;
    let projects = project_overrides.resolve(&project_stem);
    let state_bucket = state_bucket.unwrap_or_else(|| format!("{}-terraform-state", project_stem));

    Ok(BootstrapConfig {
        organization_id: organization_id.ok_or(CoreError::MissingField("organization"))?,
        folder_id: folder_id.ok_or(CoreError::MissingField("folder"))?,
        billing_account: billing_account.ok_or(CoreError::MissingField("billing-account"))?,
        domain: domain.ok_or(CoreError::MissingField("domain"))?,
        repository: repository.ok_or(CoreError::MissingField("repository"))?,
        region: region.ok_or(CoreError::MissingField("region"))?,
        project_stem,
        projects,
        state_bucket,
        identity_pool: identity_pool.unwrap_or_else(|| DEFAULT_IDENTITY_POOL.to_string()),
        identity_provider: identity_provider
            .unwrap_or_else(|| DEFAULT_IDENTITY_PROVIDER.to_string()),
        service_accounts,
        registry: registry.unwrap_or_else(|| DEFAULT_REGISTRY.to_string()),
        wait,
    })
}

/// `projects { shared "..." dev "..." prod "..." }` の個別指定
#[derive(Debug, Default)]
struct ProjectOverrides {
    shared: Option<String>,
    dev: Option<String>,
    prod: Option<String>,
}

impl ProjectOverrides {
    fn resolve(self, stem: &str) -> ProjectIds {
        let derived = ProjectIds::from_stem(stem);
        ProjectIds {
            shared: self.shared.unwrap_or(derived.shared),
            dev: self.dev.unwrap_or(derived.dev),
            prod: self.prod.unwrap_or(derived.prod),
        }
    }
}

fn parse_projects(node: &KdlNode, overrides: &mut ProjectOverrides) -> Result<()> {
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "shared" => overrides.shared = Some(string_arg(child, "projects.shared")?),
                "dev" => overrides.dev = Some(string_arg(child, "projects.dev")?),
                "prod" => overrides.prod = Some(string_arg(child, "projects.prod")?),
                other => {
                    return Err(CoreError::InvalidConfig(format!(
                        "projects に未知の項目があります: {} (shared, dev, prod のいずれか)",
                        other
                    )));
                }
            }
        }
    }
    Ok(())
}

fn parse_service_accounts(node: &KdlNode, names: &mut ServiceAccountNames) -> Result<()> {
    if let Some(children) = node.children() {
        for child in children.nodes() {
            match child.name().value() {
                "dev" => names.dev = string_arg(child, "service-accounts.dev")?,
                "prod" => names.prod = string_arg(child, "service-accounts.prod")?,
                other => {
                    return Err(CoreError::InvalidConfig(format!(
                        "service-accounts に未知の項目があります: {} (dev, prod のいずれか)",
                        other
                    )));
                }
            }
        }
    }
    Ok(())
}

/// 最初の引数を文字列として取得（数値IDは文字列化）
pub(crate) fn first_value(node: &KdlNode) -> Option<String> {
    let value = node.entries().first()?.value();
    value
        .as_string()
        .map(|s| s.to_string())
        .or_else(|| value.as_integer().map(|i| i.to_string()))
}

fn string_arg(node: &KdlNode, field: &str) -> Result<String> {
    first_value(node)
        .ok_or_else(|| CoreError::InvalidConfig(format!("{} には値が必要です", field)))
}

#[cfg(test)]
mod tests;
