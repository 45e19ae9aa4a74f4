//! ブートストラップ設定モデル
//!
//! 設定は実行前に一度だけ読み込まれ、以降は変更されない。

use super::identity::{RepositoryCondition, ServiceAccount};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// `terraform-dev` / `terraform-prod` のデフォルトサービスアカウント名
pub const DEFAULT_DEV_SERVICE_ACCOUNT: &str = "terraform-dev";
pub const DEFAULT_PROD_SERVICE_ACCOUNT: &str = "terraform-prod";
pub const DEFAULT_IDENTITY_POOL: &str = "github-pool";
pub const DEFAULT_IDENTITY_PROVIDER: &str = "github-provider";
pub const DEFAULT_REGISTRY: &str = "containers";

/// 組織ブートストラップの設定レコード
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BootstrapConfig {
    /// 組織ID（数字文字列）
    pub organization_id: String,
    /// プロジェクトを作成するフォルダID（数字文字列）
    pub folder_id: String,
    /// 請求先アカウントID (XXXXXX-XXXXXX-XXXXXX)
    pub billing_account: String,
    /// サービスのドメイン
    pub domain: String,
    /// ソースリポジトリ (owner/name)
    pub repository: String,
    /// プロジェクト名の接頭辞
    pub project_stem: String,
    pub projects: ProjectIds,
    /// Terraform state を保存するバケット
    pub state_bucket: String,
    pub identity_pool: String,
    pub identity_provider: String,
    pub service_accounts: ServiceAccountNames,
    pub region: String,
    /// Artifact Registry のリポジトリ名
    pub registry: String,
    pub wait: WaitSettings,
}

impl BootstrapConfig {
    /// リポジトリの所有者（GitHub organization）
    ///
    /// `my-org/infra` なら `my-org`。
    pub fn source_organization(&self) -> &str {
        self.repository
            .split_once('/')
            .map(|(owner, _)| owner)
            .unwrap_or(&self.repository)
    }

    /// プロバイダーに設定する属性条件
    pub fn repository_condition(&self) -> RepositoryCondition {
        RepositoryCondition::new(self.source_organization())
    }

    /// 環境に対応するサービスアカウント（共有プロジェクト内に作成される）
    pub fn service_account(&self, env: Environment) -> ServiceAccount {
        ServiceAccount::new(
            self.service_accounts.for_env(env),
            &self.projects.shared,
            format!("CI deployer ({})", env),
        )
    }

    /// 両環境のサービスアカウント（dev, prod の順）
    pub fn service_account_list(&self) -> Vec<ServiceAccount> {
        Environment::ALL
            .iter()
            .map(|env| self.service_account(*env))
            .collect()
    }

    /// 環境ごとのドメイン（prod はそのまま、dev は `dev.` 付き）
    pub fn domain_for(&self, env: Environment) -> String {
        match env {
            Environment::Prod => self.domain.clone(),
            Environment::Dev => format!("dev.{}", self.domain),
        }
    }

    /// Artifact Registry の Docker ホストパス
    pub fn registry_path(&self) -> String {
        format!(
            "{}-docker.pkg.dev/{}/{}",
            self.region, self.projects.shared, self.registry
        )
    }
}

/// 作成する3つのプロジェクトID
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectIds {
    pub shared: String,
    pub dev: String,
    pub prod: String,
}

impl ProjectIds {
    /// 接頭辞から `<stem>-shared` / `<stem>-dev` / `<stem>-prod` を導出
    pub fn from_stem(stem: &str) -> Self {
        Self {
            shared: format!("{}-shared", stem),
            dev: format!("{}-dev", stem),
            prod: format!("{}-prod", stem),
        }
    }

    /// 作成順（shared, dev, prod）
    pub fn all(&self) -> [&str; 3] {
        [&self.shared, &self.dev, &self.prod]
    }

    pub fn for_env(&self, env: Environment) -> &str {
        match env {
            Environment::Dev => &self.dev,
            Environment::Prod => &self.prod,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountNames {
    pub dev: String,
    pub prod: String,
}

impl Default for ServiceAccountNames {
    fn default() -> Self {
        Self {
            dev: DEFAULT_DEV_SERVICE_ACCOUNT.to_string(),
            prod: DEFAULT_PROD_SERVICE_ACCOUNT.to_string(),
        }
    }
}

impl ServiceAccountNames {
    pub fn for_env(&self, env: Environment) -> &str {
        match env {
            Environment::Dev => &self.dev,
            Environment::Prod => &self.prod,
        }
    }
}

/// デプロイ先の環境
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Dev,
    Prod,
}

impl Environment {
    /// 処理順
    pub const ALL: [Environment; 2] = [Environment::Dev, Environment::Prod];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 伝播待機の方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitMode {
    /// 作成したリソースが見えるまでポーリング（exponential backoff）
    Poll,
    /// 固定時間スリープ
    Fixed,
    /// 待機しない（dry-run 用）
    Disabled,
}

impl WaitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitMode::Poll => "poll",
            WaitMode::Fixed => "fixed",
            WaitMode::Disabled => "none",
        }
    }
}

impl fmt::Display for WaitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "poll" => Ok(WaitMode::Poll),
            "fixed" => Ok(WaitMode::Fixed),
            "none" => Ok(WaitMode::Disabled),
            other => Err(format!(
                "不明な待機方式です: {} (poll, fixed, none のいずれか)",
                other
            )),
        }
    }
}

/// 伝播待機の設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitSettings {
    pub mode: WaitMode,
    /// fixed モードのスリープ秒数
    pub fixed_secs: u64,
    /// poll モードの最大試行回数
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for WaitSettings {
    fn default() -> Self {
        Self {
            mode: WaitMode::Poll,
            fixed_secs: 10,
            max_retries: 8,
            initial_delay_ms: 2000,
            max_delay_ms: 30000,
            multiplier: 2.0,
        }
    }
}
