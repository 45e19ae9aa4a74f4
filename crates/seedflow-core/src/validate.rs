//! 設定の検証
//!
//! 実行前に GCP の命名規則を確認し、違反をすべて列挙する。

use crate::error::{CoreError, Result};
use crate::model::BootstrapConfig;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static NUMERIC_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]+$").unwrap());
static BILLING_ACCOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9A-F]{6}-[0-9A-F]{6}-[0-9A-F]{6}$").unwrap());
// 6〜30文字、英小文字で開始、ハイフンで終わらない
static PROJECT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9-]{4,28}[a-z0-9]$").unwrap());
static BUCKET_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9._-]{1,61}[a-z0-9]$").unwrap());
static POOL_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9][a-z0-9-]{2,30}[a-z0-9]$").unwrap());
static REPOSITORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").unwrap());
static REGION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z]+-[a-z]+[0-9]+$").unwrap());
static REGISTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]([a-z0-9-]{0,61}[a-z0-9])?$").unwrap());

/// 検証違反
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// すべての違反を返す（空なら有効）
pub fn validate(config: &BootstrapConfig) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut check = |ok: bool, field: &str, message: String| {
        if !ok {
            violations.push(Violation::new(field, message));
        }
    };

    check(
        NUMERIC_ID.is_match(&config.organization_id),
        "organization",
        format!("数字のみで指定してください: {}", config.organization_id),
    );
    check(
        NUMERIC_ID.is_match(&config.folder_id),
        "folder",
        format!("数字のみで指定してください: {}", config.folder_id),
    );
    check(
        BILLING_ACCOUNT.is_match(&config.billing_account),
        "billing-account",
        format!(
            "XXXXXX-XXXXXX-XXXXXX 形式（16進大文字）で指定してください: {}",
            config.billing_account
        ),
    );
    check(
        config.domain.contains('.') && !config.domain.chars().any(char::is_whitespace),
        "domain",
        format!("ドメイン名として不正です: {}", config.domain),
    );
    check(
        REPOSITORY.is_match(&config.repository),
        "repository",
        format!("owner/name 形式で指定してください: {}", config.repository),
    );

    for (field, id) in [
        ("projects.shared", &config.projects.shared),
        ("projects.dev", &config.projects.dev),
        ("projects.prod", &config.projects.prod),
    ] {
        check(
            PROJECT_ID.is_match(id),
            field,
            format!(
                "6〜30文字の英小文字・数字・ハイフン（英小文字で開始）で指定してください: {}",
                id
            ),
        );
    }
    let [shared, dev, prod] = config.projects.all();
    check(
        shared != dev && dev != prod && shared != prod,
        "projects",
        "shared / dev / prod のプロジェクトIDは重複できません".to_string(),
    );

    check(
        BUCKET_NAME.is_match(&config.state_bucket),
        "state-bucket",
        format!(
            "3〜63文字の英小文字・数字・ハイフン・アンダースコア・ドットで指定してください: {}",
            config.state_bucket
        ),
    );

    for (field, name) in [
        ("service-accounts.dev", &config.service_accounts.dev),
        ("service-accounts.prod", &config.service_accounts.prod),
    ] {
        check(
            PROJECT_ID.is_match(name),
            field,
            format!(
                "6〜30文字の英小文字・数字・ハイフン（英小文字で開始）で指定してください: {}",
                name
            ),
        );
    }
    check(
        config.service_accounts.dev != config.service_accounts.prod,
        "service-accounts",
        "dev と prod のサービスアカウント名は重複できません".to_string(),
    );

    for (field, id) in [
        ("identity-pool", &config.identity_pool),
        ("identity-provider", &config.identity_provider),
    ] {
        check(
            POOL_ID.is_match(id) && !id.starts_with("gcp-"),
            field,
            format!(
                "4〜32文字の英小文字・数字・ハイフンで指定してください（gcp- で開始不可）: {}",
                id
            ),
        );
    }

    check(
        REGION.is_match(&config.region),
        "region",
        format!("リージョン名として不正です: {}", config.region),
    );
    check(
        REGISTRY.is_match(&config.registry),
        "registry",
        format!("リポジトリ名として不正です: {}", config.registry),
    );

    check(
        config.wait.max_retries >= 1,
        "wait.max-retries",
        "1以上を指定してください".to_string(),
    );
    check(
        config.wait.multiplier >= 1.0,
        "wait.multiplier",
        "1.0以上を指定してください".to_string(),
    );
    check(
        config.wait.initial_delay_ms <= config.wait.max_delay_ms,
        "wait.initial-delay-ms",
        "max-delay-ms 以下を指定してください".to_string(),
    );

    violations
}

impl BootstrapConfig {
    /// 違反があればエラー
    pub fn ensure_valid(&self) -> Result<()> {
        let violations = validate(self);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(CoreError::Validation(violations))
        }
    }
}
