//! サービスアカウントと Workload Identity 連携の名前付け

use serde::{Deserialize, Serialize};

/// GitHub Actions の OIDC トークン発行者
pub const GITHUB_OIDC_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// プール配下の Workload Identity プロバイダーの場所
pub const IDENTITY_LOCATION: &str = "global";

/// OIDC クレームから Google 属性へのマッピング
pub const ATTRIBUTE_MAPPING: &[(&str, &str)] = &[
    ("google.subject", "assertion.sub"),
    ("attribute.actor", "assertion.actor"),
    ("attribute.repository", "assertion.repository"),
    ("attribute.repository_owner", "assertion.repository_owner"),
];

/// `--attribute-mapping` に渡す形式 (`k=v,k=v`)
pub fn attribute_mapping() -> String {
    ATTRIBUTE_MAPPING
        .iter()
        .map(|(attr, claim)| format!("{}={}", attr, claim))
        .collect::<Vec<_>>()
        .join(",")
}

/// プール配下で、repository 属性が `<org>/` で始まる全プリンシパル
///
/// `pool_name` はプールを問い合わせて得た正規名をそのまま使う。
pub fn principal_set(pool_name: &str, organization: &str) -> String {
    format!(
        "principalSet://iam.googleapis.com/{}/attribute.repository/{}/*",
        pool_name, organization
    )
}

/// プロバイダーの完全なリソース名
pub fn provider_resource_name(pool_name: &str, provider_id: &str) -> String {
    format!("{}/providers/{}", pool_name, provider_id)
}

/// サービスアカウント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccount {
    pub account_id: String,
    pub project_id: String,
    pub display_name: String,
}

impl ServiceAccount {
    pub fn new(
        account_id: impl Into<String>,
        project_id: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            project_id: project_id.into(),
            display_name: display_name.into(),
        }
    }

    pub fn email(&self) -> String {
        format!(
            "{}@{}.iam.gserviceaccount.com",
            self.account_id, self.project_id
        )
    }

    /// IAM バインディングのメンバー表記
    pub fn member(&self) -> String {
        format!("serviceAccount:{}", self.email())
    }
}

/// プロバイダーの属性条件
///
/// `assertion.repository` が `<org>/` で始まるトークンのみ受け付ける。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryCondition {
    organization: String,
}

impl RepositoryCondition {
    pub fn new(organization: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
        }
    }

    pub fn organization(&self) -> &str {
        &self.organization
    }

    fn prefix(&self) -> String {
        format!("{}/", self.organization)
    }

    /// CEL 式
    pub fn expression(&self) -> String {
        format!("assertion.repository.startsWith('{}')", self.prefix())
    }

    /// 式をローカルで評価する
    pub fn accepts(&self, repository: &str) -> bool {
        repository.starts_with(&self.prefix())
    }
}
