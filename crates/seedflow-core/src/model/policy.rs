//! 組織ポリシー文書
//!
//! `gcloud org-policies set-policy` に渡す YAML を生成する。

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// IAM バインディングに追加できるメンバーのドメインを制限する制約
pub const ALLOWED_POLICY_MEMBER_DOMAINS: &str = "iam.allowedPolicyMemberDomains";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrgPolicy {
    /// `projects/<id>/policies/<constraint>`
    pub name: String,
    pub spec: PolicySpec,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicySpec {
    pub rules: Vec<PolicyRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_all: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_all: Option<bool>,
}

impl OrgPolicy {
    /// 公開プリンシパル（allUsers 等）を含む任意のメンバーへのロール付与を許可
    pub fn allow_all_members(project_id: &str) -> Self {
        Self {
            name: format!(
                "projects/{}/policies/{}",
                project_id, ALLOWED_POLICY_MEMBER_DOMAINS
            ),
            spec: PolicySpec {
                rules: vec![PolicyRule {
                    allow_all: Some(true),
                    deny_all: None,
                }],
            },
        }
    }

    /// 対象プロジェクトID
    pub fn target_project(&self) -> Option<&str> {
        self.name
            .strip_prefix("projects/")
            .and_then(|rest| rest.split('/').next())
    }

    pub fn constraint(&self) -> Option<&str> {
        self.name.rsplit('/').next()
    }

    pub fn allows_all(&self) -> bool {
        self.spec
            .rules
            .iter()
            .any(|rule| rule.allow_all == Some(true))
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
