//! 有効化する API と付与するロールの一覧

/// 共有プロジェクトで有効化する API
pub const SHARED_SERVICES: &[&str] = &[
    "cloudresourcemanager.googleapis.com",
    "cloudbilling.googleapis.com",
    "iam.googleapis.com",
    "iamcredentials.googleapis.com",
    "sts.googleapis.com",
    "storage.googleapis.com",
    "artifactregistry.googleapis.com",
];

/// dev / prod プロジェクトで有効化する API
pub const ENVIRONMENT_SERVICES: &[&str] = &[
    "cloudresourcemanager.googleapis.com",
    "iam.googleapis.com",
    "run.googleapis.com",
    "compute.googleapis.com",
    "sqladmin.googleapis.com",
    "secretmanager.googleapis.com",
    "artifactregistry.googleapis.com",
    "orgpolicy.googleapis.com",
    "vpcaccess.googleapis.com",
    "servicenetworking.googleapis.com",
];

/// 各環境のサービスアカウントに、その環境のプロジェクトで付与するロール
///
/// dev と prod で同じ構成。
pub const ENVIRONMENT_ROLES: [&str; 9] = [
    "roles/run.admin",
    "roles/iam.serviceAccountUser",
    "roles/iam.serviceAccountAdmin",
    "roles/resourcemanager.projectIamAdmin",
    "roles/compute.networkAdmin",
    "roles/cloudsql.admin",
    "roles/secretmanager.admin",
    "roles/storage.admin",
    "roles/artifactregistry.reader",
];

/// 共有プロジェクトで両サービスアカウントに付与するロール
pub const SHARED_PROJECT_ROLES: &[&str] = &["roles/artifactregistry.admin", "roles/storage.admin"];

/// state バケットに対するロール
pub const STATE_BUCKET_ROLE: &str = "roles/storage.objectAdmin";

/// Workload Identity 経由でサービスアカウントを借用するロール
pub const WORKLOAD_IDENTITY_USER_ROLE: &str = "roles/iam.workloadIdentityUser";
