use super::*;
use crate::model::WaitMode;

const MINIMAL: &str = r#"
    organization "123456789012"
    folder "987654321098"
    billing-account "01ABCD-234567-89EFAB"
    domain "example.com"
    repository "my-org/infra"
    project "acme"
    region "asia-northeast1"
"#;

#[test]
fn test_parse_minimal_applies_defaults() {
    let config = parse_kdl_string(MINIMAL).unwrap();

    assert_eq!(config.organization_id, "123456789012");
    assert_eq!(config.folder_id, "987654321098");
    assert_eq!(config.billing_account, "01ABCD-234567-89EFAB");
    assert_eq!(config.repository, "my-org/infra");
    assert_eq!(config.projects.shared, "acme-shared");
    assert_eq!(config.projects.dev, "acme-dev");
    assert_eq!(config.projects.prod, "acme-prod");
    assert_eq!(config.state_bucket, "acme-terraform-state");
    assert_eq!(config.identity_pool, "github-pool");
    assert_eq!(config.identity_provider, "github-provider");
    assert_eq!(config.service_accounts.dev, "terraform-dev");
    assert_eq!(config.service_accounts.prod, "terraform-prod");
    assert_eq!(config.registry, "containers");
    assert_eq!(config.wait, WaitSettings::default());
}

#[test]
fn test_parse_numeric_ids() {
    let kdl = r#"
        organization 123456789012
        folder 987654321098
        billing-account "01ABCD-234567-89EFAB"
        domain "example.com"
        repository "my-org/infra"
        project "acme"
        region "us-central1"
    "#;

    let config = parse_kdl_string(kdl).unwrap();
    assert_eq!(config.organization_id, "123456789012");
    assert_eq!(config.folder_id, "987654321098");
}

#[test]
fn test_parse_overrides() {
    let kdl = format!(
        r#"{}
        projects {{
            shared "acme-core"
            prod "acme-live"
        }}
        service-accounts {{
            dev "deployer-dev"
            prod "deployer-prod"
        }}
        state-bucket "acme-tfstate-2024"
        identity-pool "ci-pool"
        identity-provider "ci-provider"
        registry "images"
        "#,
        MINIMAL
    );

    let config = parse_kdl_string(&kdl).unwrap();
    assert_eq!(config.projects.shared, "acme-core");
    // 指定のない dev は導出値
    assert_eq!(config.projects.dev, "acme-dev");
    assert_eq!(config.projects.prod, "acme-live");
    assert_eq!(config.service_accounts.dev, "deployer-dev");
    assert_eq!(config.service_accounts.prod, "deployer-prod");
    assert_eq!(config.state_bucket, "acme-tfstate-2024");
    assert_eq!(config.identity_pool, "ci-pool");
    assert_eq!(config.identity_provider, "ci-provider");
    assert_eq!(config.registry, "images");
}

#[test]
fn test_parse_wait_block() {
    let kdl = format!(
        r#"{}
        wait "fixed" {{
            fixed-secs 15
            max-retries 3
            initial-delay-ms 500
            max-delay-ms 4000
            multiplier 1.5
        }}
        "#,
        MINIMAL
    );

    let config = parse_kdl_string(&kdl).unwrap();
    assert_eq!(config.wait.mode, WaitMode::Fixed);
    assert_eq!(config.wait.fixed_secs, 15);
    assert_eq!(config.wait.max_retries, 3);
    assert_eq!(config.wait.initial_delay_ms, 500);
    assert_eq!(config.wait.max_delay_ms, 4000);
    assert_eq!(config.wait.multiplier, 1.5);
}

#[test]
fn test_parse_wait_integer_multiplier() {
    let kdl = format!("{}\nwait {{\n multiplier 3\n}}\n", MINIMAL);
    let config = parse_kdl_string(&kdl).unwrap();
    assert_eq!(config.wait.mode, WaitMode::Poll);
    assert_eq!(config.wait.multiplier, 3.0);
}

#[test]
fn test_parse_wait_out_of_range_is_error() {
    // u32 に収まらない値が 1 に切り詰められないこと
    let kdl = format!("{}\nwait {{\n max-retries 4294967297\n}}\n", MINIMAL);
    let result = parse_kdl_string(&kdl);
    assert!(matches!(result, Err(CoreError::InvalidConfig(_))));

    let kdl = format!("{}\nwait {{\n fixed-secs -1\n}}\n", MINIMAL);
    let result = parse_kdl_string(&kdl);
    assert!(matches!(result, Err(CoreError::InvalidConfig(_))));

    let kdl = format!("{}\nwait {{\n max-retries 4294967295\n}}\n", MINIMAL);
    assert_eq!(parse_kdl_string(&kdl).unwrap().wait.max_retries, u32::MAX);
}

#[test]
fn test_parse_wait_unknown_mode() {
    let kdl = format!("{}\nwait \"eventually\"\n", MINIMAL);
    let result = parse_kdl_string(&kdl);
    assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
}

#[test]
fn test_missing_required_field() {
    let kdl = r#"
        organization "123456789012"
        folder "987654321098"
        billing-account "01ABCD-234567-89EFAB"
        domain "example.com"
        project "acme"
        region "asia-northeast1"
    "#;

    let result = parse_kdl_string(kdl);
    assert!(matches!(result, Err(CoreError::MissingField("repository"))));
}

#[test]
fn test_missing_project_stem() {
    let result = parse_kdl_string(r#"organization "1""#);
    assert!(matches!(result, Err(CoreError::MissingField("project"))));
}

#[test]
fn test_unknown_project_key_is_error() {
    let kdl = format!("{}\nprojects {{\n staging \"acme-stg\"\n}}\n", MINIMAL);
    let result = parse_kdl_string(&kdl);
    assert!(matches!(result, Err(CoreError::InvalidConfig(_))));
}

#[test]
fn test_unknown_top_level_node_is_ignored() {
    let kdl = format!("{}\ncomment \"hello\"\n", MINIMAL);
    assert!(parse_kdl_string(&kdl).is_ok());
}

#[test]
fn test_invalid_kdl() {
    let result = parse_kdl_string("organization {");
    assert!(matches!(result, Err(CoreError::KdlParse(_))));
}

#[test]
fn test_parse_kdl_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bootstrap.kdl");
    std::fs::write(&path, MINIMAL).unwrap();

    let config = parse_kdl_file(&path).unwrap();
    assert_eq!(config.project_stem, "acme");
}

#[test]
fn test_parse_kdl_file_missing() {
    let dir = tempfile::tempdir().unwrap();
    let result = parse_kdl_file(dir.path().join("nope.kdl"));
    assert!(matches!(result, Err(CoreError::IoError { .. })));
}
