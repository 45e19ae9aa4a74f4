use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use seedflow_core::Environment;

pub fn handle(loaded: &LoadedConfig) -> anyhow::Result<()> {
    println!("{}", "設定を検証中...".blue());
    utils::print_loaded_config_file(&loaded.path);

    let config = &loaded.config;
    let violations = seedflow_core::validate(config);
    if !violations.is_empty() {
        eprintln!();
        eprintln!(
            "{}",
            format!("✗ 設定エラー ({} 件)", violations.len()).red().bold()
        );
        for violation in &violations {
            eprintln!("  • {}", violation);
        }
        std::process::exit(1);
    }

    println!("{}", "✓ 設定ファイルは正常です！".green().bold());
    println!();
    println!("サマリー:");
    println!("  組織:       {}", config.organization_id);
    println!("  フォルダー: {}", config.folder_id);
    println!("  請求先:     {}", config.billing_account);
    println!("  リポジトリ: {} ({}/*)", config.repository, config.source_organization());
    println!("  プロジェクト:");
    println!("    - {} (shared)", config.projects.shared.cyan());
    for env in Environment::ALL {
        println!(
            "    - {} ({}, {})",
            config.projects.for_env(env).cyan(),
            env,
            config.domain_for(env)
        );
    }
    println!("  サービスアカウント:");
    for account in config.service_account_list() {
        println!("    - {}", account.email().cyan());
    }
    println!("  state バケット: gs://{}", config.state_bucket);
    println!(
        "  Workload Identity: {} / {}",
        config.identity_pool, config.identity_provider
    );
    println!("  Artifact Registry: {}", config.registry_path());
    println!("  伝播待機: {}", config.wait.mode);

    Ok(())
}
