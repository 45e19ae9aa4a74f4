use crate::logger::StepLogger;
use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use seedflow_cloud::{ControlPlane, SequenceOptions, Sequencer, WaitStrategy};
use seedflow_cloud_gcp::GcpControlPlane;
use seedflow_core::WaitMode;

pub async fn handle(
    loaded: &LoadedConfig,
    yes: bool,
    skip: Option<&str>,
    wait: Option<WaitMode>,
    continue_on_error: bool,
) -> anyhow::Result<()> {
    let config = &loaded.config;
    config.ensure_valid()?;
    let skip = utils::parse_skip(skip)?;

    println!("{}", "ブートストラップを開始します...".blue().bold());
    utils::print_loaded_config_file(&loaded.path);
    println!("組織: {}", config.organization_id.cyan());
    println!("共有プロジェクト: {}", config.projects.shared.cyan());
    println!();
    utils::print_phases(&skip);

    // 確認（--yesが指定されていない場合）
    if !yes {
        println!();
        println!(
            "{}",
            "警告: 組織にプロジェクト・IAM バインディング・組織ポリシーを作成します。".yellow()
        );
        println!("内容は `seed plan` で確認できます");
        println!("実行するには --yes オプションを指定してください");
        return Ok(());
    }

    let plane = GcpControlPlane::new();
    let auth = plane.check_auth().await?;
    if !auth.authenticated {
        return Err(anyhow::anyhow!(
            "gcloud が認証されていません: {}",
            auth.error.unwrap_or_default()
        ));
    }
    println!(
        "アカウント: {}",
        auth.account_info.unwrap_or_default().cyan()
    );
    println!();

    let mut settings = config.wait.clone();
    if let Some(mode) = wait {
        settings.mode = mode;
    }

    let state_manager = loaded.state_manager();
    let lock = state_manager.acquire_lock().await?;

    let mut logger = StepLogger::new();
    let outcome = Sequencer::new(config, &plane)
        .with_wait(WaitStrategy::from_settings(&settings))
        .with_options(SequenceOptions {
            skip,
            continue_on_error,
        })
        .run(&mut logger)
        .await;

    // 中断した場合も取得済みのプール名と完了フェーズは保存する
    let mut state = state_manager.load_for(&config.projects.shared).await?;
    state.record_outcome(&outcome);
    let saved = state_manager.save(&state).await;
    lock.release().await?;
    saved?;

    let outcome = match outcome.into_result() {
        Ok(outcome) => outcome,
        Err(e) => {
            logger.print_summary(&config.projects.shared);
            eprintln!();
            eprintln!("{}", "✗ ブートストラップを中断しました".red().bold());
            eprintln!("  修正後に `seed up --yes` を再実行してください（作成済みのリソースはスキップされます）");
            return Err(e.into());
        }
    };

    logger.print_summary(&config.projects.shared);

    println!();
    println!("{}", "GitHub に登録する値:".bold());
    println!();
    print!("{}", outcome.report);

    if !logger.all_success() {
        return Err(anyhow::anyhow!(
            "{} 件のステップが失敗しました",
            outcome.result.failed.len()
        ));
    }

    println!();
    println!("{}", "✓ ブートストラップが完了しました！".green().bold());
    Ok(())
}
