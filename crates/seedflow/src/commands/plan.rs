use crate::utils::{self, LoadedConfig};
use colored::Colorize;
use seedflow_cloud::{Phase, SequenceOptions, Sequencer, StepObserver, WaitStrategy};
use seedflow_cloud_gcp::GcpControlPlane;
use seedflow_core::{Environment, OrgPolicy};

/// フェーズごとに、記録されたコマンドを表示する
struct PlanPrinter<'a> {
    plane: &'a GcpControlPlane,
    printed: usize,
}

impl StepObserver for PlanPrinter<'_> {
    fn phase_skipped(&mut self, phase: Phase) {
        println!();
        println!("{} {}", format!("# {}", phase.name()).dimmed(), "(skip)".yellow());
    }

    fn phase_finished(&mut self, phase: Phase, _failures: usize) {
        let commands = self.plane.recorded_commands();
        println!();
        println!("{}", format!("# {}", phase.name()).bold());
        for command in &commands[self.printed..] {
            println!("{}", command);
        }
        self.printed = commands.len();
    }
}

pub async fn handle(loaded: &LoadedConfig, skip: Option<&str>) -> anyhow::Result<()> {
    let config = &loaded.config;
    config.ensure_valid()?;
    let skip = utils::parse_skip(skip)?;

    println!("{}", "実行計画を作成中...".blue());
    utils::print_loaded_config_file(&loaded.path);

    let plane = GcpControlPlane::dry_run();
    let mut printer = PlanPrinter {
        plane: &plane,
        printed: 0,
    };

    Sequencer::new(config, &plane)
        .with_wait(WaitStrategy::Disabled)
        .with_options(SequenceOptions {
            skip,
            continue_on_error: false,
        })
        .run(&mut printer)
        .await
        .into_result()?;

    println!();
    println!("{}", "# 組織ポリシー".bold());
    for env in Environment::ALL {
        let policy = OrgPolicy::allow_all_members(config.projects.for_env(env));
        println!("{}", format!("## {}", policy.name).dimmed());
        print!("{}", policy.to_yaml()?);
    }

    println!();
    println!(
        "{}",
        "注意: 既存リソースの確認は行っていません。`seed up` では作成済みのものはスキップされます。"
            .yellow()
    );
    println!(
        "{}",
        "注意: プール名はプロジェクト ID で代用しています（実際はプロジェクト番号）。".yellow()
    );
    println!(
        "合計 {} コマンド",
        plane.recorded_commands().len().to_string().cyan()
    );
    Ok(())
}
