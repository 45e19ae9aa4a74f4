//! ブートストラップの進捗ログ
//!
//! 各フェーズ・各ステップの結果と所要時間を記録し、最後にサマリーを出す。

use chrono::Local;
use colored::Colorize;
use seedflow_cloud::{Action, ActionOutcome, Phase, StepObserver, WaitStrategy};
use std::time::{Duration, Instant};

/// フェーズの実行結果
#[derive(Debug, Clone)]
pub enum PhaseResult {
    /// 成功
    Success { duration: Duration },
    /// --skip で除外
    Skipped,
    /// 一部のステップが失敗
    Failed { failures: usize, duration: Duration },
}

impl PhaseResult {
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::Success { duration } => Some(*duration),
            Self::Failed { duration, .. } => Some(*duration),
            Self::Skipped => None,
        }
    }
}

/// ステップログ出力器
pub struct StepLogger {
    start_time: Instant,
    phase_results: Vec<(Phase, PhaseResult)>,
    current_phase: Option<(Phase, Instant)>,
    applied: usize,
    already_present: usize,
}

impl StepLogger {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            phase_results: Vec::new(),
            current_phase: None,
            applied: 0,
            already_present: 0,
        }
    }

    /// サマリーを出力
    pub fn print_summary(&self, shared_project: &str) {
        let total_duration = self.start_time.elapsed();

        let error_count = self.error_count();

        let slowest_phase = self
            .phase_results
            .iter()
            .filter_map(|(phase, result)| result.duration().map(|d| (phase, d)))
            .max_by_key(|(_, d)| *d);

        println!();
        println!("{}", "═".repeat(44));
        println!("Bootstrap Summary: {}", shared_project.cyan().bold());
        println!("{}", "─".repeat(44));
        println!("Total time:    {}", format_duration(total_duration).green());

        if let Some((phase, duration)) = slowest_phase {
            println!(
                "Slowest phase: {} ({})",
                phase.name(),
                format_duration(duration)
            );
        }

        println!("Applied:       {}", self.applied);
        println!("Already there: {}", self.already_present);

        if error_count > 0 {
            println!("Errors:        {}", error_count.to_string().red().bold());
        } else {
            println!("Errors:        {}", "0".green());
        }
        println!("{}", "═".repeat(44));
    }

    /// 失敗したステップの合計
    pub fn error_count(&self) -> usize {
        self.phase_results
            .iter()
            .map(|(_, result)| match result {
                PhaseResult::Failed { failures, .. } => *failures,
                _ => 0,
            })
            .sum()
    }

    /// 全フェーズが成功したか
    pub fn all_success(&self) -> bool {
        self.phase_results
            .iter()
            .all(|(_, result)| !matches!(result, PhaseResult::Failed { .. }))
    }
}

impl Default for StepLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl StepObserver for StepLogger {
    fn phase_started(&mut self, phase: Phase) {
        println!("[{}] {} {}", timestamp().dimmed(), "▶".cyan(), phase.name());
        self.current_phase = Some((phase, Instant::now()));
    }

    fn phase_skipped(&mut self, phase: Phase) {
        println!(
            "[{}] {} {} ({})",
            timestamp().dimmed(),
            "⏭".yellow(),
            phase.name(),
            "--skip".dimmed()
        );
        self.phase_results.push((phase, PhaseResult::Skipped));
    }

    fn phase_finished(&mut self, phase: Phase, failures: usize) {
        let duration = self
            .current_phase
            .take()
            .map(|(_, start)| start.elapsed())
            .unwrap_or_default();
        let duration_str = format_duration(duration);

        if failures == 0 {
            println!(
                "[{}] {} {} 完了 ({})",
                timestamp().dimmed(),
                "✓".green().bold(),
                phase.name(),
                duration_str.dimmed()
            );
            self.phase_results
                .push((phase, PhaseResult::Success { duration }));
        } else {
            println!(
                "[{}] {} {}: {} 件失敗 ({})",
                timestamp().dimmed(),
                "✗".red().bold(),
                phase.name(),
                failures,
                duration_str.dimmed()
            );
            self.phase_results
                .push((phase, PhaseResult::Failed { failures, duration }));
        }
    }

    fn action_finished(&mut self, action: &Action, outcome: &ActionOutcome) {
        let timestamp = timestamp();
        match outcome {
            ActionOutcome::Done => {
                self.applied += 1;
                println!("[{}]   → {}", timestamp.dimmed(), action.description);
            }
            ActionOutcome::Skipped(reason) => {
                self.already_present += 1;
                println!(
                    "[{}]   {} {} ({})",
                    timestamp.dimmed(),
                    "⏭".yellow(),
                    action.description,
                    reason.dimmed()
                );
            }
            ActionOutcome::Failed(error) => {
                println!(
                    "[{}]   {} {}: {}",
                    timestamp.dimmed(),
                    "✗".red().bold(),
                    action.description,
                    error.red()
                );
            }
        }
    }

    fn waiting(&mut self, reason: &str, strategy: &WaitStrategy) {
        let detail = match strategy {
            WaitStrategy::Poll(retry) => format!("最大 {} 回確認", retry.max_attempts),
            WaitStrategy::Fixed(duration) => format!("{} 待機", format_duration(*duration)),
            WaitStrategy::Disabled => return,
        };
        println!(
            "[{}]   {} {} ({})",
            timestamp().dimmed(),
            "⟳".yellow(),
            reason,
            detail.dimmed()
        );
    }
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Duration を読みやすい形式にフォーマット
fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let minutes = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", minutes, secs)
    } else if total_secs >= 1 {
        format!("{}.{}s", total_secs, millis / 100)
    } else {
        format!("{}ms", millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seedflow_cloud::ActionType;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.5s");
        assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
    }

    #[test]
    fn test_logger_counts_outcomes() {
        let mut logger = StepLogger::new();
        let action = Action::new(
            Phase::CreateProjects,
            ActionType::Create,
            "project",
            "acme-dev",
            "プロジェクト acme-dev を作成",
        );

        logger.phase_started(Phase::CreateProjects);
        logger.action_finished(&action, &ActionOutcome::Done);
        logger.action_finished(&action, &ActionOutcome::Skipped("既に存在します".into()));
        logger.phase_finished(Phase::CreateProjects, 0);
        logger.phase_skipped(Phase::LinkBilling);

        assert_eq!(logger.applied, 1);
        assert_eq!(logger.already_present, 1);
        assert!(logger.all_success());

        logger.phase_started(Phase::SharedProject);
        logger.action_finished(&action, &ActionOutcome::Failed("denied".into()));
        logger.phase_finished(Phase::SharedProject, 1);
        assert!(!logger.all_success());
        assert_eq!(logger.error_count(), 1);
    }

    #[test]
    fn test_halted_phase_counts_as_failure() {
        let mut logger = StepLogger::new();
        let billing = Action::new(
            Phase::LinkBilling,
            ActionType::Link,
            "billing",
            "acme-dev",
            "acme-dev を請求先アカウントに紐付け",
        );

        logger.phase_started(Phase::CreateProjects);
        logger.phase_finished(Phase::CreateProjects, 0);
        // 中断時も失敗したフェーズは phase_finished で通知される
        logger.phase_started(Phase::LinkBilling);
        logger.action_finished(&billing, &ActionOutcome::Failed("PERMISSION_DENIED".into()));
        logger.phase_finished(Phase::LinkBilling, 1);

        assert!(!logger.all_success());
        assert_eq!(logger.error_count(), 1);
        assert_eq!(logger.phase_results.len(), 2);
    }
}
