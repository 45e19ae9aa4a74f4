use colored::Colorize;
use seedflow_cloud::{Phase, StateManager};
use seedflow_core::BootstrapConfig;
use std::path::{Path, PathBuf};

/// 読み込んだ設定とその場所
pub struct LoadedConfig {
    pub path: PathBuf,
    pub config: BootstrapConfig,
}

impl LoadedConfig {
    /// state は設定ファイルと同じディレクトリの `.seedflow/` に置く
    pub fn state_manager(&self) -> StateManager {
        StateManager::new(state_root(&self.path))
    }
}

fn state_root(config_path: &Path) -> &Path {
    let dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // ./.seedflow/bootstrap.kdl ならプロジェクトルートに置く
    if dir.file_name().is_some_and(|name| name == ".seedflow") {
        dir.parent().unwrap_or(dir)
    } else {
        dir
    }
}

/// 設定ファイルを検出して読み込む（検証はしない）
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<LoadedConfig> {
    let path = seedflow_config::find_bootstrap_file(explicit)?;
    tracing::debug!("Loading {}", path.display());

    let config = seedflow_core::parse_kdl_file(&path)
        .map_err(|e| anyhow::anyhow!("{} の読み込みに失敗しました: {}", path.display(), e))?;

    Ok(LoadedConfig { path, config })
}

/// 読み込んだ設定ファイル情報を表示
pub fn print_loaded_config_file(path: &Path) {
    println!("📄 読み込んだ設定ファイル:");
    println!("  • {}", path.display().to_string().cyan());
}

/// --skip の値を解析
pub fn parse_skip(skip: Option<&str>) -> anyhow::Result<Vec<Phase>> {
    match skip {
        Some(list) => Phase::parse_list(list).map_err(|e| anyhow::anyhow!(e)),
        None => Ok(Vec::new()),
    }
}

/// 実行予定のフェーズ一覧を表示
pub fn print_phases(skip: &[Phase]) {
    println!("{}", "フェーズ:".bold());
    for (i, phase) in Phase::ALL.iter().enumerate() {
        if skip.contains(phase) {
            println!(
                "  {}. {} {}",
                i + 1,
                phase.name().dimmed(),
                "(skip)".yellow()
            );
        } else {
            println!("  {}. {} ({})", i + 1, phase.name(), phase.id().cyan());
        }
    }
}
