pub mod error;

pub use error::*;

use std::path::{Path, PathBuf};
use tracing::debug;

/// 設定ファイルのパスを直接指定する環境変数
pub const CONFIG_PATH_ENV: &str = "SEEDFLOW_CONFIG_PATH";

/// カレントディレクトリ・.seedflow/ で探すファイル名（優先順）
const CANDIDATES: [&str; 4] = [
    "bootstrap.local.kdl",
    ".bootstrap.local.kdl",
    "bootstrap.kdl",
    ".bootstrap.kdl",
];

/// グローバル設定ファイルのパス（~/.config/seedflow/bootstrap.kdl）
pub fn global_bootstrap_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("seedflow").join("bootstrap.kdl"))
}

/// bootstrap.kdl ファイルを探す
///
/// 以下の優先順位で設定ファイルを検索:
/// 1. 引数で指定されたパス（存在しなければエラー）
/// 2. 環境変数 SEEDFLOW_CONFIG_PATH (直接パス指定)
/// 3. カレントディレクトリ: bootstrap.local.kdl, .bootstrap.local.kdl, bootstrap.kdl, .bootstrap.kdl
/// 4. ./.seedflow/ ディレクトリ内: 同様の順序
/// 5. ~/.config/seedflow/bootstrap.kdl (グローバル設定)
pub fn find_bootstrap_file(explicit: Option<&Path>) -> Result<PathBuf> {
    // 1. 明示的な指定
    if let Some(path) = explicit {
        if path.exists() {
            return Ok(path.to_path_buf());
        }
        return Err(ConfigError::ExplicitPathNotFound(
            path.display().to_string(),
        ));
    }

    // 2. 環境変数で直接指定
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            debug!(path = %path.display(), "Using bootstrap file from environment");
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    // 3. カレントディレクトリで検索
    if let Some(path) = find_in_dir(&current_dir) {
        return Ok(path);
    }

    // 4. ./.seedflow/ ディレクトリで検索
    let seed_dir = current_dir.join(".seedflow");
    if seed_dir.is_dir() {
        if let Some(path) = find_in_dir(&seed_dir) {
            return Ok(path);
        }
    }

    // 5. グローバル設定ファイル
    if let Some(global_config) = global_bootstrap_path() {
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::BootstrapFileNotFound)
}

fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    CANDIDATES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;

    /// カレントディレクトリを移動して実行し、元に戻す
    fn in_dir<F: FnOnce()>(dir: &Path, f: F) {
        let original_dir = std::env::current_dir().unwrap();
        std::env::set_current_dir(dir).unwrap();
        temp_env::with_var_unset(CONFIG_PATH_ENV, f);
        std::env::set_current_dir(original_dir).unwrap();
    }

    #[test]
    #[serial]
    fn test_global_bootstrap_path() {
        let temp_dir = tempfile::tempdir().unwrap();

        temp_env::with_var("XDG_CONFIG_HOME", Some(temp_dir.path()), || {
            let path = global_bootstrap_path().unwrap();
            assert_eq!(path, temp_dir.path().join("seedflow/bootstrap.kdl"));
        });
    }

    #[test]
    #[serial]
    fn test_global_config_is_last_resort() {
        let temp_dir = tempfile::tempdir().unwrap();
        let work_dir = temp_dir.path().join("work");
        let global_dir = temp_dir.path().join("config/seedflow");
        fs::create_dir_all(&work_dir).unwrap();
        fs::create_dir_all(&global_dir).unwrap();
        fs::write(global_dir.join("bootstrap.kdl"), "// global").unwrap();

        temp_env::with_var("XDG_CONFIG_HOME", Some(temp_dir.path().join("config")), || {
            in_dir(&work_dir, || {
                let found = find_bootstrap_file(None).unwrap();
                assert_eq!(found, global_dir.join("bootstrap.kdl"));
            });
        });
    }

    #[test]
    #[serial]
    fn test_find_in_current_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("bootstrap.kdl"), "// test").unwrap();

        in_dir(temp_dir.path(), || {
            let found = find_bootstrap_file(None).unwrap();
            assert!(found.ends_with("bootstrap.kdl"));
        });
    }

    #[test]
    #[serial]
    fn test_local_file_has_priority() {
        let temp_dir = tempfile::tempdir().unwrap();
        fs::write(temp_dir.path().join("bootstrap.kdl"), "// shared").unwrap();
        fs::write(temp_dir.path().join("bootstrap.local.kdl"), "// local").unwrap();

        in_dir(temp_dir.path(), || {
            let found = find_bootstrap_file(None).unwrap();
            assert!(found.ends_with("bootstrap.local.kdl"));
        });
    }

    #[test]
    #[serial]
    fn test_find_in_seedflow_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let seed_dir = temp_dir.path().join(".seedflow");
        fs::create_dir(&seed_dir).unwrap();
        fs::write(seed_dir.join("bootstrap.kdl"), "// in .seedflow").unwrap();

        in_dir(temp_dir.path(), || {
            let found = find_bootstrap_file(None).unwrap();
            assert!(found.ends_with(".seedflow/bootstrap.kdl"));
        });
    }

    #[test]
    #[serial]
    fn test_env_var_path() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("custom.kdl");
        fs::write(&config_path, "// custom").unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(&config_path), || {
            let found = find_bootstrap_file(None).unwrap();
            assert_eq!(found, config_path);
        });
    }

    #[test]
    #[serial]
    fn test_explicit_path_wins_over_env() {
        let temp_dir = tempfile::tempdir().unwrap();
        let explicit = temp_dir.path().join("explicit.kdl");
        let from_env = temp_dir.path().join("env.kdl");
        fs::write(&explicit, "// explicit").unwrap();
        fs::write(&from_env, "// env").unwrap();

        temp_env::with_var(CONFIG_PATH_ENV, Some(&from_env), || {
            let found = find_bootstrap_file(Some(&explicit)).unwrap();
            assert_eq!(found, explicit);
        });
    }

    #[test]
    #[serial]
    fn test_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();

        temp_env::with_var("XDG_CONFIG_HOME", Some(temp_dir.path()), || {
            in_dir(temp_dir.path(), || {
                let result = find_bootstrap_file(None);
                assert!(matches!(result, Err(ConfigError::BootstrapFileNotFound)));
            });
        });
    }

    #[test]
    fn test_explicit_path_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.kdl");

        let result = find_bootstrap_file(Some(&missing));
        assert!(matches!(result, Err(ConfigError::ExplicitPathNotFound(_))));
    }
}
