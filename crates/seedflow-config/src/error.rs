use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(
        "設定ファイルが見つかりません。以下の場所を確認してください:\n\
        - カレントディレクトリ: bootstrap.local.kdl, .bootstrap.local.kdl, bootstrap.kdl, .bootstrap.kdl\n\
        - ./.seedflow/ ディレクトリ\n\
        - ~/.config/seedflow/bootstrap.kdl\n\
        または --config / SEEDFLOW_CONFIG_PATH 環境変数で直接指定できます"
    )]
    BootstrapFileNotFound,

    #[error("指定された設定ファイルが存在しません: {0}")]
    ExplicitPathNotFound(String),

    #[error("IO エラー: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
