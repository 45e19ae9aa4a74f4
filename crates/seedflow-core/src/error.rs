use std::path::PathBuf;
use thiserror::Error;

use crate::validate::Violation;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("KDLパースエラー: {0}")]
    KdlParse(#[from] kdl::KdlError),

    #[error("ファイル読み込みエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO エラー: {path}\n理由: {message}")]
    IoError { path: PathBuf, message: String },

    #[error("無効な設定: {0}")]
    InvalidConfig(String),

    #[error("必須項目 '{0}' が指定されていません")]
    MissingField(&'static str),

    #[error("設定の検証に失敗しました ({} 件):\n{}", .0.len(), format_violations(.0))]
    Validation(Vec<Violation>),

    #[error("ポリシー文書の生成に失敗しました: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON エラー: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

pub type Result<T> = std::result::Result<T, CoreError>;
