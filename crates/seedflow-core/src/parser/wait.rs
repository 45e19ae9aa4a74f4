//! wait ノードのパース

use super::first_value;
use crate::error::{CoreError, Result};
use crate::model::{WaitMode, WaitSettings};
use kdl::KdlNode;

/// `wait "poll" { max-retries 8 ... }` をパース
pub fn parse_wait(node: &KdlNode) -> Result<WaitSettings> {
    let mut settings = WaitSettings::default();

    if let Some(mode) = first_value(node) {
        settings.mode = mode.parse::<WaitMode>().map_err(CoreError::InvalidConfig)?;
    }

    if let Some(children) = node.children() {
        for child in children.nodes() {
            let key = child.name().value();
            match key {
                "mode" => {
                    let mode = first_value(child)
                        .ok_or_else(|| CoreError::InvalidConfig("wait.mode には値が必要です".into()))?;
                    settings.mode = mode.parse::<WaitMode>().map_err(CoreError::InvalidConfig)?;
                }
                "fixed-secs" | "fixed_secs" => settings.fixed_secs = integer_arg(child, key)?,
                "max-retries" | "max_retries" => settings.max_retries = integer_arg(child, key)?,
                "initial-delay-ms" | "initial_delay_ms" => {
                    settings.initial_delay_ms = integer_arg(child, key)?;
                }
                "max-delay-ms" | "max_delay_ms" => settings.max_delay_ms = integer_arg(child, key)?,
                "multiplier" => {
                    let value = child.entries().first().map(|e| e.value());
                    settings.multiplier = value
                        .and_then(|v| v.as_float().or_else(|| v.as_integer().map(|i| i as f64)))
                        .ok_or_else(|| {
                            CoreError::InvalidConfig("wait.multiplier には数値が必要です".into())
                        })?;
                }
                other => {
                    return Err(CoreError::InvalidConfig(format!(
                        "wait に未知の項目があります: {}",
                        other
                    )));
                }
            }
        }
    }

    Ok(settings)
}

/// 範囲外の値は切り詰めずにエラーにする
fn integer_arg<T: TryFrom<i128>>(node: &KdlNode, key: &str) -> Result<T> {
    node.entries()
        .first()
        .and_then(|e| e.value().as_integer())
        .and_then(|v| T::try_from(v).ok())
        .ok_or_else(|| {
            CoreError::InvalidConfig(format!("wait.{} には範囲内の0以上の整数が必要です", key))
        })
}
