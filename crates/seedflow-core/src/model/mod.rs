//! モデル定義
//!
//! ブートストラップで使用するデータモデルを定義します。

mod catalog;
mod config;
mod identity;
mod policy;

// Re-exports
pub use catalog::*;
pub use config::*;
pub use identity::*;
pub use policy::*;
