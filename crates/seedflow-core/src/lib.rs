//! SeedFlow Core
//!
//! 組織ブートストラップの設定モデル、KDLパーサー、検証、
//! CI 転記用レポートを提供します。

pub mod error;
pub mod model;
pub mod parser;
pub mod report;
pub mod validate;

pub use error::{CoreError, Result};
pub use model::*;
pub use parser::{parse_kdl_file, parse_kdl_string};
pub use report::{EnvironmentExport, ExportEntry, ExportReport};
pub use validate::{Violation, validate};
