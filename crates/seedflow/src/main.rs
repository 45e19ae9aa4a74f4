mod commands;
mod logger;
mod utils;

use clap::{Parser, Subcommand, ValueEnum};
use seedflow_core::WaitMode;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "seed")]
#[command(about = "書いて、まく。GCP 組織の初期構築を一枚の KDL から。", long_about = None)]
struct Cli {
    /// bootstrap.kdl のパス（省略時は自動検出）
    #[arg(short, long, global = true, env = "SEEDFLOW_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 設定を検証
    Validate,
    /// 実行される gcloud コマンドを表示（何も変更しない）
    Plan {
        /// スキップするフェーズ（カンマ区切り）
        #[arg(long)]
        skip: Option<String>,
    },
    /// 組織をブートストラップ
    Up {
        /// 確認なしで実行
        #[arg(short, long)]
        yes: bool,
        /// スキップするフェーズ（カンマ区切り: projects,billing,shared,service-accounts,workload-identity,registry,environments）
        #[arg(long)]
        skip: Option<String>,
        /// 伝播待機の方式 (poll, fixed, none)
        #[arg(long)]
        wait: Option<WaitMode>,
        /// 失敗したステップがあっても残りを続行
        #[arg(long)]
        continue_on_error: bool,
    },
    /// GitHub に登録する変数・シークレットを表示
    Report {
        /// Workload Identity プールの正規名（省略時は state または gcloud から取得）
        #[arg(long)]
        pool_name: Option<String>,
        /// 出力形式
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// gcloud の認証状態を確認
    Auth,
    /// バージョン情報を表示
    Version,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Text,
    Json,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,seedflow_core=debug,seedflow_cloud=debug,seedflow_cloud_gcp=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // stdout は report の出力に使うのでログは stderr へ
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Version/Auth コマンドは設定ファイル不要
    match cli.command {
        Commands::Version => {
            println!("seedflow {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Commands::Auth => return commands::auth::handle().await,
        _ => {}
    }

    let loaded = utils::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Validate => commands::validate::handle(&loaded)?,
        Commands::Plan { skip } => commands::plan::handle(&loaded, skip.as_deref()).await?,
        Commands::Up {
            yes,
            skip,
            wait,
            continue_on_error,
        } => {
            commands::up::handle(&loaded, yes, skip.as_deref(), wait, continue_on_error).await?
        }
        Commands::Report { pool_name, format } => {
            commands::report::handle(&loaded, pool_name, format).await?
        }
        Commands::Version | Commands::Auth => {}
    }

    Ok(())
}
