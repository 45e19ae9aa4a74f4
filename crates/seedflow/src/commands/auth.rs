use colored::Colorize;
use seedflow_cloud::ControlPlane;
use seedflow_cloud_gcp::GcpControlPlane;

pub async fn handle() -> anyhow::Result<()> {
    println!("{}", "gcloud の認証状態を確認中...".blue());

    let plane = GcpControlPlane::new();
    let status = plane.check_auth().await?;

    if status.authenticated {
        println!(
            "{} {}",
            "✓ 認証済み:".green().bold(),
            status.account_info.as_deref().unwrap_or("unknown").cyan()
        );
        Ok(())
    } else {
        eprintln!("{}", "✗ 認証されていません".red().bold());
        if let Some(error) = &status.error {
            eprintln!("  {}", error);
        }
        std::process::exit(1);
    }
}
