use crate::ReportFormat;
use crate::utils::LoadedConfig;
use colored::Colorize;
use seedflow_cloud::ControlPlane;
use seedflow_cloud_gcp::GcpControlPlane;
use seedflow_core::ExportReport;

pub async fn handle(
    loaded: &LoadedConfig,
    pool_name: Option<String>,
    format: ReportFormat,
) -> anyhow::Result<()> {
    let config = &loaded.config;
    config.ensure_valid()?;

    let pool_name = match pool_name {
        Some(name) => Some(name),
        None => resolve_pool_name(loaded).await,
    };

    if pool_name.is_none() {
        eprintln!(
            "{}",
            "⚠ Workload Identity プール名を取得できませんでした".yellow()
        );
    }

    let report = ExportReport::build(config, pool_name.as_deref());
    match format {
        ReportFormat::Text => print!("{}", report),
        ReportFormat::Json => println!("{}", report.to_json()?),
    }
    Ok(())
}

/// state に記録された名前、なければ gcloud に問い合わせる
async fn resolve_pool_name(loaded: &LoadedConfig) -> Option<String> {
    let config = &loaded.config;
    let shared = &config.projects.shared;

    match loaded.state_manager().load().await {
        Ok(Some(state)) => {
            if let Some(name) = state.pool_name_for(shared) {
                tracing::debug!("Using pool name from state");
                return Some(name.to_string());
            }
        }
        Ok(None) => {}
        Err(e) => tracing::warn!("Failed to read state: {}", e),
    }

    let plane = GcpControlPlane::new();
    match plane.describe_pool(shared, &config.identity_pool).await {
        Ok(name) => Some(name),
        Err(e) => {
            tracing::warn!("Failed to describe identity pool: {}", e);
            None
        }
    }
}
