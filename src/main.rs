use dojo_roster::{
    config::{self, BackendConfig},
    core::{Roster, format_date, format_fee, student_count_label, summarize},
    errors::Result,
    notify::TracingNotifier,
    store::{RestStore, StudentStore, TableStore},
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

async fn build_store(backend: &BackendConfig) -> Result<Arc<dyn StudentStore>> {
    let store: Arc<dyn StudentStore> = match backend {
        BackendConfig::Rest { base_url, .. } => {
            Arc::new(RestStore::new(base_url, backend.timeout())?)
        }
        BackendConfig::Table { database_url } => Arc::new(TableStore::connect(database_url).await?),
    };
    Ok(store)
}

async fn print_roster(roster: &Roster) {
    let records = roster.records().await;
    println!("{}", student_count_label(records.len()));
    if records.is_empty() {
        println!("Nenhum aluno cadastrado ainda.");
    }
    for record in &records {
        println!(
            "  {:<30} {:>3} anos  {:<22} {:<12} {}",
            record.name,
            record.age,
            record.belt,
            format_date(record.enrollment_date),
            format_fee(record.monthly_fee),
        );
    }

    let summary = summarize(&records);
    for (belt, count) in summary.by_belt.iter().filter(|(_, count)| *count > 0) {
        println!("  {belt}: {count}");
    }
    println!(
        "Mensalidades: {} ({} sem valor informado)",
        format_fee(Some(summary.monthly_revenue)),
        summary.fees_not_informed
    );
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // 1. Tracing first, so config loading is visible
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. .env is optional; variables can be set externally
    dotenv().ok();

    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Failed to load configuration: {}", e))?;

    let store = build_store(&app_config.backend)
        .await
        .inspect_err(|e| error!("Failed to set up the student store: {}", e))?;
    let roster = Roster::new(store, Arc::new(TracingNotifier))
        .with_strategy(app_config.sync.strategy);

    let watch = if app_config.sync.watch_changes {
        roster.mount().await
    } else {
        // Load errors are already reported as notices.
        let _ = roster.initialize().await;
        None
    };

    print_roster(&roster).await;

    let Some(watch) = watch else {
        return Ok(());
    };
    info!("Watching for changes, press Ctrl-C to exit");
    let mut shown = roster.records().await;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
            () = tokio::time::sleep(std::time::Duration::from_secs(1)) => {
                let current = roster.records().await;
                if current != shown {
                    shown = current;
                    print_roster(&roster).await;
                }
            }
        }
    }
    drop(watch);
    info!("Shutting down");
    Ok(())
}
