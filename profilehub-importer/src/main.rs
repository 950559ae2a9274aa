//! # ProfileHub Importer
//!
//! Command-line batch job reconciling legacy user rows into the live
//! system.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p profilehub-importer -- users.json [--dry-run] [--site <hostname>]
//! ```
//!
//! `DATABASE_URL` selects the database; `--site` defaults to
//! `DEFAULT_SITE_HOSTNAME` (or "localhost"). Re-running a batch is safe:
//! rows already reconciled are skipped.

use profilehub_importer::{
    reconciler::{ImportConfig, Reconciler},
    rows,
};
use profilehub_shared::{
    db::{migrations, pool},
    models::site::Site,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

struct Args {
    batch_path: String,
    dry_run: bool,
    site_hostname: String,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut batch_path = None;
    let mut dry_run = false;
    let mut site_hostname = std::env::var("DEFAULT_SITE_HOSTNAME")
        .unwrap_or_else(|_| "localhost".to_string());

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--dry-run" => dry_run = true,
            "--site" => {
                site_hostname = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--site requires a hostname"))?;
            }
            path if !path.starts_with('-') => batch_path = Some(path.to_string()),
            other => anyhow::bail!("Unknown argument: {}", other),
        }
    }

    Ok(Args {
        batch_path: batch_path
            .ok_or_else(|| anyhow::anyhow!("Usage: profilehub-importer <rows.json> [--dry-run] [--site <hostname>]"))?,
        dry_run,
        site_hostname,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "profilehub_importer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let args = parse_args()?;

    tracing::info!(
        "ProfileHub Importer v{} starting (batch: {}, dry_run: {})",
        env!("CARGO_PKG_VERSION"),
        args.batch_path,
        args.dry_run
    );

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

    let db = pool::create_pool(pool::DatabaseConfig {
        url: database_url,
        ..Default::default()
    })
    .await?;

    migrations::run_migrations(&db).await?;

    let site = Site::find_by_hostname(&db, &args.site_hostname)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No site with hostname '{}'", args.site_hostname))?;

    let json = tokio::fs::read_to_string(&args.batch_path).await?;
    let batch = rows::parse_batch(&json)?;
    tracing::info!(rows = batch.len(), site = %site.hostname, "Batch loaded");

    let reconciler = Reconciler::new(
        &db,
        ImportConfig {
            site_id: site.id,
            dry_run: args.dry_run,
        },
    );

    let report = reconciler.run(&batch).await?;

    println!("{}", report.summary());
    for failure in &report.failed {
        println!(
            "  row {}: {} ({})",
            failure.index,
            failure.reason,
            failure.identity.as_deref().unwrap_or("no identity")
        );
    }

    if !report.failed.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
