use anyhow::Context;
use seed_kernel::Settings;

/// Container entrypoint hook: seed once, exit non-zero on any failure.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load mongo-seed settings")?;
    seed_telemetry::init(&settings.telemetry);

    tracing::info!(
        env = ?settings.environment,
        admin_db = %settings.mongo.admin_database,
        "mongo-seed bootstrap starting"
    );

    let report = mongo_seed::run_seed(&settings).await?;

    tracing::info!(
        created = report.created.len(),
        skipped = report.skipped.len(),
        "mongo-seed bootstrap complete"
    );
    Ok(())
}
