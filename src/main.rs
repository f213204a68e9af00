use anyhow::Result;
use clap::Parser;
use geodata_etl::config::datasets;
use geodata_etl::domain::ports::ConfigProvider;
use geodata_etl::utils::{logger, validation::Validate};
use geodata_etl::{CliConfig, EtlEngine, OpenDataPipeline};
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<()> {
    let config = CliConfig::parse();

    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting geodata-etl");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let specs = datasets::select(&config.datasets)?;
    tracing::info!("Running {} dataset(s)", specs.len());

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(config.database_url())
        .await?;

    let pipeline = OpenDataPipeline::new(&config, pool, specs.clone());
    let engine = EtlEngine::new(pipeline, specs);

    match engine.run().await {
        Ok(report) => {
            let elapsed = (report.finished_at - report.started_at).num_seconds();
            println!("✅ ETL run completed in {}s", elapsed);
            for ds in &report.datasets {
                println!(
                    "   {}: extracted {} / cleaned {} / loaded {} / geometries {}",
                    ds.key, ds.extracted, ds.cleaned, ds.loaded, ds.geometries_backfilled
                );
            }
            let failed: Vec<_> = report.failed().collect();
            if !failed.is_empty() {
                println!("⚠️ {} dataset(s) failed:", failed.len());
                for ds in &failed {
                    println!("   {}: {}", ds.key, ds.failure.as_deref().unwrap_or("unknown"));
                }
                std::process::exit(2);
            }
        }
        Err(e) => {
            tracing::error!("❌ ETL run failed: {}", e);
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
