use clap::Parser;
use ecourts_scraper::core::ConfigProvider;
use ecourts_scraper::utils::{logger, monitor::SystemMonitor, validation::Validate};
use ecourts_scraper::{
    export, CauseListFetch, CliConfig, EcourtsClient, LocalStorage, LookupOutcome, Orchestrator,
    ScrapeError,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting eCourts scraper CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 驗證輸入
    if let Err(e) = cli.validate() {
        tracing::error!("❌ Input validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(1);
    }

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(e.exit_code().max(1));
        }
    };

    let monitor = SystemMonitor::new(cli.monitor);
    if monitor.is_enabled() {
        tracing::info!("🔍 System monitoring enabled");
    }

    let storage = LocalStorage::new(settings.output_path.clone());
    let client = match EcourtsClient::new(&settings) {
        Ok(client) => client,
        Err(e) => {
            report(&e);
            std::process::exit(e.exit_code().max(1));
        }
    };
    let orchestrator = Arc::new(Orchestrator::new(
        client,
        storage.clone(),
        settings.cache_ttl(),
    ));

    // The ambient clock is read once, here at the edge; everything below
    // works off explicit dates.
    let today = chrono::Local::now().date_naive();
    let date = cli.day().resolve(today);
    let now = chrono::Utc::now();

    if cli.causelist {
        if cli.has_case_query() {
            tracing::warn!("--causelist given, ignoring case lookup flags");
        }

        let exit_code = match orchestrator
            .fetch_cause_list(date, settings.court.as_deref(), now)
            .await
        {
            Ok(fetch) => {
                tracing::info!(
                    entries = fetch.list.entries.len(),
                    from_cache = fetch.from_cache,
                    "cause list for {}",
                    date
                );
                match write_cause_list_files(&storage, &fetch, cli.bundle).await {
                    Ok(paths) => {
                        println!("📥 Cause list downloaded successfully.");
                        for path in paths {
                            println!("✅ Saved: {}", storage.base_path().join(&path).display());
                        }
                        0
                    }
                    Err(e) => {
                        report(&e);
                        e.exit_code().max(1)
                    }
                }
            }
            Err(e) => {
                report(&e);
                e.exit_code().max(1)
            }
        };

        monitor.log_final_stats();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
        return Ok(());
    }

    println!("\n🔍 Checking case listing...\n");

    let results = orchestrator.lookup_many(cli.query_inputs(), date, now).await;

    let mut exit_code = 0;
    for result in results {
        match result {
            Ok(lookup) => match &lookup.outcome {
                LookupOutcome::Found(record) => {
                    if lookup.from_cache {
                        tracing::debug!(key = %lookup.key, "answered from cache");
                    }
                    println!("✅ Case Found!");
                    println!("📄 Court Name: {}", record.court_name);
                    if let Some(serial) = record.serial_number {
                        println!("🔢 Serial Number: {}", serial);
                    }
                    if let Some(listed) = record.listed_date {
                        println!("📅 Listed On: {}", listed);
                    }
                    match export::write_case_result(&storage, &lookup.key, record).await {
                        Ok(path) => {
                            println!("✅ Saved: {}", storage.base_path().join(&path).display())
                        }
                        Err(e) => {
                            report(&e);
                            exit_code = exit_code.max(e.exit_code().max(1));
                        }
                    }
                }
                LookupOutcome::NotFound => {
                    println!("❌ Case not found or not listed for the selected day.");
                }
            },
            Err(e) => {
                report(&e);
                exit_code = exit_code.max(e.exit_code().max(1));
            }
        }
    }

    monitor.log_final_stats();
    if exit_code > 0 {
        std::process::exit(exit_code);
    }
    Ok(())
}

async fn write_cause_list_files(
    storage: &LocalStorage,
    fetch: &CauseListFetch,
    bundle: bool,
) -> ecourts_scraper::Result<Vec<String>> {
    let mut paths = export::write_cause_list(storage, &fetch.list).await?;
    if bundle {
        paths.push(export::write_cause_list_bundle(storage, &fetch.list).await?);
    }
    Ok(paths)
}

fn report(e: &ScrapeError) {
    tracing::error!("❌ Scrape failed: {} (severity: {:?})", e, e.severity());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
}
