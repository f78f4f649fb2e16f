//! gallery-acquire - CLI entry point.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::mpsc::unbounded_channel;
use tracing_subscriber::{fmt, EnvFilter};

use gallery_acquire::{
    archive::NoArchiveSupport,
    catalog::{CatalogStore, MemoryCatalog},
    cli::{Args, RunMode},
    config::{validate_config, Config},
    error::{exit_codes, Error, Result},
    fetch::{FetchEvent, FetchSession},
    output::{
        create_item_bar, print_banner, print_config_summary, print_error, print_fetch_stats,
        print_info, print_scan_stats, print_warning,
    },
    scan::{LocalScanner, ScanEvent, ScanResult},
    source::{EhenClient, FirstCandidate},
    watch::{FsWatcher, WatchEvent},
};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS as u8),
        Err(e) => {
            print_error(&format!("{}", e));
            match e {
                Error::Config(_) | Error::ConfigValidation { .. } | Error::MissingConfig(_) => {
                    ExitCode::from(exit_codes::CONFIG_ERROR as u8)
                }
                Error::ScanRoot { .. } => ExitCode::from(exit_codes::SCAN_ERROR as u8),
                Error::Source(_) | Error::SessionBusy | Error::Http(_) => {
                    ExitCode::from(exit_codes::SOURCE_ERROR as u8)
                }
                _ => ExitCode::from(exit_codes::UNEXPECTED_ERROR as u8),
            }
        }
    }
}

async fn run() -> Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    fmt().with_env_filter(filter).with_target(false).init();

    // Print banner
    print_banner();

    // Load configuration
    let mut config = if args.config.exists() {
        Config::load(&args.config)?
    } else {
        print_warning(&format!(
            "Configuration file not found: {}",
            args.config.display()
        ));
        print_info("Using default configuration with CLI arguments");
        Config::default()
    };

    // Merge CLI arguments into config
    args.merge_into_config(&mut config);

    // Validate configuration
    validate_config(&config)?;

    if config.library.roots.is_empty() {
        return Err(Error::MissingConfig(
            "library.roots (or pass --root <dir>)".to_string(),
        ));
    }

    // Print configuration summary
    let roots: Vec<String> = config
        .library
        .roots
        .iter()
        .map(|r| r.display().to_string())
        .collect();
    print_config_summary(
        &roots,
        &args.mode.to_string(),
        &config.fetch.merge_policy.to_string(),
    );

    let archives = NoArchiveSupport;
    let catalog = Arc::new(MemoryCatalog::new());

    match args.mode {
        RunMode::Scan => {
            let result = run_scan(&config, &archives, &catalog).await?;
            for gallery in &result.galleries {
                catalog.insert(gallery);
            }
        }
        RunMode::Fetch => {
            let mut result = run_scan(&config, &archives, &catalog).await?;
            run_fetch(&config, &archives, &mut result).await?;
            for gallery in &result.galleries {
                catalog.insert(gallery);
            }
        }
        RunMode::Watch => {
            let result = run_scan(&config, &archives, &catalog).await?;
            for gallery in &result.galleries {
                catalog.insert(gallery);
            }
            run_watch(&config, catalog.clone()).await?;
        }
    }

    Ok(())
}

/// Run one scan pass with a progress bar over the event stream.
async fn run_scan(
    config: &Config,
    archives: &NoArchiveSupport,
    catalog: &Arc<MemoryCatalog>,
) -> Result<ScanResult> {
    print_info("Scanning library roots...");

    let (tx, mut rx) = unbounded_channel();
    let scanner = LocalScanner::new(
        catalog.known_paths(),
        config.library.ignore_paths.clone(),
        archives,
    )
    .with_events(tx);

    let bar_task = tokio::spawn(async move {
        let mut bar = None;
        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::Total(total) => {
                    bar = Some(create_item_bar(total as u64, "Scanning"));
                }
                ScanEvent::Progress(n) => {
                    if let Some(bar) = &bar {
                        bar.set_position(n as u64);
                    }
                }
                ScanEvent::Finished { .. } => {
                    if let Some(bar) = &bar {
                        bar.finish_and_clear();
                    }
                }
                ScanEvent::Skipped(..) => {}
            }
        }
    });

    let result = tokio::task::block_in_place(|| {
        scanner.scan(&config.library.roots, config.scan_options())
    });
    drop(scanner);
    let _ = bar_task.await;

    let result = result?;
    print_scan_stats(&result);
    Ok(result)
}

/// Fetch remote metadata for every scanned gallery.
async fn run_fetch(
    config: &Config,
    archives: &NoArchiveSupport,
    result: &mut ScanResult,
) -> Result<()> {
    if result.galleries.is_empty() {
        print_info("Nothing to fetch");
        return Ok(());
    }

    print_info(&format!(
        "Fetching metadata for {} galleries...",
        result.galleries.len()
    ));

    let source = EhenClient::new(config.fetch.api_url.clone(), config.credentials())?;
    // The CLI has no chooser UI; ambiguous matches take the first candidate.
    let decider = FirstCandidate;

    let (tx, mut rx) = unbounded_channel();
    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                FetchEvent::Progress(message) => print_info(&message),
                FetchEvent::Outcome(outcome) => {
                    if let Some(error) = &outcome.error {
                        print_warning(&format!("{}: {}", outcome.title, error));
                    }
                }
                FetchEvent::Summary(_) => {}
            }
        }
    });

    let session = FetchSession::new(&source, &decider, archives, config.fetch_options())
        .with_events(tx);
    let summary = session.run(&mut result.galleries).await?;
    drop(session);
    let _ = printer.await;

    print_fetch_stats(&summary);
    Ok(())
}

/// Monitor the library roots and print propose-events until interrupted.
async fn run_watch(config: &Config, catalog: Arc<MemoryCatalog>) -> Result<()> {
    let catalog: Arc<dyn CatalogStore> = catalog;
    let mut watcher = FsWatcher::new(config.monitor_paths(), catalog, config.watch_options())?;
    print_info("Watching for changes (ctrl-c to stop)...");

    loop {
        tokio::select! {
            event = watcher.next_event() => match event {
                Some(WatchEvent::ProposeAdd { path }) => {
                    print_info(&format!("New gallery candidate: {}", path.display()));
                }
                Some(WatchEvent::ProposeRemove { gallery }) => {
                    print_warning(&format!(
                        "Cataloged gallery removed from disk: {}",
                        gallery.path.display()
                    ));
                }
                Some(WatchEvent::ProposePathUpdate { gallery, dest }) => {
                    print_info(&format!(
                        "Gallery moved: {} -> {}",
                        gallery.path.display(),
                        dest.display()
                    ));
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                print_info("Stopping watcher");
                break;
            }
        }
    }

    Ok(())
}
