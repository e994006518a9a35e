use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use slotcheck::cli;
use slotcheck::config::Config;
use slotcheck::engine::Selection;
use slotcheck::notify::Notifier;
use slotcheck::provider::SlotProvider;
use slotcheck::store::SelectionStore;
use slotcheck::watcher::Watcher;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::parse_args();

    if args.help {
        cli::print_help();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("slotcheck=info".parse().unwrap()),
        )
        .init();

    info!("slotcheck Timeslot Monitor v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded");
    info!("  Facility timezone: {}", config.facility_tz);
    info!("  Slot feed: {}", config.slots_url);
    info!(
        "  Buffers: delivery {}m, pickup {}m",
        config.delivery_buffer_minutes, config.pickup_buffer_minutes
    );
    info!("  Method: {:?}", args.method);

    // Handle --validate mode
    if args.validate {
        info!("Validating configuration...");
        match config.validate() {
            Ok(()) => {
                info!("Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                error!("{}", e);
                std::process::exit(1);
            }
        }
    }

    let provider = SlotProvider::new(config.slots_url.clone());
    let notifier = Notifier::new(config.webhook_url.clone());

    let selection = match args.at {
        Some(instant) => Selection::At(instant),
        None => Selection::Now,
    };
    let store = SelectionStore::new(selection, args.method);
    let mut watcher = Watcher::new(&config, store);

    // Run a single evaluation (for testing) or start the watch loop
    if args.once {
        info!("Running single evaluation (--once mode)");
        watcher.run_once(&provider, &notifier).await?;
        info!(
            "Selection: {:?}, countdown {}ms",
            watcher.store().selection(),
            watcher.store().remaining_ms()
        );
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, shutting down");
            signal_cancel.cancel();
        }
    });

    watcher.run(&provider, &notifier, cancel).await
}
