//! HID Card Reader Agent entry point.
//!
//! Wires the raw input layer, the Tokio timer, and the card reader service
//! together, then prints every accepted card number on stdout until Ctrl-C.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()               -- reader settings + last binding
//!  └─ CardReaderService::new()    -- catalog, selector, decoder, sink
//!  └─ restore or suggest a binding
//!  └─ start services
//!       ├─ raw input message loop (Windows thread, WM_INPUT → decoder)
//!       └─ card number printer    (Tokio task)
//! ```

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use cardreader_agent::application::decode_keystrokes::TimeoutScheduler;
use cardreader_agent::application::device_catalog::{matching_keywords, RawDeviceProvider};
use cardreader_agent::application::reader_service::CardReaderService;
use cardreader_agent::infrastructure::storage::config::{self, AppConfig};
use cardreader_agent::infrastructure::timer::TokioTimeoutScheduler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration before logging so `log_level` can seed the filter.
    let (mut app_config, load_error) = match config::load_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // Initialise structured logging.  Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&app_config.logging.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("HID Card Reader Agent starting");
    if let Some(e) = load_error {
        warn!("using default configuration: {e}");
    }

    let decoder_config = match app_config.reader.decoder_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("{e}; using default reader settings");
            Default::default()
        }
    };

    let scheduler: Arc<dyn TimeoutScheduler> = Arc::new(TokioTimeoutScheduler::try_current()?);
    let service = Arc::new(CardReaderService::new(
        decoder_config,
        app_config.reader.timeout(),
        platform_provider(),
        scheduler,
    ));

    // ── Device selection ──────────────────────────────────────────────────────
    let devices = service.get_available_devices();
    for device in &devices {
        info!("  {} {}", device.handle, device.display_name);
    }

    if !service.restore_binding(&app_config.device) {
        let candidates = matching_keywords(&devices, &app_config.reader.hid_keywords);
        match candidates.as_slice() {
            [only] => {
                info!("binding the only keyword match: {}", only.display_name);
                service.bind(only.handle, only.display_name.clone());
            }
            [] => warn!("no reader bound; set [device] last_device_handle in the config file"),
            many => {
                warn!(
                    "{} devices match \"{}\"; set [device] last_device_handle to pick one",
                    many.len(),
                    app_config.reader.hid_keywords
                );
            }
        }
    }

    // ── Card number printer ───────────────────────────────────────────────────
    let mut cards = service.subscribe_card_numbers();
    tokio::spawn(async move {
        while let Some(event) = cards.recv().await {
            println!("{}", event.card_number.as_str());
        }
    });

    // ── Raw input ─────────────────────────────────────────────────────────────
    start_raw_input(Arc::clone(&service));

    info!("HID Card Reader Agent ready.  Press Ctrl-C to exit.");
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    service.shutdown();
    app_config.device = service.current_binding();
    if let Err(e) = config::save_config(&app_config) {
        error!("failed to save configuration: {e}");
    }

    info!("HID Card Reader Agent stopped");
    Ok(())
}

#[cfg(target_os = "windows")]
fn platform_provider() -> Arc<dyn RawDeviceProvider> {
    Arc::new(cardreader_agent::infrastructure::raw_input::windows::WindowsRawInput::new())
}

#[cfg(not(target_os = "windows"))]
fn platform_provider() -> Arc<dyn RawDeviceProvider> {
    Arc::new(cardreader_agent::infrastructure::raw_input::UnsupportedPlatform)
}

/// Spawns the Win32 message loop thread that feeds `WM_INPUT` to the service.
#[cfg(target_os = "windows")]
fn start_raw_input(service: Arc<CardReaderService>) {
    use cardreader_agent::infrastructure::raw_input::windows::run_message_loop;

    let spawned = std::thread::Builder::new()
        .name("cardreader-raw-input".to_string())
        .spawn(move || {
            if let Err(e) = run_message_loop(service) {
                error!("raw input loop failed: {e}");
            }
        });
    if let Err(e) = spawned {
        error!("failed to start raw input thread: {e}");
    }
}

/// Without the Raw Input API the agent runs in degraded mode.
#[cfg(not(target_os = "windows"))]
fn start_raw_input(service: Arc<CardReaderService>) {
    use cardreader_agent::infrastructure::raw_input::{UnsupportedPlatform, WindowTarget};

    service.register_raw_input(&UnsupportedPlatform, WindowTarget(0));
}
