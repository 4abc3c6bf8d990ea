//! # homelinkd — homelink daemon
//!
//! Composition root that wires the adapters together and runs the bridge.
//!
//! ## Responsibilities
//! - Parse configuration (TOML file, env var overrides)
//! - Build the MQTT bus and spawn its run loop
//! - Construct device drivers from `[[devices]]` entries and register them
//! - Announce the device set to the assistant platform (best-effort)
//! - Spawn the notification loop when a notifier is configured
//! - Wait for ctrl-c
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

mod config;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use homelink_adapter_devices::{climate, curtain, dimmer};
use homelink_adapter_notify::CallbackClient;
use homelink_app::notification_loop::NotificationLoop;
use homelink_app::ports::ChangeNotifier;
use homelink_app::registry::DeviceRegistry;

use config::{Config, DeviceEntry};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.logging.filter))
        .init();

    // Hardware bus
    let (bus, bus_driver) = homelink_adapter_mqtt::connect(&config.mqtt);

    // Devices
    let mut registry = DeviceRegistry::new();
    for entry in &config.devices {
        let device = match entry {
            DeviceEntry::Dimmer(args) => dimmer::build(bus.clone(), args.clone())?,
            DeviceEntry::Curtain(args) => curtain::build(bus.clone(), args.clone())?,
            DeviceEntry::Climate(args) => climate::build(bus.clone(), args.clone())?,
        };
        tracing::info!(device = %device.id(), "registered device");
        registry.register(device)?;
    }
    if registry.is_empty() {
        tracing::warn!("no devices configured; the bridge will serve an empty registry");
    }
    let registry = Arc::new(registry);

    tokio::spawn(bus_driver.run());

    // Notifications
    if let Some(notifier_config) = &config.notifier {
        let notifier = CallbackClient::new(notifier_config)?;
        // The device set only changes with a config change and restart, so
        // one discovery ping at startup keeps the platform in sync.
        if let Err(err) = notifier.notify_discovery().await {
            tracing::warn!(error = %err, "discovery notification failed");
        }
        tokio::spawn(NotificationLoop::new(Arc::clone(&registry), notifier).run());
    } else {
        tracing::info!("notifier not configured; change pushes disabled");
    }

    tracing::info!(devices = registry.len(), "homelinkd running");
    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    Ok(())
}
