//! Monitor command - prints change events for one schema instance.
//!
//! Other processes edit the registry file; the monitor re-reads it on an
//! interval and lets the instance turn the differences into events.

use std::{
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use signal_hook::flag as signal_flag;

use crate::backend::Backend;
use crate::cli::MonitorArgs;
use crate::output::{OutputFormat, print_json};

/// Run the monitor command until SIGINT or SIGTERM
pub fn run(
    backend: &Backend,
    args: &MonitorArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let term_signal = Arc::new(AtomicBool::new(false));
    for signal in signal_hook::consts::TERM_SIGNALS {
        signal_flag::register(*signal, Arc::clone(&term_signal))?;
    }

    let settings = Rc::new(backend.settings(&args.target)?);
    let watched = Rc::downgrade(&settings);
    settings.on_changed(move |event| {
        let Some(settings) = watched.upgrade() else {
            return;
        };
        let value = match settings.get(&event.key) {
            Ok(value) => value.to_string(),
            Err(e) => {
                tracing::warn!("Failed to read {}: {e}", event.key);
                return;
            }
        };
        match format {
            OutputFormat::Human => {
                if event.is_descendant() {
                    println!("{} [{}] = {value}", event.key, event.location);
                } else {
                    println!("{} = {value}", event.key);
                }
            }
            OutputFormat::Json => {
                let line = serde_json::json!({
                    "key": event.key,
                    "location": event.location.to_string(),
                    "descendant": event.is_descendant(),
                    "value": value,
                });
                if let Err(e) = print_json(&line) {
                    tracing::warn!("Failed to print event: {e}");
                }
            }
        }
    });

    if format == OutputFormat::Human {
        println!(
            "Monitoring {} at {} (Ctrl+C to stop)",
            settings.schema().id(),
            settings.location()
        );
    }

    let interval = Duration::from_millis(args.interval_ms.max(1));
    while !term_signal.load(Ordering::Relaxed) {
        std::thread::sleep(interval);
        if let Err(e) = backend.reload() {
            tracing::warn!("Failed to reload registry: {e}");
            continue;
        }
        backend.instance.iterate();
    }

    tracing::info!("Shutdown signal received, stopping monitor");
    Ok(())
}
