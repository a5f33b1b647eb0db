use std::time::{Duration, SystemTime};

use kanal::AsyncSender;
use textgrab_config::ConfigStore;
use textgrab_core::AppEvent;
use textgrab_types::{BackendId, Shortcut};
use tokio_util::sync::CancellationToken;

/// Forward OS hotkey presses to the app loop until cancelled. Blocking.
pub fn hotkey_listener(interval: Duration, cancel: CancellationToken, tx: AsyncSender<AppEvent>) {
    tracing::info!("Hotkey listener started");
    textgrab_ocr::poll_hotkey_events(
        interval,
        || cancel.is_cancelled() || tx.is_closed(),
        |id| {
            if let Err(e) = tx.try_send(AppEvent::HotkeyPressed(id)) {
                tracing::error!("Failed to forward hotkey press: {e}");
            }
        },
    );
}

/// Poll the settings file and report shortcut/backend changes made to it.
///
/// Environment overrides are re-applied to every reload; command line overrides
/// only hold until the file is edited.
pub async fn settings_watcher(
    store: ConfigStore,
    initial: (Shortcut, BackendId),
    interval: Duration,
    cancel: CancellationToken,
    tx: AsyncSender<AppEvent>,
) -> anyhow::Result<()> {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut last_modified = store.modified();
    let mut last_selection = initial;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let modified = store.modified();
        if modified == last_modified {
            continue;
        }
        last_modified = modified;

        let Some(selection) = reload(&store, modified) else {
            continue;
        };
        if selection == last_selection {
            continue;
        }

        tracing::info!(
            shortcut = %selection.0,
            backend = %selection.1,
            "Settings file changed"
        );
        last_selection = selection.clone();
        let (shortcut, backend) = selection;
        if tx
            .send(AppEvent::SettingsChanged { shortcut, backend })
            .await
            .is_err()
        {
            break;
        }
    }

    tracing::info!("Settings watcher stopping");
    Ok(())
}

fn reload(store: &ConfigStore, modified: Option<SystemTime>) -> Option<(Shortcut, BackendId)> {
    modified?;
    match store.load() {
        Ok(mut config) => {
            config.apply_env();
            Some(config.selection())
        }
        Err(e) => {
            tracing::warn!("Ignoring settings change: {e}");
            None
        }
    }
}

/// Ask the app loop to quit on Ctrl+C
pub async fn shutdown_signal(cancel: CancellationToken, tx: AsyncSender<AppEvent>) -> anyhow::Result<()> {
    tokio::select! {
        _ = cancel.cancelled() => {}
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutdown requested");
            tx.send(AppEvent::Shutdown).await.ok();
        }
    }
    Ok(())
}
