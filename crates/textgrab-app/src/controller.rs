use std::rc::Rc;
use std::time::Duration;

use anyhow::Context;
use kanal::{AsyncReceiver, AsyncSender};
use textgrab_config::{Config, ConfigStore};
use textgrab_core::{
    AppEvent, CaptureSession, HotkeyManager, Notifier, OcrDispatcher, SessionPorts,
};
use textgrab_io::SystemClipboard;
use textgrab_ocr::{GlobalHotkeyRegistrar, XcapCapture};
use textgrab_ui::{SlintNotifier, SlintOverlay};
use tokio::runtime::Runtime;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::events::{App, event_loop};
use crate::io::{hotkey_listener, settings_watcher, shutdown_signal};

/// Centralized channel management
pub struct ChannelSet {
    /// Everything the UI-thread app loop consumes
    pub app: (AsyncSender<AppEvent>, AsyncReceiver<AppEvent>),
}

impl ChannelSet {
    pub fn new() -> Self {
        Self {
            app: kanal::bounded_async(64),
        }
    }
}

/// Wires the worker runtime, the background tasks and the UI-thread app loop
pub struct AppController {
    channels: ChannelSet,
    runtime: Runtime,
    cancel_token: CancellationToken,
    store: ConfigStore,
    config: Config,
}

impl AppController {
    pub fn new(store: ConfigStore, config: Config) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("textgrab-worker")
            .build()
            .context("Failed to start worker runtime")?;

        Ok(Self {
            channels: ChannelSet::new(),
            runtime,
            cancel_token: CancellationToken::new(),
            store,
            config,
        })
    }

    fn spawn_tasks(&self) -> JoinSet<anyhow::Result<()>> {
        let _guard = self.runtime.enter();
        let mut tasks = JoinSet::new();
        let tx = &self.channels.app.0;

        let poll_interval = Duration::from_millis(self.config.hotkey.poll_interval_ms);
        let cancel = self.cancel_token.child_token();
        let hotkey_tx = tx.clone();
        tasks.spawn_blocking(move || {
            hotkey_listener(poll_interval, cancel, hotkey_tx);
            Ok(())
        });

        tasks.spawn(settings_watcher(
            ConfigStore::new(self.store.path()),
            self.config.selection(),
            Duration::from_millis(self.config.watch_interval_ms.max(100)),
            self.cancel_token.child_token(),
            tx.clone(),
        ));

        tasks.spawn(shutdown_signal(self.cancel_token.child_token(), tx.clone()));

        tasks
    }

    /// Build the UI-thread state. Must run on the main thread.
    fn build_app(&self) -> anyhow::Result<App<GlobalHotkeyRegistrar>> {
        let tx = self.channels.app.0.clone();

        let registrar = GlobalHotkeyRegistrar::new()?;
        let hotkeys = HotkeyManager::new(registrar, self.config.hotkey.shortcut.clone());
        let trigger_tx = tx.clone();
        hotkeys.on_activate(move || {
            tracing::debug!("Capture hotkey activated");
            if let Err(e) = trigger_tx.try_send(AppEvent::Trigger) {
                tracing::error!("Failed to queue capture: {e}");
            }
        });

        let notifier: Rc<dyn Notifier> = Rc::new(SlintNotifier::new()?);
        let session = CaptureSession::new(SessionPorts {
            capture: Box::new(XcapCapture::new(&self.config.capture)),
            overlay: Box::new(SlintOverlay::new(tx.clone())?),
            clipboard: Box::new(SystemClipboard::new()?),
            notifier: notifier.clone(),
        });

        let dispatcher = OcrDispatcher::new(textgrab_ocr::build_registry(&self.config.ocr));

        Ok(App {
            hotkeys,
            dispatcher,
            session,
            notifier,
            worker: self.runtime.handle().clone(),
            events: tx,
        })
    }

    /// Run until Ctrl+C or the event loop quits
    pub fn run(self) -> anyhow::Result<()> {
        let mut app = self.build_app()?;
        let mut tasks = self.spawn_tasks();

        tracing::info!(
            shortcut = %self.config.hotkey.shortcut.label(),
            backend = %self.config.ocr.backend,
            settings = %self.store.path().display(),
            "textgrab started"
        );
        app.select_backend(self.config.ocr.backend.clone());

        let rx = self.channels.app.1.clone();
        slint::spawn_local(event_loop(app, rx)).context("Failed to start app loop")?;
        slint::run_event_loop_until_quit().context("UI event loop failed")?;

        self.shutdown();
        self.runtime.block_on(async {
            while let Some(result) = tasks.join_next().await {
                match result {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!("Background task failed: {e:#}"),
                    Err(e) => tracing::error!("Background task panicked: {e}"),
                }
            }
        });
        self.runtime.shutdown_timeout(Duration::from_secs(1));
        tracing::info!("textgrab stopped");
        Ok(())
    }

    pub fn shutdown(&self) {
        self.cancel_token.cancel();
    }
}
