use std::rc::Rc;

use kanal::{AsyncReceiver, AsyncSender};
use textgrab_core::notify;
use textgrab_core::{
    AppEvent, BackendInit, CaptureSession, HotkeyManager, HotkeyRegistrar, InitCompletion,
    Notifier, OcrDispatcher, OverlayOutcome,
};
use textgrab_types::{BackendId, Shortcut};
use tokio::runtime::Handle;

/// Process-wide state, owned by the UI thread
pub struct App<R> {
    pub hotkeys: HotkeyManager<R>,
    pub dispatcher: OcrDispatcher,
    pub session: CaptureSession,
    pub notifier: Rc<dyn Notifier>,
    pub worker: Handle,
    pub events: AsyncSender<AppEvent>,
}

impl<R: HotkeyRegistrar> App<R> {
    /// Switch OCR backends; initialization runs on the worker
    pub fn select_backend(&mut self, backend: BackendId) {
        match self.dispatcher.select(backend) {
            Ok(Some(init)) => self.spawn_init(init),
            Ok(None) => {
                tracing::debug!(status = ?self.dispatcher.status(), "Backend already selected");
            }
            Err(e) => {
                tracing::error!("{e}");
                self.notifier.notify(notify::backend_failed(&e));
                self.start_hotkey();
            }
        }
    }

    fn spawn_init(&self, init: BackendInit) {
        let tx = self.events.clone();
        self.worker.spawn(async move {
            let completion = init.run().await;
            if tx.send(AppEvent::BackendInitialized(completion)).await.is_err() {
                tracing::debug!("App loop gone before backend initialization finished");
            }
        });
    }

    fn backend_initialized(&mut self, completion: InitCompletion) {
        let backend = completion.backend.clone();
        match self.dispatcher.complete_init(completion) {
            Ok(true) => {
                self.notifier.notify(notify::backend_ready(backend.as_str()));
                self.start_hotkey();
            }
            Ok(false) => {}
            Err(e) => {
                self.notifier.notify(notify::backend_failed(&e));
                self.start_hotkey();
            }
        }
    }

    /// The trigger goes live once the first backend selection has settled
    fn start_hotkey(&self) {
        if self.hotkeys.is_started() {
            return;
        }
        if let Err(e) = self.hotkeys.start() {
            self.notifier.notify(notify::hotkey_failed(&e));
        }
    }

    fn rebind(&self, shortcut: Shortcut) {
        if let Err(e) = self.hotkeys.rebind(shortcut) {
            self.notifier.notify(notify::hotkey_failed(&e));
        }
    }

    fn selection_finished(&mut self, outcome: OverlayOutcome) {
        let Some(job) = self.session.selection_finished(outcome, &self.dispatcher) else {
            return;
        };

        let tx = self.events.clone();
        self.worker.spawn(async move {
            let result = job.run().await;
            if tx.send(AppEvent::RecognitionFinished(result)).await.is_err() {
                tracing::debug!("App loop gone before recognition finished");
            }
        });
    }

    /// Returns false once the app should quit
    pub fn handle(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::HotkeyPressed(id) => {
                self.hotkeys.handle_activation(id);
            }
            AppEvent::Trigger => {
                self.session.trigger(&self.dispatcher);
            }
            AppEvent::SelectionFinished(outcome) => self.selection_finished(outcome),
            AppEvent::RecognitionFinished(result) => self.session.recognition_finished(result),
            AppEvent::BackendInitialized(completion) => self.backend_initialized(completion),
            AppEvent::SettingsChanged { shortcut, backend } => {
                self.rebind(shortcut);
                self.select_backend(backend);
            }
            AppEvent::Shutdown => {
                self.hotkeys.shutdown();
                return false;
            }
        }
        true
    }
}

/// App loop on the UI thread
pub async fn event_loop<R: HotkeyRegistrar>(mut app: App<R>, rx: AsyncReceiver<AppEvent>) {
    while let Ok(event) = rx.recv().await {
        tracing::trace!(?event, "app event");
        if !app.handle(event) {
            break;
        }
    }

    app.hotkeys.shutdown();
    if let Err(e) = slint::quit_event_loop() {
        tracing::error!("Failed to quit event loop: {e}");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use kanal::unbounded_async;
    use textgrab_core::fakes::{FakeRegistrar, FixedProvider, FixedRecognizer, Harness};
    use textgrab_core::{BackendRegistry, BackendStatus};
    use textgrab_types::{Severity, Shortcut};
    use tokio::time::timeout;

    use super::*;

    fn shortcut(s: &str) -> Shortcut {
        s.parse().unwrap()
    }

    struct Fixture {
        app: App<FakeRegistrar>,
        rx: AsyncReceiver<AppEvent>,
        registrar: FakeRegistrar,
        harness: Harness,
    }

    impl Fixture {
        fn new(providers: Vec<(&str, FixedProvider)>) -> Self {
            let mut registry = BackendRegistry::new();
            for (id, provider) in providers {
                registry.register(BackendId::new(id), Arc::new(provider));
            }

            let (tx, rx) = unbounded_async();
            let registrar = FakeRegistrar::default();
            let hotkeys = HotkeyManager::new(registrar.clone(), shortcut("shift+r"));
            let trigger_tx = tx.clone();
            hotkeys.on_activate(move || {
                trigger_tx.try_send(AppEvent::Trigger).unwrap();
            });

            let harness = Harness::default();
            let app = App {
                hotkeys,
                dispatcher: OcrDispatcher::new(registry),
                session: harness.session(),
                notifier: harness.notifier(),
                worker: Handle::current(),
                events: tx,
            };

            Self {
                app,
                rx,
                registrar,
                harness,
            }
        }

        /// Handle the next event the worker posts back
        async fn pump(&mut self) -> bool {
            let event = timeout(Duration::from_secs(1), self.rx.recv())
                .await
                .unwrap()
                .unwrap();
            self.app.handle(event)
        }
    }

    #[tokio::test]
    async fn test_hotkey_waits_for_backend_init() {
        let mut fx = Fixture::new(vec![("fake", FixedProvider::ready(FixedRecognizer::ok("x")))]);

        fx.app.select_backend(BackendId::new("fake"));
        assert_eq!(fx.registrar.registrations(), 0);

        assert!(fx.pump().await);
        assert!(fx.app.dispatcher.is_ready());
        assert_eq!(fx.registrar.live(), vec![shortcut("shift+r")]);
        assert_eq!(fx.harness.recorder.notices()[0].severity, Severity::Info);
    }

    #[tokio::test]
    async fn test_failed_init_still_starts_hotkey() {
        let mut fx = Fixture::new(vec![("fake", FixedProvider::failing("not installed"))]);

        fx.app.select_backend(BackendId::new("fake"));
        assert_eq!(fx.registrar.registrations(), 0);

        assert!(fx.pump().await);
        assert!(!fx.app.dispatcher.is_ready());
        assert_eq!(fx.registrar.live(), vec![shortcut("shift+r")]);

        let notices = fx.harness.recorder.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].severity, Severity::Error);
    }

    #[tokio::test]
    async fn test_unknown_backend_starts_hotkey_right_away() {
        let mut fx = Fixture::new(vec![]);

        fx.app.select_backend(BackendId::new("missing"));

        assert_eq!(fx.registrar.live(), vec![shortcut("shift+r")]);
        assert_eq!(fx.harness.recorder.notices().len(), 1);

        // no backend: a press aborts without capturing
        let id = fx.app.hotkeys.active_id().unwrap();
        assert!(fx.app.handle(AppEvent::HotkeyPressed(id)));
        assert!(fx.pump().await);
        assert!(fx.app.session.is_idle());
        assert_eq!(fx.harness.recorder.captures(), 0);
    }

    #[tokio::test]
    async fn test_settings_change_rebinds_and_reselects() {
        let mut fx = Fixture::new(vec![
            ("a", FixedProvider::ready(FixedRecognizer::ok("a"))),
            ("b", FixedProvider::ready(FixedRecognizer::ok("b"))),
        ]);
        fx.app.select_backend(BackendId::new("a"));
        fx.pump().await;

        assert!(fx.app.handle(AppEvent::SettingsChanged {
            shortcut: shortcut("ctrl+q"),
            backend: BackendId::new("b"),
        }));
        assert_eq!(fx.registrar.live(), vec![shortcut("ctrl+q")]);
        assert_eq!(
            fx.app.dispatcher.status(),
            &BackendStatus::Initializing(BackendId::new("b"))
        );

        fx.pump().await;
        assert_eq!(
            fx.app.dispatcher.status(),
            &BackendStatus::Ready(BackendId::new("b"))
        );
        assert_eq!(fx.registrar.live(), vec![shortcut("ctrl+q")]);
    }

    #[tokio::test]
    async fn test_stale_hotkey_id_starts_nothing() {
        let mut fx = Fixture::new(vec![("fake", FixedProvider::ready(FixedRecognizer::ok("x")))]);
        fx.app.select_backend(BackendId::new("fake"));
        fx.pump().await;

        let old_id = fx.app.hotkeys.active_id().unwrap();
        fx.app.handle(AppEvent::SettingsChanged {
            shortcut: shortcut("ctrl+q"),
            backend: BackendId::new("fake"),
        });

        assert!(fx.app.handle(AppEvent::HotkeyPressed(old_id)));
        assert!(fx.rx.try_recv().unwrap().is_none());
        assert!(fx.app.session.is_idle());
        assert_eq!(fx.harness.recorder.captures(), 0);

        let new_id = fx.app.hotkeys.active_id().unwrap();
        assert!(fx.app.handle(AppEvent::HotkeyPressed(new_id)));
        assert!(fx.pump().await);
        assert_eq!(fx.harness.recorder.captures(), 1);
        assert!(!fx.app.session.is_idle());
    }

    #[tokio::test]
    async fn test_shutdown_releases_hotkey() {
        let mut fx = Fixture::new(vec![("fake", FixedProvider::ready(FixedRecognizer::ok("x")))]);
        fx.app.select_backend(BackendId::new("fake"));
        fx.pump().await;
        assert_eq!(fx.registrar.live().len(), 1);

        assert!(!fx.app.handle(AppEvent::Shutdown));
        assert!(fx.registrar.live().is_empty());
    }
}
