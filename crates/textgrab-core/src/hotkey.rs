use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use textgrab_types::{HotkeyError, Shortcut};
use thiserror::Error;

/// Identifier the OS reports back when a registered combination fires
pub type HotkeyId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrarError {
    #[error("combination is already registered by another application")]
    Unavailable,

    #[error("key cannot be used as a global hotkey: {0}")]
    Unsupported(String),

    #[error("{0}")]
    Os(String),
}

/// OS global hotkey service
pub trait HotkeyRegistrar {
    fn register(&mut self, shortcut: &Shortcut) -> Result<HotkeyId, RegistrarError>;
    fn unregister(&mut self, id: HotkeyId) -> Result<(), RegistrarError>;
}

type Callback = Arc<dyn Fn() + Send + Sync>;

struct Binding<R> {
    registrar: R,
    current: Shortcut,
    active: Option<HotkeyId>,
    started: bool,
}

/// Owns the single global trigger and keeps it consistent with the OS registration.
///
/// Before [`HotkeyManager::start`] the shortcut is only remembered. After it, the
/// current shortcut is registered at all times unless the OS refused both the new
/// and the previous combination.
pub struct HotkeyManager<R> {
    binding: Mutex<Binding<R>>,
    callback: Mutex<Option<Callback>>,
}

impl<R: HotkeyRegistrar> HotkeyManager<R> {
    pub fn new(registrar: R, shortcut: Shortcut) -> Self {
        Self {
            binding: Mutex::new(Binding {
                registrar,
                current: shortcut,
                active: None,
                started: false,
            }),
            callback: Mutex::new(None),
        }
    }

    /// Callback invoked when the active combination fires
    pub fn on_activate(&self, callback: impl Fn() + Send + Sync + 'static) {
        *lock(&self.callback) = Some(Arc::new(callback));
    }

    pub fn current_shortcut(&self) -> Shortcut {
        lock(&self.binding).current.clone()
    }

    pub fn active_id(&self) -> Option<HotkeyId> {
        lock(&self.binding).active
    }

    pub fn is_active(&self) -> bool {
        self.active_id().is_some()
    }

    /// True once `start` has run, even if the registration failed
    pub fn is_started(&self) -> bool {
        lock(&self.binding).started
    }

    /// Register the current shortcut with the OS. Called once a backend is ready.
    pub fn start(&self) -> Result<(), HotkeyError> {
        let mut binding = try_lock(&self.binding)?;
        binding.started = true;
        if binding.active.is_some() {
            return Ok(());
        }

        let shortcut = binding.current.clone();
        match binding.registrar.register(&shortcut) {
            Ok(id) => {
                binding.active = Some(id);
                tracing::info!(%shortcut, id, "Global hotkey registered");
                Ok(())
            }
            Err(err) => {
                tracing::error!(%shortcut, "Failed to register global hotkey: {err}");
                Err(to_hotkey_error(shortcut, err, false))
            }
        }
    }

    /// Swap the global trigger for `shortcut`.
    ///
    /// On failure the previous shortcut is registered again when possible and the
    /// returned error says whether that worked. Concurrent calls fail with `Busy`.
    pub fn rebind(&self, shortcut: Shortcut) -> Result<(), HotkeyError> {
        let mut binding = try_lock(&self.binding)?;

        if !binding.started {
            tracing::debug!(%shortcut, "Hotkey not started yet, remembering shortcut");
            binding.current = shortcut;
            return Ok(());
        }

        if binding.current == shortcut && binding.active.is_some() {
            return Ok(());
        }

        let previous = binding.current.clone();
        if let Some(id) = binding.active.take()
            && let Err(err) = binding.registrar.unregister(id)
        {
            tracing::warn!(shortcut = %previous, "Failed to unregister hotkey: {err}");
        }

        match binding.registrar.register(&shortcut) {
            Ok(id) => {
                tracing::info!(from = %previous, to = %shortcut, id, "Global hotkey rebound");
                binding.current = shortcut;
                binding.active = Some(id);
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%shortcut, "Failed to register new hotkey: {err}");
                let restored = match binding.registrar.register(&previous) {
                    Ok(id) => {
                        binding.active = Some(id);
                        true
                    }
                    Err(restore_err) => {
                        tracing::error!(
                            shortcut = %previous,
                            "Failed to restore previous hotkey, no trigger is active: {restore_err}"
                        );
                        false
                    }
                };
                Err(to_hotkey_error(shortcut, err, restored))
            }
        }
    }

    /// Route an OS hotkey event. Returns true when it matched the active combination.
    pub fn handle_activation(&self, id: HotkeyId) -> bool {
        if lock(&self.binding).active != Some(id) {
            return false;
        }

        let callback = lock(&self.callback).clone();
        if let Some(callback) = callback {
            callback();
        }
        true
    }

    /// Release the OS registration
    pub fn shutdown(&self) {
        let mut binding = lock(&self.binding);
        binding.started = false;
        if let Some(id) = binding.active.take()
            && let Err(err) = binding.registrar.unregister(id)
        {
            tracing::warn!("Failed to unregister hotkey on shutdown: {err}");
        }
    }
}

fn to_hotkey_error(shortcut: Shortcut, err: RegistrarError, restored: bool) -> HotkeyError {
    match err {
        RegistrarError::Unavailable => HotkeyError::Unavailable { shortcut, restored },
        other => HotkeyError::RegistrationFailed {
            shortcut,
            reason: other.to_string(),
            restored,
        },
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn try_lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, HotkeyError> {
    match mutex.try_lock() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::WouldBlock) => Err(HotkeyError::Busy),
        Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
    }
}
