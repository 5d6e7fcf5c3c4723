// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Lazy, shared pose model sessions.
//!
//! A [`SessionManager`] owns at most one live session. The first
//! [`ensure_ready`](SessionManager::ensure_ready) call builds it through the
//! manager's [`EngineLoader`]; later calls return the same session. The slot is
//! guarded by a mutex held across construction, so callers racing on the first
//! call wait for the winner instead of loading the model again. A failed load
//! leaves the slot empty and the next call retries.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use crate::config::{LandmarkerOptions, ModelAsset};
use crate::engine::EngineLoader;
use crate::error::{LandmarkError, Result};

/// Lifecycle state of a [`SessionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session has been created, or the last one was released.
    Uninitialized,
    /// A session is live and will be reused.
    Ready,
}

struct Session<E> {
    engine: E,
    options: LandmarkerOptions,
}

/// Shared handle to a live model session.
///
/// Cloning is cheap. A handle keeps its session alive even after the manager
/// releases it.
pub struct SessionHandle<E> {
    inner: Arc<Session<E>>,
}

impl<E> SessionHandle<E> {
    /// The inference engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.inner.engine
    }

    /// Options the session was created with.
    #[must_use]
    pub fn options(&self) -> &LandmarkerOptions {
        &self.inner.options
    }

    /// Model asset the session was created from.
    #[must_use]
    pub fn asset(&self) -> &ModelAsset {
        &self.inner.options.asset
    }

    /// Whether two handles refer to the same session.
    #[must_use]
    pub fn same_session(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E> Clone for SessionHandle<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for SessionHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("asset", self.asset())
            .field("running_mode", &self.options().running_mode)
            .finish_non_exhaustive()
    }
}

/// Owner of the single lazily created session.
pub struct SessionManager<L: EngineLoader> {
    loader: L,
    options: LandmarkerOptions,
    slot: Mutex<Option<SessionHandle<L::Engine>>>,
}

impl<L: EngineLoader> SessionManager<L> {
    /// Create a manager. Nothing is loaded until the first
    /// [`ensure_ready`](Self::ensure_ready).
    ///
    /// The asset in `options` is only a default; the asset passed to
    /// `ensure_ready` takes precedence.
    pub const fn new(loader: L, options: LandmarkerOptions) -> Self {
        Self {
            loader,
            options,
            slot: Mutex::new(None),
        }
    }

    /// Return the live session, creating it from `asset` if there is none.
    ///
    /// Once a session exists it is returned unchanged, whatever `asset` is
    /// passed. Call [`release`](Self::release) first to switch assets.
    ///
    /// # Errors
    ///
    /// Returns [`LandmarkError::ConfigError`] if the manager's options are
    /// invalid and [`LandmarkError::InitializationError`] if the engine cannot
    /// be built. In both cases no session is stored and a later call tries again.
    pub fn ensure_ready(&self, asset: &ModelAsset) -> Result<SessionHandle<L::Engine>> {
        let mut slot = self.lock();
        if let Some(handle) = slot.as_ref() {
            if handle.asset() != asset {
                tracing::warn!(
                    requested = %asset,
                    active = %handle.asset(),
                    "session already initialized with a different asset, reusing it"
                );
            }
            return Ok(handle.clone());
        }

        let options = LandmarkerOptions {
            asset: asset.clone(),
            ..self.options.clone()
        };
        options.validate()?;

        let start = Instant::now();
        let engine = self.loader.load(&options).map_err(|e| match e {
            LandmarkError::InitializationError(_) => e,
            other => LandmarkError::InitializationError(other.to_string()),
        })?;
        tracing::info!(
            asset = %asset,
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "pose session ready"
        );

        let handle = SessionHandle {
            inner: Arc::new(Session { engine, options }),
        };
        *slot = Some(handle.clone());
        Ok(handle)
    }

    /// Drop the live session, if any. The next `ensure_ready` creates a new one.
    ///
    /// Returns `true` if a session was released.
    pub fn release(&self) -> bool {
        let released = self.lock().take().is_some();
        if released {
            tracing::info!("pose session released");
        }
        released
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        if self.lock().is_some() {
            SessionState::Ready
        } else {
            SessionState::Uninitialized
        }
    }

    /// Whether a session is live.
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Live session without creating one.
    pub fn current(&self) -> Option<SessionHandle<L::Engine>> {
        self.lock().clone()
    }

    /// Options new sessions are created with.
    pub const fn options(&self) -> &LandmarkerOptions {
        &self.options
    }

    // A panicking loader never leaves a half-built session in the slot.
    fn lock(&self) -> MutexGuard<'_, Option<SessionHandle<L::Engine>>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<L: EngineLoader> fmt::Debug for SessionManager<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &self.state())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
