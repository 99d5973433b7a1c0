//! Ctrl+C handling.
//!
//! A signal only raises a shared flag. The pipeline polls it between notes,
//! so the note in flight finishes (and is cached) before the run stops with
//! [`crate::pipeline::PipelineError::Interrupted`]. The checkpoint is not
//! advanced on that path, so the next run picks up the remaining notes.
//!
//! ```rust,no_run
//! use vaultdigest::pipeline::PipelineConfig;
//! use vaultdigest::signal::install_handler;
//!
//! let handler = install_handler().expect("Failed to install signal handler");
//! let config = PipelineConfig::new("/home/user/vault").with_shutdown_flag(handler.flag());
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) was called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Raise the flag by hand.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The flag to hand to [`crate::pipeline::PipelineConfig::with_shutdown_flag`].
    #[must_use]
    pub fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Lower the flag so the handler can be reused by a later run.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C hook, or reuse the one already installed.
///
/// Repeated calls (several `run_app` invocations in one test binary) return
/// the same handler with its flag lowered. If another component already owns
/// the hook, an unhooked handler is returned that still honours
/// [`ShutdownHandler::request_shutdown`].
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the operating system refuses
/// to register the hook.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.flag();

    let installed = ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "\nInterrupted. Stopping after the current note...");
        let _ = stderr.flush();
        log::info!("Shutdown signal received");
    });

    match installed {
        Ok(()) => {}
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C hook already owned elsewhere, using unhooked handler");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone())
}
