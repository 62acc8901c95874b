//! Periodic budget checks on a background thread.

use crate::config::Settings;
use crate::db::open_store;
use crate::error::LedgerResult;
use crate::operations::budget_status::BudgetEngine;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Clears the running flag when a tick ends, including on early return.
struct Running<'a>(&'a AtomicBool);

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs one budget check unless another is already in progress, in which
/// case `None` is returned and nothing is read.
pub fn run_tick(
    running: &AtomicBool,
    engine: &BudgetEngine<'_>,
) -> LedgerResult<Option<Vec<String>>> {
    if running
        .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
        .is_err()
    {
        tracing::debug!("budget check already running, skipping tick");
        return Ok(None);
    }
    let _running = Running(running);
    let messages = engine.check_all_budgets()?;
    for message in &messages {
        tracing::warn!("{}", message);
    }
    Ok(Some(messages))
}

/// Handle to the alert thread. Dropping it stops the thread.
pub struct AlertMonitor {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl AlertMonitor {
    /// Starts checking every `settings.alert_interval_secs`. The thread opens
    /// its own store; `notify` receives the non-empty message batches.
    pub fn spawn<F>(settings: Settings, notify: F) -> Self
    where
        F: Fn(&[String]) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let running = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&running);
        let interval = Duration::from_secs(settings.alert_interval_secs.max(1));

        let handle = thread::spawn(move || {
            let store = match open_store(&settings) {
                Ok(store) => store,
                Err(e) => {
                    tracing::error!(error = %e, "alert monitor could not open the ledger");
                    return;
                }
            };
            tracing::info!(interval_secs = interval.as_secs(), "alert monitor started");

            loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        let engine = BudgetEngine::new(store.as_ref(), settings.thresholds);
                        match run_tick(&flag, &engine) {
                            Ok(Some(messages)) if !messages.is_empty() => notify(&messages),
                            Ok(_) => {}
                            Err(e) => tracing::error!(error = %e, "budget check failed"),
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            tracing::info!("alert monitor stopped");
        });

        Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
            running,
        }
    }

    /// Flag shared with the thread, for running an extra check in step with it.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("alert monitor thread panicked");
            }
        }
    }
}

impl Drop for AlertMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}
