//! Scoped polling session
//!
//! Owns the timer and the fetch loop of one mounted status view. A single
//! task issues polls strictly one after another, so responses cannot
//! overtake each other; the sequence guard in [`StatusReconciler`] is the
//! second line. Tearing the session down (or dropping it) cancels the
//! timer, drops any in-flight fetch and any pending redirect.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::payment_reconciler::{
    Effect, PollDiagnostics, ReconcilerConfig, StatusReconciler, StatusView, Transition,
};
use crate::api::payment::models::PaymentDetail;
use crate::api::payment::PaymentDetailSource;
use crate::error::FetchError;
use crate::host::{notify_parent, CheckoutHost};

/// Handle to a running polling loop. Must be created inside a tokio runtime.
pub struct PollingSession {
    id: Uuid,
    shutdown_tx: watch::Sender<bool>,
    view_rx: watch::Receiver<StatusView>,
    diagnostics: Arc<Mutex<PollDiagnostics>>,
    task: Option<JoinHandle<()>>,
}

impl PollingSession {
    /// Start polling; the first fetch happens immediately.
    pub fn start(
        payment_id: impl Into<String>,
        source: Arc<dyn PaymentDetailSource>,
        host: Arc<dyn CheckoutHost>,
        config: ReconcilerConfig,
    ) -> Self {
        Self::spawn(payment_id.into(), source, host, config, None)
    }

    /// Start polling from a detail the page has already fetched.
    pub fn resume(
        payment_id: impl Into<String>,
        source: Arc<dyn PaymentDetailSource>,
        host: Arc<dyn CheckoutHost>,
        config: ReconcilerConfig,
        initial: PaymentDetail,
    ) -> Self {
        Self::spawn(payment_id.into(), source, host, config, Some(initial))
    }

    fn spawn(
        payment_id: String,
        source: Arc<dyn PaymentDetailSource>,
        host: Arc<dyn CheckoutHost>,
        config: ReconcilerConfig,
        initial: Option<PaymentDetail>,
    ) -> Self {
        let id = Uuid::new_v4();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (view_tx, view_rx) = watch::channel(StatusView::default());
        let diagnostics = Arc::new(Mutex::new(PollDiagnostics::default()));

        let worker = PollWorker {
            reconciler: StatusReconciler::new(payment_id.clone(), &config),
            payment_id: payment_id.clone(),
            source,
            host,
            poll_interval: config.poll_interval,
            view_tx,
            diagnostics: Arc::clone(&diagnostics),
        };

        let span = info_span!("polling_session", session_id = %id, payment_id = %payment_id);
        let task = tokio::spawn(worker.run(initial, shutdown_rx).instrument(span));

        Self {
            id,
            shutdown_tx,
            view_rx,
            diagnostics,
            task: Some(task),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Snapshot of the current view
    pub fn view(&self) -> StatusView {
        self.view_rx.borrow().clone()
    }

    /// Receiver notified on every rendered change
    pub fn subscribe(&self) -> watch::Receiver<StatusView> {
        self.view_rx.clone()
    }

    pub fn diagnostics(&self) -> PollDiagnostics {
        match self.diagnostics.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Wait until a terminal status or a blocking error is shown.
    ///
    /// Returns the last view if the loop ended without settling.
    pub async fn settled(&self) -> StatusView {
        let mut rx = self.view_rx.clone();
        let result = rx.wait_for(|view| view.is_settled()).await.map(|view| view.clone());
        match result {
            Ok(view) => view,
            Err(_) => self.view_rx.borrow().clone(),
        }
    }

    /// True once the loop and any scheduled redirect have finished
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Stop polling and wait for the task to exit
    pub async fn teardown(mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(session_id = %self.id, error = %e, "Polling task ended abnormally");
            }
        }
        debug!(session_id = %self.id, "Polling session torn down");
    }

    /// Wait for the loop to end on its own (terminal status, redirect done)
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(session_id = %self.id, error = %e, "Polling task ended abnormally");
            }
        }
    }
}

impl Drop for PollingSession {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

struct PollWorker {
    payment_id: String,
    source: Arc<dyn PaymentDetailSource>,
    host: Arc<dyn CheckoutHost>,
    poll_interval: Duration,
    reconciler: StatusReconciler,
    view_tx: watch::Sender<StatusView>,
    diagnostics: Arc<Mutex<PollDiagnostics>>,
}

impl PollWorker {
    async fn run(mut self, initial: Option<PaymentDetail>, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            "Polling session started"
        );

        let first = match initial {
            Some(detail) => Ok(detail),
            None => match self.fetch_or_shutdown(&mut shutdown_rx).await {
                Some(result) => result,
                None => {
                    info!("Polling session stopped before first fetch");
                    return;
                }
            },
        };

        let mut seq: u64 = 0;
        match first.and_then(|detail| self.reconciler.observe(seq, &detail)) {
            Ok(transition) => {
                self.record_success();
                self.publish();
                if let Some(transition) = transition {
                    if self.apply(transition, &mut shutdown_rx).await == Flow::Stop {
                        info!("Polling session finished");
                        return;
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "Initial payment fetch failed");
                self.reconciler.block(&e);
                self.publish();
                return;
            }
        }

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Shutdown signal received, stopping polling session");
                    break;
                }
                _ = ticker.tick() => {
                    seq += 1;
                    let Some(result) = self.fetch_or_shutdown(&mut shutdown_rx).await else {
                        info!("Shutdown during fetch, response discarded");
                        break;
                    };

                    match result.and_then(|detail| self.reconciler.observe(seq, &detail)) {
                        Ok(Some(transition)) => {
                            self.record_success();
                            self.publish();
                            if self.apply(transition, &mut shutdown_rx).await == Flow::Stop {
                                break;
                            }
                        }
                        Ok(None) => self.record_success(),
                        Err(e) => {
                            warn!(seq, error = %e, "Payment status poll failed, will retry");
                            self.record_failure(&e);
                        }
                    }
                }
            }
        }

        info!("Polling session finished");
    }

    /// Race a fetch against shutdown; `None` means the fetch was dropped.
    async fn fetch_or_shutdown(
        &self,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Option<Result<PaymentDetail, FetchError>> {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => None,
            result = self.source.fetch(&self.payment_id) => Some(result),
        }
    }

    /// Run the effects of an applied transition
    async fn apply(&self, transition: Transition, shutdown_rx: &mut watch::Receiver<bool>) -> Flow {
        let mut flow = Flow::Continue;
        let mut redirect = None;

        for effect in transition.effects {
            match effect {
                Effect::NotifyParent(message) => notify_parent(self.host.as_ref(), &message),
                Effect::ScheduleRedirect { url, after } => redirect = Some((url, after)),
                Effect::OfferReturn { url } => {
                    debug!(enabled = url.is_some(), "Return control offered")
                }
                Effect::StopPolling => flow = Flow::Stop,
            }
        }

        if let Some((url, after)) = redirect {
            info!(url = %url, delay_ms = after.as_millis() as u64, "Redirect scheduled");
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    info!("Redirect cancelled by teardown");
                }
                _ = sleep(after) => {
                    self.host.navigate(&url);
                }
            }
        }

        flow
    }

    fn publish(&self) {
        let next = self.reconciler.view().clone();
        self.view_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }

    fn record_success(&self) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.record_success();
        }
    }

    fn record_failure(&self, error: &FetchError) {
        if let Ok(mut diagnostics) = self.diagnostics.lock() {
            diagnostics.record_failure(error);
        }
    }
}
