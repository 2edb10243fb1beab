//! Payment status reconciliation
//!
//! The pure half of the polling loop: feeds observed payment details into
//! a state machine that decides, exactly once per status change, which
//! side effects the page must perform. Timers and I/O live in
//! [`super::polling_session`].
//!
//! Invariants:
//! - an observation older than the last applied one is discarded
//! - re-observing the applied status is a no-op
//! - once a terminal status is applied nothing changes it again

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::api::payment::models::{PaymentDetail, PaymentStatus};
use crate::config::Settings;
use crate::error::{CheckoutError, FetchError};
use crate::host::{ParentEvent, ParentMessage};
use crate::log_transition;
use crate::routes::PageEnv;
use crate::services::action_data::{success_redirect_url, ReturnUrlSource};

// ============================================================================
// Configuration
// ============================================================================

/// Which checkout view owns the polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileView {
    /// Dedicated status page polled right after a redirect back
    StatusChecker,
    /// Payment-details page of the on-chain flow
    PaymentDetails,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    pub poll_interval: Duration,
    /// Delay between entering `Success` and the redirect
    pub redirect_delay: Duration,
    pub return_url_source: ReturnUrlSource,
}

impl ReconcilerConfig {
    pub fn status_checker(env: &PageEnv) -> Self {
        Self::from_settings(&Settings::default(), ReconcileView::StatusChecker, env)
    }

    pub fn payment_details(env: &PageEnv) -> Self {
        Self::from_settings(&Settings::default(), ReconcileView::PaymentDetails, env)
    }

    pub fn from_settings(settings: &Settings, view: ReconcileView, env: &PageEnv) -> Self {
        match view {
            ReconcileView::StatusChecker => Self {
                poll_interval: Duration::from_millis(settings.checker_poll_interval_ms),
                redirect_delay: Duration::from_millis(if env.is_production() {
                    settings.checker_redirect_delay_prod_ms
                } else {
                    settings.checker_redirect_delay_other_ms
                }),
                return_url_source: ReturnUrlSource::Detail,
            },
            ReconcileView::PaymentDetails => Self {
                poll_interval: Duration::from_millis(settings.details_poll_interval_ms),
                redirect_delay: Duration::from_millis(settings.details_redirect_delay_ms),
                return_url_source: ReturnUrlSource::Action,
            },
        }
    }
}

// ============================================================================
// View state
// ============================================================================

/// UI phase; `Checking` covers both "not fetched yet" and pending-like codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPhase {
    Checking,
    Success,
    Failed,
    Cancelled,
}

impl From<PaymentStatus> for CheckPhase {
    fn from(status: PaymentStatus) -> Self {
        match status {
            PaymentStatus::Success => CheckPhase::Success,
            PaymentStatus::Failed => CheckPhase::Failed,
            PaymentStatus::Cancelled => CheckPhase::Cancelled,
            PaymentStatus::Pending | PaymentStatus::Other(_) => CheckPhase::Checking,
        }
    }
}

impl CheckPhase {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CheckPhase::Checking)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingRedirect {
    pub url: String,
    pub after_ms: u64,
}

/// Everything a status view renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusView {
    /// Gates the first paint only
    pub loading: bool,
    pub phase: CheckPhase,
    pub status_code: Option<i64>,
    pub last_error: Option<String>,
    pub payment_code: Option<String>,
    /// Fatal error; the view shows it with a retry affordance
    pub blocking_error: Option<String>,
    /// Target of the "Return to Merchant" control after failure/cancel
    pub return_url: Option<String>,
    pub redirect: Option<PendingRedirect>,
}

impl Default for StatusView {
    fn default() -> Self {
        Self {
            loading: true,
            phase: CheckPhase::Checking,
            status_code: None,
            last_error: None,
            payment_code: None,
            blocking_error: None,
            return_url: None,
            redirect: None,
        }
    }
}

/// "Return to Merchant" button state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReturnControl {
    pub enabled: bool,
    pub target: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub icon: &'static str,
    pub headline: String,
    pub message: Option<String>,
    pub return_control: Option<ReturnControl>,
    pub retry: bool,
}

impl StatusView {
    /// Terminal status applied or blocked by a fatal error
    pub fn is_settled(&self) -> bool {
        self.blocking_error.is_some() || self.phase.is_terminal()
    }

    /// Full-page rendering of the status checker
    pub fn display(&self) -> StatusDisplay {
        if let Some(error) = &self.blocking_error {
            return StatusDisplay {
                icon: "❌",
                headline: "Payment Error".to_string(),
                message: Some(error.clone()),
                return_control: None,
                retry: true,
            };
        }

        let return_control = || {
            Some(ReturnControl {
                enabled: self.return_url.is_some(),
                target: self.return_url.clone(),
            })
        };

        match self.phase {
            CheckPhase::Checking => StatusDisplay {
                icon: "⏳",
                headline: "Checking payment status...".to_string(),
                message: None,
                return_control: None,
                retry: false,
            },
            CheckPhase::Success => StatusDisplay {
                icon: "✅",
                headline: "Payment Successful!".to_string(),
                message: Some(
                    "Your payment has been processed successfully. You will be redirected shortly..."
                        .to_string(),
                ),
                return_control: None,
                retry: false,
            },
            CheckPhase::Failed => StatusDisplay {
                icon: "❌",
                headline: "Payment Failed".to_string(),
                message: Some(
                    "Your payment could not be processed. Please try again or contact support."
                        .to_string(),
                ),
                return_control: return_control(),
                retry: false,
            },
            CheckPhase::Cancelled => StatusDisplay {
                icon: "❌",
                headline: "Payment Cancelled".to_string(),
                message: Some("Your payment was cancelled. You can try again if needed.".to_string()),
                return_control: return_control(),
                retry: false,
            },
        }
    }

    /// Log the settled rendering once and hand it back
    pub fn log_settled(&self) -> StatusDisplay {
        let rendered = self.display();
        let return_enabled = rendered.return_control.as_ref().map_or(false, |c| c.enabled);
        info!(
            headline = %rendered.headline,
            status = ?self.status_code,
            return_enabled,
            "Payment status settled"
        );
        if let Some(message) = &rendered.message {
            info!("{}", message);
        }
        rendered
    }

    /// Compact header above the on-chain instruction panel
    pub fn header(&self) -> StatusDisplay {
        let (icon, headline) = match self.phase {
            CheckPhase::Success => ("✅", "Payment Confirmed".to_string()),
            CheckPhase::Failed => ("❌", "Payment Failed".to_string()),
            CheckPhase::Cancelled => ("⚠️", "Payment Cancelled".to_string()),
            CheckPhase::Checking => (
                "⏳",
                self.last_error
                    .clone()
                    .unwrap_or_else(|| "Waiting for Payment".to_string()),
            ),
        };
        StatusDisplay {
            icon,
            headline,
            message: self
                .payment_code
                .as_ref()
                .map(|code| format!("Transaction: {}", code)),
            return_control: None,
            retry: false,
        }
    }
}

// ============================================================================
// Transitions
// ============================================================================

/// Side effect the page performs when a transition is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    NotifyParent(ParentMessage),
    ScheduleRedirect { url: String, after: Duration },
    /// Enable (or leave disabled) the manual return control
    OfferReturn { url: Option<String> },
    StopPolling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub seq: u64,
    pub from: Option<PaymentStatus>,
    pub to: PaymentStatus,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn stops_polling(&self) -> bool {
        self.effects.iter().any(|e| matches!(e, Effect::StopPolling))
    }
}

// ============================================================================
// State machine
// ============================================================================

pub struct StatusReconciler {
    payment_id: String,
    redirect_delay: Duration,
    return_url_source: ReturnUrlSource,
    applied: Option<PaymentStatus>,
    last_seq: Option<u64>,
    view: StatusView,
}

impl StatusReconciler {
    pub fn new(payment_id: impl Into<String>, config: &ReconcilerConfig) -> Self {
        Self {
            payment_id: payment_id.into(),
            redirect_delay: config.redirect_delay,
            return_url_source: config.return_url_source,
            applied: None,
            last_seq: None,
            view: StatusView::default(),
        }
    }

    pub fn view(&self) -> &StatusView {
        &self.view
    }

    pub fn applied_status(&self) -> Option<PaymentStatus> {
        self.applied
    }

    pub fn is_terminal(&self) -> bool {
        self.applied.map_or(false, |s| s.is_terminal())
    }

    /// Apply the outcome of poll `seq`.
    ///
    /// Returns `Ok(None)` for stale observations, unchanged statuses and
    /// anything observed after a terminal status. A detail without a
    /// payment record is reported as `FetchError::NotFound`.
    pub fn observe(
        &mut self,
        seq: u64,
        detail: &PaymentDetail,
    ) -> Result<Option<Transition>, FetchError> {
        if self.last_seq.map_or(false, |last| seq <= last) {
            debug!(payment_id = %self.payment_id, seq, "Discarding stale observation");
            return Ok(None);
        }

        let record = detail.payment.as_ref().ok_or(FetchError::NotFound)?;
        self.last_seq = Some(seq);
        self.view.loading = false;

        if self.is_terminal() {
            if self.applied != Some(record.status) {
                warn!(
                    payment_id = %self.payment_id,
                    applied = ?self.applied,
                    observed = ?record.status,
                    "Ignoring status observed after terminal state"
                );
            }
            return Ok(None);
        }

        if self.applied == Some(record.status) {
            return Ok(None);
        }

        let from = self.applied.replace(record.status);
        log_transition!(
            payment_id = self.payment_id,
            seq = seq,
            from = from.map_or("none", |s| s.as_str()),
            to = record.status.as_str(),
            code = record.status.code(),
        );

        self.view.phase = CheckPhase::from(record.status);
        self.view.status_code = Some(record.status.code());
        self.view.last_error = record.last_error().map(str::to_string);
        self.view.payment_code = record.payment_code().map(str::to_string);

        let message = |event| {
            Effect::NotifyParent(ParentMessage {
                event,
                payment_id: self.payment_id.clone(),
                invoice_id: record.invoice_id().to_string(),
            })
        };

        let effects = match record.status {
            PaymentStatus::Success => {
                let mut effects = vec![message(ParentEvent::PaymentSuccess)];
                match success_redirect_url(detail, self.return_url_source) {
                    Some(url) => {
                        self.view.redirect = Some(PendingRedirect {
                            url: url.clone(),
                            after_ms: self.redirect_delay.as_millis() as u64,
                        });
                        effects.push(Effect::ScheduleRedirect {
                            url,
                            after: self.redirect_delay,
                        });
                    }
                    None => debug!(payment_id = %self.payment_id, "No return URL, staying on confirmation"),
                }
                effects.push(Effect::StopPolling);
                effects
            }
            PaymentStatus::Failed | PaymentStatus::Cancelled => {
                let event = if record.status == PaymentStatus::Failed {
                    ParentEvent::PaymentFailed
                } else {
                    ParentEvent::PaymentCancelled
                };
                let cancel_url = detail.cancel_url().map(str::to_string);
                self.view.return_url = cancel_url.clone();
                vec![
                    message(event),
                    Effect::OfferReturn { url: cancel_url },
                    Effect::StopPolling,
                ]
            }
            PaymentStatus::Pending | PaymentStatus::Other(_) => Vec::new(),
        };

        Ok(Some(Transition {
            seq,
            from,
            to: record.status,
            effects,
        }))
    }

    /// The first fetch failed: the view is blocked for good.
    pub fn block(&mut self, error: &FetchError) {
        self.view.loading = false;
        self.view.blocking_error = Some(CheckoutError::from(error.clone()).user_message());
    }
}

/// Transient poll failures, kept for diagnostics only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PollDiagnostics {
    pub polls: u64,
    pub failed_polls: u64,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
}

impl PollDiagnostics {
    pub fn record_success(&mut self) {
        self.polls += 1;
    }

    pub fn record_failure(&mut self, error: &FetchError) {
        self.polls += 1;
        self.failed_polls += 1;
        self.last_error = Some(error.to_string());
        self.last_error_at = Some(Utc::now());
    }
}
