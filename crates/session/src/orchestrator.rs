use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use wlanauth_core::config::SessionConfig;
use wlanauth_core::{LoginError, LoginResult, ProbeOutcome};
use wlanauth_portal::Portal;

use crate::counters::SessionCounters;
use crate::status::{SessionStatus, StatusReport, StatusSink};

/// What the orchestrator needs from the protocol engine.
#[async_trait]
pub trait PortalClient: Send + Sync + 'static {
    fn has_credentials(&self) -> bool;
    async fn probe(&self) -> ProbeOutcome;
    async fn login(&self) -> LoginResult;
}

#[async_trait]
impl PortalClient for Portal {
    fn has_credentials(&self) -> bool {
        self.credentials().is_configured()
    }

    async fn probe(&self) -> ProbeOutcome {
        Portal::probe(self).await
    }

    async fn login(&self) -> LoginResult {
        Portal::login(self).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Online,
    Offline,
    LoginSucceeded,
    LoginFailed(LoginError),
    /// The attempt task died before producing a result
    Aborted(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptEvent {
    PortalDetected,
    Finished(AttemptOutcome),
}

/// An [`AttemptEvent`] tagged with the client generation that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptMessage {
    pub generation: u64,
    pub event: AttemptEvent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickDecision {
    Idle,
    Report(SessionStatus),
    /// Caller must start an attempt; the orchestrator already counts it as
    /// in flight.
    Start,
}

/// External signals: link transitions and manual "try now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    LinkState(bool),
    Rearm,
}

pub struct SessionOrchestrator<C: PortalClient> {
    client: Arc<C>,
    counters: SessionCounters,
    link_up: Option<bool>,
    in_flight: bool,
    generation: u64,
    check_interval: Duration,
    check_loop_timeout: Duration,
}

impl<C: PortalClient> SessionOrchestrator<C> {
    pub fn new(client: Arc<C>, config: &SessionConfig) -> Self {
        Self {
            client,
            counters: SessionCounters::new(config.retry_limit),
            link_up: None,
            in_flight: false,
            generation: 0,
            check_interval: config.check_interval(),
            check_loop_timeout: config.check_loop_timeout(),
        }
    }

    pub fn counters(&self) -> &SessionCounters {
        &self.counters
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    /// Link went up or down. A change (or the first report) opens a new
    /// check window and forgets earlier failures.
    pub fn notify_link_state(&mut self, up: bool, now: Instant) {
        if self.link_up != Some(up) {
            debug!(up, "link state changed");
            self.counters.mark_transition(now);
            self.counters.reset_retries();
        }
        self.link_up = Some(up);
    }

    pub fn rearm(&mut self, now: Instant) {
        info!("session re-armed");
        self.counters.mark_transition(now);
        self.counters.reset_retries();
    }

    /// New credentials: failures against the old ones no longer count.
    /// An attempt still running on the old client is left to finish, but its
    /// outcome is discarded.
    pub fn replace_client(&mut self, client: Arc<C>) {
        self.client = client;
        self.generation += 1;
        self.counters.reset_retries();
    }

    pub fn on_tick(&mut self, now: Instant) -> TickDecision {
        if self.counters.limit_reached() {
            return TickDecision::Report(SessionStatus::RetryLimitReached);
        }
        if !self.client.has_credentials() || self.link_up != Some(true) {
            return TickDecision::Report(SessionStatus::Offline);
        }
        if self.counters.connection_changed_at().is_none() {
            return TickDecision::Idle;
        }
        if self.counters.transition_expired(now, self.check_loop_timeout) {
            return TickDecision::Report(SessionStatus::CheckLoopTimedOut);
        }
        if self.in_flight {
            return TickDecision::Report(SessionStatus::InProgress);
        }

        self.in_flight = true;
        TickDecision::Start
    }

    /// Like [`on_event`](Self::on_event), but ignores events from an attempt
    /// started before the last [`replace_client`](Self::replace_client).
    pub fn on_message(&mut self, message: AttemptMessage) -> Option<StatusReport> {
        if message.generation == self.generation {
            return Some(self.on_event(message.event));
        }
        if let AttemptEvent::Finished(outcome) = message.event {
            debug!(generation = message.generation, ?outcome, "dropping outcome from replaced client");
            self.in_flight = false;
        }
        None
    }

    pub fn on_event(&mut self, event: AttemptEvent) -> StatusReport {
        match event {
            AttemptEvent::PortalDetected => StatusReport::with_detail(
                SessionStatus::LoggingIn,
                format!("attempt {}", self.counters.retry_count() + 1),
            ),
            AttemptEvent::Finished(outcome) => {
                self.in_flight = false;
                self.apply(outcome)
            }
        }
    }

    fn apply(&mut self, outcome: AttemptOutcome) -> StatusReport {
        match outcome {
            AttemptOutcome::Online => {
                self.counters.reset_retries();
                self.counters.clear_transition();
                StatusReport::new(SessionStatus::Online)
            }
            AttemptOutcome::Offline => StatusReport::new(SessionStatus::Offline),
            AttemptOutcome::LoginSucceeded => {
                self.counters.reset_retries();
                StatusReport::with_detail(SessionStatus::Online, "login was successful")
            }
            AttemptOutcome::LoginFailed(e) if e.is_terminal() => {
                self.counters.pin_at_limit();
                StatusReport::with_detail(SessionStatus::AuthRejected, e.to_string())
            }
            AttemptOutcome::LoginFailed(e) => {
                self.counters.record_failure();
                StatusReport::with_detail(SessionStatus::OfflineLoginFailed, e.to_string())
            }
            AttemptOutcome::Aborted(reason) => {
                self.counters.record_failure();
                StatusReport::with_detail(SessionStatus::OfflineLoginFailed, reason)
            }
        }
    }

    /// Probe, and log in if the portal is in the way, on a task of its own.
    /// A panic inside the attempt surfaces as [`AttemptOutcome::Aborted`].
    pub fn spawn_attempt(&self, events: mpsc::UnboundedSender<AttemptMessage>) {
        let client = Arc::clone(&self.client);
        let generation = self.generation;
        tokio::spawn(async move {
            let progress = events.clone();
            let attempt = tokio::spawn(run_attempt(client, generation, progress));
            let outcome = match attempt.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "attempt task aborted");
                    AttemptOutcome::Aborted(format!("attempt aborted: {}", e))
                }
            };
            let message = AttemptMessage {
                generation,
                event: AttemptEvent::Finished(outcome),
            };
            if events.send(message).is_err() {
                debug!("session loop gone, dropping attempt outcome");
            }
        });
    }

    /// Tick until `shutdown` resolves.
    pub async fn run<F>(
        mut self,
        sink: Arc<dyn StatusSink>,
        mut control: mpsc::UnboundedReceiver<SessionControl>,
        shutdown: F,
    ) where
        F: Future<Output = ()>,
    {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let mut ticker = tokio::time::interval(self.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        info!(interval_s = self.check_interval.as_secs(), "session loop started");
        loop {
            // Control and completions go before the ticker so a tick never
            // acts on state that is already stale.
            tokio::select! {
                biased;

                _ = &mut shutdown => {
                    info!("session loop stopping");
                    break;
                }
                Some(cmd) = control.recv() => match cmd {
                    SessionControl::LinkState(up) => self.notify_link_state(up, Instant::now()),
                    SessionControl::Rearm => self.rearm(Instant::now()),
                },
                Some(message) = events_rx.recv() => {
                    if let Some(report) = self.on_message(message) {
                        sink.report(&report);
                    }
                }
                _ = ticker.tick() => match self.on_tick(Instant::now()) {
                    TickDecision::Idle => {}
                    TickDecision::Report(status) => sink.report(&StatusReport::new(status)),
                    TickDecision::Start => {
                        info!(retry = self.counters.retry_count(), "checking login status");
                        sink.report(&StatusReport::new(SessionStatus::Checking));
                        self.spawn_attempt(events_tx.clone());
                    }
                },
            }
        }
    }
}

async fn run_attempt<C: PortalClient>(
    client: Arc<C>,
    generation: u64,
    events: mpsc::UnboundedSender<AttemptMessage>,
) -> AttemptOutcome {
    match client.probe().await {
        ProbeOutcome::Authenticated => AttemptOutcome::Online,
        ProbeOutcome::Indeterminate => AttemptOutcome::Offline,
        ProbeOutcome::PortalBlocking => {
            let _ = events.send(AttemptMessage {
                generation,
                event: AttemptEvent::PortalDetected,
            });
            let result = client.login().await;
            match result.error {
                None if result.successful => AttemptOutcome::LoginSucceeded,
                Some(e) => AttemptOutcome::LoginFailed(e),
                None => {
                    warn!("login reported failure without an error");
                    AttemptOutcome::Aborted("login failed".into())
                }
            }
        }
    }
}
