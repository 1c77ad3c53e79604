use std::sync::{Arc, Mutex};

use anyhow::Result;
use tokio::signal;
use tokio::sync::mpsc;
use tracing::{info, warn};

use wlanauth_core::config::AppConfig;
use wlanauth_session::{SessionControl, SessionOrchestrator, SessionStatus, StatusReport, StatusSink};

/// Logs a status only when it differs from the previous one.
#[derive(Default)]
struct TracingSink {
    last: Mutex<Option<SessionStatus>>,
}

impl StatusSink for TracingSink {
    fn report(&self, report: &StatusReport) {
        let mut last = match self.last.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *last == Some(report.status) && report.detail.is_none() {
            return;
        }
        *last = Some(report.status);

        match (&report.status, &report.detail) {
            (SessionStatus::AuthRejected | SessionStatus::OfflineLoginFailed, Some(detail)) => {
                warn!(status = %report.status, %detail, "session status")
            }
            (_, Some(detail)) => info!(status = %report.status, %detail, "session status"),
            (_, None) => info!(status = %report.status, "session status"),
        }
    }
}

pub async fn run(config: AppConfig) -> Result<()> {
    let portal = Arc::new(super::build_portal(&config)?);
    if !portal.credentials().is_configured() {
        warn!("no credentials configured, the session will stay offline");
    }

    let orchestrator = SessionOrchestrator::new(portal, &config.session);
    let sink: Arc<dyn StatusSink> = Arc::new(TracingSink::default());
    let (control_tx, control_rx) = mpsc::unbounded_channel();

    // No link monitor here: treat the interface as up from the start.
    let _ = control_tx.send(SessionControl::LinkState(true));
    spawn_rearm_listener(control_tx.clone());

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
    };

    orchestrator.run(sink, control_rx, shutdown).await;
    Ok(())
}

#[cfg(unix)]
fn spawn_rearm_listener(control: mpsc::UnboundedSender<SessionControl>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut usr1 = match signal(SignalKind::user_defined1()) {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "SIGUSR1 re-arm unavailable");
            return;
        }
    };
    tokio::spawn(async move {
        while usr1.recv().await.is_some() {
            info!("SIGUSR1 received, re-arming");
            if control.send(SessionControl::Rearm).is_err() {
                break;
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_rearm_listener(_control: mpsc::UnboundedSender<SessionControl>) {}
