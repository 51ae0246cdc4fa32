//! Background maintenance tasks.

use std::time::Duration;

use tokio::{task::JoinHandle, time::interval};

use crate::session::SessionRegistry;

/// How often idle sessions are looked for
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Start all background jobs
///
/// Returns the join handles so the caller can abort them on shutdown.
pub fn start_background_jobs(sessions: SessionRegistry, idle_timeout: Duration) -> Vec<JoinHandle<()>> {
    vec![tokio::spawn(periodic_session_sweep_job(sessions, idle_timeout))]
}

/// Forget sessions nobody has touched for `idle_timeout`
///
/// Only the in-memory session goes away: its saved progress stays in the store
/// and the client can reopen it with the same id.
async fn periodic_session_sweep_job(sessions: SessionRegistry, idle_timeout: Duration) {
    let max_idle = match chrono::Duration::from_std(idle_timeout) {
        Ok(max_idle) => max_idle,
        Err(e) => {
            tracing::error!("Idle timeout out of range, session sweeping disabled: {e}");
            return;
        }
    };

    let mut interval = interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;

        match sessions.sweep_idle(max_idle) {
            0 => tracing::debug!("Session sweep complete: no idle sessions"),
            swept => tracing::info!(
                swept,
                remaining = sessions.len(),
                "Session sweep complete"
            ),
        }
    }
}
