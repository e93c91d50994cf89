//! Connection heartbeat
//!
//! A background task probes the backend on a fixed interval and publishes a
//! `connected` flag through a watch channel. The flag starts out `true` so the
//! indicator does not flash "offline" before the first probe completes.

use prayer_admin_backend::HealthProbe;
use prayer_admin_core::HeartbeatConfig;
use std::{sync::Arc, time::Duration};
use tokio::{
    sync::{oneshot, watch},
    task::JoinHandle,
    time::{MissedTickBehavior, interval, timeout},
};
use tracing::debug;

/// Probe limit; one row is enough to prove the backend answers
const PROBE_LIMIT: u32 = 1;

/// Periodic liveness probe
#[derive(Debug)]
pub struct ConnectionHeartbeat {
    connected: watch::Receiver<bool>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionHeartbeat {
    /// Start probing; the first probe runs immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(probe: Arc<dyn HealthProbe>, config: &HeartbeatConfig) -> Self {
        let (connected_tx, connected) = watch::channel(true);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
        let every = config.interval();
        let bound = config.timeout();
        let table = config.probe_table.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let up = check(probe.as_ref(), &table, bound).await;
                        connected_tx.send_if_modified(|current| {
                            let changed = *current != up;
                            *current = up;
                            changed
                        });
                    }
                    _ = &mut shutdown_rx => {
                        debug!("Heartbeat task shutting down");
                        break;
                    }
                }
            }
        });

        Self {
            connected,
            shutdown: Some(shutdown_tx),
            task: Some(task),
        }
    }

    /// Latest known connectivity
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    /// Watch the flag for changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.connected.clone()
    }

    /// Whether the probe task is still scheduled
    pub const fn is_mounted(&self) -> bool {
        self.task.is_some()
    }

    /// Stop probing. No probe starts after this returns.
    pub fn unmount(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for ConnectionHeartbeat {
    fn drop(&mut self) {
        self.unmount();
    }
}

/// Run a single probe outside the timer
pub async fn probe_once(probe: &dyn HealthProbe, config: &HeartbeatConfig) -> bool {
    check(probe, &config.probe_table, config.timeout()).await
}

/// One probe; failures are logged at debug level only
async fn check(probe: &dyn HealthProbe, table: &str, bound: Duration) -> bool {
    match timeout(bound, probe.probe(table, PROBE_LIMIT, bound)).await {
        Ok(Ok(())) => true,
        Ok(Err(err)) => {
            debug!(error = %err, "Connection probe failed");
            false
        }
        Err(_) => {
            debug!(timeout = ?bound, "Connection probe timed out");
            false
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::missing_panics_doc)]
mod tests {
    use super::*;
    use prayer_admin_backend::{MockBackend, MockCall};
    use pretty_assertions::assert_eq;
    use tokio::time::sleep;

    fn config() -> HeartbeatConfig {
        HeartbeatConfig {
            interval_secs: 30,
            timeout_ms: 5000,
            probe_table: "prayers".to_string(),
        }
    }

    fn probes(backend: &MockBackend) -> usize {
        backend
            .calls()
            .iter()
            .filter(|call| matches!(call, MockCall::Probe(_)))
            .count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_starts_optimistic_and_tracks_probe() {
        let backend = MockBackend::new();
        backend.set_reachable(false);
        let heartbeat = ConnectionHeartbeat::mount(Arc::new(backend.clone()), &config());
        assert!(heartbeat.is_connected());

        let mut rx = heartbeat.subscribe();
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());

        backend.set_reachable(true);
        rx.changed().await.unwrap();
        assert!(heartbeat.is_connected());
        assert_eq!(backend.calls().last(), Some(&MockCall::Probe("prayers".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_probes_on_interval() {
        let backend = MockBackend::new();
        let _heartbeat = ConnectionHeartbeat::mount(Arc::new(backend.clone()), &config());

        sleep(Duration::from_secs(1)).await;
        assert_eq!(probes(&backend), 1);

        sleep(Duration::from_secs(60)).await;
        assert_eq!(probes(&backend), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_probe_marks_down() {
        let backend = MockBackend::new().with_probe_delay(Duration::from_secs(10));
        let heartbeat = ConnectionHeartbeat::mount(Arc::new(backend.clone()), &config());

        sleep(Duration::from_secs(6)).await;
        assert!(!heartbeat.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_probe_after_unmount() {
        let backend = MockBackend::new();
        let mut heartbeat = ConnectionHeartbeat::mount(Arc::new(backend.clone()), &config());
        sleep(Duration::from_secs(1)).await;

        heartbeat.unmount();
        assert!(!heartbeat.is_mounted());
        sleep(Duration::from_secs(300)).await;

        assert_eq!(probes(&backend), 1);
    }

    #[tokio::test]
    async fn test_probe_once() {
        let backend = MockBackend::new();
        assert!(probe_once(&backend, &config()).await);

        backend.set_reachable(false);
        assert!(!probe_once(&backend, &config()).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_stops_probing() {
        let backend = MockBackend::new();
        let heartbeat = ConnectionHeartbeat::mount(Arc::new(backend.clone()), &config());
        sleep(Duration::from_secs(1)).await;

        drop(heartbeat);
        sleep(Duration::from_secs(300)).await;

        assert_eq!(probes(&backend), 1);
    }
}
