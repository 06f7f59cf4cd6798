//! # Progress Poller
//!
//! While connected, refreshes the active dataset's progress every poll
//! interval. A failed poll hands control to the reconnect loop.
//!
//! ```text
//!  tick ──► url + dataset set? ── no ──► skip tick
//!                │
//!               yes
//!                ▼
//!         GET progress ── ok ──► store progress, state = Connected
//!                │
//!               err ──► Disconnected, start reconnect, stop
//! ```

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::connection::ConnectionController;
use crate::status::ConnectionState;
use crate::tasks::LoopToken;

impl ConnectionController {
    /// Starts the poller, replacing a running one and stopping reconnects.
    pub(crate) fn start_poller(&self) {
        self.inner.reconnect.cancel();
        let this = self.clone();
        self.inner.poller.spawn(move |token| this.poll_loop(token));
    }

    /// True while a poller is running.
    pub fn is_polling(&self) -> bool {
        self.inner.poller.is_running()
    }

    async fn poll_loop(self, token: LoopToken) {
        let period = self.inner.settings.poll_interval;
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            period_secs = period.as_secs(),
            generation = token.generation(),
            "Progress poller started"
        );

        loop {
            interval.tick().await;
            if !token.is_current() {
                break;
            }

            let (url, dataset_id) = {
                let status = self.inner.status.read().await;
                (status.server_url.clone(), status.active_dataset_id)
            };
            let (Some(url), Some(dataset_id)) = (url, dataset_id) else {
                debug!("No server or dataset, skipping progress poll");
                continue;
            };

            match self.inner.gateway.progress(&url, dataset_id).await {
                Ok(progress) => {
                    let mut status = self.inner.status.write().await;
                    if !token.is_current() {
                        break;
                    }
                    if status.active_dataset_id == Some(dataset_id) {
                        status.progress = Some(progress);
                        self.inner.emitter.emit_progress(&progress);
                    }
                    if !status.state.is_connected() {
                        status.state = ConnectionState::Connected;
                        self.inner.emitter.emit_status(&status);
                    }
                    debug!(
                        dataset_id,
                        scanned = progress.scanned,
                        total = progress.total,
                        "Progress updated"
                    );
                }
                Err(e) => {
                    warn!(dataset_id, error = %e, "Progress poll failed");
                    let message = format!("Lost connection to server: {e}");
                    if self.enter_disconnected(&message, Some(&token)).await {
                        self.start_reconnect();
                    }
                    break;
                }
            }
        }

        debug!(generation = token.generation(), "Progress poller stopped");
    }
}
