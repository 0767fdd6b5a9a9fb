//! Periodic liveness supervision.

use crate::channel::ChannelFactory;
use crate::{LinkState, Proxy};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Shortest period the heartbeat will tick at.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Background task calling [`Proxy::test_connection`] on a fixed period.
///
/// The task ends on its own once the proxy is no longer connected, whether
/// the heartbeat detected a loss or the owner disconnected. Dropping the
/// handle stops it; a probe in flight is abandoned and its channel faults.
/// Periods under [`MIN_PERIOD`] are raised to it.
pub struct Heartbeat {
    task: JoinHandle<()>,
}

impl Heartbeat {
    pub fn spawn<F: ChannelFactory>(proxy: Arc<Proxy<F>>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period.max(MIN_PERIOD));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                match proxy.test_connection().await {
                    LinkState::Connected => {}
                    state => {
                        let address = proxy.address();
                        tracing::debug!("Heartbeat for {} stopping ({:?})", address, state);
                        break;
                    }
                }
            }
        });
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.task.abort();
    }
}
