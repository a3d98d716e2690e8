pub mod policy;
pub mod window;

pub use policy::AnomalyPolicy;
pub use window::SlidingWindow;

use std::sync::Arc;

use tracing::{info, warn};

use crate::alert::AlertDispatcher;
use crate::broker::MessageChannel;
use crate::errors::BrokerError;
use crate::reading::{Alert, ChannelId, Reading};

/// Per-channel detector parameters. Defaults match the original deployment:
/// smoker watches for a 15°F endpoint drop over 5 readings, each food probe
/// for a full-window spread of at most 1°F over 20 readings.
#[derive(Debug, Clone, Copy)]
pub struct DetectorConfig {
    pub channel: ChannelId,
    pub capacity: usize,
    pub policy: AnomalyPolicy,
}

impl DetectorConfig {
    pub fn defaults(channel: ChannelId) -> Self {
        match channel {
            ChannelId::Smoker => Self {
                channel,
                capacity: 5,
                policy: AnomalyPolicy::Drop { threshold: 15.0 },
            },
            ChannelId::FoodA | ChannelId::FoodB => Self {
                channel,
                capacity: 20,
                policy: AnomalyPolicy::Stall { threshold: 1.0 },
            },
        }
    }
}

/// One consumer: owns its window, processes its channel's readings strictly
/// in arrival order. State lives for the process lifetime only; a restarted
/// detector begins with an empty window by design.
pub struct Detector {
    channel: ChannelId,
    window: SlidingWindow,
    policy: AnomalyPolicy,
    dispatcher: AlertDispatcher,
}

impl Detector {
    pub fn new(config: DetectorConfig, dispatcher: AlertDispatcher) -> Self {
        Self {
            channel: config.channel,
            window: SlidingWindow::new(config.capacity),
            policy: config.policy,
            dispatcher,
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn window(&self) -> &SlidingWindow {
        &self.window
    }

    /// The window step for one reading: tail-insert, evaluate the predicate
    /// iff the window just became exactly full, then evict the single oldest
    /// entry. Evaluation therefore happens at most once per insertion and
    /// never on a partially filled window.
    pub fn observe(&mut self, reading: &Reading) -> Option<Alert> {
        self.window.push(reading.temperature);
        if !self.window.is_full() {
            return None;
        }
        let alert = self.policy.evaluate(&self.window).map(|diff| {
            Alert::new(
                self.channel,
                self.policy.describe(self.channel, diff),
                reading.timestamp.clone(),
            )
        });
        self.window.pop_oldest();
        alert
    }

    /// Processes one reading end to end. Dispatch failures are contained by
    /// the dispatcher and never interrupt the detector.
    pub async fn process(&mut self, reading: &Reading) {
        info!(
            channel = %self.channel,
            timestamp = %reading.timestamp,
            temperature = reading.temperature,
            "Received temperature"
        );
        if let Some(alert) = self.observe(reading) {
            self.dispatcher.dispatch(&alert).await;
        }
    }

    /// Consume loop: blocks on the channel until the stream ends (which a
    /// broker-backed stream never does; shutdown is process termination).
    /// Each delivery is acked only after the window update, so a crash
    /// mid-processing causes redelivery rather than silent loss.
    pub async fn run(mut self, channel: Arc<dyn MessageChannel>) -> Result<(), BrokerError> {
        let mut stream = channel.subscribe().await?;
        info!(channel = %self.channel, queue = channel.queue(), "Waiting for readings");
        while let Some(delivery) = stream.next_delivery().await? {
            let payload = delivery.payload_str().into_owned();
            match Reading::parse_wire(self.channel, &payload) {
                Some(reading) => self.process(&reading).await,
                None => warn!(
                    channel = %self.channel,
                    payload = %payload,
                    "Discarding malformed payload"
                ),
            }
            stream.ack(delivery.tag).await?;
        }
        info!(channel = %self.channel, "Reading stream ended");
        Ok(())
    }
}
