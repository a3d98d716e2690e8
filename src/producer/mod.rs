use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info};

use crate::broker::{Broker, MessageChannel};
use crate::errors::BrokerError;
use crate::reading::{ChannelId, Reading, SensorRow};

/// Routes source rows onto the three per-sensor channels, pacing emissions to
/// simulate real-time sensor cadence. The pacing interval is deliberate and
/// configurable, not dead time.
pub struct Router {
    channels: Vec<(ChannelId, Arc<dyn MessageChannel>)>,
    pacing: Duration,
}

impl Router {
    /// Opens one channel per sensor. Failure here means the broker is
    /// unreachable and is fatal to the run.
    pub async fn connect(broker: &dyn Broker, pacing: Duration) -> Result<Self, BrokerError> {
        let mut channels = Vec::with_capacity(ChannelId::ALL.len());
        for channel in ChannelId::ALL {
            channels.push((channel, broker.open(channel.queue_name()).await?));
        }
        Ok(Self { channels, pacing })
    }

    pub fn pacing(&self) -> Duration {
        self.pacing
    }

    fn channel_for(&self, id: ChannelId) -> &Arc<dyn MessageChannel> {
        // Router::connect opens every ChannelId, so the lookup always hits.
        &self
            .channels
            .iter()
            .find(|(channel, _)| *channel == id)
            .unwrap_or_else(|| unreachable!("channel {id} not opened"))
            .1
    }

    /// Publishes every present channel value of one row, in channel order.
    /// A transient publish failure drops that single reading: it is logged
    /// with channel and timestamp and the row continues. No retry.
    pub async fn emit(&self, row: &SensorRow) {
        for reading in row.readings() {
            if let Err(e) = self.publish(&reading).await {
                error!(
                    queue = reading.channel.queue_name(),
                    timestamp = %reading.timestamp,
                    error = %e,
                    "Publish failed; reading dropped"
                );
            }
        }
    }

    async fn publish(&self, reading: &Reading) -> Result<(), BrokerError> {
        let channel = self.channel_for(reading.channel);
        channel.publish(reading.encode_wire().as_bytes()).await?;
        info!(
            queue = channel.queue(),
            timestamp = %reading.timestamp,
            temperature = reading.temperature,
            "Sent reading"
        );
        Ok(())
    }

    /// Emits every row in source order, suspending for the pacing interval
    /// between rows.
    pub async fn run(&self, rows: &[SensorRow]) {
        info!(
            rows = rows.len(),
            pacing_secs = self.pacing.as_secs_f64(),
            "Router started"
        );
        for row in rows {
            self.emit(row).await;
            sleep(self.pacing).await;
        }
        info!("Router finished; all rows emitted");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::{MemoryBroker, MessageStream};

    fn row(ts: &str, smoker: Option<f64>, food_a: Option<f64>, food_b: Option<f64>) -> SensorRow {
        SensorRow {
            timestamp: ts.to_string(),
            smoker,
            food_a,
            food_b,
        }
    }

    async fn drain(mut stream: Box<dyn MessageStream>, expected: usize) -> Vec<String> {
        let mut payloads = Vec::new();
        for _ in 0..expected {
            let delivery = stream.next_delivery().await.unwrap().unwrap();
            payloads.push(delivery.payload_str().into_owned());
            stream.ack(delivery.tag).await.unwrap();
        }
        payloads
    }

    #[tokio::test]
    async fn routes_each_value_to_its_own_queue() {
        let broker = MemoryBroker::new();
        let router = Router::connect(&broker, Duration::ZERO).await.unwrap();
        router
            .run(&[
                row("08:00:00", Some(225.0), Some(150.0), Some(140.0)),
                row("08:00:30", Some(226.0), Some(150.5), Some(140.5)),
            ])
            .await;

        let smoker = broker.open("01-smoker").await.unwrap();
        let payloads = drain(smoker.subscribe().await.unwrap(), 2).await;
        assert_eq!(payloads, vec!["08:00:00, 225", "08:00:30, 226"]);

        let food_b = broker.open("03-food-B").await.unwrap();
        let payloads = drain(food_b.subscribe().await.unwrap(), 2).await;
        assert_eq!(payloads, vec!["08:00:00, 140", "08:00:30, 140.5"]);
    }

    #[tokio::test]
    async fn missing_field_produces_no_message_for_that_channel() {
        let broker = MemoryBroker::new();
        let router = Router::connect(&broker, Duration::ZERO).await.unwrap();
        router
            .run(&[
                row("08:00:00", Some(225.0), Some(150.0), None),
                row("08:00:30", Some(226.0), Some(150.5), Some(140.5)),
            ])
            .await;

        let food_b = broker.open("03-food-B").await.unwrap();
        let payloads = drain(food_b.subscribe().await.unwrap(), 1).await;
        assert_eq!(payloads, vec!["08:00:30, 140.5"]);
        // Smoker queue is unaffected by Food B's gap.
        let smoker = broker.open("01-smoker").await.unwrap();
        assert_eq!(drain(smoker.subscribe().await.unwrap(), 2).await.len(), 2);
    }
}
