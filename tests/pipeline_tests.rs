// End-to-end runs over the in-memory broker: router and detectors as
// independent tasks, coupled only by the queues.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use smokewatch::broker::Broker;
use smokewatch::errors::NotifyError;
use smokewatch::{
    Alert, AlertDispatcher, ChannelId, Detector, DetectorConfig, MemoryBroker, Notifier, Router,
    SensorRow,
};

#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingNotifier {
    fn sent(&self) -> Vec<Alert> {
        self.alerts.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Notifier for RecordingNotifier {
    async fn send_alert(&self, alert: &Alert) -> Result<(), NotifyError> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

fn row(ts: &str, smoker: Option<f64>, food_a: Option<f64>, food_b: Option<f64>) -> SensorRow {
    SensorRow {
        timestamp: ts.to_string(),
        smoker,
        food_a,
        food_b,
    }
}

async fn spawn_detector(
    broker: &MemoryBroker,
    channel: ChannelId,
    notifier: Arc<dyn Notifier>,
) -> Result<tokio::task::JoinHandle<()>> {
    let queue = broker.open(channel.queue_name()).await?;
    let detector = Detector::new(
        DetectorConfig::defaults(channel),
        AlertDispatcher::new(notifier),
    );
    Ok(tokio::spawn(async move {
        let _ = detector.run(queue).await;
    }))
}

async fn drain_and_stop(broker: &MemoryBroker, detectors: Vec<tokio::task::JoinHandle<()>>) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !broker.drained() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("pipeline failed to drain in time");
    for handle in detectors {
        handle.abort();
    }
}

#[tokio::test]
async fn smoker_drop_travels_the_full_pipeline() -> Result<()> {
    let broker = MemoryBroker::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut detectors = Vec::new();
    for channel in ChannelId::ALL {
        detectors.push(spawn_detector(&broker, channel, notifier.clone()).await?);
    }

    let temps = [225.0, 224.0, 223.0, 210.0, 208.0];
    let rows: Vec<SensorRow> = temps
        .iter()
        .enumerate()
        .map(|(i, &t)| row(&format!("t{i}"), Some(t), Some(150.0), Some(140.0)))
        .collect();

    let router = Router::connect(&broker, Duration::ZERO).await?;
    router.run(&rows).await;
    drain_and_stop(&broker, detectors).await;

    let alerts = notifier.sent();
    assert_eq!(alerts.len(), 1, "only the smoker should have alerted");
    assert_eq!(alerts[0].channel, ChannelId::Smoker);
    assert_eq!(alerts[0].timestamp, "t4");
    Ok(())
}

#[tokio::test]
async fn missing_food_b_fields_do_not_disturb_its_window() -> Result<()> {
    let broker = MemoryBroker::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let detectors = vec![spawn_detector(&broker, ChannelId::FoodB, notifier.clone()).await?];

    // 25 rows, 5 of them with no Food B sample. The 20 present values are
    // flat, so the stall fires exactly when the 20th present value arrives —
    // the gaps neither pad nor reset the window.
    let rows: Vec<SensorRow> = (0..25)
        .map(|i| {
            let food_b = if i % 5 == 2 { None } else { Some(140.0) };
            row(&format!("t{i}"), None, None, food_b)
        })
        .collect();
    let present: Vec<&SensorRow> = rows.iter().filter(|r| r.food_b.is_some()).collect();
    assert_eq!(present.len(), 20);
    let twentieth_present_ts = present[19].timestamp.clone();

    let router = Router::connect(&broker, Duration::ZERO).await?;
    router.run(&rows).await;
    drain_and_stop(&broker, detectors).await;

    let alerts = notifier.sent();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].channel, ChannelId::FoodB);
    assert_eq!(alerts[0].timestamp, twentieth_present_ts);
    Ok(())
}

#[tokio::test]
async fn detectors_are_independent_across_channels() -> Result<()> {
    let broker = MemoryBroker::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let mut detectors = Vec::new();
    for channel in ChannelId::ALL {
        detectors.push(spawn_detector(&broker, channel, notifier.clone()).await?);
    }

    // Food A stalls flat while the smoker climbs and Food B is absent
    // entirely; only Food A should alert.
    let rows: Vec<SensorRow> = (0..20)
        .map(|i| {
            row(
                &format!("t{i}"),
                Some(220.0 + i as f64),
                Some(150.0),
                None,
            )
        })
        .collect();

    let router = Router::connect(&broker, Duration::ZERO).await?;
    router.run(&rows).await;
    drain_and_stop(&broker, detectors).await;

    let alerts = notifier.sent();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].channel, ChannelId::FoodA);
    Ok(())
}
