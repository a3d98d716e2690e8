use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The three sensor channels of the rig: one smoker probe and two food probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelId {
    Smoker,
    FoodA,
    FoodB,
}

impl ChannelId {
    pub const ALL: [ChannelId; 3] = [ChannelId::Smoker, ChannelId::FoodA, ChannelId::FoodB];

    /// Broker queue name for this channel, matching the original deployment.
    pub fn queue_name(&self) -> &'static str {
        match self {
            ChannelId::Smoker => "01-smoker",
            ChannelId::FoodA => "02-food-A",
            ChannelId::FoodB => "03-food-B",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChannelId::Smoker => "Smoker",
            ChannelId::FoodA => "Food A",
            ChannelId::FoodB => "Food B",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// One timestamped temperature sample for one channel. Immutable once built;
/// ownership moves to the channel on publish and to the detector on receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub timestamp: String,
    pub channel: ChannelId,
    pub temperature: f64,
}

impl Reading {
    pub fn new(timestamp: impl Into<String>, channel: ChannelId, temperature: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            channel,
            temperature,
        }
    }

    /// Wire payload: `"<timestamp>, <temperature>"`, one temperature per message.
    pub fn encode_wire(&self) -> String {
        format!("{}, {}", self.timestamp, self.temperature)
    }

    /// Parses a wire payload received on `channel`. Returns `None` for
    /// payloads with no delimiter or a non-numeric temperature; the caller
    /// decides how loudly to complain.
    pub fn parse_wire(channel: ChannelId, payload: &str) -> Option<Reading> {
        let (timestamp, temp) = payload.rsplit_once(',')?;
        let temperature: f64 = temp.trim().parse().ok()?;
        Some(Reading {
            timestamp: timestamp.trim().to_string(),
            channel,
            temperature,
        })
    }
}

/// One row of the source table: a timestamp plus whichever channel
/// temperatures were recorded. A missing value means that channel simply has
/// no sample this interval.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorRow {
    pub timestamp: String,
    pub smoker: Option<f64>,
    pub food_a: Option<f64>,
    pub food_b: Option<f64>,
}

impl SensorRow {
    /// Derives up to three readings from this row, in channel order.
    pub fn readings(&self) -> Vec<Reading> {
        let fields = [
            (ChannelId::Smoker, self.smoker),
            (ChannelId::FoodA, self.food_a),
            (ChannelId::FoodB, self.food_b),
        ];
        fields
            .into_iter()
            .filter_map(|(channel, temp)| {
                temp.map(|t| Reading::new(self.timestamp.clone(), channel, t))
            })
            .collect()
    }
}

/// A detected anomaly, ready for dispatch. Ephemeral: never queued, retried,
/// or persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub channel: ChannelId,
    pub message: String,
    /// Timestamp of the reading that triggered the predicate.
    pub timestamp: String,
    pub raised_at: DateTime<Utc>,
}

impl Alert {
    pub fn new(channel: ChannelId, message: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            channel,
            message: message.into(),
            timestamp: timestamp.into(),
            raised_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_round_trip() {
        let reading = Reading::new("07/04/20 08:05:00", ChannelId::Smoker, 225.5);
        let payload = reading.encode_wire();
        assert_eq!(payload, "07/04/20 08:05:00, 225.5");
        let parsed = Reading::parse_wire(ChannelId::Smoker, &payload).unwrap();
        assert_eq!(parsed, reading);
    }

    #[test]
    fn wire_rejects_garbage() {
        assert!(Reading::parse_wire(ChannelId::FoodA, "no delimiter here").is_none());
        assert!(Reading::parse_wire(ChannelId::FoodA, "08:05:00, not-a-number").is_none());
    }

    #[test]
    fn row_skips_missing_channels() {
        let row = SensorRow {
            timestamp: "08:05:00".into(),
            smoker: Some(225.0),
            food_a: None,
            food_b: Some(140.0),
        };
        let readings = row.readings();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].channel, ChannelId::Smoker);
        assert_eq!(readings[1].channel, ChannelId::FoodB);
    }
}
