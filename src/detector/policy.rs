use serde::{Deserialize, Serialize};

use super::window::SlidingWindow;
use crate::reading::ChannelId;

/// Channel-specific anomaly predicate, evaluated only on an exactly-full
/// window.
///
/// The two shapes are deliberately different and must stay that way:
/// `Drop` compares only the window's temporal endpoints (a sustained
/// directional decline; intermediate noise is irrelevant), while `Stall`
/// compares full-window extrema (any excursion anywhere in the window
/// disqualifies a plateau). Stall uses `max - min`, never `newest - oldest`,
/// so out-of-order arrival cannot produce a negative difference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum AnomalyPolicy {
    Drop { threshold: f64 },
    Stall { threshold: f64 },
}

impl AnomalyPolicy {
    /// Returns the measured temperature difference when the predicate holds.
    /// Callers only invoke this on a full window.
    pub fn evaluate(&self, window: &SlidingWindow) -> Option<f64> {
        match *self {
            AnomalyPolicy::Drop { threshold } => {
                let diff = window.oldest()? - window.newest()?;
                (diff >= threshold).then_some(diff)
            }
            AnomalyPolicy::Stall { threshold } => {
                let diff = window.spread()?;
                (diff <= threshold).then_some(diff)
            }
        }
    }

    /// Human-readable alert text for a matched predicate.
    pub fn describe(&self, channel: ChannelId, diff: f64) -> String {
        match self {
            AnomalyPolicy::Drop { .. } => {
                format!("{} Alert! Temperature dropped by {:.1}°F", channel, diff)
            }
            AnomalyPolicy::Stall { threshold } => format!(
                "{} Stall Alert! Temperature change {:.1}°F is within {:.1}°F",
                channel, diff, threshold
            ),
        }
    }

    pub fn threshold(&self) -> f64 {
        match *self {
            AnomalyPolicy::Drop { threshold } | AnomalyPolicy::Stall { threshold } => threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_of(values: &[f64]) -> SlidingWindow {
        let mut window = SlidingWindow::new(values.len());
        for &v in values {
            window.push(v);
        }
        window
    }

    #[test]
    fn drop_uses_endpoints_only() {
        let policy = AnomalyPolicy::Drop { threshold: 15.0 };
        // Wild swings in the middle do not matter; endpoints differ by 17.
        let window = window_of(&[225.0, 300.0, 100.0, 210.0, 208.0]);
        assert_eq!(policy.evaluate(&window), Some(17.0));
        // Endpoints too close, even though the middle collapsed.
        let window = window_of(&[225.0, 100.0, 100.0, 100.0, 215.0]);
        assert_eq!(policy.evaluate(&window), None);
    }

    #[test]
    fn drop_ignores_rises() {
        let policy = AnomalyPolicy::Drop { threshold: 15.0 };
        let window = window_of(&[200.0, 210.0, 220.0, 230.0, 240.0]);
        assert_eq!(policy.evaluate(&window), None);
    }

    #[test]
    fn stall_uses_full_window_extrema() {
        let policy = AnomalyPolicy::Stall { threshold: 1.0 };
        let window = window_of(&[150.0, 150.4, 150.2, 150.5]);
        let diff = policy.evaluate(&window).unwrap();
        assert!((diff - 0.5).abs() < 1e-9);
        // One excursion anywhere disqualifies the stall.
        let window = window_of(&[150.0, 152.0, 150.2, 150.5]);
        assert_eq!(policy.evaluate(&window), None);
    }

    #[test]
    fn stall_handles_out_of_order_arrival() {
        let policy = AnomalyPolicy::Stall { threshold: 1.0 };
        // Newest is below oldest; newest - oldest would be negative, but the
        // spread is still a valid non-negative plateau measure.
        let window = window_of(&[150.6, 150.2, 150.4, 150.0]);
        let diff = policy.evaluate(&window).unwrap();
        assert!(diff >= 0.0);
        assert!((diff - 0.6).abs() < 1e-9);
    }
}
