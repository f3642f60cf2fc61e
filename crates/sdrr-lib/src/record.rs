use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Activity events relevant to the decoder. Anything else a device may emit
/// is folded into `Other` and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    Start,
    StopAll,
    Other,
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "start" => EventKind::Start,
            "stop_all" => EventKind::StopAll,
            _ => EventKind::Other,
        }
    }
}

impl From<String> for EventKind {
    fn from(s: String) -> Self {
        EventKind::from(s.as_str())
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Start => "start",
            EventKind::StopAll => "stop_all",
            EventKind::Other => "other",
        }
        .to_string()
    }
}

/// One decoded record from a recording, in temporal order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    /// Periodic telemetry: position and device heart rate.
    Telemetry {
        #[serde(default)]
        timestamp: Option<DateTime<Utc>>,
        #[serde(default)]
        heart_rate: Option<u8>,
        #[serde(default)]
        latitude: Option<f64>,
        #[serde(default)]
        longitude: Option<f64>,
    },
    /// Device activity event (start, stop_all, ...).
    Event { kind: EventKind },
    /// A burst of beat-to-beat intervals in seconds. Entries the device
    /// dropped are null.
    Hrv { rr_s: Vec<Option<f64>> },
}

/// One annotated beat.
///
/// Samples are emitted as soon as their interval arrives; `sdrr_ms` and
/// `warn` stay unset until the decoder has seen enough trailing history to
/// backfill them, and remain unset for the final samples of a stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: Option<DateTime<Utc>>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Device heart rate from the surrounding telemetry record (bpm).
    pub resting_hr_bpm: Option<u8>,
    pub rr_ms: f64,
    pub rr_prev_ms: Option<f64>,
    pub instant_hr_bpm: f64,
    /// Robust dispersion estimate of recent RR differences (SDΔRR).
    pub sdrr_ms: Option<f64>,
    pub warn: Option<bool>,
}

/// A maximal run of consecutive anomalous samples. `end` is exclusive; None
/// means the run was still open when the stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarningInterval {
    pub start: usize,
    pub end: Option<usize>,
}

/// Everything one decoding pass produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HrvAnalysis {
    pub samples: Vec<Sample>,
    pub warnings: Vec<WarningInterval>,
    /// True once at least one beat-to-beat interval record was seen.
    /// Consumers skip reporting entirely when this is false.
    pub hrv_observed: bool,
}

impl HrvAnalysis {
    /// Resolve warning intervals to concrete `[start, end)` ranges,
    /// suppressing runs shorter than `min_len` samples. An interval still
    /// open at end of stream runs to the end of the sample sequence.
    pub fn significant_warnings(&self, min_len: usize) -> Vec<(usize, usize)> {
        let last = self.samples.len();
        self.warnings
            .iter()
            .map(|w| (w.start, w.end.unwrap_or(last)))
            .filter(|(start, end)| end - start >= min_len)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_sample() -> Sample {
        Sample {
            timestamp: None,
            latitude: None,
            longitude: None,
            resting_hr_bpm: None,
            rr_ms: 800.0,
            rr_prev_ms: None,
            instant_hr_bpm: 75.0,
            sdrr_ms: None,
            warn: None,
        }
    }

    #[test]
    fn significant_warnings_filters_short_runs() {
        let analysis = HrvAnalysis {
            samples: vec![blank_sample(); 30],
            warnings: vec![
                WarningInterval {
                    start: 0,
                    end: Some(5),
                },
                WarningInterval {
                    start: 6,
                    end: None,
                },
            ],
            hrv_observed: true,
        };
        assert_eq!(analysis.significant_warnings(20), vec![(6, 30)]);
        assert_eq!(
            analysis.significant_warnings(2),
            vec![(0, 5), (6, 30)],
            "short runs survive a looser filter"
        );
    }

    #[test]
    fn unknown_event_kinds_deserialize_as_other() {
        let record: Record = serde_json::from_str(r#"{"type":"event","kind":"pause"}"#).unwrap();
        match record {
            Record::Event { kind } => assert_eq!(kind, EventKind::Other),
            _ => panic!("expected an event record"),
        }
    }
}
