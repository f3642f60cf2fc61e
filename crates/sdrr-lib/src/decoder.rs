use anyhow::{bail, Result};
use chrono::{DateTime, Utc};

use crate::record::{EventKind, HrvAnalysis, Record, Sample};
use crate::segmenter::WarningSegmenter;
use crate::window::DeltaWindow;

/// Tunables for one decoding pass.
#[derive(Debug, Clone, Copy)]
pub struct DecoderConfig {
    /// Quartile half-width `K`: the dispersion window holds `4K+1`
    /// differences and estimates are written `2K` samples behind the newest
    /// one.
    pub half_width: usize,
    /// Dispersion above which a sample is flagged anomalous (msec).
    pub threshold_ms: f64,
    /// Keep decoding through stop events instead of discarding
    /// stopped-state history.
    pub include_stopped: bool,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            half_width: 16,
            threshold_ms: 50.0,
            include_stopped: false,
        }
    }
}

impl DecoderConfig {
    /// Window length `N = 4K+1`.
    pub fn window_len(&self) -> usize {
        4 * self.half_width + 1
    }

    /// Backfill distance `2K`.
    pub fn lag(&self) -> usize {
        2 * self.half_width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActivityState {
    Stopped,
    Running,
}

/// Telemetry context carried onto each emitted sample.
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    timestamp: Option<DateTime<Utc>>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    hr_bpm: Option<u8>,
}

/// Streaming decoder, one instance per recording pass.
///
/// Feed records in temporal order with [`HrvDecoder::push`], then call
/// [`HrvDecoder::finish`]. Samples are emitted as their intervals arrive,
/// but the dispersion estimate and anomaly flag are backfilled `2K` samples
/// later: the quartile window is centered on its midpoint, so the statistic
/// computed at the newest sample describes the one `2K` behind it.
pub struct HrvDecoder {
    cfg: DecoderConfig,
    state: ActivityState,
    ctx: Context,
    rr_prev_ms: Option<f64>,
    since_reset: usize,
    window: DeltaWindow,
    segmenter: WarningSegmenter,
    samples: Vec<Sample>,
    hrv_observed: bool,
}

impl HrvDecoder {
    pub fn new(cfg: DecoderConfig) -> Result<Self> {
        if cfg.half_width == 0 {
            bail!("quartile half-width must be at least 1");
        }
        Ok(Self {
            cfg,
            state: ActivityState::Stopped,
            ctx: Context::default(),
            rr_prev_ms: None,
            since_reset: 0,
            window: DeltaWindow::new(cfg.half_width),
            segmenter: WarningSegmenter::new(),
            samples: Vec::new(),
            hrv_observed: false,
        })
    }

    pub fn push(&mut self, record: Record) {
        match record {
            Record::Telemetry {
                timestamp,
                heart_rate,
                latitude,
                longitude,
            } => {
                self.ctx = Context {
                    timestamp,
                    latitude,
                    longitude,
                    hr_bpm: heart_rate,
                };
            }
            Record::Event { kind } => self.on_event(kind),
            Record::Hrv { rr_s } => {
                self.hrv_observed = true;
                for rr in rr_s.into_iter().flatten() {
                    self.on_interval(rr);
                }
            }
        }
    }

    fn on_event(&mut self, kind: EventKind) {
        match kind {
            EventKind::Start => self.state = ActivityState::Running,
            // Interval data is unreliable after a full stop until the next
            // start, so the trailing history is discarded entirely.
            EventKind::StopAll if !self.cfg.include_stopped => self.reset(),
            EventKind::StopAll | EventKind::Other => {}
        }
    }

    fn reset(&mut self) {
        self.segmenter.reset(self.samples.len());
        self.state = ActivityState::Stopped;
        self.ctx = Context::default();
        self.rr_prev_ms = None;
        self.since_reset = 0;
        self.window = DeltaWindow::new(self.cfg.half_width);
    }

    fn on_interval(&mut self, rr_s: f64) {
        if self.state != ActivityState::Running && !self.cfg.include_stopped {
            return;
        }
        let rr_ms = rr_s * 1000.0;
        let delta = match self.rr_prev_ms {
            Some(prev) => rr_ms - prev,
            None => 0.0,
        };
        let sdrr = self.window.insert(delta);
        self.samples.push(Sample {
            timestamp: self.ctx.timestamp,
            latitude: self.ctx.latitude,
            longitude: self.ctx.longitude,
            resting_hr_bpm: self.ctx.hr_bpm,
            rr_ms,
            rr_prev_ms: self.rr_prev_ms,
            instant_hr_bpm: 60.0 / rr_s,
            sdrr_ms: None,
            warn: None,
        });
        // Hold off finalizing until the pre-filled window has been flushed
        // with genuine history since the last reset.
        if self.since_reset >= self.window.len() - 1 {
            let head = self.samples.len() - 1;
            let warn = sdrr > self.cfg.threshold_ms;
            let target = &mut self.samples[head - self.cfg.lag()];
            target.sdrr_ms = Some(sdrr);
            target.warn = Some(warn);
            self.segmenter.observe(head, warn);
        }
        self.rr_prev_ms = Some(rr_ms);
        self.since_reset += 1;
    }

    pub fn finish(self) -> HrvAnalysis {
        HrvAnalysis {
            samples: self.samples,
            warnings: self.segmenter.into_intervals(),
            hrv_observed: self.hrv_observed,
        }
    }
}

/// Run a full pass over an already-materialized record sequence.
pub fn analyze<I>(records: I, cfg: DecoderConfig) -> Result<HrvAnalysis>
where
    I: IntoIterator<Item = Record>,
{
    let mut decoder = HrvDecoder::new(cfg)?;
    for record in records {
        decoder.push(record);
    }
    Ok(decoder.finish())
}
