use std::io::Write;

use anyhow::Result;
use csv::WriterBuilder;

use crate::record::Sample;

const HEADER: [&str; 9] = [
    "timestamp",
    "latitude",
    "longitude",
    "HR(bpm)",
    "RR(msec)",
    "RRprev(msec)",
    "instantaneous HR(bpm)",
    "est. SDΔRR(msec)",
    "warn",
];

/// Write the per-sample report. Unset cells stay empty (dispersion and flag
/// for the samples that were never finalized, context fields the recording
/// never provided); the flag renders as 0/1.
pub fn write_samples_csv<W: Write>(writer: W, samples: &[Sample]) -> Result<()> {
    let mut w = WriterBuilder::new().from_writer(writer);
    w.write_record(HEADER)?;
    for s in samples {
        w.write_record(&[
            s.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default(),
            s.latitude.map(|v| v.to_string()).unwrap_or_default(),
            s.longitude.map(|v| v.to_string()).unwrap_or_default(),
            s.resting_hr_bpm.map(|v| v.to_string()).unwrap_or_default(),
            s.rr_ms.to_string(),
            s.rr_prev_ms.map(|v| v.to_string()).unwrap_or_default(),
            s.instant_hr_bpm.to_string(),
            s.sdrr_ms.map(|v| v.to_string()).unwrap_or_default(),
            s.warn.map(|v| u8::from(v).to_string()).unwrap_or_default(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
