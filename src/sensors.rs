use std::time::Instant;

use serde::Deserialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc::Sender;

use crate::error::{DetectorResult, FallDetectorError};
use crate::types::AccelData;

/// Monotonic clock used to stamp samples that arrive without a timestamp
#[derive(Clone, Copy, Debug)]
pub struct SampleClock {
    start: Instant,
}

impl SampleClock {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Seconds since the clock was started
    pub fn now(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for SampleClock {
    fn default() -> Self {
        Self::start()
    }
}

#[derive(Deserialize)]
struct JsonSample {
    timestamp: Option<f64>,
    x: f64,
    y: f64,
    z: f64,
}

/// Parse one transport line into a sample.
///
/// Accepted formats:
/// - `x=0.01, y=0.02, z=0.98[, timestamp=12.5]` (termux-sensor style)
/// - `timestamp,x,y,z` or `x,y,z`
/// - `{"timestamp": 12.5, "x": 0.01, "y": 0.02, "z": 0.98}`
///
/// `fallback_ts` is used when the line carries no timestamp. Blank lines and
/// `#` comments yield `Ok(None)`.
///
/// The fallback is usually [`SampleClock`] time, which has its own epoch. A
/// stream should be either fully stamped or fully unstamped; mixing the two
/// puts samples on different time bases and makes the fall window
/// comparisons meaningless.
pub fn parse_sample_line(line: &str, fallback_ts: f64) -> DetectorResult<Option<AccelData>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let sample = if line.starts_with('{') {
        parse_json(line, fallback_ts)?
    } else if line.contains('=') {
        parse_key_value(line, fallback_ts)?
    } else {
        parse_csv(line, fallback_ts)?
    };
    Ok(Some(sample))
}

fn parse_json(line: &str, fallback_ts: f64) -> DetectorResult<AccelData> {
    let raw: JsonSample =
        serde_json::from_str(line).map_err(|e| FallDetectorError::Parse(format!("{}: {}", line, e)))?;
    Ok(AccelData::new(
        raw.x,
        raw.y,
        raw.z,
        raw.timestamp.unwrap_or(fallback_ts),
    ))
}

fn parse_key_value(line: &str, fallback_ts: f64) -> DetectorResult<AccelData> {
    // Example: "Accelerometer event: x=0.5, y=0.3, z=0.98, accuracy=0"
    let mut x = None;
    let mut y = None;
    let mut z = None;
    let mut timestamp = None;

    for part in line.split(',') {
        let Some((key, val_str)) = part.split_once('=') else {
            continue;
        };
        let key = key.rsplit(' ').next().unwrap_or(key).trim();
        let slot = match key {
            "x" => &mut x,
            "y" => &mut y,
            "z" => &mut z,
            "t" | "timestamp" => &mut timestamp,
            _ => continue,
        };
        *slot = Some(parse_number(val_str, line)?);
    }

    match (x, y, z) {
        (Some(x), Some(y), Some(z)) => Ok(AccelData::new(x, y, z, timestamp.unwrap_or(fallback_ts))),
        _ => Err(FallDetectorError::Parse(format!(
            "missing axis in '{}'",
            line
        ))),
    }
}

fn parse_csv(line: &str, fallback_ts: f64) -> DetectorResult<AccelData> {
    let fields = line
        .split(',')
        .map(|f| parse_number(f, line))
        .collect::<DetectorResult<Vec<f64>>>()?;

    match fields.as_slice() {
        [x, y, z] => Ok(AccelData::new(*x, *y, *z, fallback_ts)),
        [t, x, y, z] => Ok(AccelData::new(*x, *y, *z, *t)),
        _ => Err(FallDetectorError::Parse(format!(
            "expected 3 or 4 fields, got {} in '{}'",
            fields.len(),
            line
        ))),
    }
}

fn parse_number(field: &str, line: &str) -> DetectorResult<f64> {
    field
        .trim()
        .parse()
        .map_err(|_| FallDetectorError::Parse(format!("bad number '{}' in '{}'", field.trim(), line)))
}

/// Read samples line by line and forward them to the single classifier consumer.
///
/// Malformed lines are logged and skipped. Returns `(forwarded, rejected)` line
/// counts once the reader hits EOF or the receiver goes away. See
/// [`parse_sample_line`] for how unstamped lines are timed.
pub async fn accel_loop<R>(reader: R, tx: Sender<AccelData>, clock: SampleClock) -> (u64, u64)
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut sample_count = 0u64;
    let mut rejected = 0u64;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                log::error!("[accel] read failed after {} samples: {}", sample_count, e);
                break;
            }
        };

        let accel = match parse_sample_line(&line, clock.now()) {
            Ok(Some(accel)) => accel,
            Ok(None) => continue,
            Err(e) => {
                rejected += 1;
                log::warn!("[accel] skipping line: {}", e);
                continue;
            }
        };

        if tx.send(accel).await.is_err() {
            log::debug!("[accel] Channel closed after {} samples", sample_count);
            break;
        }

        sample_count += 1;
        if sample_count % 1000 == 0 {
            log::debug!("[accel] {} samples", sample_count);
        }
    }

    (sample_count, rejected)
}
