use crate::data::bar::{Bar, BarError};
use crate::data::cache::{BarCache, Fingerprint};
use crate::data::resample::resample;
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Missing required column: {0}")]
    MissingColumn(&'static str),
    #[error("Empty timestamp at line {line}")]
    EmptyTimestamp { line: usize },
    #[error("Malformed timestamp '{value}' at line {line}")]
    InvalidTimestamp { line: usize, value: String },
    #[error("Malformed {column} value '{value}' at line {line}")]
    InvalidNumber {
        line: usize,
        column: &'static str,
        value: String,
    },
    #[error("Invalid bar at line {line}: {source}")]
    InvalidBar {
        line: usize,
        #[source]
        source: BarError,
    },
    #[error("Invalid symbol filter: {0}")]
    InvalidPattern(#[from] regex::Error),
}

//filters applied while loading, part of the cache fingerprint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadOptions {
    //only keep symbols matching this pattern (anchored at the start)
    #[serde(default)]
    pub symbol_regex: Option<String>,

    //aggregate into n-minute bars per symbol after filtering
    #[serde(default)]
    pub resample_minutes: Option<u32>,
}

impl LoadOptions {
    pub fn describe(&self) -> String {
        format!(
            "symbol_regex={};resample_minutes={}",
            self.symbol_regex.as_deref().unwrap_or(""),
            self.resample_minutes.map(|m| m.to_string()).unwrap_or_default()
        )
    }
}

//column positions resolved case-insensitively from the header row
struct ColumnMap {
    timestamp: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    symbol: usize,
    volume: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &StringRecord) -> Result<Self, DataError> {
        let find = |names: &[&str]| {
            headers
                .iter()
                .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
        };

        Ok(ColumnMap {
            timestamp: find(&["timestamp", "ts_event"]).ok_or(DataError::MissingColumn("timestamp"))?,
            open: find(&["open"]).ok_or(DataError::MissingColumn("open"))?,
            high: find(&["high"]).ok_or(DataError::MissingColumn("high"))?,
            low: find(&["low"]).ok_or(DataError::MissingColumn("low"))?,
            close: find(&["close"]).ok_or(DataError::MissingColumn("close"))?,
            symbol: find(&["symbol"]).ok_or(DataError::MissingColumn("symbol"))?,
            volume: find(&["volume"]),
        })
    }
}

//parses the timestamp layouts seen in exported tick data, naive values are utc
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"] {
        if let Ok(ts) = DateTime::parse_from_str(raw, fmt) {
            return Some(ts.with_timezone(&Utc));
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }

    None
}

fn parse_number(record: &StringRecord, idx: usize, column: &'static str, line: usize) -> Result<f64, DataError> {
    let raw = record.get(idx).unwrap_or("").trim();
    raw.parse::<f64>().map_err(|_| DataError::InvalidNumber {
        line,
        column,
        value: raw.to_string(),
    })
}

//reads and validates bars from any csv source, rows are returned in file order
pub fn read_bars<R: Read>(source: R) -> Result<Vec<Bar>, DataError> {
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(source);
    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut bars = Vec::new();

    for (index, result) in reader.records().enumerate() {
        let record = result?;
        let line = index + 2;

        let raw_ts = record.get(columns.timestamp).unwrap_or("").trim();
        if raw_ts.is_empty() {
            return Err(DataError::EmptyTimestamp { line });
        }
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| DataError::InvalidTimestamp {
            line,
            value: raw_ts.to_string(),
        })?;

        let open = parse_number(&record, columns.open, "open", line)?;
        let high = parse_number(&record, columns.high, "high", line)?;
        let low = parse_number(&record, columns.low, "low", line)?;
        let close = parse_number(&record, columns.close, "close", line)?;

        //blank volume cells are treated as missing
        let volume = match columns.volume {
            Some(idx) if !record.get(idx).unwrap_or("").trim().is_empty() => {
                Some(parse_number(&record, idx, "volume", line)?)
            }
            _ => None,
        };

        let symbol = record.get(columns.symbol).unwrap_or("").trim().to_string();

        let bar = Bar::new(timestamp, open, high, low, close, volume, symbol)
            .map_err(|source| DataError::InvalidBar { line, source })?;
        bars.push(bar);
    }

    Ok(bars)
}

//keeps bars whose symbol matches the pattern at its start
pub fn filter_by_pattern(bars: Vec<Bar>, pattern: &Regex) -> Vec<Bar> {
    bars.into_iter()
        .filter(|bar| pattern.find(&bar.symbol).is_some_and(|m| m.start() == 0))
        .collect()
}

//sorts by (timestamp, symbol)
pub fn sort_bars(bars: &mut [Bar]) {
    bars.sort_by(|a, b| {
        a.timestamp
            .cmp(&b.timestamp)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
}

//applies filters, sorting and resampling to freshly read bars
pub fn prepare_bars(bars: Vec<Bar>, options: &LoadOptions) -> Result<Vec<Bar>, DataError> {
    let total = bars.len();

    let mut bars = match &options.symbol_regex {
        Some(pattern) => {
            let re = Regex::new(pattern)?;
            let kept = filter_by_pattern(bars, &re);
            debug!(pattern = %pattern, kept = kept.len(), total, "applied symbol filter");
            kept
        }
        None => bars,
    };

    sort_bars(&mut bars);

    if let Some(minutes) = options.resample_minutes.filter(|m| *m > 1) {
        let before = bars.len();
        bars = resample(&bars, minutes);
        debug!(minutes, before, after = bars.len(), "resampled bars");
    }

    Ok(bars)
}

//loads bars from a csv file
pub fn load_csv<P: AsRef<Path>>(path: P, options: &LoadOptions) -> Result<Vec<Bar>, DataError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)?;
    let bars = read_bars(file)?;
    let bars = prepare_bars(bars, options)?;

    info!(path = %path.display(), rows = bars.len(), "loaded bars");
    Ok(bars)
}

//loads through the given cache, reusing bars when the file and filters are unchanged
pub fn load_csv_cached<P: AsRef<Path>>(
    cache: &mut BarCache,
    path: P,
    options: &LoadOptions,
) -> Result<Arc<Vec<Bar>>, DataError> {
    let path = path.as_ref();
    let key = Fingerprint::of(path, options)?;

    if let Some(bars) = cache.get(&key) {
        debug!(path = %path.display(), rows = bars.len(), "bar cache hit");
        return Ok(bars);
    }

    let bars = load_csv(path, options)?;
    Ok(cache.put(key, bars))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = "\
TS_EVENT,Open,High,Low,Close,Volume,Symbol
2024-03-14T13:30:01Z,100.0,101.0,99.0,100.5,10,NQM4
2024-03-14 13:30:00+00:00,100.0,100.5,99.5,100.0,,NQH4
2024-03-14 13:30:00,100.0,100.5,99.5,100.0,3,NQM4
2024-03-14 13:30:02,10.0,10.5,9.5,10.0,3,NQ.c.0
";

    #[test]
    fn test_read_bars_maps_columns_case_insensitively() {
        let bars = read_bars(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0].symbol, "NQM4");
        assert_eq!(bars[0].volume, Some(10.0));
        assert_eq!(bars[1].volume, None);
        assert_eq!(
            bars[1].timestamp,
            Utc.with_ymd_and_hms(2024, 3, 14, 13, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_prepare_sorts_by_timestamp_then_symbol_and_filters() {
        let bars = read_bars(SAMPLE.as_bytes()).unwrap();
        let options = LoadOptions {
            symbol_regex: Some(r"^NQ[HMUZ][0-9]$".to_string()),
            resample_minutes: None,
        };
        let bars = prepare_bars(bars, &options).unwrap();
        let order: Vec<_> = bars
            .iter()
            .map(|b| (b.timestamp.format("%S").to_string(), b.symbol.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("00".to_string(), "NQH4"),
                ("00".to_string(), "NQM4"),
                ("01".to_string(), "NQM4"),
            ]
        );
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let csv = "timestamp,open,high,low,symbol\n2024-03-14T13:30:00Z,1,1,1,NQH4\n";
        let err = read_bars(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::MissingColumn("close")));
    }

    #[test]
    fn test_bad_timestamps_are_fatal() {
        let empty = "timestamp,open,high,low,close,symbol\n,1,1,1,1,NQH4\n";
        assert!(matches!(
            read_bars(empty.as_bytes()).unwrap_err(),
            DataError::EmptyTimestamp { line: 2 }
        ));

        let garbage = "timestamp,open,high,low,close,symbol\nyesterday,1,1,1,1,NQH4\n";
        assert!(matches!(
            read_bars(garbage.as_bytes()).unwrap_err(),
            DataError::InvalidTimestamp { line: 2, .. }
        ));
    }

    #[test]
    fn test_ohlc_violation_reports_line() {
        let csv = "timestamp,open,high,low,close,symbol\n\
                   2024-03-14T13:30:00Z,1,1,1,1,NQH4\n\
                   2024-03-14T13:30:01Z,1,0.5,1,1,NQH4\n";
        assert!(matches!(
            read_bars(csv.as_bytes()).unwrap_err(),
            DataError::InvalidBar { line: 3, .. }
        ));
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let options = LoadOptions {
            symbol_regex: Some("([".to_string()),
            resample_minutes: None,
        };
        assert!(matches!(
            prepare_bars(Vec::new(), &options),
            Err(DataError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_parse_timestamp_fractional_seconds() {
        let ts = parse_timestamp("2024-03-14 13:30:00.500").unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 500);
        assert!(parse_timestamp("14/03/2024").is_none());
    }
}
