use crate::data::bar::Bar;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

struct Bucket {
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: Option<f64>,
}

//aggregates bars into n-minute bars per symbol (first/max/min/last/sum)
//buckets are aligned to the epoch, input is expected in timestamp order
pub fn resample(bars: &[Bar], minutes: u32) -> Vec<Bar> {
    if minutes <= 1 {
        return bars.to_vec();
    }

    let width = i64::from(minutes) * 60;
    let mut buckets: BTreeMap<(i64, String), Bucket> = BTreeMap::new();

    for bar in bars {
        let secs = bar.timestamp.timestamp();
        let start = secs - secs.rem_euclid(width);

        buckets
            .entry((start, bar.symbol.clone()))
            .and_modify(|b| {
                b.high = b.high.max(bar.high);
                b.low = b.low.min(bar.low);
                b.close = bar.close;
                b.volume = match (b.volume, bar.volume) {
                    (Some(a), Some(v)) => Some(a + v),
                    (a, v) => a.or(v),
                };
            })
            .or_insert(Bucket {
                open: bar.open,
                high: bar.high,
                low: bar.low,
                close: bar.close,
                volume: bar.volume,
            });
    }

    buckets
        .into_iter()
        .filter_map(|((start, symbol), b)| {
            let timestamp = DateTime::<Utc>::from_timestamp(start, 0)?;
            Some(Bar::new_unchecked(
                timestamp, b.open, b.high, b.low, b.close, b.volume, symbol,
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(min: u32, sec: u32, o: f64, h: f64, l: f64, c: f64, symbol: &str) -> Bar {
        Bar::new_unchecked(
            Utc.with_ymd_and_hms(2024, 3, 14, 13, min, sec).unwrap(),
            o,
            h,
            l,
            c,
            Some(1.0),
            symbol,
        )
    }

    #[test]
    fn test_resample_groups_per_symbol_and_bucket() {
        let bars = vec![
            bar(30, 0, 10.0, 11.0, 9.0, 10.5, "NQH4"),
            bar(30, 0, 50.0, 51.0, 49.0, 50.0, "NQM4"),
            bar(37, 30, 10.5, 12.0, 10.0, 11.5, "NQH4"),
            bar(44, 59, 11.5, 11.6, 8.0, 8.5, "NQH4"),
            bar(45, 0, 8.5, 9.0, 8.0, 8.75, "NQH4"),
        ];

        let out = resample(&bars, 15);
        assert_eq!(out.len(), 3);

        let first = &out[0];
        assert_eq!(first.symbol, "NQH4");
        assert_eq!(first.timestamp, Utc.with_ymd_and_hms(2024, 3, 14, 13, 30, 0).unwrap());
        assert_eq!((first.open, first.high, first.low, first.close), (10.0, 12.0, 8.0, 8.5));
        assert_eq!(first.volume, Some(3.0));

        assert_eq!(out[1].symbol, "NQM4");
        assert_eq!(out[2].timestamp, Utc.with_ymd_and_hms(2024, 3, 14, 13, 45, 0).unwrap());
    }

    #[test]
    fn test_one_minute_is_passthrough() {
        let bars = vec![bar(30, 0, 10.0, 11.0, 9.0, 10.5, "NQH4")];
        assert_eq!(resample(&bars, 1), bars);
    }
}
