use crate::config::SessionConfig;
use crate::data::Bar;
use chrono::{DateTime, Duration, NaiveDate, Utc};

//high and low of the opening range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpeningRange {
    pub high: f64,
    pub low: f64,
}

impl OpeningRange {
    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

//bars of one session split at the end of the opening range
#[derive(Debug, Clone, Default)]
pub struct RangeSplit<'a> {
    //none when no bar falls inside the window
    pub range: Option<OpeningRange>,
    pub in_window: Vec<&'a Bar>,
    pub post_window: Vec<&'a Bar>,
}

//extracts the opening range from one session's bars
//the window is [start, start + duration - 1s], post-window bars start strictly after it
pub fn extract_opening_range<'a>(
    day_bars: &[&'a Bar],
    window_start: DateTime<Utc>,
    duration: Duration,
) -> RangeSplit<'a> {
    let window_end = window_start + duration - Duration::seconds(1);

    let in_window: Vec<&Bar> = day_bars
        .iter()
        .copied()
        .filter(|b| b.timestamp >= window_start && b.timestamp <= window_end)
        .collect();
    let post_window: Vec<&Bar> = day_bars
        .iter()
        .copied()
        .filter(|b| b.timestamp > window_end)
        .collect();

    let range = in_window.iter().fold(None, |acc: Option<OpeningRange>, b| {
        Some(match acc {
            None => OpeningRange {
                high: b.high,
                low: b.low,
            },
            Some(r) => OpeningRange {
                high: r.high.max(b.high),
                low: r.low.min(b.low),
            },
        })
    });

    RangeSplit {
        range,
        in_window,
        post_window,
    }
}

//session boundaries resolved for one calendar date
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionWindow {
    pub date: NaiveDate,
    pub start: DateTime<Utc>,
    pub flat: DateTime<Utc>,
    pub opening_range: Duration,
}

impl SessionWindow {
    pub fn for_date(date: NaiveDate, session: &SessionConfig) -> Self {
        SessionWindow {
            date,
            start: date.and_time(session.session_start).and_utc(),
            flat: date.and_time(session.flat_time).and_utc(),
            opening_range: Duration::seconds(i64::from(session.opening_range_secs)),
        }
    }

    //bars of the traded symbol inside [start, flat], in time order
    pub fn session_bars<'a>(&self, bars: &'a [Bar], symbol: &str) -> Vec<&'a Bar> {
        let mut session: Vec<&Bar> = bars
            .iter()
            .filter(|b| b.symbol == symbol && b.timestamp >= self.start && b.timestamp <= self.flat)
            .collect();
        session.sort_by_key(|b| b.timestamp);
        session
    }

    pub fn split<'a>(&self, session_bars: &[&'a Bar]) -> RangeSplit<'a> {
        extract_opening_range(session_bars, self.start, self.opening_range)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn bar(h: u32, m: u32, s: u32, high: f64, low: f64, symbol: &str) -> Bar {
        Bar::new_unchecked(
            Utc.with_ymd_and_hms(2024, 3, 14, h, m, s).unwrap(),
            low,
            high,
            low,
            high,
            None,
            symbol,
        )
    }

    fn window() -> SessionWindow {
        SessionWindow::for_date(
            NaiveDate::from_ymd_opt(2024, 3, 14).unwrap(),
            &SessionConfig::default(),
        )
    }

    #[test]
    fn test_window_boundaries_are_inclusive_then_strict() {
        let bars = vec![
            bar(13, 30, 0, 101.0, 99.0, "NQM4"),
            bar(13, 30, 29, 102.0, 100.0, "NQM4"),
            bar(13, 30, 30, 110.0, 90.0, "NQM4"),
        ];
        let w = window();
        let session = w.session_bars(&bars, "NQM4");
        let split = w.split(&session);

        assert_eq!(
            split.range,
            Some(OpeningRange {
                high: 102.0,
                low: 99.0
            })
        );
        assert_eq!(split.in_window.len(), 2);
        assert_eq!(split.post_window.len(), 1);
        assert_eq!(split.range.unwrap().width(), 3.0);
    }

    #[test]
    fn test_empty_window_has_no_range() {
        let bars = vec![bar(13, 31, 0, 101.0, 99.0, "NQM4")];
        let w = window();
        let session = w.session_bars(&bars, "NQM4");
        let split = w.split(&session);
        assert!(split.range.is_none());
        assert_eq!(split.post_window.len(), 1);
    }

    #[test]
    fn test_session_filters_symbol_and_hours() {
        let bars = vec![
            bar(13, 29, 59, 101.0, 99.0, "NQM4"),
            bar(13, 30, 0, 101.0, 99.0, "NQH4"),
            bar(20, 0, 0, 101.0, 99.0, "NQM4"),
            bar(20, 0, 1, 101.0, 99.0, "NQM4"),
        ];
        let session = window().session_bars(&bars, "NQM4");
        assert_eq!(session.len(), 1);
        assert_eq!(session[0].timestamp.time(), NaiveTime::from_hms_opt(20, 0, 0).unwrap());
    }
}
