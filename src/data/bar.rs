use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BarError {
    #[error("Invalid OHLC values: high ({high}) < low ({low})")]
    InvalidHighLow { high: f64, low: f64 },
    #[error("Invalid OHLC values: close ({close}) outside high-low range [{low}, {high}]")]
    InvalidClose { close: f64, high: f64, low: f64 },
    #[error("Invalid OHLC values: open ({open}) outside high-low range [{low}, {high}]")]
    InvalidOpen { open: f64, high: f64, low: f64 },
    #[error("Non-finite price in bar")]
    NonFinite,
    #[error("Negative volume: {0}")]
    NegativeVolume(f64),
}

//a single ohlc bar of one contract
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    pub symbol: String,
}

impl Bar {
    //creates a new Bar with validation
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
        symbol: impl Into<String>,
    ) -> Result<Self, BarError> {
        if !(open.is_finite() && high.is_finite() && low.is_finite() && close.is_finite()) {
            return Err(BarError::NonFinite);
        }

        if high < low {
            return Err(BarError::InvalidHighLow { high, low });
        }

        if close < low || close > high {
            return Err(BarError::InvalidClose { close, high, low });
        }

        if open < low || open > high {
            return Err(BarError::InvalidOpen { open, high, low });
        }

        if let Some(v) = volume {
            if v < 0.0 {
                return Err(BarError::NegativeVolume(v));
            }
        }

        Ok(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            symbol: symbol.into(),
        })
    }

    //creates a Bar without validation
    pub fn new_unchecked(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: Option<f64>,
        symbol: impl Into<String>,
    ) -> Self {
        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            symbol: symbol.into(),
        }
    }

    //utc calendar date the bar belongs to
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 14, 13, 30, 0).unwrap()
    }

    #[test]
    fn test_valid_bar() {
        let bar = Bar::new(ts(), 100.0, 101.0, 99.5, 100.5, Some(12.0), "NQH4").unwrap();
        assert_eq!(bar.volume, Some(12.0));
        assert_eq!(bar.date(), NaiveDate::from_ymd_opt(2024, 3, 14).unwrap());
    }

    #[test]
    fn test_high_below_low_rejected() {
        let err = Bar::new(ts(), 100.0, 99.0, 100.0, 99.5, None, "NQH4").unwrap_err();
        assert_eq!(err, BarError::InvalidHighLow { high: 99.0, low: 100.0 });
    }

    #[test]
    fn test_open_and_close_outside_range_rejected() {
        assert!(matches!(
            Bar::new(ts(), 98.0, 101.0, 99.0, 100.0, None, "NQH4"),
            Err(BarError::InvalidOpen { .. })
        ));
        assert!(matches!(
            Bar::new(ts(), 100.0, 101.0, 99.0, 101.5, None, "NQH4"),
            Err(BarError::InvalidClose { .. })
        ));
    }

    #[test]
    fn test_negative_volume_and_nan_rejected() {
        assert_eq!(
            Bar::new(ts(), 100.0, 101.0, 99.0, 100.0, Some(-1.0), "NQH4").unwrap_err(),
            BarError::NegativeVolume(-1.0)
        );
        assert_eq!(
            Bar::new(ts(), f64::NAN, 101.0, 99.0, 100.0, None, "NQH4").unwrap_err(),
            BarError::NonFinite
        );
    }
}
