use crate::engine::execution::Touch;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

//trade direction, flat rows are placeholders for days without a position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "long")]
    Long,
    #[serde(rename = "short")]
    Short,
    #[serde(rename = "none")]
    Flat,
}

impl Direction {
    //converts to points sign (long = +1, short = -1)
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
            Direction::Flat => 0.0,
        }
    }

    //breaking the upper trigger goes long, the lower one goes short
    pub fn from_entry_touch(touch: Touch) -> Option<Self> {
        match touch {
            Touch::High => Some(Direction::Long),
            Touch::Low => Some(Direction::Short),
            Touch::Neither => None,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
            Direction::Flat => write!(f, "none"),
        }
    }
}

//closed set of ledger outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeResult {
    #[serde(rename = "TP")]
    TakeProfit,
    #[serde(rename = "SL")]
    StopLoss,
    #[serde(rename = "EOD")]
    EndOfDay,
    #[serde(rename = "no_fill")]
    NoFill,
    #[serde(rename = "no_data")]
    NoData,
    #[serde(rename = "skip_small_stop")]
    SkipSmallStop,
    #[serde(rename = "skip_risk_cap")]
    SkipRiskCap,
    #[serde(rename = "skip_risk_band")]
    SkipRiskBand,
    #[serde(rename = "insufficient_data")]
    InsufficientData,
    #[serde(rename = "no_signals")]
    NoSignals,
}

impl TradeResult {
    //tp, sl and eod are executed trades, everything else is a placeholder
    pub fn is_real(&self) -> bool {
        matches!(
            self,
            TradeResult::TakeProfit | TradeResult::StopLoss | TradeResult::EndOfDay
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TradeResult::TakeProfit => "TP",
            TradeResult::StopLoss => "SL",
            TradeResult::EndOfDay => "EOD",
            TradeResult::NoFill => "no_fill",
            TradeResult::NoData => "no_data",
            TradeResult::SkipSmallStop => "skip_small_stop",
            TradeResult::SkipRiskCap => "skip_risk_cap",
            TradeResult::SkipRiskBand => "skip_risk_band",
            TradeResult::InsufficientData => "insufficient_data",
            TradeResult::NoSignals => "no_signals",
        }
    }
}

impl fmt::Display for TradeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//one ledger row, column order is the csv column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub date: NaiveDate,
    pub entry_time: Option<DateTime<Utc>>,
    pub exit_time: Option<DateTime<Utc>>,
    pub direction: Direction,
    pub or_high: Option<f64>,
    pub or_low: Option<f64>,
    pub stop_pts: f64,
    pub target_pts: f64,
    pub contracts: u32,
    pub micro_contracts: u32,
    pub size_label: String,
    pub risk_usd: f64,
    pub entry: Option<f64>,
    pub target: Option<f64>,
    pub stop: Option<f64>,
    pub exit: Option<f64>,
    pub result: TradeResult,
    pub points: f64,
    pub pnl_usd: f64,
    pub scale_in_number: Option<u32>,
    pub trend_line: Option<f64>,
}

impl Trade {
    //a row recording a day that produced no executed trade
    pub fn placeholder(symbol: impl Into<String>, date: NaiveDate, result: TradeResult) -> Self {
        Trade {
            symbol: symbol.into(),
            date,
            entry_time: None,
            exit_time: None,
            direction: Direction::Flat,
            or_high: None,
            or_low: None,
            stop_pts: 0.0,
            target_pts: 0.0,
            contracts: 0,
            micro_contracts: 0,
            size_label: String::new(),
            risk_usd: 0.0,
            entry: None,
            target: None,
            stop: None,
            exit: None,
            result,
            points: 0.0,
            pnl_usd: 0.0,
            scale_in_number: None,
            trend_line: None,
        }
    }

    pub fn with_range(mut self, or_high: f64, or_low: f64) -> Self {
        self.or_high = Some(or_high);
        self.or_low = Some(or_low);
        self
    }

    pub fn is_real(&self) -> bool {
        self.result.is_real()
    }
}
