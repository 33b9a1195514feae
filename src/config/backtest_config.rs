use crate::data::LoadOptions;
use crate::engine::execution::TieBreak;
use crate::instrument::FuturesContract;
use anyhow::Context;
use chrono::{Duration, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("tick size must be positive, got {0}")]
    TickSize(f64),
    #[error("point value must be positive, got {0}")]
    PointValue(f64),
    #[error("opening range must be at least one second long")]
    EmptyOpeningRange,
    #[error("opening range ends at {or_end} which is not before flat time {flat}")]
    OpeningRangeAfterFlat { or_end: NaiveTime, flat: NaiveTime },
    #[error("session start {start} is not before flat time {flat}")]
    SessionOrder { start: NaiveTime, flat: NaiveTime },
    #[error("invalid {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
    #[error("invalid symbol filter: {0}")]
    SymbolPattern(String),
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        field,
        reason: reason.into(),
    }
}

//session times, all utc
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    //start of the session and of the opening range
    pub session_start: NaiveTime,

    //opening range length in seconds (minutes are written as seconds)
    pub opening_range_secs: u32,

    //forced flat time
    pub flat_time: NaiveTime,
}

impl SessionConfig {
    //last instant inside the opening range (one second resolution)
    pub fn opening_range_end(&self) -> NaiveTime {
        self.session_start + Duration::seconds(i64::from(self.opening_range_secs) - 1)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            session_start: NaiveTime::from_hms_opt(13, 30, 0).unwrap_or_default(),
            opening_range_secs: 30,
            flat_time: NaiveTime::from_hms_opt(20, 0, 0).unwrap_or_default(),
        }
    }
}

//how far the stop sits from the entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum StopPolicy {
    //a fraction k of the opening range width
    FractionOfRange { multiplier: f64 },
    //a constant number of points (1R)
    FixedPoints { points: f64 },
    //at the opposite bound of the opening range
    OppositeBound,
}

//fixed target once the stop gets large
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetBreakpoint {
    pub stop_at_least: f64,
    pub target_pts: f64,
}

//target distance as a multiple of the stop distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetPolicy {
    pub r_multiple: f64,
    #[serde(default)]
    pub min_pts: Option<f64>,
    #[serde(default)]
    pub max_pts: Option<f64>,
    #[serde(default)]
    pub breakpoint: Option<TargetBreakpoint>,
}

//contract sizing rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SizingPolicy {
    Fixed {
        contracts: u32,
    },
    //`below` contracts when stop < breakpoint, `at_or_above` otherwise
    StepByStop {
        breakpoint_pts: f64,
        below: u32,
        at_or_above: u32,
    },
    //largest count within the cap, clamped to [min, max]
    RiskBudget {
        risk_cap_usd: f64,
        min_contracts: u32,
        max_contracts: u32,
    },
    //standard + micro mix landing risk in [min, max], closest to target
    MixedRiskBand {
        micro: FuturesContract,
        risk_min_usd: f64,
        risk_max_usd: f64,
        risk_target_usd: f64,
        max_standard: u32,
        max_micro: u32,
    },
}

//opening-range breakout parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutParams {
    pub entry_buffer_ticks: u32,
    pub stop: StopPolicy,
    //skip the day when the stop is smaller than this
    #[serde(default)]
    pub min_stop_pts: Option<f64>,
    pub target: TargetPolicy,
    pub sizing: SizingPolicy,
    //skip the day when sized risk exceeds this
    #[serde(default)]
    pub risk_cap_usd: Option<f64>,
    pub max_trades_per_day: u32,
}

impl Default for BreakoutParams {
    fn default() -> Self {
        BreakoutParams {
            entry_buffer_ticks: 2,
            stop: StopPolicy::FractionOfRange { multiplier: 0.5 },
            min_stop_pts: None,
            target: TargetPolicy {
                r_multiple: 1.0,
                min_pts: None,
                max_pts: None,
                breakpoint: None,
            },
            sizing: SizingPolicy::Fixed { contracts: 1 },
            risk_cap_usd: None,
            max_trades_per_day: 1,
        }
    }
}

//supertrend scale-in (accumulate only) parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleInParams {
    pub atr_period: usize,
    pub multiplier: f64,
    pub risk_per_entry_usd: f64,
    pub max_contracts_total: u32,
    pub max_scale_ins: u32,
    //bars required beyond the atr period before a day is simulated
    #[serde(default = "default_warmup_margin")]
    pub warmup_margin: usize,
}

fn default_warmup_margin() -> usize {
    10
}

impl Default for ScaleInParams {
    fn default() -> Self {
        ScaleInParams {
            atr_period: 10,
            multiplier: 3.0,
            risk_per_entry_usd: 100.0,
            max_contracts_total: 10,
            max_scale_ins: 5,
            warmup_margin: default_warmup_margin(),
        }
    }
}

//strategy-specific parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyParams {
    Breakout(BreakoutParams),
    ScaleIn(ScaleInParams),
}

impl StrategyParams {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyParams::Breakout(_) => "Opening Range Breakout",
            StrategyParams::ScaleIn(_) => "SuperTrend Scale-In",
        }
    }
}

//where bars come from and how they are prepared
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub path: PathBuf,
    #[serde(flatten)]
    pub load: LoadOptions,
}

//optional output paths
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub trades_csv: Option<PathBuf>,
    #[serde(default)]
    pub picks_csv: Option<PathBuf>,
    #[serde(default)]
    pub kpis_json: Option<PathBuf>,
}

//complete backtest configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfiguration {
    pub name: String,

    //data
    pub data: DataConfig,

    //contract specification, the root feeds the roll resolver
    pub contract: FuturesContract,

    pub session: SessionConfig,

    //execution assumptions
    #[serde(default)]
    pub slippage_ticks: u32,
    #[serde(default)]
    pub tie_break: TieBreak,

    //strategy
    pub strategy: StrategyParams,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Default for BacktestConfiguration {
    fn default() -> Self {
        BacktestConfiguration {
            name: "opr".to_string(),
            data: DataConfig {
                path: PathBuf::from("data.csv"),
                load: LoadOptions {
                    symbol_regex: Some(r"^NQ[HMUZ][0-9]$".to_string()),
                    resample_minutes: None,
                },
            },
            contract: FuturesContract::nq(),
            session: SessionConfig::default(),
            slippage_ticks: 0,
            tie_break: TieBreak::HighFirst,
            strategy: StrategyParams::Breakout(BreakoutParams::default()),
            output: OutputConfig::default(),
        }
    }
}

impl BacktestConfiguration {
    pub fn slippage_pts(&self) -> f64 {
        self.contract.ticks_to_points(f64::from(self.slippage_ticks))
    }

    //checks every invariant the simulator relies on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.contract.tick_size > 0.0) {
            return Err(ConfigError::TickSize(self.contract.tick_size));
        }
        if !(self.contract.point_value > 0.0) {
            return Err(ConfigError::PointValue(self.contract.point_value));
        }
        if self.contract.commission_rt < 0.0 {
            return Err(invalid("commission_rt", "must not be negative"));
        }

        if let Some(pattern) = &self.data.load.symbol_regex {
            Regex::new(pattern).map_err(|e| ConfigError::SymbolPattern(e.to_string()))?;
        }

        let session = &self.session;
        if session.session_start >= session.flat_time {
            return Err(ConfigError::SessionOrder {
                start: session.session_start,
                flat: session.flat_time,
            });
        }

        match &self.strategy {
            StrategyParams::Breakout(params) => {
                if session.opening_range_secs == 0 {
                    return Err(ConfigError::EmptyOpeningRange);
                }
                let or_end = session.opening_range_end();
                //a range wrapping past midnight would also fail this check
                if or_end >= session.flat_time || or_end < session.session_start {
                    return Err(ConfigError::OpeningRangeAfterFlat {
                        or_end,
                        flat: session.flat_time,
                    });
                }
                validate_breakout(params)
            }
            StrategyParams::ScaleIn(params) => validate_scale_in(params),
        }
    }

    //load configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {:?}", path))?;
        let config: BacktestConfiguration = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config {:?}", path))?;
        config
            .validate()
            .with_context(|| format!("Invalid config {:?}", path))?;
        Ok(config)
    }

    //save configuration to a JSON file
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

fn validate_breakout(params: &BreakoutParams) -> Result<(), ConfigError> {
    if params.max_trades_per_day == 0 {
        return Err(invalid("max_trades_per_day", "must be at least 1"));
    }

    match params.stop {
        StopPolicy::FractionOfRange { multiplier } if !(multiplier > 0.0) => {
            return Err(invalid("stop.multiplier", "must be positive"));
        }
        StopPolicy::FixedPoints { points } if !(points > 0.0) => {
            return Err(invalid("stop.points", "must be positive"));
        }
        _ => {}
    }

    let target = &params.target;
    if !(target.r_multiple > 0.0) {
        return Err(invalid("target.r_multiple", "must be positive"));
    }
    if let (Some(lo), Some(hi)) = (target.min_pts, target.max_pts) {
        if lo > hi {
            return Err(invalid("target", format!("min_pts {lo} above max_pts {hi}")));
        }
    }

    match &params.sizing {
        SizingPolicy::Fixed { contracts } if *contracts == 0 => {
            Err(invalid("sizing.contracts", "must be at least 1"))
        }
        SizingPolicy::StepByStop { below, at_or_above, .. } if *below == 0 && *at_or_above == 0 => {
            Err(invalid("sizing", "step sizing never trades"))
        }
        SizingPolicy::RiskBudget {
            risk_cap_usd,
            min_contracts,
            max_contracts,
        } => {
            if !(*risk_cap_usd > 0.0) {
                Err(invalid("sizing.risk_cap_usd", "must be positive"))
            } else if min_contracts > max_contracts || *max_contracts == 0 {
                Err(invalid("sizing", "contract bounds are empty"))
            } else {
                Ok(())
            }
        }
        SizingPolicy::MixedRiskBand {
            micro,
            risk_min_usd,
            risk_max_usd,
            risk_target_usd,
            ..
        } => {
            if !(micro.point_value > 0.0) {
                Err(invalid("sizing.micro.point_value", "must be positive"))
            } else if !(risk_min_usd <= risk_target_usd && risk_target_usd <= risk_max_usd) {
                Err(invalid("sizing", "risk band must satisfy min <= target <= max"))
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

fn validate_scale_in(params: &ScaleInParams) -> Result<(), ConfigError> {
    if params.atr_period == 0 {
        return Err(invalid("atr_period", "must be at least 1"));
    }
    if !(params.multiplier > 0.0) {
        return Err(invalid("multiplier", "must be positive"));
    }
    if !(params.risk_per_entry_usd > 0.0) {
        return Err(invalid("risk_per_entry_usd", "must be positive"));
    }
    if params.max_contracts_total == 0 || params.max_scale_ins == 0 {
        return Err(invalid("max_contracts_total", "scale-in limits must be at least 1"));
    }
    Ok(())
}
