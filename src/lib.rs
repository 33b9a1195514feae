//an intraday futures backtester for opening-range breakout and scale-in strategies

pub mod config;
pub mod data;
pub mod engine;
pub mod instrument;
pub mod metrics;
pub mod portfolio;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        BacktestConfiguration, BreakoutParams, ConfigError, Preset, ScaleInParams, SessionConfig,
        SizingPolicy, StopPolicy, StrategyParams, TargetPolicy,
    };
    pub use crate::data::{load_csv, load_csv_cached, read_bars, Bar, BarCache, DataError, LoadOptions};
    pub use crate::engine::{
        BacktestEngine, BacktestResult, SensitivityReport, SessionWindow, TieBreak, Touch,
    };
    pub use crate::instrument::{FuturesContract, RollResolver};
    pub use crate::metrics::{calculate_equity_curve, summarize, EquityPoint, KpiSummary, WinRule};
    pub use crate::portfolio::{Direction, SymbolPick, SymbolPickLog, Trade, TradeLedger, TradeResult};
    pub use crate::strategy::{
        build_strategy, LevelCalculator, OpeningRangeBreakout, PositionLevels, Strategy,
        SuperTrendScaleIn, TradingDay,
    };
}
