pub mod backtest;
pub mod execution;
pub mod session;

pub use backtest::{BacktestEngine, BacktestResult, SensitivityReport};
pub use execution::{fill_price, first_touch, TieBreak, Touch};
pub use session::{extract_opening_range, OpeningRange, RangeSplit, SessionWindow};
