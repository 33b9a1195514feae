pub mod summary;
pub mod timeseries;

pub use summary::{summarize, KpiSummary, WinRule, PROFIT_FACTOR_CAP};
pub use timeseries::{calculate_equity_curve, max_drawdown, EquityPoint};
