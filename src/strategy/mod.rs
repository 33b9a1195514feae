pub mod breakout;
pub mod indicators;
pub mod levels;
pub mod scale_in;

use crate::config::{BacktestConfiguration, StrategyParams};
use crate::data::Bar;
use crate::engine::execution::TieBreak;
use crate::metrics::WinRule;
use crate::portfolio::Trade;
use chrono::NaiveDate;

pub use breakout::OpeningRangeBreakout;
pub use levels::{LevelCalculator, PositionLevels, Rejection};
pub use scale_in::SuperTrendScaleIn;

//everything a strategy sees for one calendar date
#[derive(Debug, Clone, Copy)]
pub struct TradingDay<'a> {
    pub date: NaiveDate,

    //contract picked by the roll resolver
    pub symbol: &'a str,

    //all bars stamped with this date, any symbol, sorted by time
    pub bars: &'a [Bar],
}

//strategy interface, one call per trading day
//a day's result depends only on its own bars, so days can run in parallel
pub trait Strategy: Send + Sync {
    //returns at least one ledger row for the day
    fn simulate_day(&self, day: &TradingDay<'_>, tie_break: TieBreak) -> Vec<Trade>;

    //how wins are counted for this strategy's kpis
    fn win_rule(&self) -> WinRule;

    //returns the strategy name
    fn name(&self) -> &str;
}

//builds the strategy described by a configuration
pub fn build_strategy(config: &BacktestConfiguration) -> Box<dyn Strategy> {
    let slippage_pts = config.slippage_pts();
    match &config.strategy {
        StrategyParams::Breakout(params) => Box::new(OpeningRangeBreakout::new(
            params.clone(),
            config.contract.clone(),
            config.session.clone(),
            slippage_pts,
        )),
        StrategyParams::ScaleIn(params) => Box::new(SuperTrendScaleIn::new(
            params.clone(),
            config.contract.clone(),
            config.session.clone(),
            slippage_pts,
        )),
    }
}

//helper function to calculate simple moving average
pub fn sma(prices: &[f64]) -> Option<f64> {
    if prices.is_empty() {
        return None;
    }
    Some(prices.iter().sum::<f64>() / prices.len() as f64)
}
