use crate::config::{ScaleInParams, SessionConfig};
use crate::data::Bar;
use crate::engine::execution::TieBreak;
use crate::engine::session::SessionWindow;
use crate::instrument::FuturesContract;
use crate::metrics::WinRule;
use crate::portfolio::{Direction, Trade, TradeResult};
use crate::strategy::indicators::{cross_above, supertrend_series};
use crate::strategy::{Strategy, TradingDay};
use tracing::debug;

//supertrend scale-in
//adds a long entry each time the close crosses above the supertrend line,
//never cuts, and exits every entry at the session's last close
#[derive(Debug, Clone)]
pub struct SuperTrendScaleIn {
    params: ScaleInParams,
    contract: FuturesContract,
    session: SessionConfig,
    slippage_pts: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct ScaleInEntry {
    number: u32,
    bar_index: usize,
    price: f64,
    trend_line: f64,
    contracts: u32,
    risk_usd: f64,
}

impl SuperTrendScaleIn {
    pub fn new(
        params: ScaleInParams,
        contract: FuturesContract,
        session: SessionConfig,
        slippage_pts: f64,
    ) -> Self {
        SuperTrendScaleIn {
            params,
            contract,
            session,
            slippage_pts,
        }
    }

    //contracts for one entry so that the distance to the line risks about the per-entry budget
    //zero when the line is within a tick of price
    pub fn position_size(&self, price: f64, trend_line: f64) -> u32 {
        let distance = (price - trend_line).abs();
        if distance <= self.contract.tick_size {
            return 0;
        }
        let n = (self.params.risk_per_entry_usd / (distance * self.contract.point_value)).floor();
        if n.is_finite() && n >= 1.0 {
            n.min(f64::from(u32::MAX)) as u32
        } else {
            1
        }
    }

    fn accumulate(&self, bars: &[&Bar], line: &[Option<f64>], crosses: &[bool]) -> Vec<ScaleInEntry> {
        let mut entries: Vec<ScaleInEntry> = Vec::new();
        let mut total = 0u32;

        for (i, bar) in bars.iter().enumerate().skip(self.params.atr_period) {
            if !crosses[i] {
                continue;
            }
            if entries.len() as u32 >= self.params.max_scale_ins
                || total >= self.params.max_contracts_total
            {
                continue;
            }
            let trend_line = match line[i] {
                Some(v) => v,
                None => continue,
            };

            let wanted = self.position_size(bar.close, trend_line);
            if wanted == 0 {
                continue;
            }
            let contracts = wanted.min(self.params.max_contracts_total - total);

            let price = bar.close + self.slippage_pts;
            let risk_usd = (price - trend_line).abs() * self.contract.point_value * f64::from(contracts);
            total += contracts;
            entries.push(ScaleInEntry {
                number: entries.len() as u32 + 1,
                bar_index: i,
                price,
                trend_line,
                contracts,
                risk_usd,
            });
        }

        entries
    }
}

impl Strategy for SuperTrendScaleIn {
    fn simulate_day(&self, day: &TradingDay<'_>, _tie_break: TieBreak) -> Vec<Trade> {
        let placeholder = |result| Trade::placeholder(day.symbol, day.date, result);

        let window = SessionWindow::for_date(day.date, &self.session);
        let bars = window.session_bars(day.bars, day.symbol);
        if bars.is_empty() {
            return vec![placeholder(TradeResult::NoData)];
        }
        if bars.len() < self.params.atr_period + self.params.warmup_margin {
            debug!(date = %day.date, bars = bars.len(), "not enough bars for supertrend");
            return vec![placeholder(TradeResult::InsufficientData)];
        }

        let hlc: Vec<(f64, f64, f64)> = bars.iter().map(|b| (b.high, b.low, b.close)).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
        let line = supertrend_series(&hlc, self.params.atr_period, self.params.multiplier);
        let crosses = cross_above(&closes, &line);

        let entries = self.accumulate(&bars, &line, &crosses);
        let last = match bars.last() {
            Some(b) => b,
            None => return vec![placeholder(TradeResult::NoData)],
        };
        if entries.is_empty() {
            return vec![placeholder(TradeResult::NoSignals)];
        }

        let exit = last.close - self.slippage_pts;
        let pv = self.contract.point_value;
        let commission = self.contract.commission_rt;
        debug!(date = %day.date, entries = entries.len(), "scale-in day simulated");

        entries
            .into_iter()
            .map(|e| {
                let points = exit - e.price;
                let n = f64::from(e.contracts);
                Trade {
                    entry_time: Some(bars[e.bar_index].timestamp),
                    exit_time: Some(last.timestamp),
                    direction: Direction::Long,
                    contracts: e.contracts,
                    size_label: format!("{}={}", self.contract.root, e.contracts),
                    risk_usd: e.risk_usd,
                    stop_pts: (e.price - e.trend_line).abs(),
                    entry: Some(e.price),
                    exit: Some(exit),
                    points,
                    pnl_usd: points * pv * n - commission * n,
                    scale_in_number: Some(e.number),
                    trend_line: Some(e.trend_line),
                    ..placeholder(TradeResult::EndOfDay)
                }
            })
            .collect()
    }

    fn win_rule(&self) -> WinRule {
        WinRule::PositivePnl
    }

    fn name(&self) -> &str {
        "SuperTrend Scale-In"
    }
}
