use crate::config::{BreakoutParams, SessionConfig};
use crate::data::Bar;
use crate::engine::execution::{fill_price, first_touch, TieBreak, Touch};
use crate::engine::session::{OpeningRange, SessionWindow};
use crate::instrument::FuturesContract;
use crate::metrics::WinRule;
use crate::portfolio::{Direction, OpenPosition, Trade, TradeResult};
use crate::strategy::levels::{LevelCalculator, PositionLevels};
use crate::strategy::{Strategy, TradingDay};
use tracing::debug;

//opening range breakout
//goes long when price breaks above the range plus buffer, short when it breaks below
//exits at target, stop or the last bar before flat time
#[derive(Debug, Clone)]
pub struct OpeningRangeBreakout {
    params: BreakoutParams,
    contract: FuturesContract,
    session: SessionConfig,
    slippage_pts: f64,
}

#[derive(Debug)]
enum DayState {
    Flat,
    InPosition(OpenPosition),
}

impl OpeningRangeBreakout {
    pub fn new(
        params: BreakoutParams,
        contract: FuturesContract,
        session: SessionConfig,
        slippage_pts: f64,
    ) -> Self {
        OpeningRangeBreakout {
            params,
            contract,
            session,
            slippage_pts,
        }
    }

    pub fn levels(&self) -> LevelCalculator<'_> {
        LevelCalculator::new(&self.params, &self.contract, self.slippage_pts)
    }

    //walks post-range bars, entries on trigger touches and exits on target/stop touches
    //a bar that enters is checked for an exit in the same pass
    fn scan(
        &self,
        post_window: &[&Bar],
        levels: &PositionLevels,
        template: &Trade,
        tie_break: TieBreak,
    ) -> Vec<Trade> {
        let slip = self.slippage_pts;
        let max_trades = self.params.max_trades_per_day as usize;
        let mut trades = Vec::new();
        let mut state = DayState::Flat;

        for bar in post_window {
            if trades.len() >= max_trades {
                break;
            }

            if let DayState::Flat = state {
                let touch = first_touch(bar, levels.trigger_high, levels.trigger_low, tie_break);
                if let Some(direction) = Direction::from_entry_touch(touch) {
                    let trigger = match direction {
                        Direction::Short => levels.trigger_low,
                        _ => levels.trigger_high,
                    };
                    let entry = fill_price(trigger, touch, slip);
                    state = DayState::InPosition(OpenPosition::open(
                        direction,
                        entry,
                        bar.timestamp,
                        levels,
                    ));
                }
            }

            let exit = match &state {
                DayState::InPosition(pos) => {
                    let (upper, lower) = pos.exit_levels();
                    let touch = first_touch(bar, upper, lower, tie_break);
                    let level = if touch == Touch::High { upper } else { lower };
                    pos.classify(touch)
                        .map(|result| (fill_price(level, touch, slip), result))
                }
                DayState::Flat => None,
            };

            if let Some((exit_price, result)) = exit {
                if let DayState::InPosition(pos) = std::mem::replace(&mut state, DayState::Flat) {
                    trades.push(pos.close(template, levels, exit_price, bar.timestamp, result));
                }
            }
        }

        //still open at flat time, exit at the last close without slippage
        if let (DayState::InPosition(pos), Some(last)) = (state, post_window.last()) {
            trades.push(pos.close(
                template,
                levels,
                last.close,
                last.timestamp,
                TradeResult::EndOfDay,
            ));
        }

        trades
    }

    fn with_levels(template: Trade, range: OpeningRange, levels: &PositionLevels) -> Trade {
        Trade {
            stop_pts: levels.stop_pts,
            target_pts: levels.target_pts,
            contracts: levels.contracts,
            micro_contracts: levels.micro_contracts,
            size_label: levels.size_label.clone(),
            risk_usd: levels.risk_usd,
            ..template.with_range(range.high, range.low)
        }
    }
}

impl Strategy for OpeningRangeBreakout {
    fn simulate_day(&self, day: &TradingDay<'_>, tie_break: TieBreak) -> Vec<Trade> {
        let placeholder = |result| Trade::placeholder(day.symbol, day.date, result);

        let window = SessionWindow::for_date(day.date, &self.session);
        let session = window.session_bars(day.bars, day.symbol);
        if session.is_empty() {
            debug!(date = %day.date, symbol = day.symbol, "no session bars");
            return vec![placeholder(TradeResult::NoData)];
        }

        let split = window.split(&session);
        let range = match split.range {
            Some(r) => r,
            None => {
                debug!(date = %day.date, "opening range window is empty");
                return vec![placeholder(TradeResult::NoData)];
            }
        };
        if split.post_window.is_empty() {
            return vec![placeholder(TradeResult::NoFill).with_range(range.high, range.low)];
        }
        if !(range.width() > 0.0) {
            debug!(date = %day.date, "degenerate opening range");
            return vec![placeholder(TradeResult::NoData).with_range(range.high, range.low)];
        }

        let levels = match self.levels().compute(range.high, range.low) {
            Ok(levels) => levels,
            Err(rejection) => {
                debug!(date = %day.date, result = %rejection.result, stop = rejection.stop_pts, "day skipped");
                return vec![Trade {
                    stop_pts: rejection.stop_pts,
                    target_pts: rejection.target_pts,
                    risk_usd: rejection.risk_usd,
                    ..placeholder(rejection.result).with_range(range.high, range.low)
                }];
            }
        };

        let template = Self::with_levels(placeholder(TradeResult::NoFill), range, &levels);
        let trades = self.scan(&split.post_window, &levels, &template, tie_break);
        if trades.is_empty() {
            return vec![placeholder(TradeResult::NoFill).with_range(range.high, range.low)];
        }

        debug!(date = %day.date, trades = trades.len(), "day simulated");
        trades
    }

    fn win_rule(&self) -> WinRule {
        WinRule::TakeProfit
    }

    fn name(&self) -> &str {
        "Opening Range Breakout"
    }
}
