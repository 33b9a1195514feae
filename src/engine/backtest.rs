use crate::config::BacktestConfiguration;
use crate::data::Bar;
use crate::engine::execution::TieBreak;
use crate::instrument::RollResolver;
use crate::metrics::{summarize, KpiSummary, WinRule};
use crate::portfolio::{SymbolPick, SymbolPickLog, Trade, TradeLedger, TradeResult};
use crate::strategy::{build_strategy, Strategy, TradingDay};
use chrono::NaiveDate;
use indexmap::IndexMap;
use rayon::prelude::*;
use std::borrow::Cow;
use tracing::{info, warn};

//result of a backtest
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub tie_break: TieBreak,
    pub ledger: TradeLedger,
    pub picks: SymbolPickLog,
    pub summary: KpiSummary,
}

//the same input run with both tie-break assumptions
#[derive(Debug, Clone)]
pub struct SensitivityReport {
    pub primary: BacktestResult,
    pub flipped: BacktestResult,
    //dates whose ledger rows differ between the two runs
    pub differing_dates: Vec<NaiveDate>,
}

//main backtest engine
pub struct BacktestEngine {
    resolver: RollResolver,
    strategy: Box<dyn Strategy>,
}

impl BacktestEngine {
    //creates an engine for a validated configuration
    pub fn new(config: &BacktestConfiguration) -> Self {
        BacktestEngine {
            resolver: RollResolver::new(config.contract.root.clone()),
            strategy: build_strategy(config),
        }
    }

    pub fn win_rule(&self) -> WinRule {
        self.strategy.win_rule()
    }

    //runs every date in the input, one ledger row or more per date
    pub fn run(&self, bars: &[Bar], tie_break: TieBreak) -> BacktestResult {
        let sorted = sorted_bars(bars);
        let days: Vec<(NaiveDate, &[Bar])> = group_by_date(&sorted).into_iter().collect();
        if days.is_empty() {
            warn!("backtest input has no bars");
        }
        info!(
            strategy = self.strategy.name(),
            days = days.len(),
            bars = sorted.len(),
            %tie_break,
            "running backtest"
        );

        let per_day: Vec<(SymbolPick, Vec<Trade>)> = days
            .par_iter()
            .map(|&(date, day_bars)| self.run_day(date, day_bars, tie_break))
            .collect();

        let (picks, trades): (Vec<SymbolPick>, Vec<Vec<Trade>>) = per_day.into_iter().unzip();
        let ledger = TradeLedger::new(trades.into_iter().flatten().collect());
        let picks = SymbolPickLog::new(picks);
        let summary = summarize(ledger.trades(), self.win_rule());

        info!(
            rows = ledger.len(),
            trades = summary.trades,
            net_pnl = summary.net_pnl,
            missing_days = picks.missing().count(),
            "backtest finished"
        );

        BacktestResult {
            tie_break,
            ledger,
            picks,
            summary,
        }
    }

    //runs the input with the given tie-break and again with the opposite one
    pub fn run_sensitivity(&self, bars: &[Bar], tie_break: TieBreak) -> SensitivityReport {
        let primary = self.run(bars, tie_break);
        let flipped = self.run(bars, tie_break.flipped());
        let differing_dates = differing_dates(&primary.ledger, &flipped.ledger);

        info!(
            differing = differing_dates.len(),
            "tie-break sensitivity computed"
        );

        SensitivityReport {
            primary,
            flipped,
            differing_dates,
        }
    }

    fn run_day(&self, date: NaiveDate, bars: &[Bar], tie_break: TieBreak) -> (SymbolPick, Vec<Trade>) {
        let symbol = self.resolver.resolve(date);
        let has_data = bars.iter().any(|b| b.symbol == symbol);

        let trades = if has_data {
            let day = TradingDay {
                date,
                symbol: &symbol,
                bars,
            };
            self.strategy.simulate_day(&day, tie_break)
        } else {
            vec![Trade::placeholder(symbol.clone(), date, TradeResult::NoData)]
        };

        let pick = SymbolPick {
            date,
            picked_symbol: symbol,
            has_data,
        };
        (pick, trades)
    }
}

//borrows the bars when already in (timestamp, symbol) order
fn sorted_bars(bars: &[Bar]) -> Cow<'_, [Bar]> {
    let in_order = bars
        .windows(2)
        .all(|w| (w[0].timestamp, &w[0].symbol) <= (w[1].timestamp, &w[1].symbol));
    if in_order {
        Cow::Borrowed(bars)
    } else {
        let mut owned = bars.to_vec();
        crate::data::loader::sort_bars(&mut owned);
        Cow::Owned(owned)
    }
}

//contiguous runs of sorted bars keyed by utc date
pub fn group_by_date(bars: &[Bar]) -> IndexMap<NaiveDate, &[Bar]> {
    bars.chunk_by(|a, b| a.date() == b.date())
        .map(|chunk| (chunk[0].date(), chunk))
        .collect()
}

//dates present in either ledger whose rows are not identical
pub fn differing_dates(a: &TradeLedger, b: &TradeLedger) -> Vec<NaiveDate> {
    let by_date = |ledger: &TradeLedger| {
        let mut map: IndexMap<NaiveDate, Vec<Trade>> = IndexMap::new();
        for t in ledger.trades() {
            map.entry(t.date).or_default().push(t.clone());
        }
        map
    };
    let left = by_date(a);
    let right = by_date(b);

    let mut dates: Vec<NaiveDate> = left.keys().chain(right.keys()).copied().collect();
    dates.sort();
    dates.dedup();
    dates
        .into_iter()
        .filter(|d| left.get(d) != right.get(d))
        .collect()
}
