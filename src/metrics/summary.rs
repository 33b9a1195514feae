use crate::metrics::timeseries::{calculate_equity_curve, max_drawdown};
use crate::portfolio::{Trade, TradeResult};
use indexmap::IndexMap;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeSet;

//reported in place of an infinite profit factor
pub const PROFIT_FACTOR_CAP: f64 = 999.99;

//what counts as a winning trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinRule {
    //only take-profit exits are wins
    TakeProfit,
    //any trade with positive p&l is a win (strategies that only exit at eod)
    PositivePnl,
}

impl WinRule {
    pub fn is_win(&self, trade: &Trade) -> bool {
        match self {
            WinRule::TakeProfit => trade.result == TradeResult::TakeProfit,
            WinRule::PositivePnl => trade.pnl_usd > 0.0,
        }
    }
}

//summary metrics for a ledger, over executed trades only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub net_pnl: f64,
    pub profit_factor: f64,
    pub expectancy: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_drawdown: f64,
    //distinct dates in the whole ledger, placeholders included
    pub days: usize,
}

fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

fn mean_or_zero(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or(values.mean(), 0.0)
}

impl KpiSummary {
    //win/loss counts follow the win rule, gross profit and loss follow the sign of p&l
    pub fn from_trades(trades: &[Trade], win_rule: WinRule) -> Self {
        let days = trades.iter().map(|t| t.date).collect::<BTreeSet<_>>().len();
        let real: Vec<&Trade> = trades.iter().filter(|t| t.is_real()).collect();

        let (wins, losses): (Vec<&Trade>, Vec<&Trade>) =
            real.iter().copied().partition(|t| win_rule.is_win(t));
        let win_pnl: Vec<f64> = wins.iter().map(|t| t.pnl_usd).collect();
        let loss_pnl: Vec<f64> = losses.iter().map(|t| t.pnl_usd).collect();

        let gross_profit: f64 = real.iter().map(|t| t.pnl_usd).filter(|p| *p > 0.0).sum();
        let gross_loss: f64 = real
            .iter()
            .map(|t| t.pnl_usd)
            .filter(|p| *p < 0.0)
            .map(f64::abs)
            .sum();
        let net_pnl: f64 = real.iter().map(|t| t.pnl_usd).sum();

        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            PROFIT_FACTOR_CAP
        } else {
            0.0
        };

        let count = real.len();
        let (win_rate, expectancy) = if count > 0 {
            (wins.len() as f64 / count as f64, net_pnl / count as f64)
        } else {
            (0.0, 0.0)
        };

        let curve = calculate_equity_curve(real.iter().copied());

        KpiSummary {
            trades: count,
            winning_trades: wins.len(),
            losing_trades: losses.len(),
            win_rate: finite_or(win_rate, 0.0),
            gross_profit: finite_or(gross_profit, 0.0),
            gross_loss: finite_or(gross_loss, 0.0),
            net_pnl: finite_or(net_pnl, 0.0),
            profit_factor: finite_or(profit_factor, PROFIT_FACTOR_CAP),
            expectancy: finite_or(expectancy, 0.0),
            avg_win: mean_or_zero(&win_pnl),
            avg_loss: mean_or_zero(&loss_pnl),
            max_drawdown: finite_or(max_drawdown(&curve), 0.0),
            days,
        }
    }

    //ordered key -> value view, also the kpi json layout
    pub fn to_pairs(&self) -> IndexMap<&'static str, f64> {
        let mut pairs = IndexMap::new();
        pairs.insert("trades", self.trades as f64);
        pairs.insert("winning_trades", self.winning_trades as f64);
        pairs.insert("losing_trades", self.losing_trades as f64);
        pairs.insert("win_rate", self.win_rate);
        pairs.insert("gross_profit", self.gross_profit);
        pairs.insert("gross_loss", self.gross_loss);
        pairs.insert("net_pnl_usd", self.net_pnl);
        pairs.insert("profit_factor", self.profit_factor);
        pairs.insert("expectancy_usd", self.expectancy);
        pairs.insert("avg_win_usd", self.avg_win);
        pairs.insert("avg_loss_usd", self.avg_loss);
        pairs.insert("max_dd_usd", self.max_drawdown);
        pairs.insert("days", self.days as f64);
        pairs
    }

    pub fn to_json_file<P: AsRef<std::path::Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.to_pairs())?;
        std::fs::write(path, json)?;
        Ok(())
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self, title: &str) {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new(title), Cell::new("Value")]));

        let rows = [
            ("Trades", format!("{}", self.trades)),
            (
                "Wins / Losses",
                format!("{} / {}", self.winning_trades, self.losing_trades),
            ),
            ("Win Rate", format!("{:.2}%", self.win_rate * 100.0)),
            ("Gross Profit", format!("${:.2}", self.gross_profit)),
            ("Gross Loss", format!("${:.2}", self.gross_loss)),
            ("Net P&L", format!("${:.2}", self.net_pnl)),
            ("Profit Factor", format!("{:.3}", self.profit_factor)),
            ("Expectancy", format!("${:.2}", self.expectancy)),
            ("Avg Win", format!("${:.2}", self.avg_win)),
            ("Avg Loss", format!("${:.2}", self.avg_loss)),
            ("Max Drawdown", format!("${:.2}", self.max_drawdown)),
            ("Days", format!("{}", self.days)),
        ];
        for (name, value) in rows {
            table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
        }

        table.printstd();
    }
}

//reduces a ledger to kpis
pub fn summarize(trades: &[Trade], win_rule: WinRule) -> KpiSummary {
    KpiSummary::from_trades(trades, win_rule)
}
