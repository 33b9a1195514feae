use crate::portfolio::Trade;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

//a point in the cumulative p&l curve, one per executed trade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub exit_time: Option<DateTime<Utc>>,
    pub pnl_usd: f64,
    pub cumulative_pnl: f64,
    //cumulative p&l minus its running max, never positive
    pub drawdown: f64,
}

//calculates the cumulative p&l curve with drawdowns, in ledger order
pub fn calculate_equity_curve<'a, I>(trades: I) -> Vec<EquityPoint>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let mut curve = Vec::new();
    let mut cumulative = 0.0;
    let mut peak = f64::NEG_INFINITY;

    for trade in trades {
        cumulative += trade.pnl_usd;

        //update peak
        if cumulative > peak {
            peak = cumulative;
        }

        curve.push(EquityPoint {
            date: trade.date,
            exit_time: trade.exit_time,
            pnl_usd: trade.pnl_usd,
            cumulative_pnl: cumulative,
            drawdown: cumulative - peak,
        });
    }

    curve
}

//calculates maximum drawdown from the curve (a non-positive dollar amount)
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    equity_curve
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0, f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portfolio::TradeResult;

    fn trade(pnl: f64) -> Trade {
        let mut t = Trade::placeholder(
            "NQH4",
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            TradeResult::EndOfDay,
        );
        t.pnl_usd = pnl;
        t
    }

    #[test]
    fn test_drawdown_measured_from_running_max() {
        let trades: Vec<Trade> = [100.0, -50.0, -70.0, 200.0, -10.0]
            .into_iter()
            .map(trade)
            .collect();
        let curve = calculate_equity_curve(&trades);
        let cum: Vec<f64> = curve.iter().map(|p| p.cumulative_pnl).collect();
        assert_eq!(cum, vec![100.0, 50.0, -20.0, 180.0, 170.0]);
        assert_eq!(max_drawdown(&curve), -120.0);
    }

    #[test]
    fn test_first_loss_is_its_own_peak() {
        let trades = vec![trade(-30.0), trade(-20.0)];
        let curve = calculate_equity_curve(&trades);
        assert_eq!(curve[0].drawdown, 0.0);
        assert_eq!(max_drawdown(&curve), -20.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }
}
