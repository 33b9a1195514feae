use crate::engine::execution::Touch;
use crate::portfolio::trade::{Direction, Trade, TradeResult};
use crate::strategy::levels::PositionLevels;
use chrono::{DateTime, Utc};

//an open breakout position, at most one exists per day at any time
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub direction: Direction,
    pub entry_price: f64,
    pub entry_time: DateTime<Utc>,
    pub target_price: f64,
    pub stop_price: f64,
}

impl OpenPosition {
    //opens a position and places target and stop around the fill
    pub fn open(
        direction: Direction,
        entry_price: f64,
        entry_time: DateTime<Utc>,
        levels: &PositionLevels,
    ) -> Self {
        let sign = direction.sign();
        OpenPosition {
            direction,
            entry_price,
            entry_time,
            target_price: entry_price + sign * levels.target_pts,
            stop_price: entry_price - sign * levels.stop_pts,
        }
    }

    //returns (upper, lower) exit levels
    pub fn exit_levels(&self) -> (f64, f64) {
        match self.direction {
            Direction::Short => (self.stop_price, self.target_price),
            _ => (self.target_price, self.stop_price),
        }
    }

    //maps the touched exit level to an outcome
    pub fn classify(&self, touch: Touch) -> Option<TradeResult> {
        match (self.direction, touch) {
            (_, Touch::Neither) | (Direction::Flat, _) => None,
            (Direction::Long, Touch::High) | (Direction::Short, Touch::Low) => {
                Some(TradeResult::TakeProfit)
            }
            (Direction::Long, Touch::Low) | (Direction::Short, Touch::High) => {
                Some(TradeResult::StopLoss)
            }
        }
    }

    //points gained per contract at an exit price
    pub fn points_to(&self, exit_price: f64) -> f64 {
        self.direction.sign() * (exit_price - self.entry_price)
    }

    //closes into a ledger row built on top of the day's template row
    pub fn close(
        self,
        template: &Trade,
        levels: &PositionLevels,
        exit_price: f64,
        exit_time: DateTime<Utc>,
        result: TradeResult,
    ) -> Trade {
        let points = self.points_to(exit_price);
        Trade {
            entry_time: Some(self.entry_time),
            exit_time: Some(exit_time),
            direction: self.direction,
            entry: Some(self.entry_price),
            target: Some(self.target_price),
            stop: Some(self.stop_price),
            exit: Some(exit_price),
            result,
            points,
            pnl_usd: points * levels.dollars_per_point - levels.commission_usd,
            ..template.clone()
        }
    }
}
