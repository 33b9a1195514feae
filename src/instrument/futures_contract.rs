use serde::{Deserialize, Serialize};

//represents a futures contract family specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FuturesContract {
    //root symbol the roll resolver prefixes (eg nq, es)
    pub root: String,

    //minimum price fluctuation
    pub tick_size: f64,

    //dollar value of one full point move
    pub point_value: f64,

    //round-trip commission per contract
    #[serde(default)]
    pub commission_rt: f64,
}

impl FuturesContract {
    pub fn new(root: impl Into<String>, tick_size: f64, point_value: f64, commission_rt: f64) -> Self {
        FuturesContract {
            root: root.into(),
            tick_size,
            point_value,
            commission_rt,
        }
    }

    //dollar value of one tick
    pub fn tick_value(&self) -> f64 {
        self.tick_size * self.point_value
    }

    //converts a tick count to price points
    pub fn ticks_to_points(&self, ticks: f64) -> f64 {
        ticks * self.tick_size
    }

    //dollar risk of a stop distance for a number of contracts
    pub fn risk_usd(&self, stop_pts: f64, contracts: u32) -> f64 {
        stop_pts * self.point_value * f64::from(contracts)
    }

    //helper to create an e-mini nasdaq-100 contract
    pub fn nq() -> Self {
        FuturesContract::new("NQ", 0.25, 20.0, 0.0)
    }

    //helper to create a micro e-mini nasdaq-100 contract
    pub fn mnq() -> Self {
        FuturesContract::new("MNQ", 0.25, 2.0, 0.0)
    }
}

impl Default for FuturesContract {
    fn default() -> Self {
        FuturesContract::nq()
    }
}

//rounds a price distance to the nearest tick, ties to even
pub fn round_to_tick(value: f64, tick: f64) -> f64 {
    if tick <= 0.0 {
        return value;
    }
    (value / tick).round_ties_even() * tick
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_helpers() {
        let nq = FuturesContract::nq();
        assert_eq!(nq.tick_value(), 5.0);
        assert_eq!(nq.ticks_to_points(2.0), 0.5);
        assert_eq!(nq.risk_usd(10.0, 3), 600.0);
    }

    #[test]
    fn test_round_to_tick_ties_to_even() {
        assert_eq!(round_to_tick(1.2, 0.25), 1.25);
        //0.125 / 0.25 = 0.5 exactly, rounds to the even tick count 0
        assert_eq!(round_to_tick(0.125, 0.25), 0.0);
        assert_eq!(round_to_tick(0.375, 0.25), 0.5);
        assert_eq!(round_to_tick(3.3, 0.0), 3.3);
    }
}
