use crate::data::Bar;
use serde::{Deserialize, Serialize};
use std::fmt;

//which extreme a bar reached first when it spans both levels
//ohlc bars carry no intrabar path, so this is a modelling assumption
//and is exposed so results can be re-run with the opposite choice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    #[default]
    HighFirst,
    LowFirst,
}

impl TieBreak {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "high_first" | "high" => Some(TieBreak::HighFirst),
            "low_first" | "low" => Some(TieBreak::LowFirst),
            _ => None,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            TieBreak::HighFirst => TieBreak::LowFirst,
            TieBreak::LowFirst => TieBreak::HighFirst,
        }
    }
}

impl fmt::Display for TieBreak {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TieBreak::HighFirst => write!(f, "high_first"),
            TieBreak::LowFirst => write!(f, "low_first"),
        }
    }
}

//outcome of checking one bar against an upper and a lower level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Touch {
    High,
    Low,
    Neither,
}

//decides which level a bar touched first
//the upper level is touched when high >= level, the lower when low <= level
pub fn first_touch(bar: &Bar, level_high: f64, level_low: f64, tie_break: TieBreak) -> Touch {
    let hit_high = bar.high >= level_high;
    let hit_low = bar.low <= level_low;

    match (hit_high, hit_low) {
        (true, true) => match tie_break {
            TieBreak::HighFirst => Touch::High,
            TieBreak::LowFirst => Touch::Low,
        },
        (true, false) => Touch::High,
        (false, true) => Touch::Low,
        (false, false) => Touch::Neither,
    }
}

//fill price for a stop-style order at a touched level
//price ran through the level, so upper fills slip up and lower fills slip down
pub fn fill_price(level: f64, touch: Touch, slippage_pts: f64) -> f64 {
    match touch {
        Touch::High => level + slippage_pts,
        Touch::Low => level - slippage_pts,
        Touch::Neither => level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar(high: f64, low: f64) -> Bar {
        Bar::new_unchecked(
            Utc.with_ymd_and_hms(2024, 3, 14, 13, 31, 0).unwrap(),
            low,
            high,
            low,
            high,
            None,
            "NQM4",
        )
    }

    #[test]
    fn test_both_touched_follows_tie_break() {
        let b = bar(105.0, 95.0);
        assert_eq!(first_touch(&b, 104.0, 96.0, TieBreak::HighFirst), Touch::High);
        assert_eq!(first_touch(&b, 104.0, 96.0, TieBreak::LowFirst), Touch::Low);
    }

    #[test]
    fn test_single_side_ignores_tie_break() {
        let b = bar(105.0, 97.0);
        for tb in [TieBreak::HighFirst, TieBreak::LowFirst] {
            assert_eq!(first_touch(&b, 104.0, 96.0, tb), Touch::High);
            assert_eq!(first_touch(&b, 106.0, 97.0, tb), Touch::Low);
            assert_eq!(first_touch(&b, 106.0, 96.0, tb), Touch::Neither);
        }
    }

    #[test]
    fn test_exact_level_counts_as_touch() {
        let b = bar(104.0, 96.0);
        assert_eq!(first_touch(&b, 104.0, 90.0, TieBreak::LowFirst), Touch::High);
        assert_eq!(first_touch(&b, 110.0, 96.0, TieBreak::HighFirst), Touch::Low);
    }

    #[test]
    fn test_fill_price_slips_through_level() {
        assert_eq!(fill_price(100.0, Touch::High, 0.25), 100.25);
        assert_eq!(fill_price(100.0, Touch::Low, 0.25), 99.75);
        assert_eq!(fill_price(100.0, Touch::Neither, 0.25), 100.0);
    }

    #[test]
    fn test_tie_break_parse_and_flip() {
        assert_eq!(TieBreak::parse("low-first"), Some(TieBreak::LowFirst));
        assert_eq!(TieBreak::parse("HIGH_FIRST"), Some(TieBreak::HighFirst));
        assert_eq!(TieBreak::parse("sideways"), None);
        assert_eq!(TieBreak::HighFirst.flipped(), TieBreak::LowFirst);
        assert_eq!(TieBreak::LowFirst.to_string(), "low_first");
    }
}
