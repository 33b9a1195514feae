use crate::strategy::sma;
use std::collections::VecDeque;

//average true range as a simple rolling mean of the true range
#[derive(Debug, Clone)]
pub struct RollingAtr {
    period: usize,
    window: VecDeque<f64>,
    prev_close: Option<f64>,
}

impl RollingAtr {
    pub fn new(period: usize) -> Self {
        RollingAtr {
            period,
            window: VecDeque::with_capacity(period),
            prev_close: None,
        }
    }

    //true range, the first bar has no previous close and uses high - low
    pub fn true_range(&self, high: f64, low: f64) -> f64 {
        match self.prev_close {
            Some(pc) => (high - low).max((high - pc).abs()).max((low - pc).abs()),
            None => high - low,
        }
    }

    //returns the atr once `period` true ranges have been seen
    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let tr = self.true_range(high, low);
        self.prev_close = Some(close);

        if self.window.len() >= self.period {
            self.window.pop_front();
        }
        self.window.push_back(tr);

        if self.window.len() < self.period {
            return None;
        }
        let values: Vec<f64> = self.window.iter().copied().collect();
        sma(&values)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Bands {
    upper: f64,
    lower: f64,
    //true while the line follows the upper band (downtrend)
    on_upper: bool,
}

//supertrend line over hl2 +/- multiplier * atr with ratcheting final bands
//the first value is produced at bar index `period`, one bar after the atr warms up
#[derive(Debug, Clone)]
pub struct SuperTrend {
    period: usize,
    multiplier: f64,
    atr: RollingAtr,
    index: usize,
    prev_close: Option<f64>,
    bands: Option<Bands>,
}

impl SuperTrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        SuperTrend {
            period,
            multiplier,
            atr: RollingAtr::new(period),
            index: 0,
            prev_close: None,
            bands: None,
        }
    }

    pub fn update(&mut self, high: f64, low: f64, close: f64) -> Option<f64> {
        let atr = self.atr.update(high, low, close);
        let index = self.index;
        self.index += 1;
        let prev_close = self.prev_close.replace(close);

        let atr = match atr {
            Some(v) if index >= self.period => v,
            _ => return None,
        };

        let hl2 = (high + low) / 2.0;
        let basic_upper = hl2 + self.multiplier * atr;
        let basic_lower = hl2 - self.multiplier * atr;

        let next = match (self.bands, prev_close) {
            (Some(prev), Some(pc)) => {
                let upper = if basic_upper < prev.upper || pc > prev.upper {
                    basic_upper
                } else {
                    prev.upper
                };
                let lower = if basic_lower > prev.lower || pc < prev.lower {
                    basic_lower
                } else {
                    prev.lower
                };
                //side comes from the previous state, so upper == lower (zero atr) keeps the side
                let on_upper = if prev.on_upper {
                    close <= upper
                } else {
                    close < lower
                };
                Bands {
                    upper,
                    lower,
                    on_upper,
                }
            }
            //seeded on the lower band
            _ => Bands {
                upper: basic_upper,
                lower: basic_lower,
                on_upper: false,
            },
        };
        self.bands = Some(next);

        Some(if next.on_upper { next.upper } else { next.lower })
    }
}

//supertrend values for a run of (high, low, close) bars
pub fn supertrend_series(bars: &[(f64, f64, f64)], period: usize, multiplier: f64) -> Vec<Option<f64>> {
    let mut st = SuperTrend::new(period, multiplier);
    bars.iter().map(|&(h, l, c)| st.update(h, l, c)).collect()
}

//true at i when close crosses from at-or-below the line to above it
pub fn cross_above(closes: &[f64], line: &[Option<f64>]) -> Vec<bool> {
    (0..closes.len())
        .map(|i| {
            if i == 0 {
                return false;
            }
            match (line[i - 1], line.get(i).copied().flatten()) {
                (Some(prev_line), Some(cur_line)) => {
                    closes[i - 1] <= prev_line && closes[i] > cur_line
                }
                _ => false,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atr_is_simple_mean_of_true_range() {
        let mut atr = RollingAtr::new(3);
        assert_eq!(atr.update(10.0, 8.0, 9.0), None);
        //prev close 9, high 12 -> tr 3
        assert_eq!(atr.update(12.0, 10.0, 11.0), None);
        //prev close 11, low 9 -> tr 2
        assert_eq!(atr.update(11.0, 9.0, 10.0), Some((2.0 + 3.0 + 2.0) / 3.0));
        //window drops the first tr
        assert_eq!(atr.update(11.0, 10.0, 10.5), Some((3.0 + 2.0 + 1.0) / 3.0));
    }

    #[test]
    fn test_supertrend_starts_at_period_on_lower_band() {
        let bars: Vec<(f64, f64, f64)> = (0..6).map(|_| (101.0, 99.0, 100.0)).collect();
        let st = supertrend_series(&bars, 3, 1.0);
        assert!(st[..3].iter().all(|v| v.is_none()));
        //hl2 100, atr 2 -> lower band 98, stays put on flat data
        assert_eq!(st[3], Some(98.0));
        assert_eq!(st[5], Some(98.0));
    }

    #[test]
    fn test_supertrend_flips_to_upper_band_on_break_down() {
        let mut bars: Vec<(f64, f64, f64)> = (0..5).map(|_| (101.0, 99.0, 100.0)).collect();
        bars.push((91.0, 89.0, 90.0));
        let st = supertrend_series(&bars, 3, 1.0);
        let last = st[5].unwrap();
        assert!(last > 90.0, "line should sit above price after a break down, got {last}");
    }

    #[test]
    fn test_supertrend_zero_atr_keeps_lower_side() {
        //upper and lower bands coincide when every bar is a single price
        let bars: Vec<(f64, f64, f64)> = (0..6).map(|_| (100.0, 100.0, 100.0)).collect();
        let st = supertrend_series(&bars, 3, 3.0);
        assert_eq!(st[3], Some(100.0));
        assert_eq!(st[4], Some(100.0));
        assert_eq!(st[5], Some(100.0));

        let mut state = SuperTrend::new(3, 3.0);
        for &(h, l, c) in &bars {
            state.update(h, l, c);
        }
        assert!(state.bands.is_some_and(|b| !b.on_upper && b.upper == b.lower));
    }

    #[test]
    fn test_cross_above_needs_prior_line() {
        let closes = [100.0, 97.0, 99.0, 96.0];
        let line = [None, Some(98.0), Some(98.0), Some(98.0)];
        assert_eq!(cross_above(&closes, &line), vec![false, false, true, false]);
    }
}
