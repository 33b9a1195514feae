use crate::config::{BreakoutParams, SizingPolicy, StopPolicy, TargetPolicy};
use crate::instrument::FuturesContract;
use crate::portfolio::TradeResult;

//entry triggers, exit distances and sizing for one day
#[derive(Debug, Clone, PartialEq)]
pub struct PositionLevels {
    pub trigger_high: f64,
    pub trigger_low: f64,
    pub stop_pts: f64,
    pub target_pts: f64,
    pub contracts: u32,
    pub micro_contracts: u32,
    pub size_label: String,
    pub risk_usd: f64,
    //p&l per point across the whole mix
    pub dollars_per_point: f64,
    //round-trip commission across the whole mix
    pub commission_usd: f64,
}

//why a day was skipped before any scan, with whatever was computed
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub result: TradeResult,
    pub stop_pts: f64,
    pub target_pts: f64,
    pub risk_usd: f64,
}

#[derive(Debug, Clone, PartialEq)]
struct Sizing {
    contracts: u32,
    micro_contracts: u32,
    risk_usd: f64,
    dollars_per_point: f64,
    commission_usd: f64,
    label: String,
}

//turns an opening range into tradable levels
pub struct LevelCalculator<'a> {
    params: &'a BreakoutParams,
    contract: &'a FuturesContract,
    slippage_pts: f64,
}

impl<'a> LevelCalculator<'a> {
    pub fn new(params: &'a BreakoutParams, contract: &'a FuturesContract, slippage_pts: f64) -> Self {
        LevelCalculator {
            params,
            contract,
            slippage_pts,
        }
    }

    pub fn entry_buffer_pts(&self) -> f64 {
        self.contract
            .ticks_to_points(f64::from(self.params.entry_buffer_ticks))
    }

    pub fn stop_distance(&self, or_high: f64, or_low: f64) -> f64 {
        let range = or_high - or_low;
        match self.params.stop {
            StopPolicy::FractionOfRange { multiplier } => range * multiplier,
            StopPolicy::FixedPoints { points } => points,
            //entry sits buffer + slippage beyond one bound, the stop at the other
            StopPolicy::OppositeBound => range + self.entry_buffer_pts() + self.slippage_pts,
        }
    }

    pub fn target_distance(&self, stop_pts: f64) -> f64 {
        target_distance(&self.params.target, stop_pts, self.contract.tick_size)
    }

    pub fn compute(&self, or_high: f64, or_low: f64) -> Result<PositionLevels, Rejection> {
        let stop_pts = self.stop_distance(or_high, or_low);
        let target_pts = self.target_distance(stop_pts);
        let reject = |result, risk_usd| Rejection {
            result,
            stop_pts,
            target_pts,
            risk_usd,
        };

        let too_small = match self.params.min_stop_pts {
            Some(min) => stop_pts < min,
            None => false,
        };
        if too_small || !(stop_pts > 0.0) {
            return Err(reject(TradeResult::SkipSmallStop, 0.0));
        }

        let sizing = self.size(stop_pts).map_err(|result| reject(result, 0.0))?;

        if let Some(cap) = self.params.risk_cap_usd {
            if sizing.risk_usd > cap {
                return Err(reject(TradeResult::SkipRiskCap, sizing.risk_usd));
            }
        }

        let buffer = self.entry_buffer_pts();
        Ok(PositionLevels {
            trigger_high: or_high + buffer,
            trigger_low: or_low - buffer,
            stop_pts,
            target_pts,
            contracts: sizing.contracts,
            micro_contracts: sizing.micro_contracts,
            size_label: sizing.label,
            risk_usd: sizing.risk_usd,
            dollars_per_point: sizing.dollars_per_point,
            commission_usd: sizing.commission_usd,
        })
    }

    fn size(&self, stop_pts: f64) -> Result<Sizing, TradeResult> {
        let contract = self.contract;
        let standard_only = |n: u32| Sizing {
            contracts: n,
            micro_contracts: 0,
            risk_usd: contract.risk_usd(stop_pts, n),
            dollars_per_point: contract.point_value * f64::from(n),
            commission_usd: contract.commission_rt * f64::from(n),
            label: format!("{}={}", contract.root, n),
        };

        match &self.params.sizing {
            SizingPolicy::Fixed { contracts } => Ok(standard_only(*contracts)),
            SizingPolicy::StepByStop {
                breakpoint_pts,
                below,
                at_or_above,
            } => {
                let n = if stop_pts < *breakpoint_pts {
                    *below
                } else {
                    *at_or_above
                };
                if n == 0 {
                    return Err(TradeResult::SkipSmallStop);
                }
                Ok(standard_only(n))
            }
            SizingPolicy::RiskBudget {
                risk_cap_usd,
                min_contracts,
                max_contracts,
            } => {
                let per_contract = stop_pts * contract.point_value;
                let fit = (risk_cap_usd / per_contract).floor();
                let n = if fit.is_finite() && fit > 0.0 {
                    (fit.min(f64::from(u32::MAX)) as u32)
                        .max(*min_contracts)
                        .min(*max_contracts)
                } else {
                    *min_contracts
                };
                let sized = standard_only(n);
                //the minimum can push risk above the cap, which skips the day rather than forcing one contract
                if n == 0 || sized.risk_usd > *risk_cap_usd {
                    return Err(TradeResult::SkipRiskCap);
                }
                Ok(sized)
            }
            SizingPolicy::MixedRiskBand {
                micro,
                risk_min_usd,
                risk_max_usd,
                risk_target_usd,
                max_standard,
                max_micro,
            } => {
                let band = RiskBand {
                    min: *risk_min_usd,
                    max: *risk_max_usd,
                    target: *risk_target_usd,
                    max_standard: *max_standard,
                    max_micro: *max_micro,
                };
                let (n, m, risk) = band_mix(stop_pts, contract.point_value, micro.point_value, &band)
                    .ok_or(TradeResult::SkipRiskBand)?;
                Ok(Sizing {
                    contracts: n,
                    micro_contracts: m,
                    risk_usd: risk,
                    dollars_per_point: contract.point_value * f64::from(n)
                        + micro.point_value * f64::from(m),
                    commission_usd: contract.commission_rt * f64::from(n)
                        + micro.commission_rt * f64::from(m),
                    label: format!("{}={};{}={}", contract.root, n, micro.root, m),
                })
            }
        }
    }
}

//target distance for a stop distance
pub fn target_distance(policy: &TargetPolicy, stop_pts: f64, tick_size: f64) -> f64 {
    if let Some(bp) = &policy.breakpoint {
        if stop_pts >= bp.stop_at_least {
            return bp.target_pts;
        }
    }

    let mut target = crate::instrument::round_to_tick(policy.r_multiple * stop_pts, tick_size);
    match policy.min_pts {
        Some(min) => target = target.max(min),
        None => target = target.max(tick_size),
    }
    if let Some(max) = policy.max_pts {
        target = target.min(max);
    }
    target
}

#[derive(Debug, Clone)]
struct RiskBand {
    min: f64,
    max: f64,
    target: f64,
    max_standard: u32,
    max_micro: u32,
}

//standard/micro mix whose risk lands inside the band, closest to the target
//ties keep the smaller standard count, then the smaller micro count
fn band_mix(stop_pts: f64, standard_pv: f64, micro_pv: f64, band: &RiskBand) -> Option<(u32, u32, f64)> {
    if !(stop_pts > 0.0) {
        return None;
    }
    let per_standard = stop_pts * standard_pv;
    let per_micro = stop_pts * micro_pv;

    let fit_standard = (band.max / per_standard).floor();
    let max_standard = if fit_standard.is_finite() && fit_standard >= 0.0 {
        band.max_standard.min(fit_standard.min(f64::from(u32::MAX)) as u32)
    } else {
        band.max_standard
    };

    let mut best: Option<(f64, (u32, u32, f64))> = None;
    for n in 0..=max_standard {
        let standard_risk = per_standard * f64::from(n);
        if standard_risk > band.max {
            continue;
        }

        let need_min = (band.min - standard_risk).max(0.0);
        let room_max = (band.max - standard_risk).max(0.0);
        let m_lo = (need_min / per_micro).ceil();
        let m_hi = (room_max / per_micro).floor().min(f64::from(band.max_micro));
        if !(m_lo.is_finite() && m_hi.is_finite()) || m_lo > m_hi {
            continue;
        }

        //risk is linear in m, so the best m is next to the target
        let ideal = ((band.target - standard_risk) / per_micro).clamp(m_lo, m_hi);
        let mut candidates = [m_lo, ideal.floor(), ideal.ceil(), m_hi]
            .map(|m| m.clamp(m_lo, m_hi) as u32);
        candidates.sort_unstable();

        for m in candidates {
            let risk = standard_risk + per_micro * f64::from(m);
            if risk < band.min || risk > band.max {
                continue;
            }
            let dist = (risk - band.target).abs();
            let better = match &best {
                None => true,
                Some((d, _)) => dist < *d,
            };
            if better {
                best = Some((dist, (n, m, risk)));
            }
        }
    }

    best.map(|(_, mix)| mix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TargetBreakpoint;

    fn params(stop: StopPolicy, sizing: SizingPolicy) -> BreakoutParams {
        BreakoutParams {
            stop,
            sizing,
            ..BreakoutParams::default()
        }
    }

    fn scaled() -> TargetPolicy {
        TargetPolicy {
            r_multiple: 0.12,
            min_pts: Some(2.0),
            max_pts: Some(4.0),
            breakpoint: Some(TargetBreakpoint {
                stop_at_least: 40.0,
                target_pts: 5.0,
            }),
        }
    }

    #[test]
    fn test_scaled_target_rounds_clamps_and_breaks() {
        let t = scaled();
        assert_eq!(target_distance(&t, 10.0, 0.25), 2.0);
        assert_eq!(target_distance(&t, 25.0, 0.25), 3.0);
        assert_eq!(target_distance(&t, 39.0, 0.25), 4.0);
        assert_eq!(target_distance(&t, 40.0, 0.25), 5.0);
    }

    #[test]
    fn test_unclamped_target_floors_at_one_tick() {
        let t = TargetPolicy {
            r_multiple: 0.01,
            min_pts: None,
            max_pts: None,
            breakpoint: None,
        };
        assert_eq!(target_distance(&t, 5.0, 0.25), 0.25);
    }

    #[test]
    fn test_fraction_stop_and_triggers() {
        let contract = FuturesContract::nq();
        let p = params(
            StopPolicy::FractionOfRange { multiplier: 0.5 },
            SizingPolicy::Fixed { contracts: 2 },
        );
        let levels = LevelCalculator::new(&p, &contract, 0.0)
            .compute(110.0, 100.0)
            .unwrap();
        assert_eq!(levels.trigger_high, 110.5);
        assert_eq!(levels.trigger_low, 99.5);
        assert_eq!(levels.stop_pts, 5.0);
        assert_eq!(levels.target_pts, 5.0);
        assert_eq!(levels.risk_usd, 200.0);
        assert_eq!(levels.dollars_per_point, 40.0);
        assert_eq!(levels.size_label, "NQ=2");
    }

    #[test]
    fn test_opposite_bound_includes_buffer_and_slippage() {
        let contract = FuturesContract::nq();
        let p = params(StopPolicy::OppositeBound, SizingPolicy::Fixed { contracts: 1 });
        let calc = LevelCalculator::new(&p, &contract, 0.25);
        assert_eq!(calc.stop_distance(120.0, 100.0), 20.75);
    }

    #[test]
    fn test_small_stop_is_skipped() {
        let contract = FuturesContract::nq();
        let mut p = params(
            StopPolicy::FractionOfRange { multiplier: 0.5 },
            SizingPolicy::Fixed { contracts: 1 },
        );
        p.min_stop_pts = Some(15.0);
        let rej = LevelCalculator::new(&p, &contract, 0.0)
            .compute(120.0, 100.0)
            .unwrap_err();
        assert_eq!(rej.result, TradeResult::SkipSmallStop);
        assert_eq!(rej.stop_pts, 10.0);
    }

    #[test]
    fn test_step_sizing_and_risk_cap() {
        let contract = FuturesContract::nq();
        let mut p = params(
            StopPolicy::FractionOfRange { multiplier: 0.5 },
            SizingPolicy::StepByStop {
                breakpoint_pts: 40.0,
                below: 4,
                at_or_above: 2,
            },
        );
        p.risk_cap_usd = Some(3000.0);
        let calc = LevelCalculator::new(&p, &contract, 0.0);

        //stop 30 -> 4 contracts -> 2400
        let levels = calc.compute(160.0, 100.0).unwrap();
        assert_eq!(levels.contracts, 4);
        assert_eq!(levels.risk_usd, 2400.0);

        //stop 45 -> 2 contracts -> 1800
        assert_eq!(calc.compute(190.0, 100.0).unwrap().contracts, 2);

        //stop 38 -> 4 contracts -> 3040 > 3000
        let rej = calc.compute(176.0, 100.0).unwrap_err();
        assert_eq!(rej.result, TradeResult::SkipRiskCap);
        assert_eq!(rej.risk_usd, 3040.0);
    }

    #[test]
    fn test_risk_budget_clamps_and_skips_above_cap() {
        let contract = FuturesContract::nq();
        let p = params(
            StopPolicy::FixedPoints { points: 20.0 },
            SizingPolicy::RiskBudget {
                risk_cap_usd: 2500.0,
                min_contracts: 1,
                max_contracts: 7,
            },
        );
        //400 per contract -> floor(6.25) = 6
        let levels = LevelCalculator::new(&p, &contract, 0.0)
            .compute(101.0, 100.0)
            .unwrap();
        assert_eq!(levels.contracts, 6);

        let wide = params(
            StopPolicy::FixedPoints { points: 200.0 },
            SizingPolicy::RiskBudget {
                risk_cap_usd: 2500.0,
                min_contracts: 1,
                max_contracts: 7,
            },
        );
        let rej = LevelCalculator::new(&wide, &contract, 0.0)
            .compute(101.0, 100.0)
            .unwrap_err();
        assert_eq!(rej.result, TradeResult::SkipRiskCap);
    }

    #[test]
    fn test_band_mix_lands_in_band_near_target() {
        let band = RiskBand {
            min: 1000.0,
            max: 1500.0,
            target: 1250.0,
            max_standard: 7,
            max_micro: 70,
        };
        //stop 10: nq 200, mnq 20 -> 6 nq + 2 mnq = 1240 or 5 nq + 13 mnq = 1260 etc
        let (n, m, risk) = band_mix(10.0, 20.0, 2.0, &band).unwrap();
        assert!((1000.0..=1500.0).contains(&risk));
        assert!((risk - 1250.0).abs() <= 10.0);
        assert_eq!(risk, 200.0 * f64::from(n) + 20.0 * f64::from(m));

        //stop 300: one nq is 6000, 70 mnq are 42000 but even one mnq is 600
        let (n, m, risk) = band_mix(300.0, 20.0, 2.0, &band).unwrap();
        assert_eq!((n, m), (0, 2));
        assert_eq!(risk, 1200.0);

        //stop 800: one mnq is 1600, nothing fits
        assert!(band_mix(800.0, 20.0, 2.0, &band).is_none());
    }

    #[test]
    fn test_mixed_band_sizing_reports_label() {
        let contract = FuturesContract::nq();
        let p = params(
            StopPolicy::FixedPoints { points: 800.0 },
            SizingPolicy::MixedRiskBand {
                micro: FuturesContract::mnq(),
                risk_min_usd: 1000.0,
                risk_max_usd: 1500.0,
                risk_target_usd: 1250.0,
                max_standard: 7,
                max_micro: 70,
            },
        );
        let rej = LevelCalculator::new(&p, &contract, 0.0)
            .compute(101.0, 100.0)
            .unwrap_err();
        assert_eq!(rej.result, TradeResult::SkipRiskBand);

        let p = params(
            StopPolicy::FixedPoints { points: 300.0 },
            p.sizing.clone(),
        );
        let levels = LevelCalculator::new(&p, &contract, 0.0)
            .compute(101.0, 100.0)
            .unwrap();
        assert_eq!(levels.size_label, "NQ=0;MNQ=2");
        assert_eq!(levels.dollars_per_point, 4.0);
    }
}
