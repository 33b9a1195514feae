use crate::config::backtest_config::{
    BacktestConfiguration, BreakoutParams, ScaleInParams, SessionConfig, SizingPolicy,
    StopPolicy, StrategyParams, TargetBreakpoint, TargetPolicy,
};
use crate::instrument::FuturesContract;
use chrono::NaiveTime;

//named starting points for the strategy variants that have been researched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    //30s opening range, fractional stop, nq/mnq risk band sizing
    Opr30sRiskBand,
    //30s opening range, stop at the opposite bound, 1r target, risk budget sizing
    Opr30s1R,
    //15m opening range, fixed 12 point r, 0.4r target, step sizing
    Opr15m1R,
    //15m opening range, fractional stop, doubled step sizing with a risk cap
    Opr15mStep,
    //15m supertrend scale-in, never cuts
    SuperTrendScaleIn,
}

impl Preset {
    pub fn all() -> [Preset; 5] {
        [
            Preset::Opr30sRiskBand,
            Preset::Opr30s1R,
            Preset::Opr15m1R,
            Preset::Opr15mStep,
            Preset::SuperTrendScaleIn,
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Opr30sRiskBand => "opr-30s-risk-band",
            Preset::Opr30s1R => "opr-30s-1r",
            Preset::Opr15m1R => "opr-15m-1r",
            Preset::Opr15mStep => "opr-15m-step",
            Preset::SuperTrendScaleIn => "supertrend-scale-in",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        Preset::all().into_iter().find(|p| p.name() == s)
    }

    pub fn configuration(&self) -> BacktestConfiguration {
        let base = BacktestConfiguration {
            name: self.name().to_string(),
            ..BacktestConfiguration::default()
        };

        match self {
            Preset::Opr30sRiskBand => BacktestConfiguration {
                strategy: StrategyParams::Breakout(BreakoutParams {
                    entry_buffer_ticks: 2,
                    stop: StopPolicy::FractionOfRange { multiplier: 0.5 },
                    min_stop_pts: None,
                    target: scaled_target(2.0, 4.0),
                    sizing: SizingPolicy::MixedRiskBand {
                        micro: FuturesContract::mnq(),
                        risk_min_usd: 1000.0,
                        risk_max_usd: 1500.0,
                        risk_target_usd: 1250.0,
                        max_standard: 7,
                        max_micro: 70,
                    },
                    risk_cap_usd: None,
                    max_trades_per_day: 1,
                }),
                ..base
            },
            Preset::Opr30s1R => BacktestConfiguration {
                strategy: StrategyParams::Breakout(BreakoutParams {
                    entry_buffer_ticks: 2,
                    stop: StopPolicy::OppositeBound,
                    min_stop_pts: Some(15.0),
                    target: TargetPolicy {
                        r_multiple: 1.0,
                        min_pts: None,
                        max_pts: None,
                        breakpoint: None,
                    },
                    sizing: SizingPolicy::RiskBudget {
                        risk_cap_usd: 2500.0,
                        min_contracts: 1,
                        max_contracts: 7,
                    },
                    risk_cap_usd: None,
                    max_trades_per_day: 1,
                }),
                ..base
            },
            Preset::Opr15m1R => BacktestConfiguration {
                session: fifteen_minute_session(),
                strategy: StrategyParams::Breakout(BreakoutParams {
                    entry_buffer_ticks: 2,
                    stop: StopPolicy::FixedPoints { points: 12.0 },
                    min_stop_pts: Some(6.0),
                    target: TargetPolicy {
                        r_multiple: 0.4,
                        min_pts: None,
                        max_pts: None,
                        breakpoint: None,
                    },
                    sizing: SizingPolicy::StepByStop {
                        breakpoint_pts: 40.0,
                        below: 2,
                        at_or_above: 1,
                    },
                    risk_cap_usd: Some(3000.0),
                    max_trades_per_day: 1,
                }),
                ..base
            },
            Preset::Opr15mStep => BacktestConfiguration {
                session: fifteen_minute_session(),
                strategy: StrategyParams::Breakout(BreakoutParams {
                    entry_buffer_ticks: 2,
                    stop: StopPolicy::FractionOfRange { multiplier: 0.5 },
                    min_stop_pts: Some(15.0),
                    target: scaled_target(2.5, 5.0),
                    sizing: SizingPolicy::StepByStop {
                        breakpoint_pts: 40.0,
                        below: 4,
                        at_or_above: 2,
                    },
                    risk_cap_usd: Some(3000.0),
                    max_trades_per_day: 1,
                }),
                ..base
            },
            Preset::SuperTrendScaleIn => {
                let mut config = BacktestConfiguration {
                    session: SessionConfig {
                        session_start: NaiveTime::default(),
                        opening_range_secs: 0,
                        flat_time: NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default(),
                    },
                    strategy: StrategyParams::ScaleIn(ScaleInParams::default()),
                    ..base
                };
                config.data.load.resample_minutes = Some(15);
                config
            }
        }
    }
}

//0.12r rounded to the tick, clamped, 5 points once the stop reaches 40
fn scaled_target(min_pts: f64, max_pts: f64) -> TargetPolicy {
    TargetPolicy {
        r_multiple: 0.12,
        min_pts: Some(min_pts),
        max_pts: Some(max_pts),
        breakpoint: Some(TargetBreakpoint {
            stop_at_least: 40.0,
            target_pts: 5.0,
        }),
    }
}

fn fifteen_minute_session() -> SessionConfig {
    SessionConfig {
        opening_range_secs: 15 * 60,
        ..SessionConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_preset_validates() {
        for preset in Preset::all() {
            let config = preset.configuration();
            assert_eq!(config.validate(), Ok(()), "{}", preset.name());
            assert_eq!(config.name, preset.name());
        }
    }

    #[test]
    fn test_parse_by_name() {
        assert_eq!(Preset::parse("OPR-30S-1R"), Some(Preset::Opr30s1R));
        assert_eq!(Preset::parse("unknown"), None);
    }

    #[test]
    fn test_scale_in_preset_resamples() {
        let config = Preset::SuperTrendScaleIn.configuration();
        assert_eq!(config.data.load.resample_minutes, Some(15));
    }
}
