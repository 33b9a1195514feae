pub mod backtest_config;
pub mod presets;

pub use backtest_config::{
    BacktestConfiguration, BreakoutParams, ConfigError, DataConfig, OutputConfig, ScaleInParams,
    SessionConfig, SizingPolicy, StopPolicy, StrategyParams, TargetBreakpoint, TargetPolicy,
};
pub use presets::Preset;
