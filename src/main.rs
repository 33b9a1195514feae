use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use orbit::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "orbit")]
#[command(about = "An intraday futures backtester for opening-range breakout and scale-in strategies", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //run a backtest
    Run {
        //path to a json configuration file
        #[arg(long, conflicts_with = "preset")]
        config: Option<PathBuf>,

        //named preset used when no config file is given
        #[arg(long)]
        preset: Option<String>,

        //path to csv data file (overrides the configuration)
        #[arg(long)]
        data: Option<PathBuf>,

        //bar tie-break: high_first or low_first (overrides the configuration)
        #[arg(long)]
        tie_break: Option<String>,

        //also run with the opposite tie-break and report the dates that change
        #[arg(long)]
        sensitivity: bool,

        //output options
        //output path for trades csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,

        //output path for the per-date symbol picks csv
        #[arg(long)]
        output_picks_csv: Option<PathBuf>,

        //output path for the kpi json
        #[arg(long)]
        output_kpis_json: Option<PathBuf>,

        //output path for the cumulative p&l csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,
    },

    //print the contract traded on a date
    Roll {
        //date as yyyy-mm-dd
        #[arg(long)]
        date: NaiveDate,

        //contract root
        #[arg(long, default_value = "NQ")]
        root: String,
    },

    //write a preset's configuration as json
    InitConfig {
        //preset name
        #[arg(long, default_value = "opr-30s-risk-band")]
        preset: String,

        //where to write the configuration
        #[arg(long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            preset,
            data,
            tie_break,
            sensitivity,
            output_trades_csv,
            output_picks_csv,
            output_kpis_json,
            output_equity_csv,
        } => {
            let mut configuration = load_configuration(config.as_deref(), preset.as_deref())?;

            if let Some(path) = data {
                configuration.data.path = path;
            }
            if let Some(tb) = tie_break {
                configuration.tie_break = TieBreak::parse(&tb)
                    .ok_or_else(|| anyhow::anyhow!("Unknown tie-break: {}", tb))?;
            }
            let outputs = &mut configuration.output;
            outputs.trades_csv = output_trades_csv.or(outputs.trades_csv.take());
            outputs.picks_csv = output_picks_csv.or(outputs.picks_csv.take());
            outputs.kpis_json = output_kpis_json.or(outputs.kpis_json.take());

            run_backtest(&configuration, sensitivity, output_equity_csv)?;
        }
        Commands::Roll { date, root } => {
            let resolver = RollResolver::new(root);
            println!("{} -> {}", date, resolver.resolve(date));
        }
        Commands::InitConfig { preset, output } => {
            let preset = parse_preset(&preset)?;
            preset
                .configuration()
                .to_json_file(&output)
                .with_context(|| format!("Failed to write config {:?}", output))?;
            println!("Wrote {} configuration to {:?}", preset.name(), output);
        }
    }

    Ok(())
}

fn parse_preset(name: &str) -> Result<Preset> {
    Preset::parse(name).ok_or_else(|| {
        let known: Vec<&str> = Preset::all().iter().map(|p| p.name()).collect();
        anyhow::anyhow!("Unknown preset: {} (known: {})", name, known.join(", "))
    })
}

fn load_configuration(config: Option<&Path>, preset: Option<&str>) -> Result<BacktestConfiguration> {
    match (config, preset) {
        (Some(path), _) => BacktestConfiguration::from_json_file(path),
        (None, Some(name)) => Ok(parse_preset(name)?.configuration()),
        (None, None) => Ok(BacktestConfiguration::default()),
    }
}

fn run_backtest(
    configuration: &BacktestConfiguration,
    sensitivity: bool,
    output_equity_csv: Option<PathBuf>,
) -> Result<()> {
    configuration
        .validate()
        .context("Invalid configuration")?;

    println!("Orbit Intraday Futures Backtester");
    println!("=================================\n");

    //load data
    let data_path = &configuration.data.path;
    let mut cache = BarCache::new();
    let bars = load_csv_cached(&mut cache, data_path, &configuration.data.load)
        .with_context(|| format!("Failed to load data from {:?}", data_path))?;

    if bars.is_empty() {
        anyhow::bail!(
            "No bars left in {:?} after filtering ({})",
            data_path,
            configuration.data.load.describe()
        );
    }

    println!("Loaded {} bars", bars.len());
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        println!("Date range: {} to {}\n", first.timestamp, last.timestamp);
    }

    println!(
        "Contract: {} (tick: {} = ${}, point value: ${})",
        configuration.contract.root,
        configuration.contract.tick_size,
        configuration.contract.tick_value(),
        configuration.contract.point_value
    );
    println!("Strategy: {}", configuration.strategy.name());
    println!("Slippage: {} tick(s)", configuration.slippage_ticks);
    println!("Tie-break: {}\n", configuration.tie_break);

    //run backtest
    let engine = BacktestEngine::new(configuration);
    let result = if sensitivity {
        let report = engine.run_sensitivity(&bars, configuration.tie_break);
        print_sensitivity(&report);
        report.primary
    } else {
        engine.run(&bars, configuration.tie_break)
    };

    //display results
    println!("Backtest Results ({})", result.tie_break);
    println!("================\n");
    result.summary.pretty_print_table(&configuration.name);

    //save outputs if requested
    let outputs = &configuration.output;
    if let Some(path) = &outputs.trades_csv {
        result
            .ledger
            .save_csv(path)
            .with_context(|| format!("Failed to write trades to {:?}", path))?;
        println!("\nTrades saved to {:?}", path);
    }

    if let Some(path) = &outputs.picks_csv {
        result
            .picks
            .save_csv(path)
            .with_context(|| format!("Failed to write picks to {:?}", path))?;
        println!("Symbol picks saved to {:?}", path);
    }

    if let Some(path) = &outputs.kpis_json {
        result
            .summary
            .to_json_file(path)
            .with_context(|| format!("Failed to write kpis to {:?}", path))?;
        println!("KPIs saved to {:?}", path);
    }

    if let Some(path) = output_equity_csv {
        let curve = calculate_equity_curve(result.ledger.real_trades());
        save_equity_csv(&curve, &path)?;
        println!("Equity curve saved to {:?}", path);
    }

    Ok(())
}

fn print_sensitivity(report: &SensitivityReport) {
    println!("Tie-break sensitivity");
    println!("=====================\n");
    report.primary.summary.pretty_print_table(&report.primary.tie_break.to_string());
    report.flipped.summary.pretty_print_table(&report.flipped.tie_break.to_string());

    println!(
        "\n{} date(s) change with the tie-break",
        report.differing_dates.len()
    );
    for date in &report.differing_dates {
        println!("  {}", date);
    }
    println!();
}

fn save_equity_csv(equity_curve: &[EquityPoint], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    for point in equity_curve {
        wtr.serialize(point)?;
    }
    wtr.flush()?;
    Ok(())
}
