extern crate clap;

use cfspeed::cloudflare::client::{AddressFamily, Client};
use cfspeed::cloudflare::tests::engine::{
    SizingStrategy, TestConfig, TestDirections, TestEngine,
};
use cfspeed::errors::{exit_codes, format_error_for_display};
use cfspeed::results::{text_report, SpeedTestResults};
use clap::{Parser, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colored::Colorize;
use log::{info, warn};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    Both,
    Down,
    Up,
}

impl From<DirectionArg> for TestDirections {
    fn from(arg: DirectionArg) -> Self {
        match arg {
            DirectionArg::Both => TestDirections::Both,
            DirectionArg::Down => TestDirections::Download,
            DirectionArg::Up => TestDirections::Upload,
        }
    }
}

/// Measure latency and throughput against speed.cloudflare.com.
#[derive(Parser)]
#[command(author, version = env!("CFSPEED_VERSION"), about, long_about = None)]
struct Cli {
    /// Measure over IPv4 (combine with -6 to measure both)
    #[arg(short = '4', long = "ip4")]
    ipv4: bool,

    /// Measure over IPv6 (combine with -4 to measure both)
    #[arg(short = '6', long = "ip6")]
    ipv6: bool,

    /// Concurrent streams per direction; 0 uses a single stream
    #[arg(short, long, default_value_t = 0)]
    multiplicity: usize,

    /// Seconds spent on each direction (at most an hour)
    #[arg(
        short,
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=3600)
    )]
    time: u64,

    /// Skip idle and loaded latency measurement
    #[arg(long)]
    no_rtt: bool,

    /// Which directions to measure
    #[arg(long, value_enum, default_value_t = DirectionArg::Both)]
    direction: DirectionArg,

    /// Grow transfer sizes until a transfer takes 2s instead of using a
    /// fixed time budget
    #[arg(long)]
    adaptive: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    verbosity: Verbosity<WarnLevel>,
}

impl Cli {
    fn families(&self) -> Vec<AddressFamily> {
        match (self.ipv4, self.ipv6) {
            (false, false) => vec![AddressFamily::Auto],
            (true, false) => vec![AddressFamily::V4],
            (false, true) => vec![AddressFamily::V6],
            (true, true) => vec![AddressFamily::V4, AddressFamily::V6],
        }
    }

    fn test_config(&self) -> TestConfig {
        let sizing = if self.adaptive {
            if self.multiplicity > 0 {
                warn!(
                    "--adaptive measures a single stream; \
                     ignoring --multiplicity"
                );
            }
            SizingStrategy::Adaptive
        } else {
            SizingStrategy::FixedBudget
        };

        TestConfig {
            budget: Duration::from_secs(self.time),
            multiplicity: self.multiplicity,
            measure_rtt: !self.no_rtt,
            sizing,
            directions: self.direction.into(),
            ..TestConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbosity.log_level_filter())
        .init();

    std::process::exit(run(&cli).await);
}

/// Run every requested address family and return the process exit code.
async fn run(cli: &Cli) -> i32 {
    let config = cli.test_config();
    let families = cli.families();

    let mut results = Vec::with_capacity(families.len());
    let mut exit_code = exit_codes::SUCCESS;
    let mut fatal = None;

    for family in families {
        info!("Measuring over {}", family);

        let output = match Client::new(family) {
            Ok(client) => TestEngine::new(client, config.clone()).run().await,
            Err(error) => Err(error),
        };

        match output {
            Ok(output) => {
                exit_code = exit_code.max(output.exit_code());
                let snapshot = SpeedTestResults::from_engine_output(&output);

                if !cli.json {
                    if !results.is_empty() {
                        println!();
                    }
                    print!("{}", text_report(&snapshot));
                }

                results.push(snapshot);
            }
            Err(error) => {
                eprintln!(
                    "{} {}",
                    format!("[{}]", family).bold(),
                    format_error_for_display(&error).red()
                );
                fatal.get_or_insert(error.exit_code());
            }
        }
    }

    if cli.json {
        match serde_json::to_string_pretty(&results) {
            Ok(json) => println!("{}", json),
            Err(error) => {
                eprintln!("{}", format!("Error: {}", error).red());
                return exit_codes::UNKNOWN_ERROR;
            }
        }
    }

    match fatal {
        Some(code) if results.is_empty() => code,
        Some(_) => exit_codes::PARTIAL_FAILURE,
        None => exit_code,
    }
}
