use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use metronome_cli::config::MetronomeConfig;
use metronome_cli::{VERSION, commands, logging};

#[derive(Parser)]
#[command(version = VERSION, about, long_about = None)]
pub struct Cli {
    /// Enables debug logging (-dd for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Schedule a one-shot alarm and print the previous remaining seconds
    Alarm {
        seconds: i64,
        /// Immediately replace the first alarm with this one
        replacement: Option<i64>,
    },
    /// Schedule a microsecond interval alarm and print the previous remaining microseconds
    Ualarm {
        #[arg(allow_negative_numbers = true)]
        initial_us: i64,
        #[arg(allow_negative_numbers = true)]
        repeat_us: i64,
        /// Replace it right away with `--replace <initial_us> <repeat_us>`
        #[arg(long, num_args = 2, value_names = ["INITIAL_US", "REPEAT_US"], allow_negative_numbers = true)]
        replace: Option<Vec<i64>>,
    },
    /// Sleep, reporting the time left if a signal cuts it short
    Sleep {
        #[arg(allow_negative_numbers = true)]
        seconds: f64,
        /// Arm an alarm this many seconds out before sleeping
        #[arg(long)]
        alarm: Option<i64>,
        /// Keep sleeping for the time left after each interruption
        #[arg(long)]
        resume: bool,
    },
    /// Wait for SIGALRM, SIGINT or SIGUSR1
    Pause {
        /// Arm an alarm this many seconds out before waiting
        #[arg(long)]
        alarm: Option<i64>,
    },
    /// Print each value on its own line to stderr, flattening [lists]
    Warn {
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
    },
    /// Print a tick every step until interrupted
    Tick {
        /// Period in seconds (defaults to [timing] step)
        #[arg(short, long)]
        step: Option<f64>,
        /// Stop after this many steps
        #[arg(short = 'n', long)]
        count: Option<u64>,
        /// Fail if a step overruns its period instead of skipping ticks
        #[arg(long)]
        strict: bool,
    },
    /// Count once per step up to a limit, as a two-state machine
    Count {
        /// Period in seconds (defaults to [timing] step)
        #[arg(short, long)]
        step: Option<f64>,
        #[arg(long, default_value_t = 10)]
        to: u64,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<MetronomeConfig> {
    let Some(path) = path.or_else(MetronomeConfig::config_path) else {
        return Ok(MetronomeConfig::default());
    };
    MetronomeConfig::load_or_default(&path)
        .with_context(|| format!("failed to load config from {}", path.display()))
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config)?;

    let _guard = logging::init_logging("metronome", config.logging.file, cli.debug)
        .context("failed to initialize logging")?;
    info!("metronome {VERSION}");

    match cli.command {
        Command::Alarm {
            seconds,
            replacement,
        } => commands::alarm(seconds, replacement),
        Command::Ualarm {
            initial_us,
            repeat_us,
            replace,
        } => {
            let replace = replace.and_then(|pair| match pair.as_slice() {
                [initial, repeat] => Some((*initial, *repeat)),
                _ => None,
            });
            commands::ualarm(initial_us, repeat_us, replace)
        }
        Command::Sleep {
            seconds,
            alarm,
            resume,
        } => commands::sleep(seconds, alarm, resume),
        Command::Pause { alarm } => commands::pause(alarm),
        Command::Warn { values } => commands::warn(&values, &config),
        Command::Tick {
            step,
            count,
            strict,
        } => commands::tick(
            step.unwrap_or(config.timing.step),
            count,
            strict || config.timing.strict_timing,
        ),
        Command::Count { step, to } => commands::count(step.unwrap_or(config.timing.step), to),
    }
}
