//! Stock explorer command-line dashboard
//!
//! # Usage
//!
//! ```bash
//! # Optional: enable plain-language descriptions
//! export TOKEN_GENAI="your-gemini-key"
//!
//! # One-shot
//! stock-explorer --ticker AAPL --period 1y
//!
//! # Interactive
//! stock-explorer
//! ```

mod repl;

use clap::Parser;
use explorer_stock::{
    AnalysisOutcome, Analyzer, ChartOptions, ExplorerConfig, Language, MarketDataSource,
    NarrativeTranslator, Period, YahooMarketData,
};
use explorer_utils::{LogFormat, LoggingConfig};
use repl::Command;
use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "stock-explorer", version)]
#[command(about = "Explore a stock: key facts, growth, volatility and price charts", long_about = None)]
struct Args {
    /// Ticker to analyze once; starts the interactive mode when omitted
    #[arg(short, long)]
    ticker: Option<String>,

    /// History window: 6mo, 1y, 5y or max
    #[arg(short, long, default_value = "6mo")]
    period: Period,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Language of the company description (es, en)
    #[arg(long)]
    language: Option<Language>,

    /// Chart width in columns
    #[arg(long)]
    width: Option<usize>,

    /// Chart height in rows
    #[arg(long)]
    height: Option<usize>,

    /// Log output format (pretty, json)
    #[arg(long)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let env_file = explorer_utils::load_env_file();
    let args = Args::parse();

    let mut logging = LoggingConfig::from_env();
    if let Some(format) = args.log_format {
        logging = logging.with_format(format);
    }
    explorer_utils::init_tracing(&logging)?;

    if let Some(path) = env_file {
        debug!("Loaded environment from {}", path.display());
    }

    let config = build_config(&args)?;
    info!(
        language = %config.language,
        translation = config.llm.is_some(),
        "Starting stock-explorer"
    );

    let source = YahooMarketData::new(config.request_timeout)?;
    let analyzer = Analyzer::new(source, NarrativeTranslator::from_config(&config));
    let options = config.chart_options();

    if let Some(ticker) = &args.ticker {
        let outcome = analyzer.analyze(ticker, args.period).await;
        print_outcome(&outcome, &options, args.json)?;
        return Ok(ExitCode::from(exit_code(&outcome)));
    }

    run_interactive(&analyzer, args.period, &options, args.json).await?;
    Ok(ExitCode::SUCCESS)
}

/// Environment first, then command-line overrides
fn build_config(args: &Args) -> anyhow::Result<ExplorerConfig> {
    let mut config = ExplorerConfig::from_env()?;
    if let Some(language) = args.language {
        config.language = language;
    }
    if let Some(width) = args.width {
        config.chart_width = width;
    }
    if let Some(height) = args.height {
        config.chart_height = height;
    }
    config.validate()?;
    Ok(config)
}

async fn run_interactive<S: MarketDataSource>(
    analyzer: &Analyzer<S>,
    mut period: Period,
    options: &ChartOptions,
    json: bool,
) -> anyhow::Result<()> {
    println!("Stock explorer. Type :help for commands.\n");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("[{period}] ticker> ");
        stdout.flush()?;

        let mut input = String::new();
        match stdin.lock().read_line(&mut input) {
            Ok(0) => {
                println!("\nGoodbye!");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                eprintln!("Error reading input: {e}");
                continue;
            }
        }

        match repl::parse_line(&input) {
            Command::Quit => {
                println!("Goodbye!");
                break;
            }
            Command::Help => println!("{}\n", repl::HELP),
            Command::SetPeriod(p) => {
                period = p;
                println!("Period set to {} ({})\n", p, p.label());
            }
            Command::Invalid(message) => eprintln!("{message}\n"),
            Command::Blank => {
                print_outcome(&analyzer.analyze("", period).await, options, json)?;
            }
            Command::Analyze { ticker, period: p } => {
                let outcome = analyzer.analyze(&ticker, p.unwrap_or(period)).await;
                print_outcome(&outcome, options, json)?;
            }
        }
    }

    Ok(())
}

fn print_outcome(outcome: &AnalysisOutcome, options: &ChartOptions, json: bool) -> anyhow::Result<()> {
    match outcome {
        _ if json => println!("{}", outcome.to_json()?),
        AnalysisOutcome::ProviderError { .. } => eprintln!("{}\n", outcome.render(options)),
        _ => println!("{}\n", outcome.render(options)),
    }
    Ok(())
}

/// 0 on success, 1 for provider failures, 2 for unknown or blank tickers
fn exit_code(outcome: &AnalysisOutcome) -> u8 {
    match outcome {
        AnalysisOutcome::Success(_) => 0,
        AnalysisOutcome::ProviderError { .. } => 1,
        AnalysisOutcome::EmptyTicker | AnalysisOutcome::SymbolNotFound { .. } => 2,
    }
}
