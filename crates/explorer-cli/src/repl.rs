//! Line commands for the interactive mode

use explorer_stock::Period;

pub const HELP: &str = "\
Enter a ticker symbol, optionally followed by a period:
  AAPL            analyze with the current period
  msft 5y         analyze over a specific period (6mo, 1y, 5y, max)
  :period <p>     change the default period
  :help           show this help
  :quit           exit";

/// One parsed input line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Analyze { ticker: String, period: Option<Period> },
    SetPeriod(Period),
    Help,
    Quit,
    /// Blank line
    Blank,
    /// Unusable input with a message for the user
    Invalid(String),
}

pub fn parse_line(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Blank;
    }

    if let Some(rest) = line.strip_prefix(':') {
        let mut parts = rest.split_whitespace();
        return match (parts.next(), parts.next(), parts.next()) {
            (Some("q" | "quit" | "exit"), None, _) => Command::Quit,
            (Some("h" | "help"), None, _) => Command::Help,
            (Some("period"), Some(token), None) => match token.parse() {
                Ok(period) => Command::SetPeriod(period),
                Err(e) => Command::Invalid(e.to_string()),
            },
            (Some("period"), _, _) => Command::Invalid("usage: :period <6mo|1y|5y|max>".to_string()),
            _ => Command::Invalid(format!("unknown command ':{rest}', type :help")),
        };
    }

    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(ticker), None, _) => Command::Analyze {
            ticker: ticker.to_string(),
            period: None,
        },
        (Some(ticker), Some(token), None) => match token.parse() {
            Ok(period) => Command::Analyze {
                ticker: ticker.to_string(),
                period: Some(period),
            },
            Err(e) => Command::Invalid(e.to_string()),
        },
        _ => Command::Invalid("expected '<ticker> [period]'".to_string()),
    }
}
