//! Raw command-line parsing.
//!
//! One command per line, tab-separated: token 0 is the keyword, the rest
//! are positional string arguments. Blank and whitespace-only lines are
//! not commands at all — they produce no echo and no response.

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// The keyword token.
    pub keyword: String,
    /// Positional arguments, in order.
    pub args: Vec<String>,
    /// The original line, echoed back verbatim in the response.
    pub raw: String,
}

impl Command {
    /// Parse a raw input line. Returns `None` for blank lines (empty or
    /// only spaces/tabs), which are skipped entirely.
    pub fn parse(line: &str) -> Option<Command> {
        if line.chars().all(|c| c == ' ' || c == '\t') {
            return None;
        }
        let mut tokens = line.split('\t');
        let keyword = tokens.next().unwrap_or_default().to_string();
        let args = tokens.map(str::to_string).collect();
        Some(Command {
            keyword,
            args,
            raw: line.to_string(),
        })
    }
}
