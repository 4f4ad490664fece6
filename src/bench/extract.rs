use regex::Regex;
use std::sync::OnceLock;

/// Textual contract with the measured kernels: on success each program
/// prints one line of the form `Execution Time: <decimal> seconds`.
const TIME_PATTERN: &str = r"Execution Time:\s+([\d.]+)\s+seconds";

fn time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // The pattern is a compile-time constant, so this cannot fail at runtime
    RE.get_or_init(|| Regex::new(TIME_PATTERN).expect("invalid time pattern"))
}

/// Extract the execution time from program output.
///
/// Takes the first matching line and ignores everything else (build
/// diagnostics, MPI chatter, later matches). Returns `None` when no line
/// matches or the captured number does not parse.
pub fn extract_execution_time(output: &str) -> Option<f64> {
    let captures = time_regex().captures(output)?;
    captures.get(1)?.as_str().parse::<f64>().ok()
}
