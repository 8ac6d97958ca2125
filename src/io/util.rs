use super::{Format, error::Error};
use std::io::BufRead;
use std::str::FromStr;

/// Placeholder token used by the BIOSYM formats for an absent value.
pub const UNKNOWN: &str = "?";

/// Reads all lines with their 1-based line numbers.
pub fn collect_lines<R: BufRead>(reader: R) -> Result<Vec<(usize, String)>, Error> {
    reader
        .lines()
        .enumerate()
        .map(|(i, line)| {
            line.map(|v| (i + 1, v))
                .map_err(|e| Error::Io { source: e })
        })
        .collect()
}

/// Parses one whitespace token, naming `what` in the error.
pub fn parse_token<T: FromStr>(
    token: &str,
    format: Format,
    line: usize,
    what: &str,
) -> Result<T, Error> {
    token
        .parse::<T>()
        .map_err(|_| Error::parse(format, line, format!("invalid {what} '{token}'")))
}

/// `None` for the BIOSYM unknown marker, owned text otherwise.
pub fn known(token: &str) -> Option<String> {
    (token != UNKNOWN).then(|| token.to_string())
}

/// Fixed-column slice, trimmed. Short lines yield an empty string.
pub fn columns(line: &str, start: usize, end: usize) -> &str {
    let end = end.min(line.len());
    if start >= end {
        return "";
    }
    line.get(start..end).map(str::trim).unwrap_or("")
}

/// Truncates `s` to at most `width` characters.
pub fn fit(s: &str, width: usize) -> &str {
    match s.char_indices().nth(width) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Bond order token: `1.0` style for integral orders, shortest form otherwise.
pub fn format_order(order: f64) -> String {
    if order.fract() == 0.0 {
        format!("{order:.1}")
    } else {
        format!("{order}")
    }
}
