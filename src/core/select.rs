//! Purpose: Parse caller-facing row-selection strings.
//! Exports: `parse_row_selection`.
//! Role: Turns `"1-100,200,500"` into a deduplicated ascending index list
//! before any file I/O happens.
//! Invariants: Any malformed token aborts the whole parse with a usage
//! error naming the token.

use crate::core::error::{Error, ErrorKind};
use crate::core::plan::RowSelection;

/// Comma-separated tokens, each a non-negative integer or an inclusive
/// `start-end` range. Blank input selects all rows.
pub fn parse_row_selection(text: &str) -> Result<RowSelection, Error> {
    if text.trim().is_empty() {
        return Ok(RowSelection::All);
    }
    let mut rows: Vec<usize> = Vec::new();
    for token in text.split(',') {
        let token = token.trim();
        if token.is_empty() {
            return Err(token_error(token, "empty token"));
        }
        match token.split_once('-') {
            Some((start_text, end_text)) => {
                let start = parse_index(start_text, token)?;
                let end = parse_index(end_text, token)?;
                if start > end {
                    return Err(token_error(token, "start row exceeds end row"));
                }
                rows.extend(start..=end);
            }
            None => rows.push(parse_index(token, token)?),
        }
    }
    rows.sort_unstable();
    rows.dedup();
    Ok(RowSelection::Indices(rows))
}

fn parse_index(text: &str, token: &str) -> Result<usize, Error> {
    text.trim()
        .parse()
        .map_err(|_| token_error(token, "not a non-negative row number"))
}

fn token_error(token: &str, reason: &str) -> Error {
    Error::new(ErrorKind::Usage)
        .with_message(format!("invalid row selection `{token}`: {reason}"))
        .with_hint("Use comma-separated rows and inclusive ranges, e.g. `1-100,200,500`.")
}

#[cfg(test)]
mod tests {
    use super::parse_row_selection;
    use crate::core::plan::RowSelection;

    #[test]
    fn blank_selects_all() {
        assert_eq!(parse_row_selection("").unwrap(), RowSelection::All);
        assert_eq!(parse_row_selection("   ").unwrap(), RowSelection::All);
    }

    #[test]
    fn tokens_are_deduplicated_and_sorted() {
        let parsed = parse_row_selection("5, 1-3, 2, 9").unwrap();
        assert_eq!(parsed, RowSelection::Indices(vec![1, 2, 3, 5, 9]));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = parse_row_selection("2-1").unwrap_err();
        assert!(err.to_string().contains("2-1"));
    }

    #[test]
    fn malformed_tokens_abort_the_parse() {
        assert!(parse_row_selection("1,x,3").is_err());
        assert!(parse_row_selection("1,,3").is_err());
        assert!(parse_row_selection("-3").is_err());
        assert!(parse_row_selection("1-2-3").is_err());
        assert!(parse_row_selection("1.5").is_err());
    }

    #[test]
    fn single_row_and_single_range() {
        assert_eq!(
            parse_row_selection("7").unwrap(),
            RowSelection::Indices(vec![7])
        );
        assert_eq!(
            parse_row_selection("0-4").unwrap(),
            RowSelection::Indices(vec![0, 1, 2, 3, 4])
        );
    }
}
