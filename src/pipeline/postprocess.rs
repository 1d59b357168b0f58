//! Post-processing: deterministic cleanup of raw extractor output.
//!
//! Text from pdf-extract, antiword, pandoc and tesseract carries the
//! artefacts of its origin: CRLF line endings, form feeds between pages,
//! trailing spaces from column padding, runs of blank lines, zero-width
//! characters. Engines pass their output through [`clean_text`] before
//! building an outcome; the orchestrator itself never rewrites text.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules.
///
/// Rules (applied in order):
/// 1. Normalise line endings (CRLF / CR → LF)
/// 2. Turn form feeds into paragraph breaks
/// 3. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to 1
/// 6. Trim surrounding whitespace
pub fn clean_text(input: &str) -> String {
    let s = normalise_line_endings(input);
    let s = replace_form_feeds(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    s.trim().to_string()
}

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

fn replace_form_feeds(input: &str) -> String {
    input.replace('\x0C', "\n\n")
}

fn remove_invisible_chars(input: &str) -> String {
    input
        .chars()
        .filter(|c| {
            !matches!(
                c,
                '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}' | '\u{00AD}'
            )
        })
        .collect()
}

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

static RE_BLANK_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_RUNS.replace_all(input, "\n\n").into_owned()
}
