//! Post-processing: deterministic cleanup of LLM-written task output.
//!
//! Even when told to answer in plain text, models regularly wrap the answer
//! in code fences, use CRLF line endings, or pad it with blank lines and
//! zero-width characters. These rules fix such quirks without touching the
//! wording. Each rule is a pure `&str → String` function.
//!
//! Rules (applied in order):
//! 1. Strip outer code fences
//! 2. Normalise line endings (CRLF → LF)
//! 3. Trim trailing whitespace per line
//! 4. Collapse 3+ consecutive blank lines down to one
//! 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens)
//! 6. Trim leading and trailing blank space from the whole text

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to raw task output.
pub fn clean_text(input: &str) -> String {
    let s = strip_outer_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    s.trim().to_string()
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```(?:markdown|md|text|plaintext)?[ \t]*\r?\n(.*?)\r?\n```\s*$")
        .expect("static regex")
});

fn strip_outer_fences(input: &str) -> String {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("static regex"));

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        ['\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}'],
        "",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_fences() {
        assert_eq!(clean_text("```\nHello\n```"), "Hello");
        assert_eq!(clean_text("```markdown\n# Title\nBody\n```\n"), "# Title\nBody");
    }

    #[test]
    fn keeps_inner_fences() {
        let s = "Intro\n```\ncode\n```\nOutro";
        assert_eq!(clean_text(s), s);
    }

    #[test]
    fn normalises_whitespace() {
        let raw = "Line one   \r\n\r\n\r\n\r\nLine two\t\r\n";
        assert_eq!(clean_text(raw), "Line one\n\nLine two");
    }

    #[test]
    fn removes_invisible_chars() {
        assert_eq!(clean_text("\u{FEFF}Glu\u{200B}cose"), "Glucose");
    }

    #[test]
    fn empty_stays_empty() {
        assert_eq!(clean_text("   \n\n"), "");
    }
}
