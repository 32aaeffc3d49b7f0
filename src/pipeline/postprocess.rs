//! Post-processing: deterministic cleanup of agent-written insight text.
//!
//! The drug-information agent answers in free-form Markdown. Pasted verbatim
//! into the report it can break the document: a ```markdown fence swallows
//! the following sections, a `# Heading` outranks the medication header it
//! sits under, Windows line endings and zero-width characters leak through.
//!
//! [`clean_insight`] applies a fixed sequence of pure `&str → String` rules.
//! Rule order matters: fences are stripped before line endings are
//! normalised so the fence regex sees the raw text, and headings are demoted
//! after blank lines are collapsed.

use once_cell::sync::Lazy;
use regex::Regex;

/// Heading depth the insight's own headings start at: one below the
/// `### <medication>` header that introduces it.
const INSIGHT_HEADING_LEVEL: usize = 4;

/// Apply all cleanup rules to one insight.
///
/// Rules (applied in order):
/// 1. Strip outer markdown fences
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 3+ consecutive blank lines down to 1
/// 5. Demote headings below the medication header
/// 6. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 7. Trim leading/trailing blank lines
pub fn clean_insight(input: &str) -> String {
    let s = strip_markdown_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = demote_headings(&s);
    let s = remove_invisible_chars(&s);
    s.trim_matches('\n').to_string()
}

// ── Rule 1: Strip outer markdown fences ──────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md|text)?\r?\n(.*)\r?\n```\s*$").unwrap());

fn strip_markdown_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
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
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Demote headings ──────────────────────────────────────────────────

static RE_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(#{1,6})\s+(.*)$").unwrap());

/// Shift every ATX heading so the shallowest one lands at
/// [`INSIGHT_HEADING_LEVEL`]. Levels are capped at 6.
fn demote_headings(input: &str) -> String {
    let shallowest = input
        .lines()
        .filter_map(|l| RE_HEADING.captures(l).map(|c| c[1].len()))
        .min();
    let Some(shallowest) = shallowest else {
        return input.to_string();
    };
    if shallowest >= INSIGHT_HEADING_LEVEL {
        return input.to_string();
    }
    let shift = INSIGHT_HEADING_LEVEL - shallowest;

    input
        .lines()
        .map(|line| match RE_HEADING.captures(line) {
            Some(caps) => {
                let level = (caps[1].len() + shift).min(6);
                format!("{} {}", "#".repeat(level), &caps[2])
            }
            None => line.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 6: Remove invisible Unicode characters ─────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Tests ────────────────────────────────────────────────────────────────────
