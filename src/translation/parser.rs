/*!
 * Strict parser for model answers.
 *
 * Grammar, applied to the raw model output:
 *
 * ```text
 * output  := any-text answer any-text
 * answer  := "<answer>" ws* ( element ws* )* "</answer>"
 * element := "<text id=\"" digits "\">" content "</text>"
 * ```
 *
 * Exactly one answer element may appear. Its body may only hold `<text>`
 * elements and whitespace, and the ids must be exactly the expected set.
 * Anything else produces a `ParseFailure` that says what was wrong, and
 * that description is sent back to the model on the next attempt.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::translation::markup::decode;

const ANSWER_OPEN: &str = "<answer>";
const ANSWER_CLOSE: &str = "</answer>";
const TEXT_OPEN: &str = "<text";
const TEXT_CLOSE: &str = "</text>";

static TEXT_OPEN_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^<text\s+id\s*=\s*(?:"(\d+)"|'(\d+)')\s*>"#).expect("text tag regex is valid")
});

/// Why an answer was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// No `<answer>` element at all
    MissingAnswer,
    /// More than one `<answer>` element
    MultipleAnswers { count: usize },
    /// An `<answer>` inside another one
    NestedAnswer,
    /// `<answer>` without its closing tag
    UnterminatedAnswer,
    /// A closing `</answer>` with no opening tag before it
    StrayAnswerClose,
    /// Something other than whitespace or `<text>` elements inside the answer
    UnexpectedContent { snippet: String },
    /// A `<text>` element that does not follow the element grammar
    MalformedElement { detail: String },
    /// The ids do not match the expected set
    IdMismatch { expected: BTreeSet<u32>, found: Vec<u32> },
    /// A `<text>` element with nothing in it
    EmptyText { id: u32 },
    /// A `<text>` element with an empty line inside; SRT ends an entry there
    BlankLine { id: u32 },
}

/// Successful parse: translated text per window-local id
pub type Translations = BTreeMap<u32, String>;

impl ParseFailure {
    fn id_mismatch_detail(expected: &BTreeSet<u32>, found: &[u32]) -> String {
        let found_set: BTreeSet<u32> = found.iter().copied().collect();

        let missing: Vec<u32> = expected.difference(&found_set).copied().collect();
        let unexpected: Vec<u32> = found_set.difference(expected).copied().collect();
        let mut duplicated: Vec<u32> = found_set
            .iter()
            .copied()
            .filter(|id| found.iter().filter(|f| *f == id).count() > 1)
            .collect();
        duplicated.dedup();

        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("missing {}", join(&missing)));
        }
        if !duplicated.is_empty() {
            parts.push(format!("duplicated {}", join(&duplicated)));
        }
        if !unexpected.is_empty() {
            parts.push(format!("unexpected {}", join(&unexpected)));
        }
        parts.join("; ")
    }
}

fn join(ids: &[u32]) -> String {
    ids.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(",")
}

fn describe_expected(expected: &BTreeSet<u32>) -> String {
    let (Some(first), Some(last)) = (expected.first(), expected.last()) else {
        return "no ids".to_string();
    };
    let contiguous = (*last - *first) as usize + 1 == expected.len();

    match expected.len() {
        1 => format!("id {}", first),
        _ if contiguous => format!("ids {}..{}", first, last),
        _ => format!("ids {{{}}}", join(&expected.iter().copied().collect::<Vec<_>>())),
    }
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingAnswer => write!(f, "no <answer> element was found"),
            Self::MultipleAnswers { count } => {
                write!(f, "expected exactly one <answer> element, found {}", count)
            }
            Self::NestedAnswer => write!(f, "an <answer> element was opened inside another <answer> element"),
            Self::UnterminatedAnswer => write!(f, "the <answer> element was never closed with </answer>"),
            Self::StrayAnswerClose => write!(f, "found </answer> without a matching <answer>"),
            Self::UnexpectedContent { snippet } => write!(
                f,
                "the <answer> element may only contain <text> elements, but it contains \"{}\"",
                snippet
            ),
            Self::MalformedElement { detail } => write!(f, "{}", detail),
            Self::IdMismatch { expected, found } => {
                let noun = if expected.len() == 1 { "element" } else { "elements" };
                write!(
                    f,
                    "expected {} text {} with {}, found ids {{{}}}",
                    expected.len(),
                    noun,
                    describe_expected(expected),
                    join(found)
                )?;
                let detail = Self::id_mismatch_detail(expected, found);
                if !detail.is_empty() {
                    write!(f, " ({})", detail)?;
                }
                Ok(())
            }
            Self::EmptyText { id } => write!(f, "the text element with id {} is empty", id),
            Self::BlankLine { id } => write!(
                f,
                "the text element with id {} contains an empty line; subtitle text may not contain empty lines",
                id
            ),
        }
    }
}

/// Short excerpt for diagnostics
fn snippet(text: &str) -> String {
    const MAX_CHARS: usize = 40;
    let trimmed = text.trim();
    let mut out: String = trimmed.chars().take(MAX_CHARS).collect();
    if trimmed.chars().count() > MAX_CHARS {
        out.push_str("...");
    }
    out
}

/// Locate the body of the single answer element
fn answer_body(raw: &str) -> Result<&str, ParseFailure> {
    let opens: Vec<usize> = raw.match_indices(ANSWER_OPEN).map(|(i, _)| i).collect();
    let closes: Vec<usize> = raw.match_indices(ANSWER_CLOSE).map(|(i, _)| i).collect();

    let Some(&open) = opens.first() else {
        return Err(if closes.is_empty() {
            ParseFailure::MissingAnswer
        } else {
            ParseFailure::StrayAnswerClose
        });
    };

    if closes.iter().any(|&c| c < open) {
        return Err(ParseFailure::StrayAnswerClose);
    }

    if let Some(&second) = opens.get(1) {
        let first_close = closes.first().copied();
        return Err(match first_close {
            Some(close) if close < second => ParseFailure::MultipleAnswers { count: opens.len() },
            _ => ParseFailure::NestedAnswer,
        });
    }

    let close = match closes.as_slice() {
        [] => return Err(ParseFailure::UnterminatedAnswer),
        [close] => *close,
        _ => return Err(ParseFailure::StrayAnswerClose),
    };

    Ok(&raw[open + ANSWER_OPEN.len()..close])
}

/// Parse a raw model answer against the expected window-local ids.
///
/// Never panics on untrusted input. On success the map covers exactly
/// `expected`; values are entity-decoded and trimmed, with inner newlines kept.
pub fn parse(raw: &str, expected: &BTreeSet<u32>) -> Result<Translations, ParseFailure> {
    let raw = raw.replace("\r\n", "\n");
    let body = answer_body(&raw)?;

    let mut elements: Vec<(u32, String)> = Vec::new();
    let mut rest = body.trim_start();

    while !rest.is_empty() {
        if !rest.starts_with(TEXT_OPEN) {
            let end = rest.find(TEXT_OPEN).unwrap_or(rest.len());
            return Err(ParseFailure::UnexpectedContent { snippet: snippet(&rest[..end]) });
        }

        let Some(caps) = TEXT_OPEN_TAG.captures(rest) else {
            let tag_end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            return Err(ParseFailure::MalformedElement {
                detail: format!(
                    "the tag {} is not of the form <text id=\"N\">",
                    snippet(&rest[..tag_end])
                ),
            });
        };

        let id_text = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str()).unwrap_or_default();
        let id: u32 = id_text.parse().map_err(|_| ParseFailure::MalformedElement {
            detail: format!("the text element id \"{}\" is not a valid number", id_text),
        })?;

        let after_open = &rest[caps.get(0).map(|m| m.end()).unwrap_or(0)..];
        let Some(close) = after_open.find(TEXT_CLOSE) else {
            return Err(ParseFailure::MalformedElement {
                detail: format!("the text element with id {} is not closed with </text>", id),
            });
        };

        let content = &after_open[..close];
        if content.contains(TEXT_OPEN) {
            return Err(ParseFailure::MalformedElement {
                detail: format!("the text element with id {} contains another <text> element", id),
            });
        }

        elements.push((id, decode(content).trim().to_string()));
        rest = after_open[close + TEXT_CLOSE.len()..].trim_start();
    }

    let found: Vec<u32> = elements.iter().map(|(id, _)| *id).collect();
    let found_set: BTreeSet<u32> = found.iter().copied().collect();
    if found_set != *expected || found.len() != found_set.len() {
        return Err(ParseFailure::IdMismatch {
            expected: expected.clone(),
            found,
        });
    }

    if let Some((id, _)) = elements.iter().find(|(_, text)| text.is_empty()) {
        return Err(ParseFailure::EmptyText { id: *id });
    }

    if let Some((id, _)) = elements
        .iter()
        .find(|(_, text)| text.lines().any(|line| line.trim().is_empty()))
    {
        return Err(ParseFailure::BlankLine { id: *id });
    }

    Ok(elements.into_iter().collect())
}
