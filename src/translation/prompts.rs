/*!
 * Prompt construction for one window.
 *
 * Every entry of the window becomes a `<text>` element numbered from 1
 * within the window, carrying its timecodes. The model is asked to reason
 * first and then return a single `<answer>` element holding one `<text>`
 * element per id. After a failed attempt the prompt starts with a
 * correction notice and still carries the whole window.
 */

use std::fmt::Write;

use crate::subtitle_processor::SubtitleEntry;
use crate::translation::markup::escape;
use crate::translation::parser::ParseFailure;

/// Render the prompt for a window.
///
/// `target_language` is the display name (`French`, not `fr`). An empty
/// `context` emits no context element.
pub fn build(
    window: &[SubtitleEntry],
    context: &str,
    target_language: &str,
    feedback: Option<&ParseFailure>,
) -> String {
    let count = window.len();
    let mut prompt = String::new();

    if let Some(failure) = feedback {
        let _ = writeln!(
            prompt,
            "CORRECTION NEEDED: your previous answer could not be used because it was structurally invalid: {}.",
            failure
        );
        let _ = writeln!(
            prompt,
            "Answer again with one complete, corrected <answer> element containing exactly {} <text> element(s) with ids {}.",
            count,
            id_span(count)
        );
        prompt.push('\n');
    }

    let _ = writeln!(
        prompt,
        "You are a professional subtitle translator. Translate the subtitles below into {}.",
        target_language
    );

    let context = context.trim();
    if !context.is_empty() {
        prompt.push_str("\nBackground on the material:\n");
        let _ = writeln!(prompt, "<context>{}</context>", escape(context));
    }

    prompt.push_str("\nSubtitles:\n");
    for (i, entry) in window.iter().enumerate() {
        let _ = writeln!(
            prompt,
            "<text id=\"{}\" start=\"{}\" end=\"{}\">{}</text>",
            i + 1,
            entry.format_start_time(),
            entry.format_end_time(),
            escape(&entry.text)
        );
    }

    prompt.push_str("\nInstructions:\n");
    prompt.push_str(
        "1. First reason about the batch as a whole: who is speaking, the tone, \
         and how each line continues the previous one. Write this reasoning as plain text before the answer, \
         and do not write the tag names answer or text in angle brackets anywhere in it.\n",
    );
    let _ = writeln!(
        prompt,
        "2. Then write exactly one <answer> element. It must contain one <text id=\"N\"> element for each id {}, \
         holding only the translated text of that subtitle and nothing else.",
        id_span(count)
    );
    prompt.push_str(
        "3. Keep line breaks inside a subtitle where they make sense, but never leave an empty line inside a text element. \
         Write &, < and > inside the text as &amp;, &lt; and &gt;.\n",
    );
    prompt.push_str("4. Do not merge, split, skip or renumber subtitles.\n");

    prompt.push_str("\nAnswer format:\n<answer>\n");
    prompt.push_str("<text id=\"1\">translated text</text>\n");
    if count > 1 {
        if count > 2 {
            prompt.push_str("...\n");
        }
        let _ = writeln!(prompt, "<text id=\"{}\">translated text</text>", count);
    }
    prompt.push_str("</answer>\n");

    prompt
}

fn id_span(count: usize) -> String {
    match count {
        0 | 1 => "1".to_string(),
        n => format!("1 to {}", n),
    }
}
