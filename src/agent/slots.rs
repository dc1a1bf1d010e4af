//! Pull task titles, ids and status filters out of free text.

use crate::models::StatusFilter;

/// Phrases that introduce a task title, tried in this order.
const TITLE_PHRASES: [&str; 4] = ["add ", "create ", "make ", "new "];

/// Markers that split a title from its description, tried in this order.
const DESCRIPTION_MARKERS: [&str; 2] = ["with description", "and description"];

/// Filler dropped when no title phrase is present.
const STOP_WORDS: [&str; 11] = [
    "please", "can", "you", "add", "create", "make", "a", "an", "the", "to", "for",
];

/// Title and description for a new task. An empty title means nothing
/// usable was found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
}

pub fn extract_task_draft(text: &str) -> TaskDraft {
    let lower = text.trim().to_lowercase();

    let candidate = TITLE_PHRASES
        .iter()
        .find_map(|phrase| lower.find(phrase).map(|pos| &lower[pos + phrase.len()..]))
        .map(str::trim)
        .unwrap_or("");

    let mut draft = split_description(candidate);
    if draft.title.is_empty() {
        draft.title = strip_filler(text);
    }
    draft
}

fn split_description(candidate: &str) -> TaskDraft {
    for marker in DESCRIPTION_MARKERS {
        if let Some((title, description)) = candidate.split_once(marker) {
            return TaskDraft {
                title: title.trim().to_string(),
                description: description.trim().to_string(),
            };
        }
    }
    TaskDraft {
        title: candidate.to_string(),
        description: String::new(),
    }
}

/// Fallback title: the original words minus stop words, with edge
/// punctuation trimmed.
fn strip_filler(text: &str) -> String {
    let kept: Vec<&str> = text
        .split_whitespace()
        .filter(|word| !STOP_WORDS.contains(&word.to_lowercase().as_str()))
        .collect();
    kept.join(" ")
        .trim_matches(|c: char| matches!(c, ' ' | '.' | '!' | '?'))
        .to_string()
}

/// The first run of decimal digits in the text, or 0 when there is none.
pub fn extract_task_id(text: &str) -> u64 {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

pub fn extract_status_filter(text: &str) -> Option<StatusFilter> {
    let lower = text.to_lowercase();
    if lower.contains("completed") {
        Some(StatusFilter::Completed)
    } else if lower.contains("pending") || lower.contains("incomplete") {
        Some(StatusFilter::Pending)
    } else {
        None
    }
}
