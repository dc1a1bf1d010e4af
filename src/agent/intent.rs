use serde::Serialize;

/// The action a chat message asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Add,
    List,
    Complete,
    Delete,
    Update,
    Unknown,
}

/// Keyword sets in priority order. The first set with a word present in the
/// message decides the intent, so "mark as done and then delete" is a
/// `Complete`. Keep the order: replies depend on it.
const KEYWORDS: [(Intent, &[&str]); 5] = [
    (Intent::Add, &["add", "create", "new", "make"]),
    (Intent::List, &["list", "show", "view", "see", "my"]),
    (Intent::Complete, &["complete", "done", "finish", "mark"]),
    (Intent::Delete, &["delete", "remove", "cancel"]),
    (Intent::Update, &["update", "change", "edit", "modify"]),
];

/// Classify a free-text command. Never fails; unmatched text is `Unknown`.
pub fn classify(text: &str) -> Intent {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| words.contains(k)))
        .map_or(Intent::Unknown, |(intent, _)| *intent)
}
