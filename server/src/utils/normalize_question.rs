/// Maximum length (in characters) of a normalized question
pub const MAX_NORMALIZED_QUESTION_CHARS: usize = 500;

/// Fold a question into the key used to group repeats in the analytics table:
/// lowercased, whitespace collapsed to single spaces, trimmed, and capped at
/// [MAX_NORMALIZED_QUESTION_CHARS] characters.
pub fn normalize_question(question: &str) -> String {
    let collapsed = question
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    match collapsed.char_indices().nth(MAX_NORMALIZED_QUESTION_CHARS) {
        Some((cut, _)) => collapsed[..cut].trim_end().to_owned(),
        None => collapsed,
    }
}
