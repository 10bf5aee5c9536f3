//! Reading-time estimate

use super::ContentSection;

/// Words read per minute
pub const WORDS_PER_MINUTE: usize = 200;

/// Text of every section body; sections are joined with `", "`
pub fn body_text(sections: &[ContentSection]) -> String {
    sections
        .iter()
        .map(|s| s.body.as_text())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Estimated minutes to read `sections`, rounded up
pub fn reading_time(sections: &[ContentSection], words_per_minute: usize) -> usize {
    let words = body_text(sections).split_whitespace().count();
    words.div_ceil(words_per_minute.max(1))
}
