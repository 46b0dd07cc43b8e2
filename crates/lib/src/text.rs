//! SMS text preparation: typographic punctuation replacement, percent escaping
//! and the 160-character counter shown next to the message box.

/// Maximum characters in one SMS segment.
pub const SMS_MAX_CHARS: usize = 160;

/// Word-processor punctuation and the 7-bit character each is replaced with.
/// An empty replacement deletes the character.
const REPLACEMENTS: &[(char, &str)] = &[
    ('\u{201C}', "\""),
    ('\u{201D}', "\""),
    ('\u{201E}', "\""),
    ('\u{201F}', "\""),
    ('\u{2018}', "'"),
    ('\u{2019}', "'"),
    ('\u{201A}', "'"),
    ('\u{201B}', "'"),
    ('\u{2013}', "-"),
    ('\u{2014}', "-"),
    ('\u{2015}', "-"),
    ('\u{00A7}', "$"),
    ('\u{00A1}', "i"),
    ('\u{00A4}', ""),
    ('\u{00C4}', "A"),
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    #[error("message text is empty")]
    Empty,
    #[error("message is {len} characters long, the limit is {max}")]
    TooLong { len: usize, max: usize },
}

/// Replace SMS-unsafe punctuation with plain equivalents.
///
/// Each input character is looked up once; replacements are never re-scanned,
/// so applying this twice yields the same string as applying it once.
pub fn normalize_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match REPLACEMENTS.iter().find(|(find, _)| *find == c) {
            Some((_, replace)) => out.push_str(replace),
            None => out.push(c),
        }
    }
    out
}

/// Double every `%` so the text survives percent-style formatting downstream.
/// Not idempotent: call exactly once per outgoing text.
pub fn escape_percent(text: &str) -> String {
    text.replace('%', "%%")
}

/// Trim, normalize and length-check operator input. Does not escape `%`.
pub fn prepare_sms_text(text: &str) -> Result<String, TextError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(TextError::Empty);
    }
    let normalized = normalize_text(trimmed);
    let len = normalized.chars().count();
    if len > SMS_MAX_CHARS {
        return Err(TextError::TooLong {
            len,
            max: SMS_MAX_CHARS,
        });
    }
    Ok(normalized)
}

/// Character budget for a message being typed.
#[derive(Debug, Clone)]
pub struct CharCounter {
    count: usize,
    blank: bool,
}

impl CharCounter {
    pub fn new(text: &str) -> Self {
        Self {
            count: text.chars().count(),
            blank: text.trim().is_empty(),
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    /// Characters left before the limit; negative when over.
    pub fn remaining(&self) -> i64 {
        SMS_MAX_CHARS as i64 - self.count as i64
    }

    pub fn is_over_limit(&self) -> bool {
        self.remaining() < 0
    }

    pub fn label(&self) -> String {
        match self.remaining() {
            n if n > 1 => format!("{} characters left", n),
            1 => "1 character left".to_string(),
            0 => "No characters left".to_string(),
            -1 => "1 character over limit".to_string(),
            n => format!("{} characters over limit", -n),
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.blank && !self.is_over_limit()
    }
}
