/// Normalizes a keyword title so the same search term is shared across
/// subscribers: lowercased, punctuation stripped, letters/digits/underscore
/// and whitespace kept.
///
/// `"LG TV!!"` and `"lg tv"` normalize to the same keyword.
#[must_use]
pub fn normalize_keyword(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || *c == '_')
        .collect::<String>()
        .trim()
        .to_owned()
}
