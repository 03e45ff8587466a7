const COMMENT_PREFIX: char = '#';

/// Splits an input line into words on whitespace. Blank lines and lines whose
/// first word starts with `#` produce no words at all.
pub fn split_words(line: &str) -> Vec<String> {
    let mut words = line.split_whitespace().peekable();
    match words.peek() {
        Some(first) if first.starts_with(COMMENT_PREFIX) => Vec::new(),
        _ => words.map(String::from).collect(),
    }
}
