//! Short uppercase keys derived from project or workspace names.
//!
//! # Invariants
//! - Keys contain only `A-Z` and `0-9`.
//! - Key length is within `MIN_KEY_LEN..=MAX_KEY_LEN`.

pub const MIN_KEY_LEN: usize = 2;
pub const MAX_KEY_LEN: usize = 10;
const SINGLE_WORD_LEN: usize = 3;
const FALLBACK_KEY: &str = "PRJ";

/// Builds a key from word initials (`"Website Redesign"` -> `"WR"`).
///
/// A single word contributes its first three characters (`"Apollo"` ->
/// `"APO"`). Non-ASCII characters are dropped; names with no usable
/// characters fall back to `PRJ`.
pub fn generate_project_key(name: &str, max_len: usize) -> String {
    let max_len = max_len.clamp(MIN_KEY_LEN, MAX_KEY_LEN);
    let words: Vec<String> = name
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_uppercase)
        .collect();

    let mut key: String = match words.as_slice() {
        [] => return FALLBACK_KEY.to_string(),
        [single] => single.chars().take(SINGLE_WORD_LEN.min(max_len)).collect(),
        many => many.iter().filter_map(|word| word.chars().next()).collect(),
    };
    key.truncate(max_len);

    if key.len() < MIN_KEY_LEN {
        // pad short keys with the next characters of the joined name
        let joined: String = words.concat();
        key = joined.chars().take(MIN_KEY_LEN).collect();
        while key.len() < MIN_KEY_LEN {
            key.push('X');
        }
    }
    key
}

/// Appends the smallest numeric suffix that makes `base` unused.
///
/// The base is shortened when needed so the result stays within
/// `MAX_KEY_LEN`. Lookup errors abort the search.
pub fn unique_project_key<E>(
    base: &str,
    mut is_taken: impl FnMut(&str) -> Result<bool, E>,
) -> Result<String, E> {
    if !is_taken(base)? {
        return Ok(base.to_string());
    }
    let mut suffix: u32 = 2;
    loop {
        let suffix_text = suffix.to_string();
        let keep = MAX_KEY_LEN.saturating_sub(suffix_text.len());
        let mut candidate: String = base.chars().take(keep).collect();
        candidate.push_str(&suffix_text);
        if !is_taken(&candidate)? {
            return Ok(candidate);
        }
        suffix += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{generate_project_key, unique_project_key};

    #[test]
    fn multi_word_names_use_initials() {
        assert_eq!(generate_project_key("Website Redesign", 10), "WR");
        assert_eq!(
            generate_project_key("customer-success  platform v2", 10),
            "CSPV"
        );
    }

    #[test]
    fn single_word_uses_prefix() {
        assert_eq!(generate_project_key("apollo", 10), "APO");
        assert_eq!(generate_project_key("Q", 10), "QX");
    }

    #[test]
    fn respects_max_len_and_fallback() {
        assert_eq!(generate_project_key("a b c d e f g h i j k l", 4), "ABCD");
        assert_eq!(generate_project_key("ünïcödé ✓", 10), "NCD");
        assert_eq!(generate_project_key("  --  ", 10), "PRJ");
    }

    #[test]
    fn unique_key_appends_suffix() {
        let taken = ["AC", "AC2"];
        let lookup = |key: &str| Ok::<_, ()>(taken.contains(&key));
        assert_eq!(unique_project_key("AC", lookup), Ok("AC3".to_string()));
        assert_eq!(unique_project_key("ZZ", lookup), Ok("ZZ".to_string()));
        let long_taken = ["ABCDEFGHIJ"];
        assert_eq!(
            unique_project_key("ABCDEFGHIJ", |key| Ok::<_, ()>(long_taken.contains(&key))),
            Ok("ABCDEFGHI2".to_string())
        );
    }

    #[test]
    fn unique_key_truncates_on_char_boundaries() {
        let base = "ÄÖÜÄÖÜÄÖÜÄ";
        let key = unique_project_key(base, |key| Ok::<_, ()>(key == base)).unwrap();
        assert_eq!(key, "ÄÖÜÄÖÜÄÖÜ2");
        assert_eq!(key.chars().count(), 10);
    }

    #[test]
    fn unique_key_propagates_lookup_errors() {
        assert_eq!(unique_project_key("AC", |_| Err("db down")), Err("db down"));
    }
}
