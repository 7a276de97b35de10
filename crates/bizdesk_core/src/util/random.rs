//! Random token and number generation.

use rand::distributions::{Alphanumeric, DistString};
use rand::seq::SliceRandom;
use rand::Rng;

const LOWER: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
const UPPER: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const DIGITS: &[u8] = b"0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()-_=+[]{};:,.?";

/// Largest digit count whose values fit in `u64` without overflow checks.
pub const MAX_RANDOM_DIGITS: u32 = 18;

/// Alphanumeric string of exactly `len` characters.
pub fn random_string(len: usize) -> String {
    Alphanumeric.sample_string(&mut rand::thread_rng(), len)
}

/// Random number with exactly `digits` decimal digits (no leading zero).
///
/// `digits` is clamped to `1..=18`.
pub fn random_number(digits: u32) -> u64 {
    let digits = digits.clamp(1, MAX_RANDOM_DIGITS);
    let low = if digits == 1 { 0 } else { 10u64.pow(digits - 1) };
    let high = 10u64.pow(digits);
    rand::thread_rng().gen_range(low..high)
}

/// Password with at least one lowercase, uppercase and digit character,
/// plus one symbol when `symbols` is set.
///
/// `len` is raised to the number of required classes when smaller.
pub fn random_password(len: usize, symbols: bool) -> String {
    let mut classes: Vec<&[u8]> = vec![LOWER, UPPER, DIGITS];
    if symbols {
        classes.push(SYMBOLS);
    }
    let len = len.max(classes.len());
    let pool: Vec<u8> = classes.iter().flat_map(|class| class.iter().copied()).collect();

    let mut rng = rand::thread_rng();
    let mut chars: Vec<u8> = classes
        .iter()
        .filter_map(|class| class.choose(&mut rng).copied())
        .collect();
    while chars.len() < len {
        if let Some(c) = pool.choose(&mut rng) {
            chars.push(*c);
        }
    }
    chars.shuffle(&mut rng);
    chars.into_iter().map(char::from).collect()
}

#[cfg(test)]
mod tests {
    use super::{random_number, random_password, random_string};

    #[test]
    fn random_string_has_requested_length() {
        let value = random_string(24);
        assert_eq!(value.len(), 24);
        assert!(value.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(random_string(24), value);
    }

    #[test]
    fn random_number_has_exact_digit_count() {
        for _ in 0..200 {
            let value = random_number(6);
            assert!((100_000..1_000_000).contains(&value));
        }
        assert!(random_number(1) < 10);
        assert!(random_number(40) < 10u64.pow(18));
    }

    #[test]
    fn password_contains_every_class() {
        let password = random_password(16, true);
        assert_eq!(password.len(), 16);
        assert!(password.chars().any(|c| c.is_ascii_lowercase()));
        assert!(password.chars().any(|c| c.is_ascii_uppercase()));
        assert!(password.chars().any(|c| c.is_ascii_digit()));
        assert!(password.chars().any(|c| !c.is_ascii_alphanumeric()));
        assert_eq!(random_password(1, false).len(), 3);
    }
}
