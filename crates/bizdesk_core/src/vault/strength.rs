//! Heuristic password strength scoring.

use crate::model::vault::PasswordStrength;

const COMMON_PASSWORDS: &[&str] = &[
    "password", "123456", "12345678", "qwerty", "letmein", "welcome", "admin", "iloveyou",
    "monkey", "abc123",
];

/// Scores a password by length, character variety and obvious patterns.
pub fn score_password(password: &str) -> PasswordStrength {
    let lowered = password.to_lowercase();
    if password.chars().count() < 8 || COMMON_PASSWORDS.iter().any(|common| lowered.contains(common))
    {
        return PasswordStrength::Weak;
    }

    let classes = [
        password.chars().any(|c| c.is_lowercase()),
        password.chars().any(|c| c.is_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
        password.chars().any(|c| !c.is_alphanumeric()),
    ]
    .iter()
    .filter(|present| **present)
    .count();

    let mut score = classes;
    let len = password.chars().count();
    if len >= 12 {
        score += 1;
    }
    if len >= 16 {
        score += 1;
    }
    if has_long_run(password) {
        score = score.saturating_sub(1);
    }

    match score {
        0..=2 => PasswordStrength::Weak,
        3 => PasswordStrength::Fair,
        4 => PasswordStrength::Good,
        _ => PasswordStrength::Strong,
    }
}

fn has_long_run(password: &str) -> bool {
    let chars: Vec<char> = password.chars().collect();
    chars.windows(3).any(|window| window[0] == window[1] && window[1] == window[2])
}
