//! Wall-clock access in one place.

use chrono::{NaiveDate, Utc};

/// Current time as Unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Current UTC calendar date.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Epoch milliseconds at UTC midnight of `date`.
pub fn date_start_epoch_ms(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|value| value.and_utc().timestamp_millis())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::date_start_epoch_ms;
    use chrono::NaiveDate;

    #[test]
    fn midnight_epoch_ms() {
        let date = NaiveDate::from_ymd_opt(1970, 1, 2).unwrap();
        assert_eq!(date_start_epoch_ms(date), 86_400_000);
    }
}
