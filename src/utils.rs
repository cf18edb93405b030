/// Round to one decimal place, halves away from zero.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// True when `s` has the `yyyy-mm-dd` shape of the store's date column.
/// Only the shape is checked; calendar validity is left to the store lookup.
pub fn looks_like_iso_date(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() == 10
        && b[4] == b'-'
        && b[7] == b'-'
        && b.iter()
            .enumerate()
            .all(|(i, c)| i == 4 || i == 7 || c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_one_decimal() {
        assert_eq!(round_to_tenth(71.66), 71.7);
        assert_eq!(round_to_tenth(71.64), 71.6);
        assert_eq!(round_to_tenth(-3.25), -3.3);
        assert_eq!(round_to_tenth(74.0), 74.0);
    }

    #[test]
    fn iso_date_shape() {
        assert!(looks_like_iso_date("2016-08-23"));
        assert!(looks_like_iso_date("2016-13-45"));
        assert!(!looks_like_iso_date("2016-8-23"));
        assert!(!looks_like_iso_date("20160823"));
        assert!(!looks_like_iso_date("2016/08/23"));
    }
}
