//! Currency display helpers using Indonesian digit grouping.

/// Separator inserted between groups of three integer digits (id-ID locale).
pub const GROUP_SEPARATOR: char = '.';

/// Format an amount with grouped integer digits and no fractional part.
///
/// Non-finite input renders as `"0"` so a bad coercion never leaks into the
/// document. The currency code and the trailing `".00"` are the caller's
/// concern, see [`display_amount`].
///
/// ```
/// assert_eq!(invoicer::currency::format_currency(1_500_000.0), "1.500.000");
/// ```
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }

    let rounded = value.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(GROUP_SEPARATOR);
        }
        grouped.push(ch);
    }

    if negative {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Amount as shown on the preview's total line, e.g. `IDR 500.000.00`.
pub fn display_amount(code: &str, value: f64) -> String {
    format!("{} {}.00", code, format_currency(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands_with_dots() {
        assert_eq!(format_currency(1_500_000.0), "1.500.000");
        assert_eq!(format_currency(4_500.0), "4.500");
        assert_eq!(format_currency(999.0), "999");
        assert_eq!(format_currency(0.0), "0");
    }

    #[test]
    fn drops_fraction_by_rounding() {
        assert_eq!(format_currency(1_499.5), "1.500");
        assert_eq!(format_currency(12.4), "12");
    }

    #[test]
    fn negative_and_non_finite() {
        assert_eq!(format_currency(-2_500.0), "-2.500");
        assert_eq!(format_currency(-0.2), "0");
        assert_eq!(format_currency(f64::NAN), "0");
        assert_eq!(format_currency(f64::INFINITY), "0");
    }

    #[test]
    fn display_amount_appends_code_and_cents() {
        assert_eq!(display_amount("IDR", 500_000.0), "IDR 500.000.00");
    }
}
