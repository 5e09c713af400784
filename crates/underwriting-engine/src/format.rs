/// Render a dollar amount with thousands separators, e.g. `$1,250,000`.
pub fn format_currency(amount: f64) -> String {
    if !amount.is_finite() {
        return format!("${amount}");
    }

    let rounded = amount.round();
    let negative = rounded < 0.0;
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-${grouped}")
    } else {
        format!("${grouped}")
    }
}

/// Render a number without a trailing `.0` when it is integral.
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        format!("{value}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_currency(250_000.0), "$250,000");
        assert_eq!(format_currency(1_250_000.4), "$1,250,000");
        assert_eq!(format_currency(999.0), "$999");
        assert_eq!(format_currency(-5_000.0), "-$5,000");
    }

    #[test]
    fn trims_integral_numbers() {
        assert_eq!(format_number(45.0), "45");
        assert_eq!(format_number(27.5), "27.5");
    }
}
