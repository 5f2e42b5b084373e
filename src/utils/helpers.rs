/// Parse a user-typed USD amount.
///
/// Surrounding whitespace is ignored. Returns `None` for anything that is not
/// a finite number greater than zero (empty input, garbage, `inf`, `NaN`, 0).
pub fn parse_usd_amount(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}

/// `0x1234567890abcdef` -> `0x1234...cdef`. Short addresses pass through.
pub fn shorten_address(address: &str) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= 10 {
        return address.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// USD with thousands separators and two decimals, e.g. `$1,234.50`.
pub fn format_usd(value: f64) -> String {
    let negative = value < 0.0;
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    format!("{}${}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}

/// Token quantity at four decimals with its symbol, e.g. `0.2100 ETH`.
pub fn format_token_amount(amount: f64, symbol: &str) -> String {
    format!("{:.4} {}", amount, symbol)
}

/// Ratio as a percentage with one decimal, e.g. `0.3` -> `30.0%`.
pub fn format_ratio_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

pub fn format_health_factor(health_factor: f64) -> String {
    format!("{:.3}", health_factor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usd_amount() {
        assert_eq!(parse_usd_amount("400"), Some(400.0));
        assert_eq!(parse_usd_amount(" 12.5 "), Some(12.5));
        assert_eq!(parse_usd_amount(""), None);
        assert_eq!(parse_usd_amount("abc"), None);
        assert_eq!(parse_usd_amount("0"), None);
        assert_eq!(parse_usd_amount("-5"), None);
        assert_eq!(parse_usd_amount("inf"), None);
        assert_eq!(parse_usd_amount("NaN"), None);
    }

    #[test]
    fn test_shorten_address() {
        assert_eq!(shorten_address("0x1234567890abcdef"), "0x1234...cdef");
        assert_eq!(shorten_address("short"), "short");
        assert_eq!(shorten_address("0123456789"), "0123456789");
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_usd(0.0), "$0.00");
        assert_eq!(format_usd(20.0), "$20.00");
        assert_eq!(format_usd(1234.5), "$1,234.50");
        assert_eq!(format_usd(1_000_000.0), "$1,000,000.00");
        assert_eq!(format_usd(-999.999), "-$1,000.00");
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(format_token_amount(0.21, "ETH"), "0.2100 ETH");
        assert_eq!(format_ratio_percent(0.3), "30.0%");
        assert_eq!(format_health_factor(0.45), "0.450");
    }
}
