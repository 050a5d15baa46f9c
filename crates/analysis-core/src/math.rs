//! Small numeric helpers shared by the calculators.

/// Mean of a slice, `None` when empty.
pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Round an optional value, passing `None` through.
pub fn round_opt(value: Option<f64>, decimals: u32) -> Option<f64> {
    value.map(|v| round_to(v, decimals))
}

/// Format with a thousands separator and a fixed number of decimals, e.g. `2,030.00`.
pub fn format_grouped(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(f) => format!("{sign}{grouped}.{f}"),
        None => format!("{sign}{grouped}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mean() {
        assert_eq!(mean(&[]), None);
        assert_relative_eq!(mean(&[1.0, 2.0, 3.0]).unwrap(), 2.0);
    }

    #[test]
    fn test_round_to() {
        assert_relative_eq!(round_to(1.23456789, 6), 1.234568, epsilon = 1e-12);
        assert_relative_eq!(round_to(1.499, 2), 1.5, epsilon = 1e-12);
        assert_relative_eq!(round_to(-2.345, 1), -2.3, epsilon = 1e-12);
    }

    #[test]
    fn test_format_grouped() {
        assert_eq!(format_grouped(2030.0, 2), "2,030.00");
        assert_eq!(format_grouped(1.08456, 2), "1.08");
        assert_eq!(format_grouped(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_grouped(-1500.5, 1), "-1,500.5");
        assert_eq!(format_grouped(999.999, 2), "1,000.00");
    }
}
