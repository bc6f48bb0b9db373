//! Currency display for the form output (`$1,234.56`)

use crate::constants::CURRENCY_SYMBOL;

/// Two decimals, comma thousands separators, `-$` prefix for negatives
pub fn format_currency(value: f64) -> String {
    if !value.is_finite() {
        return format!("{}{}", CURRENCY_SYMBOL, value);
    }

    let cents = (value.abs() * 100.0).round();
    let negative = value < 0.0 && cents > 0.0;

    // Split before grouping so the cent digits never pick up separators
    let text = format!("{:.0}", cents);
    let (whole, frac) = if text.len() > 2 {
        text.split_at(text.len() - 2)
    } else {
        ("0", text.as_str())
    };

    format!(
        "{}{}{}.{:0>2}",
        if negative { "-" } else { "" },
        CURRENCY_SYMBOL,
        group_thousands(whole),
        frac
    )
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
