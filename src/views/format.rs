//! Display formatting shared by the view adapters.

/// Compact currency form: `$950`, `$12.5K`, `$3.4M`, `$1.1B`.
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let abs = value.abs();
    let (scaled, suffix) = if abs >= 1e9 {
        (abs / 1e9, "B")
    } else if abs >= 1e6 {
        (abs / 1e6, "M")
    } else if abs >= 1e3 {
        (abs / 1e3, "K")
    } else {
        return format!("{}${}", sign, trim_decimal(abs, 2));
    };
    format!("{}${}{}", sign, trim_decimal(scaled, 1), suffix)
}

/// Currency given in millions, e.g. a protocol TVL of `71.8` gives `$71.8M`.
pub fn format_millions(millions: f64) -> String {
    format_currency(millions * 1e6)
}

/// Integer with thousands separators: `12450` gives `12,450`.
pub fn format_number(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

pub fn format_percent(value: f64) -> String {
    format!("{}%", trim_decimal(value, 1))
}

/// Round to `places` decimals and drop trailing zeros.
fn trim_decimal(value: f64, places: usize) -> String {
    let s = format!("{:.*}", places, value);
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}
