use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scale — Magnitude suffix for compact amounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Scale {
    #[default]
    Units,
    Thousands,
    Millions,
    Billions,
}

impl Scale {
    pub fn factor(self) -> f64 {
        match self {
            Scale::Units => 1.0,
            Scale::Thousands => 1_000.0,
            Scale::Millions => 1_000_000.0,
            Scale::Billions => 1_000_000_000.0,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Scale::Units => "",
            Scale::Thousands => "K",
            Scale::Millions => "M",
            Scale::Billions => "B",
        }
    }
}

// ---------------------------------------------------------------------------
// Amount — Structured monetary amount
// ---------------------------------------------------------------------------

/// A monetary amount stored as `value × scale` in an ISO 4217 currency.
///
/// `Amount { value: 32.5, currency: "USD", scale: Millions }` displays as
/// `$32.5M`. Aggregation always goes through [`Amount::in_millions`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Amount {
    pub value: f64,
    pub currency: String,
    #[serde(default)]
    pub scale: Scale,
}

impl Amount {
    pub fn new(value: f64, currency: &str, scale: Scale) -> Self {
        Self {
            value,
            currency: currency.to_string(),
            scale,
        }
    }

    /// Shorthand for a USD amount in millions.
    pub fn usd_millions(value: f64) -> Self {
        Self::new(value, "USD", Scale::Millions)
    }

    /// Absolute amount in currency units.
    pub fn units(&self) -> f64 {
        self.value * self.scale.factor()
    }

    pub fn in_millions(&self) -> f64 {
        self.units() / Scale::Millions.factor()
    }

    fn symbol(&self) -> &str {
        match self.currency.as_str() {
            "USD" => "$",
            "EUR" => "\u{20ac}",
            "GBP" => "\u{a3}",
            other => other,
        }
    }

    /// Compact display form, e.g. `$32.5M`.
    pub fn display(&self) -> String {
        let symbol = self.symbol();
        let sep = if symbol.len() == 3 && symbol.is_ascii() { " " } else { "" };
        format!(
            "{}{}{}{}",
            symbol,
            sep,
            trim_decimal(self.value),
            self.scale.suffix()
        )
    }
}

impl Default for Amount {
    fn default() -> Self {
        Self::new(0.0, "USD", Scale::Units)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// Format with at most one decimal place, dropping a trailing `.0`.
fn trim_decimal(value: f64) -> String {
    let s = format!("{:.1}", value);
    s.strip_suffix(".0").map(str::to_string).unwrap_or(s)
}
