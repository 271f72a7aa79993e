use serde::{Deserialize, Serialize};

/// The board a security trades on, which decides the suffix the historical
/// feed expects after the security code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Market {
    /// Main board of the exchange (`.TW`).
    #[default]
    Listed,
    /// Over-the-counter board (`.TWO`).
    Otc,
}

impl Market {
    /// The market identifier appended to a code by the historical feed.
    pub fn suffix(self) -> &'static str {
        match self {
            Market::Listed => ".TW",
            Market::Otc => ".TWO",
        }
    }

    /// Builds the historical-feed symbol for a security code, e.g. `2330` -> `2330.TW`.
    pub fn symbol(self, code: &str) -> String {
        format!("{}{}", code.trim(), self.suffix())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_appends_market_suffix() {
        assert_eq!(Market::Listed.symbol("2330"), "2330.TW");
        assert_eq!(Market::Otc.symbol(" 6488 "), "6488.TWO");
    }

    #[test]
    fn deserializes_snake_case() {
        let m: Market = serde_json::from_str("\"otc\"").unwrap();
        assert_eq!(m, Market::Otc);
        assert_eq!(Market::default(), Market::Listed);
    }
}
