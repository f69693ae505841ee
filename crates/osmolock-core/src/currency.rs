use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use serde::{Deserialize, Serialize};

use crate::error::LockupError;

// ── Currency ─────────────────────────────────────────────────────────────────

/// Display metadata for one chain currency.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Currency {
    /// Human-facing ticker, e.g. `OSMO`.
    pub coin_denom: String,
    /// On-chain denomination amounts are expressed in, e.g. `uosmo`.
    pub coin_minimal_denom: String,
    /// Number of decimal places between the two denominations.
    pub coin_decimals: u8,
}

impl Currency {
    pub fn new(
        coin_denom: impl Into<String>,
        coin_minimal_denom: impl Into<String>,
        coin_decimals: u8,
    ) -> Self {
        Self {
            coin_denom: coin_denom.into(),
            coin_minimal_denom: coin_minimal_denom.into(),
            coin_decimals,
        }
    }

    /// Placeholder for a denomination the chain metadata does not know yet:
    /// displayed by its raw denom with no decimal scaling.
    pub fn unknown(minimal_denom: impl Into<String>) -> Self {
        let denom = minimal_denom.into();
        Self {
            coin_denom: denom.clone(),
            coin_minimal_denom: denom,
            coin_decimals: 0,
        }
    }
}

// ── CoinPretty ───────────────────────────────────────────────────────────────

/// An exact amount of one currency, held in minimal-denomination units.
///
/// All arithmetic goes through [`BigDecimal`]; nothing here touches floats.
#[derive(Clone, Debug, PartialEq)]
pub struct CoinPretty {
    currency: Currency,
    amount: BigDecimal,
}

impl CoinPretty {
    pub fn new(currency: Currency, amount: BigDecimal) -> Self {
        Self { currency, amount }
    }

    pub fn zero(currency: Currency) -> Self {
        Self::new(currency, BigDecimal::zero())
    }

    /// Parse an amount given in minimal-denomination units (`"1500000"`).
    pub fn from_minimal(currency: Currency, amount: &str) -> Result<Self, LockupError> {
        let amount = parse_decimal(&currency.coin_minimal_denom, amount)?;
        Ok(Self::new(currency, amount))
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    /// Amount in minimal-denomination units.
    pub fn raw_amount(&self) -> &BigDecimal {
        &self.amount
    }

    pub fn is_zero(&self) -> bool {
        self.amount.is_zero()
    }

    /// Add a minimal-denomination amount.
    pub fn add_raw(&self, amount: &BigDecimal) -> Self {
        Self::new(self.currency.clone(), &self.amount + amount)
    }

    /// Amount scaled by the currency's decimals (`1500000 uosmo` → `1.5`).
    pub fn to_dec(&self) -> BigDecimal {
        let (digits, exponent) = self.amount.clone().into_bigint_and_exponent();
        BigDecimal::new(digits, exponent + i64::from(self.currency.coin_decimals))
    }
}

impl fmt::Display for CoinPretty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            format_plain(&self.to_dec(), self.currency.coin_decimals),
            self.currency.coin_denom
        )
    }
}

/// Parse a decimal or integer string into an exact decimal.
pub(crate) fn parse_decimal(denom: &str, value: &str) -> Result<BigDecimal, LockupError> {
    let invalid = || LockupError::InvalidAmount {
        denom: denom.to_string(),
        value: value.to_string(),
    };
    // BigDecimal also accepts exponent notation; the chain never emits it.
    if value.is_empty()
        || !value
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == '-')
    {
        return Err(invalid());
    }
    BigDecimal::from_str(value).map_err(|_| invalid())
}

/// Render without exponent notation, with trailing fractional zeros trimmed.
fn format_plain(value: &BigDecimal, decimals: u8) -> String {
    value
        .with_scale(i64::from(decimals))
        .normalized()
        .to_plain_string()
}
