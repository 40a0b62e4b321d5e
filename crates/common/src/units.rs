//! Exact conversion between decimal ETH strings and integer wei.
//!
//! Every amount that enters a transaction must be converted from the decimal
//! display form to wei using integer arithmetic only. Floating point never
//! touches these values: the conversion controls funds transfer.
//!
//! The reverse direction (`format_wei`) is for display only. Its output is
//! lossy once trailing zeros are trimmed and must never be parsed back for
//! further computation.

use thiserror::Error;

/// Number of decimal places in the native currency (1 ETH = 10^18 wei).
pub const ETH_DECIMALS: u32 = 18;

/// 10^18, the smallest-unit scale factor.
pub const WEI_PER_ETH: u128 = 1_000_000_000_000_000_000;

// ════════════════════════════════════════════════════════════════════════════
// ERROR TYPE
// ════════════════════════════════════════════════════════════════════════════

/// Errors from amount parsing and cost arithmetic.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnitsError {
    /// Input is empty or contains no digits.
    #[error("empty amount")]
    Empty,

    /// Input contains a character that is not a digit or a single decimal point.
    #[error("invalid character {0:?} in amount")]
    InvalidCharacter(char),

    /// More than 18 fractional digits cannot be represented in wei.
    #[error("too many decimal places ({0}, max 18)")]
    TooManyDecimals(usize),

    /// Value does not fit in 128 bits of wei.
    #[error("amount overflows wei range")]
    Overflow,
}

// ════════════════════════════════════════════════════════════════════════════
// PARSING
// ════════════════════════════════════════════════════════════════════════════

/// Parse a decimal ETH string ("0.5", "1.23456789") into wei.
///
/// Integer arithmetic only; the result equals `value * 10^18` exactly.
/// Rejects signs, exponents, more than one decimal point, more than 18
/// fractional digits, and values that overflow `u128`.
pub fn parse_eth(input: &str) -> Result<u128, UnitsError> {
    let s = input.trim();
    if s.is_empty() {
        return Err(UnitsError::Empty);
    }

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };

    if int_part.is_empty() && frac_part.is_empty() {
        return Err(UnitsError::Empty);
    }
    if frac_part.len() > ETH_DECIMALS as usize {
        return Err(UnitsError::TooManyDecimals(frac_part.len()));
    }

    let mut int_value: u128 = 0;
    for c in int_part.chars() {
        let digit = c.to_digit(10).ok_or(UnitsError::InvalidCharacter(c))? as u128;
        int_value = int_value
            .checked_mul(10)
            .and_then(|v| v.checked_add(digit))
            .ok_or(UnitsError::Overflow)?;
    }

    let mut frac_value: u128 = 0;
    for c in frac_part.chars() {
        let digit = c.to_digit(10).ok_or(UnitsError::InvalidCharacter(c))? as u128;
        // At most 18 digits: cannot overflow u128.
        frac_value = frac_value * 10 + digit;
    }
    for _ in frac_part.len()..ETH_DECIMALS as usize {
        frac_value *= 10;
    }

    int_value
        .checked_mul(WEI_PER_ETH)
        .and_then(|v| v.checked_add(frac_value))
        .ok_or(UnitsError::Overflow)
}

// ════════════════════════════════════════════════════════════════════════════
// DISPLAY
// ════════════════════════════════════════════════════════════════════════════

/// Format wei as a decimal ETH string for display.
///
/// Trailing fractional zeros are trimmed ("0.500" becomes "0.5"); a whole
/// number renders without a decimal point. Display output only.
pub fn format_wei(wei: u128) -> String {
    let int_part = wei / WEI_PER_ETH;
    let frac_part = wei % WEI_PER_ETH;
    if frac_part == 0 {
        return int_part.to_string();
    }
    let frac = format!("{:018}", frac_part);
    let trimmed = frac.trim_end_matches('0');
    format!("{}.{}", int_part, trimmed)
}

// ════════════════════════════════════════════════════════════════════════════
// COST ARITHMETIC
// ════════════════════════════════════════════════════════════════════════════

/// Total cost of a transfer: `amount + gas_limit * gas_price`, checked.
pub fn total_cost(amount_wei: u128, gas_limit: u64, gas_price_wei: u128) -> Result<u128, UnitsError> {
    let fee = (gas_limit as u128)
        .checked_mul(gas_price_wei)
        .ok_or(UnitsError::Overflow)?;
    amount_wei.checked_add(fee).ok_or(UnitsError::Overflow)
}
