//! Typed Contract Arguments
//!
//! Arguments destined for 64/128-bit ledger fields are parsed from strings
//! with integer parsing only; floating-point parsing would silently lose
//! precision above 2^53.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;
use stellar_xdr::curr::{
    AccountId, Hash, Int128Parts, PublicKey as XdrPublicKey, ScAddress, ScVal, ScVec, Uint256,
    VecM,
};

use crate::error::WalletError;

/// Stroops per whole unit of the base asset
pub const STROOPS_PER_UNIT: i64 = 10_000_000;

/// A typed argument for a contract invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScArg {
    /// Account (`G...`) or contract (`C...`) address
    Address(String),
    /// Unsigned 64-bit integer
    U64(u64),
    /// Signed 128-bit integer
    I128(i128),
    /// Ordered sequence of arguments
    Vec(Vec<ScArg>),
}

impl ScArg {
    /// Address argument from a strkey string
    pub fn address(s: impl Into<String>) -> Self {
        ScArg::Address(s.into())
    }

    /// Parse a u64 argument from its decimal string form
    pub fn u64_from_str(s: &str) -> Result<Self, WalletError> {
        let value = s
            .trim()
            .parse::<u64>()
            .map_err(|_| WalletError::InvalidInput(format!("not a 64-bit integer: {}", s)))?;
        Ok(ScArg::U64(value))
    }

    /// Parse an i128 argument from its decimal string form
    pub fn i128_from_str(s: &str) -> Result<Self, WalletError> {
        let value = s
            .trim()
            .parse::<i128>()
            .map_err(|_| WalletError::InvalidInput(format!("not a 128-bit integer: {}", s)))?;
        Ok(ScArg::I128(value))
    }

    /// Vector argument
    pub fn vec(items: Vec<ScArg>) -> Self {
        ScArg::Vec(items)
    }

    /// Convert into the ledger's value representation
    pub fn to_scval(&self) -> Result<ScVal, WalletError> {
        match self {
            ScArg::Address(s) => Ok(ScVal::Address(to_sc_address(s)?)),
            ScArg::U64(v) => Ok(ScVal::U64(*v)),
            ScArg::I128(v) => Ok(ScVal::I128(Int128Parts {
                hi: (*v >> 64) as i64,
                lo: *v as u64,
            })),
            ScArg::Vec(items) => {
                let values = items
                    .iter()
                    .map(|a| a.to_scval())
                    .collect::<Result<Vec<_>, _>>()?;
                let values: VecM<ScVal> = values
                    .try_into()
                    .map_err(|_| WalletError::InvalidInput("argument vector too long".to_string()))?;
                Ok(ScVal::Vec(Some(ScVec(values))))
            }
        }
    }
}

/// Decode a strkey address into the ledger's address representation
pub(crate) fn to_sc_address(s: &str) -> Result<ScAddress, WalletError> {
    match s.as_bytes().first() {
        Some(b'G') => {
            let key = stellar_strkey::ed25519::PublicKey::from_string(s)
                .map_err(|_| WalletError::InvalidInput(format!("invalid account address: {}", s)))?;
            Ok(ScAddress::Account(AccountId(
                XdrPublicKey::PublicKeyTypeEd25519(Uint256(key.0)),
            )))
        }
        Some(b'C') => {
            let contract = stellar_strkey::Contract::from_string(s)
                .map_err(|_| WalletError::InvalidInput(format!("invalid contract address: {}", s)))?;
            Ok(ScAddress::Contract(Hash(contract.0)))
        }
        _ => Err(WalletError::InvalidInput(format!(
            "unrecognized address: {}",
            s
        ))),
    }
}

/// Convert a display amount (whole units, up to 7 decimal places) into
/// stroops, exactly.
pub fn amount_to_stroops(display: &str) -> Result<i128, WalletError> {
    let amount = Decimal::from_str(display.trim())
        .map_err(|_| WalletError::InvalidInput(format!("not a valid amount: {}", display)))?;
    if amount <= Decimal::ZERO {
        return Err(WalletError::InvalidInput("amount must be positive".to_string()));
    }
    let scaled = amount * Decimal::from(STROOPS_PER_UNIT);
    if scaled.fract() != Decimal::ZERO {
        return Err(WalletError::InvalidInput(format!(
            "amount has more precision than a stroop: {}",
            display
        )));
    }
    scaled
        .to_i128()
        .ok_or_else(|| WalletError::InvalidInput(format!("amount out of range: {}", display)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account_strkey(byte: u8) -> String {
        stellar_strkey::ed25519::PublicKey([byte; 32]).to_string()
    }

    fn contract_strkey(byte: u8) -> String {
        stellar_strkey::Contract([byte; 32]).to_string()
    }

    #[test]
    fn test_i128_parsed_without_precision_loss() {
        let arg = ScArg::i128_from_str("123456789012345678").unwrap();
        match arg.to_scval().unwrap() {
            ScVal::I128(parts) => {
                let value = ((parts.hi as i128) << 64) | (parts.lo as i128);
                assert_eq!(value, 123_456_789_012_345_678_i128);
            }
            other => panic!("expected I128, got {:?}", other),
        }
    }

    #[test]
    fn test_i128_beyond_f64_precision() {
        // 2^63 + 1 is not representable in an f64; integer parsing keeps it.
        let arg = ScArg::i128_from_str("9223372036854775809").unwrap();
        assert_eq!(arg, ScArg::I128(9_223_372_036_854_775_809_i128));
    }

    #[test]
    fn test_integer_parsing_rejects_float_forms() {
        assert!(ScArg::i128_from_str("1.5").is_err());
        assert!(ScArg::i128_from_str("1e5").is_err());
        assert!(ScArg::u64_from_str("2.0").is_err());
        assert!(ScArg::u64_from_str("-3").is_err());
    }

    #[test]
    fn test_amount_to_stroops() {
        assert_eq!(amount_to_stroops("25").unwrap(), 250_000_000);
        assert_eq!(amount_to_stroops("0.0000001").unwrap(), 1);
        assert_eq!(amount_to_stroops("1.5").unwrap(), 15_000_000);
    }

    #[test]
    fn test_amount_to_stroops_rejects_sub_stroop_precision() {
        assert!(amount_to_stroops("0.00000001").is_err());
    }

    #[test]
    fn test_amount_to_stroops_rejects_non_positive() {
        assert!(amount_to_stroops("0").is_err());
        assert!(amount_to_stroops("-5").is_err());
        assert!(amount_to_stroops("abc").is_err());
    }

    #[test]
    fn test_address_decoding() {
        let account = account_strkey(3);
        assert!(matches!(to_sc_address(&account).unwrap(), ScAddress::Account(_)));

        let contract = contract_strkey(9);
        assert!(matches!(to_sc_address(&contract).unwrap(), ScAddress::Contract(_)));

        assert!(to_sc_address("not-an-address").is_err());
        assert!(to_sc_address("GABC").is_err());
    }

    #[test]
    fn test_vec_arg_converts_elementwise() {
        let arg = ScArg::vec(vec![ScArg::U64(1), ScArg::U64(2)]);
        match arg.to_scval().unwrap() {
            ScVal::Vec(Some(values)) => assert_eq!(values.0.len(), 2),
            other => panic!("expected Vec, got {:?}", other),
        }
    }
}
