//! Payout arithmetic

use crate::{error::ParcelError, Result};

/// 100% in basis points
pub const BASIS_POINTS: u16 = 10_000;

/// How a released escrow is divided
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeSplit {
    /// Kept by the platform
    pub platform_fee: u64,
    /// Paid to the carrier
    pub carrier_payment: u64,
}

impl FeeSplit {
    /// `platform_fee = floor(amount * fee_rate / 10000)`, the rest to the carrier
    pub fn compute(amount: u64, fee_rate: u16) -> Result<Self> {
        if fee_rate > BASIS_POINTS {
            return Err(ParcelError::InvalidFeeRate);
        }

        let fee = u128::from(amount)
            .checked_mul(u128::from(fee_rate))
            .ok_or(ParcelError::ArithmeticOverflow)?
            / u128::from(BASIS_POINTS);
        let platform_fee = u64::try_from(fee).map_err(|_| ParcelError::ArithmeticOverflow)?;
        let carrier_payment = amount
            .checked_sub(platform_fee)
            .ok_or(ParcelError::ArithmeticOverflow)?;

        Ok(Self {
            platform_fee,
            carrier_payment,
        })
    }

    /// Sum of both shares
    pub fn total(&self) -> Result<u64> {
        self.platform_fee
            .checked_add(self.carrier_payment)
            .ok_or(ParcelError::ArithmeticOverflow)
    }
}
