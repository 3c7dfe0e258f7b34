//! Error types for the marketplace program
//!
//! Every domain error carries a stable numeric code. Inside the ledger a
//! program failure travels as `parcel_ledger::Error::Program { code, .. }`;
//! converting back through [`From`] restores the typed variant, so callers
//! can match on [`ParcelError`] directly.

use thiserror::Error;

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, ParcelError>;

/// First code handed to domain errors
pub const ERROR_CODE_OFFSET: u32 = 6000;

/// Marketplace errors
#[derive(Error, Debug)]
pub enum ParcelError {
    /// The platform record already exists
    #[error("Platform is already initialized")]
    AlreadyInitialized,

    /// The package id is already taken on this platform
    #[error("Package id is already in use")]
    DuplicatePackageId,

    /// A dimension is zero
    #[error("Package dimensions must be positive")]
    InvalidDimensions,

    /// Weight is zero
    #[error("Package weight must be positive")]
    InvalidWeight,

    /// The caller already has a carrier profile
    #[error("Carrier profile already exists")]
    AlreadyExists,

    /// The package is not in the state this operation starts from
    #[error("Invalid package status transition")]
    InvalidStatusTransition,

    /// No carrier profile for the caller
    #[error("Carrier profile not found")]
    CarrierNotFound,

    /// Funding amount differs from the package price
    #[error("Escrow amount does not match package price")]
    AmountMismatch,

    /// Escrow was already funded
    #[error("Escrow is already funded")]
    AlreadyFunded,

    /// Caller is not the package sender
    #[error("Caller is not authorized for this package")]
    Unauthorized,

    /// The package has not been accepted by a carrier
    #[error("Package has not been accepted by a carrier")]
    PackageNotAccepted,

    /// Caller is not the carrier assigned to the package
    #[error("Caller is not the assigned carrier")]
    NotAssignedCarrier,

    /// Escrow holds no funds to release
    #[error("Escrow is not funded")]
    EscrowNotFunded,

    /// The package was already delivered
    #[error("Package is already delivered")]
    AlreadyDelivered,

    /// Checked arithmetic failed
    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// Fee rate above 10000 basis points
    #[error("Fee rate exceeds 10000 basis points")]
    InvalidFeeRate,

    /// The platform record does not exist yet
    #[error("Platform is not initialized")]
    PlatformNotInitialized,

    /// Price is zero
    #[error("Package price must be positive")]
    InvalidPrice,

    /// Description exceeds the record budget
    #[error("Package description is too long")]
    DescriptionTooLong,

    /// All 256 package ids are taken
    #[error("Package id space is exhausted")]
    PackageIdSpaceExhausted,

    /// Initial reputation above the allowed maximum
    #[error("Initial reputation is out of range")]
    InvalidReputation,

    /// Carrier reputation below the acceptance threshold
    #[error("Carrier reputation is too low to accept deliveries")]
    InsufficientReputation,

    /// No package at the given address
    #[error("Package not found")]
    PackageNotFound,

    /// Escrow record already created for the package
    #[error("Escrow is already initialized")]
    EscrowAlreadyInitialized,

    /// No escrow record for the package
    #[error("Escrow not found")]
    EscrowNotFound,

    /// Sender balance cannot cover the escrow deposit
    #[error("Insufficient funds for escrow deposit")]
    InsufficientFunds,

    /// Escrow points at a different package
    #[error("Escrow does not belong to this package")]
    EscrowPackageMismatch,

    /// Record bytes have the wrong tag, owner or layout
    #[error("Invalid record data")]
    InvalidRecord,

    /// Instruction bytes could not be decoded
    #[error("Invalid instruction data")]
    InvalidInstruction,

    /// Substrate failure (signature, storage, reserve, ...)
    #[error("Ledger error: {0}")]
    Ledger(parcel_ledger::Error),
}

impl ParcelError {
    /// Stable numeric code, `None` for substrate errors
    pub fn code(&self) -> Option<u32> {
        use ParcelError::*;

        let index = match self {
            AlreadyInitialized => 0,
            DuplicatePackageId => 1,
            InvalidDimensions => 2,
            InvalidWeight => 3,
            AlreadyExists => 4,
            InvalidStatusTransition => 5,
            CarrierNotFound => 6,
            AmountMismatch => 7,
            AlreadyFunded => 8,
            Unauthorized => 9,
            PackageNotAccepted => 10,
            NotAssignedCarrier => 11,
            EscrowNotFunded => 12,
            AlreadyDelivered => 13,
            ArithmeticOverflow => 14,
            InvalidFeeRate => 15,
            PlatformNotInitialized => 16,
            InvalidPrice => 17,
            DescriptionTooLong => 18,
            PackageIdSpaceExhausted => 19,
            InvalidReputation => 20,
            InsufficientReputation => 21,
            PackageNotFound => 22,
            EscrowAlreadyInitialized => 23,
            EscrowNotFound => 24,
            InsufficientFunds => 25,
            EscrowPackageMismatch => 26,
            InvalidRecord => 27,
            InvalidInstruction => 28,
            Ledger(_) => return None,
        };
        Some(ERROR_CODE_OFFSET + index)
    }

    /// Recover a domain error from its code
    pub fn from_code(code: u32) -> Option<Self> {
        use ParcelError::*;

        let error = match code.checked_sub(ERROR_CODE_OFFSET)? {
            0 => AlreadyInitialized,
            1 => DuplicatePackageId,
            2 => InvalidDimensions,
            3 => InvalidWeight,
            4 => AlreadyExists,
            5 => InvalidStatusTransition,
            6 => CarrierNotFound,
            7 => AmountMismatch,
            8 => AlreadyFunded,
            9 => Unauthorized,
            10 => PackageNotAccepted,
            11 => NotAssignedCarrier,
            12 => EscrowNotFunded,
            13 => AlreadyDelivered,
            14 => ArithmeticOverflow,
            15 => InvalidFeeRate,
            16 => PlatformNotInitialized,
            17 => InvalidPrice,
            18 => DescriptionTooLong,
            19 => PackageIdSpaceExhausted,
            20 => InvalidReputation,
            21 => InsufficientReputation,
            22 => PackageNotFound,
            23 => EscrowAlreadyInitialized,
            24 => EscrowNotFound,
            25 => InsufficientFunds,
            26 => EscrowPackageMismatch,
            27 => InvalidRecord,
            28 => InvalidInstruction,
            _ => return None,
        };
        Some(error)
    }
}

impl From<parcel_ledger::Error> for ParcelError {
    fn from(error: parcel_ledger::Error) -> Self {
        match error {
            parcel_ledger::Error::Program { code, .. } => {
                ParcelError::from_code(code).unwrap_or(ParcelError::Ledger(error))
            }
            other => ParcelError::Ledger(other),
        }
    }
}

impl From<ParcelError> for parcel_ledger::Error {
    fn from(error: ParcelError) -> Self {
        match error.code() {
            Some(code) => parcel_ledger::Error::Program {
                code,
                message: error.to_string(),
            },
            None => match error {
                ParcelError::Ledger(inner) => inner,
                other => parcel_ledger::Error::Program {
                    code: 0,
                    message: other.to_string(),
                },
            },
        }
    }
}

impl From<bincode::Error> for ParcelError {
    fn from(_: bincode::Error) -> Self {
        ParcelError::InvalidRecord
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_roundtrip() {
        for code in ERROR_CODE_OFFSET..ERROR_CODE_OFFSET + 29 {
            let error = ParcelError::from_code(code).unwrap();
            assert_eq!(error.code(), Some(code));
        }
        assert!(ParcelError::from_code(ERROR_CODE_OFFSET + 29).is_none());
        assert!(ParcelError::from_code(42).is_none());
    }

    #[test]
    fn test_crosses_ledger_boundary() {
        let ledger_error: parcel_ledger::Error = ParcelError::NotAssignedCarrier.into();
        assert!(matches!(
            ledger_error,
            parcel_ledger::Error::Program { code: 6011, .. }
        ));

        let back: ParcelError = ledger_error.into();
        assert!(matches!(back, ParcelError::NotAssignedCarrier));
    }

    #[test]
    fn test_substrate_errors_pass_through() {
        let original = parcel_ledger::Error::DuplicateTransaction("sig".to_string());
        let wrapped: ParcelError = original.into();
        assert!(wrapped.code().is_none());

        let unwrapped: parcel_ledger::Error = wrapped.into();
        assert!(matches!(unwrapped, parcel_ledger::Error::DuplicateTransaction(_)));
    }

    #[test]
    fn test_unknown_program_code_stays_wrapped() {
        let foreign = parcel_ledger::Error::Program {
            code: 1,
            message: "other program".to_string(),
        };
        assert!(matches!(ParcelError::from(foreign), ParcelError::Ledger(_)));
    }
}
