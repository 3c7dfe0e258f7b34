//! Instruction wire format
//!
//! Instructions are bincode-encoded. Variant order is part of the wire
//! contract: do not reorder.

use crate::{error::ParcelError, Result};
use parcel_ledger::Address;
use serde::{Deserialize, Serialize};

/// Marketplace operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParcelInstruction {
    /// Create the platform record, signed by the future authority
    Initialize {
        /// Fee in basis points, config default when absent
        fee_rate: Option<u16>,
        /// Optional fungible asset reference
        default_token: Option<Address>,
    },

    /// Register a package, signed and paid for by the sender
    RegisterPackage {
        /// Free-form description
        description: String,
        /// Weight
        weight: u64,
        /// Length, width, height
        dimensions: [u32; 3],
        /// Agreed payment in lamports
        price: u64,
        /// Identifier, unique per platform
        package_id: u8,
    },

    /// Create the signer's carrier profile
    CreateCarrier {
        /// Starting reputation
        initial_reputation: u32,
    },

    /// Take a registered package, signed by a carrier authority
    AcceptDelivery {
        /// Package address
        package: Address,
    },

    /// Allocate the escrow record, signed by the sender
    InitializeEscrow {
        /// Package address
        package: Address,
    },

    /// Deposit the price into escrow, signed by the sender
    CreateEscrow {
        /// Package address
        package: Address,
        /// Deposit, must equal the package price
        amount: u64,
    },

    /// Release escrow and close the delivery, signed by the assigned carrier
    CompleteDelivery {
        /// Package address
        package: Address,
    },
}

impl ParcelInstruction {
    /// Encode for a transaction payload
    pub fn pack(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|_| ParcelError::InvalidInstruction)
    }

    /// Decode a transaction payload
    pub fn unpack(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data).map_err(|_| ParcelError::InvalidInstruction)
    }

    /// Operation name, as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            ParcelInstruction::Initialize { .. } => "initialize",
            ParcelInstruction::RegisterPackage { .. } => "register_package",
            ParcelInstruction::CreateCarrier { .. } => "create_carrier",
            ParcelInstruction::AcceptDelivery { .. } => "accept_delivery",
            ParcelInstruction::InitializeEscrow { .. } => "initialize_escrow",
            ParcelInstruction::CreateEscrow { .. } => "create_escrow",
            ParcelInstruction::CompleteDelivery { .. } => "complete_delivery",
        }
    }
}
