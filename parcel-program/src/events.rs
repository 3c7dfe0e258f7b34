//! Events emitted by successful operations
//!
//! Events are recorded as JSON in the transaction receipt and journal entry.

use parcel_ledger::Address;
use serde::{Deserialize, Serialize};

/// Marketplace event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum ParcelEvent {
    /// Platform record created
    PlatformInitialized {
        /// Platform address
        platform: Address,
        /// Administrator
        authority: Address,
        /// Fee in basis points
        fee_rate: u16,
    },

    /// Package registered
    PackageRegistered {
        /// Package address
        package: Address,
        /// Package id
        package_id: u8,
        /// Sender wallet
        sender: Address,
        /// Agreed price
        price: u64,
    },

    /// Carrier profile created
    CarrierCreated {
        /// Carrier record address
        carrier: Address,
        /// Owning wallet
        authority: Address,
        /// Starting reputation
        reputation: u32,
    },

    /// Carrier took a package
    DeliveryAccepted {
        /// Package address
        package: Address,
        /// Package id
        package_id: u8,
        /// Carrier record address
        carrier: Address,
        /// Acceptance time
        accepted_at: i64,
    },

    /// Escrow record allocated
    EscrowInitialized {
        /// Escrow address
        escrow: Address,
        /// Package address
        package: Address,
    },

    /// Price locked in escrow
    EscrowFunded {
        /// Escrow address
        escrow: Address,
        /// Package address
        package: Address,
        /// Locked lamports
        amount: u64,
    },

    /// Escrow released and package delivered
    DeliveryCompleted {
        /// Package address
        package: Address,
        /// Package id
        package_id: u8,
        /// Carrier record address
        carrier: Address,
        /// Paid to the carrier authority
        carrier_payment: u64,
        /// Paid to the platform
        platform_fee: u64,
        /// Release time
        released_at: i64,
    },
}

impl ParcelEvent {
    /// Decode an event recorded in a receipt or journal entry
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
