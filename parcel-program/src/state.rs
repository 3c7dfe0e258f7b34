//! Marketplace records
//!
//! Each record is stored as an 8-byte type tag followed by its bincode body,
//! zero-padded to a fixed size so later updates never outgrow the reserve
//! paid at creation.

use crate::{error::ParcelError, Result};
use parcel_ledger::{crypto::hash_bytes, Address};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Length of the type tag in front of every record
pub const DISCRIMINATOR_LEN: usize = 8;

/// Longest description a package record can hold
pub const MAX_DESCRIPTION_LEN: usize = 256;

/// Number of distinct package ids per platform
pub const PACKAGE_ID_SPACE: u64 = 256;

const ADDRESS_LEN: usize = 32;
const OPTION_ADDRESS_LEN: usize = 1 + ADDRESS_LEN;
const ENUM_TAG_LEN: usize = 4;
const STRING_PREFIX_LEN: usize = 8;

/// A typed record stored in a program-owned account
pub trait Record: Serialize + DeserializeOwned {
    /// Type name hashed into the discriminator
    const NAME: &'static str;

    /// Allocated account size, including the discriminator
    const SPACE: usize;

    /// First 8 bytes of `sha256("record:<NAME>")`
    fn discriminator() -> [u8; DISCRIMINATOR_LEN] {
        let digest = hash_bytes(format!("record:{}", Self::NAME).as_bytes());
        let mut tag = [0u8; DISCRIMINATOR_LEN];
        tag.copy_from_slice(&digest[..DISCRIMINATOR_LEN]);
        tag
    }

    /// True if `data` carries this record's tag
    fn matches(data: &[u8]) -> bool {
        data.len() >= DISCRIMINATOR_LEN && data[..DISCRIMINATOR_LEN] == Self::discriminator()
    }

    /// Encode into exactly [`Record::SPACE`] bytes
    fn pack(&self) -> Result<Vec<u8>> {
        let mut data = Self::discriminator().to_vec();
        bincode::serialize_into(&mut data, self)?;
        if data.len() > Self::SPACE {
            return Err(ParcelError::InvalidRecord);
        }
        data.resize(Self::SPACE, 0);
        Ok(data)
    }

    /// Decode, checking the tag
    fn unpack(data: &[u8]) -> Result<Self> {
        if !Self::matches(data) {
            return Err(ParcelError::InvalidRecord);
        }
        Ok(bincode::deserialize(&data[DISCRIMINATOR_LEN..])?)
    }
}

/// Package lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackageStatus {
    /// Waiting for a carrier
    Registered,
    /// Accepted and on its way
    InTransit,
    /// Delivered and paid out
    Delivered,
}

/// Escrow lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Record allocated, nothing deposited
    Uninitialized,
    /// Price locked in custody
    Funded,
    /// Paid out to carrier and platform
    Released,
}

/// Singleton marketplace configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Administrator
    pub authority: Address,
    /// Fee in basis points
    pub fee_rate: u16,
    /// Packages registered so far
    pub total_packages: u64,
    /// Optional fungible asset reference
    pub default_token: Option<Address>,
    /// Derivation bump
    pub bump: u8,
    /// Creation time (unix seconds)
    pub created_at: i64,
}

impl Record for Platform {
    const NAME: &'static str = "Platform";
    const SPACE: usize = DISCRIMINATOR_LEN + ADDRESS_LEN + 2 + 8 + OPTION_ADDRESS_LEN + 1 + 8;
}

/// One shipment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    /// Identifier, unique per platform
    pub id: u8,
    /// Registering wallet
    pub sender: Address,
    /// Accepting carrier's record address
    pub carrier: Option<Address>,
    /// Free-form description
    pub description: String,
    /// Weight
    pub weight: u64,
    /// Length, width, height
    pub dimensions: [u32; 3],
    /// Agreed payment in lamports
    pub price: u64,
    /// Lifecycle state
    pub status: PackageStatus,
    /// Registration time
    pub created_at: i64,
    /// Acceptance time, zero until accepted
    pub accepted_at: i64,
    /// Delivery time, zero until delivered
    pub delivered_at: i64,
    /// Derivation bump
    pub bump: u8,
}

impl Record for Package {
    const NAME: &'static str = "Package";
    const SPACE: usize = DISCRIMINATOR_LEN
        + 1
        + ADDRESS_LEN
        + OPTION_ADDRESS_LEN
        + STRING_PREFIX_LEN
        + MAX_DESCRIPTION_LEN
        + 8
        + 3 * 4
        + 8
        + ENUM_TAG_LEN
        + 3 * 8
        + 1;
}

impl Package {
    /// Registered → InTransit
    pub fn accept(&mut self, carrier: Address, now: i64) -> Result<()> {
        match self.status {
            PackageStatus::Registered => {
                self.carrier = Some(carrier);
                self.status = PackageStatus::InTransit;
                self.accepted_at = now;
                Ok(())
            }
            PackageStatus::InTransit | PackageStatus::Delivered => {
                Err(ParcelError::InvalidStatusTransition)
            }
        }
    }

    /// InTransit → Delivered
    pub fn deliver(&mut self, now: i64) -> Result<()> {
        match self.status {
            PackageStatus::InTransit => {
                self.status = PackageStatus::Delivered;
                self.delivered_at = now;
                Ok(())
            }
            PackageStatus::Delivered => Err(ParcelError::AlreadyDelivered),
            PackageStatus::Registered => Err(ParcelError::InvalidStatusTransition),
        }
    }

    /// Assigned carrier record, present once accepted
    pub fn assigned_carrier(&self) -> Result<Address> {
        self.carrier.ok_or(ParcelError::PackageNotAccepted)
    }
}

/// Delivery agent profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Carrier {
    /// Owning wallet, receives payouts
    pub authority: Address,
    /// Externally maintained score
    pub reputation: u32,
    /// Completed deliveries
    pub completed_deliveries: u64,
    /// Derivation bump
    pub bump: u8,
    /// Creation time
    pub created_at: i64,
}

impl Record for Carrier {
    const NAME: &'static str = "Carrier";
    const SPACE: usize = DISCRIMINATOR_LEN + ADDRESS_LEN + 4 + 8 + 1 + 8;
}

impl Carrier {
    /// Count one more completed delivery
    pub fn record_delivery(&mut self) -> Result<()> {
        self.completed_deliveries = self
            .completed_deliveries
            .checked_add(1)
            .ok_or(ParcelError::ArithmeticOverflow)?;
        Ok(())
    }
}

/// Payment custody for one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    /// Package address
    pub package: Address,
    /// Paying wallet
    pub sender: Address,
    /// Carrier record address
    pub carrier: Address,
    /// Locked lamports
    pub amount: u64,
    /// Lifecycle state
    pub status: EscrowStatus,
    /// Allocation time
    pub created_at: i64,
    /// Deposit time, zero until funded
    pub funded_at: i64,
    /// Release time, zero until released
    pub released_at: i64,
    /// Derivation bump
    pub bump: u8,
}

impl Record for Escrow {
    const NAME: &'static str = "Escrow";
    const SPACE: usize = DISCRIMINATOR_LEN + 3 * ADDRESS_LEN + 8 + ENUM_TAG_LEN + 3 * 8 + 1;
}

impl Escrow {
    /// Uninitialized → Funded
    pub fn fund(&mut self, amount: u64, now: i64) -> Result<()> {
        match self.status {
            EscrowStatus::Uninitialized => {
                self.amount = amount;
                self.status = EscrowStatus::Funded;
                self.funded_at = now;
                Ok(())
            }
            EscrowStatus::Funded | EscrowStatus::Released => Err(ParcelError::AlreadyFunded),
        }
    }

    /// Funded → Released
    pub fn release(&mut self, now: i64) -> Result<()> {
        match self.status {
            EscrowStatus::Funded => {
                self.status = EscrowStatus::Released;
                self.released_at = now;
                Ok(())
            }
            EscrowStatus::Uninitialized | EscrowStatus::Released => {
                Err(ParcelError::EscrowNotFunded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn package() -> Package {
        Package {
            id: 1,
            sender: Address::new([1u8; 32]),
            carrier: None,
            description: "Books".to_string(),
            weight: 5,
            dimensions: [10, 20, 30],
            price: 1_000,
            status: PackageStatus::Registered,
            created_at: 100,
            accepted_at: 0,
            delivered_at: 0,
            bump: 255,
        }
    }

    fn escrow() -> Escrow {
        Escrow {
            package: Address::new([2u8; 32]),
            sender: Address::new([1u8; 32]),
            carrier: Address::new([3u8; 32]),
            amount: 0,
            status: EscrowStatus::Uninitialized,
            created_at: 100,
            funded_at: 0,
            released_at: 0,
            bump: 254,
        }
    }

    #[test]
    fn test_package_moves_forward_only() {
        let mut pkg = package();
        let carrier = Address::new([3u8; 32]);

        assert!(matches!(pkg.deliver(5), Err(ParcelError::InvalidStatusTransition)));

        pkg.accept(carrier, 200).unwrap();
        assert_eq!(pkg.status, PackageStatus::InTransit);
        assert_eq!(pkg.assigned_carrier().unwrap(), carrier);
        assert_eq!(pkg.accepted_at, 200);
        assert!(matches!(pkg.accept(carrier, 201), Err(ParcelError::InvalidStatusTransition)));

        pkg.deliver(300).unwrap();
        assert_eq!(pkg.status, PackageStatus::Delivered);
        assert_eq!(pkg.delivered_at, 300);
        assert!(matches!(pkg.deliver(301), Err(ParcelError::AlreadyDelivered)));
    }

    #[test]
    fn test_escrow_moves_forward_only() {
        let mut e = escrow();
        assert!(matches!(e.release(1), Err(ParcelError::EscrowNotFunded)));

        e.fund(1_000, 2).unwrap();
        assert_eq!(e.amount, 1_000);
        assert!(matches!(e.fund(1_000, 3), Err(ParcelError::AlreadyFunded)));

        e.release(4).unwrap();
        assert_eq!(e.status, EscrowStatus::Released);
        assert_eq!(e.released_at, 4);
        assert!(matches!(e.release(5), Err(ParcelError::EscrowNotFunded)));
        assert!(matches!(e.fund(1_000, 6), Err(ParcelError::AlreadyFunded)));
    }

    #[test]
    fn test_pack_roundtrip_and_fixed_size() {
        let pkg = package();
        let data = pkg.pack().unwrap();
        assert_eq!(data.len(), Package::SPACE);
        assert_eq!(Package::unpack(&data).unwrap(), pkg);

        // Accepting grows the body but not the allocation
        let mut accepted = pkg.clone();
        accepted.accept(Address::new([3u8; 32]), 1).unwrap();
        assert_eq!(accepted.pack().unwrap().len(), Package::SPACE);
    }

    #[test]
    fn test_largest_package_fits() {
        let mut pkg = package();
        pkg.description = "x".repeat(MAX_DESCRIPTION_LEN);
        pkg.accept(Address::new([3u8; 32]), 1).unwrap();
        assert_eq!(pkg.pack().unwrap().len(), Package::SPACE);

        pkg.description.push('x');
        assert!(matches!(pkg.pack(), Err(ParcelError::InvalidRecord)));
    }

    #[test]
    fn test_discriminator_mismatch() {
        let data = escrow().pack().unwrap();
        assert!(Escrow::matches(&data));
        assert!(!Package::matches(&data));
        assert!(matches!(Package::unpack(&data), Err(ParcelError::InvalidRecord)));
        assert!(matches!(Escrow::unpack(&[0u8; 4]), Err(ParcelError::InvalidRecord)));
    }

    #[test]
    fn test_discriminators_are_distinct() {
        let tags = [
            Platform::discriminator(),
            Package::discriminator(),
            Carrier::discriminator(),
            Escrow::discriminator(),
        ];
        for (i, a) in tags.iter().enumerate() {
            for b in &tags[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_platform_and_carrier_fill_space() {
        let platform = Platform {
            authority: Address::new([1u8; 32]),
            fee_rate: 200,
            total_packages: 0,
            default_token: Some(Address::new([9u8; 32])),
            bump: 255,
            created_at: 0,
        };
        let packed = platform.pack().unwrap();
        assert_eq!(packed.len(), Platform::SPACE);
        assert_eq!(Platform::unpack(&packed).unwrap(), platform);

        let mut carrier = Carrier {
            authority: Address::new([1u8; 32]),
            reputation: 80,
            completed_deliveries: u64::MAX,
            bump: 250,
            created_at: 0,
        };
        assert_eq!(carrier.pack().unwrap().len(), Carrier::SPACE);
        assert!(matches!(carrier.record_delivery(), Err(ParcelError::ArithmeticOverflow)));
    }
}
