//! Derived record addresses

use parcel_ledger::{find_derived_address, Address, Result};

/// Seed tag of the platform record
pub const PLATFORM_SEED: &[u8] = b"platform";

/// Seed tag of package records
pub const PACKAGE_SEED: &[u8] = b"package";

/// Seed tag of carrier records
pub const CARRIER_SEED: &[u8] = b"carrier";

/// Seed tag of escrow records
pub const ESCROW_SEED: &[u8] = b"escrow";

/// Platform singleton
pub fn platform_address(program_id: &Address) -> Result<(Address, u8)> {
    find_derived_address(&[PLATFORM_SEED], program_id)
}

/// Package `package_id` under `platform`
pub fn package_address(
    program_id: &Address,
    platform: &Address,
    package_id: u8,
) -> Result<(Address, u8)> {
    find_derived_address(&[PACKAGE_SEED, platform.as_ref(), &[package_id]], program_id)
}

/// Carrier profile owned by `authority`
pub fn carrier_address(program_id: &Address, authority: &Address) -> Result<(Address, u8)> {
    find_derived_address(&[CARRIER_SEED, authority.as_ref()], program_id)
}

/// Escrow for `package`
pub fn escrow_address(program_id: &Address, package: &Address) -> Result<(Address, u8)> {
    find_derived_address(&[ESCROW_SEED, package.as_ref()], program_id)
}
