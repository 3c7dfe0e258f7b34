//! Derived record addresses
//!
//! A derived address is `sha256(seeds || [bump] || program_id || marker)`
//! for the highest `bump` whose hash is not an ed25519 point. Nobody holds
//! a private key for such an address, so only the owning program can mutate
//! the record stored there.

use crate::types::Address;
use crate::{Error, Result};
use sha2::{Digest, Sha256};

/// Maximum number of seeds (including the bump)
pub const MAX_SEEDS: usize = 16;

/// Maximum length of a single seed
pub const MAX_SEED_LEN: usize = 32;

const DERIVATION_MARKER: &[u8] = b"ParcelDerivedAddress";

/// Compute the address for seeds that already include the bump
///
/// Fails if the hash lands on the curve.
pub fn create_derived_address(seeds: &[&[u8]], program_id: &Address) -> Result<Address> {
    let address = hash_seeds(seeds, program_id)?;
    if address.is_on_curve() {
        return Err(Error::AddressDerivation(
            "derived address lies on the ed25519 curve".to_string(),
        ));
    }
    Ok(address)
}

/// Find the canonical derived address and its bump
pub fn find_derived_address(seeds: &[&[u8]], program_id: &Address) -> Result<(Address, u8)> {
    if seeds.len() >= MAX_SEEDS {
        return Err(Error::AddressDerivation(format!(
            "{} seeds leaves no room for the bump",
            seeds.len()
        )));
    }

    for bump in (0..=u8::MAX).rev() {
        let bump_seed = [bump];
        let mut with_bump: Vec<&[u8]> = seeds.to_vec();
        with_bump.push(&bump_seed);
        let address = hash_seeds(&with_bump, program_id)?;

        if !address.is_on_curve() {
            return Ok((address, bump));
        }
    }

    Err(Error::AddressDerivation(
        "no off-curve address for seeds".to_string(),
    ))
}

fn hash_seeds(seeds: &[&[u8]], program_id: &Address) -> Result<Address> {
    if seeds.len() > MAX_SEEDS {
        return Err(Error::AddressDerivation(format!(
            "{} seeds exceeds maximum of {}",
            seeds.len(),
            MAX_SEEDS
        )));
    }

    let mut hasher = Sha256::new();
    for seed in seeds {
        if seed.len() > MAX_SEED_LEN {
            return Err(Error::AddressDerivation(format!(
                "seed of {} bytes exceeds maximum of {}",
                seed.len(),
                MAX_SEED_LEN
            )));
        }
        hasher.update(seed);
    }
    hasher.update(program_id.as_bytes());
    hasher.update(DERIVATION_MARKER);

    Ok(Address::new(hasher.finalize().into()))
}
