//! ParcelChain Marketplace
//!
//! Escrow-backed parcel delivery program running on [`parcel_ledger`].
//!
//! # Lifecycle
//!
//! 1. **Initialize**: an administrator creates the platform record and fee rate
//! 2. **Register**: a sender registers a package with an agreed price
//! 3. **Accept**: a carrier takes the package (Registered → InTransit)
//! 4. **Escrow**: the sender allocates the escrow, then deposits the price
//! 5. **Complete**: the assigned carrier closes the delivery; escrow pays the
//!    carrier and the platform fee in the same transaction
//!
//! # Example
//!
//! ```no_run
//! use parcel_program::{Config, Marketplace};
//! use parcel_ledger::KeyPair;
//!
//! #[tokio::main]
//! async fn main() -> parcel_program::Result<()> {
//!     let market = Marketplace::start(&Config::default()).await?;
//!     let admin = KeyPair::generate();
//!
//!     market.airdrop(&admin.address(), 10_000_000_000).await?;
//!     market.initialize(&admin, None, None).await?;
//!
//!     let platform = market.platform()?;
//!     println!("fee rate: {:?}", platform.map(|p| p.fee_rate));
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod addresses;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod fees;
pub mod instruction;
pub mod processor;
pub mod state;

use parcel_ledger::Address;

/// Address of the marketplace program
pub const PROGRAM_ID: Address = Address::new(*b"ParcelChainMarketplaceProgram v1");

// Re-exports
pub use client::Marketplace;
pub use config::{Config, MarketplaceConfig};
pub use error::{ParcelError, Result};
pub use events::ParcelEvent;
pub use fees::FeeSplit;
pub use instruction::ParcelInstruction;
pub use processor::ParcelProgram;
pub use state::{Carrier, Escrow, EscrowStatus, Package, PackageStatus, Platform, Record};
