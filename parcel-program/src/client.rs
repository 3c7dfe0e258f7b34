//! Typed client for the marketplace
//!
//! Builds and signs instructions, submits them through a [`LedgerHandle`]
//! and decodes records for read queries. Program failures come back as the
//! matching [`ParcelError`] variant.

use crate::{
    addresses::{carrier_address, escrow_address, package_address, platform_address},
    config::Config,
    error::ParcelError,
    instruction::ParcelInstruction,
    processor::ParcelProgram,
    state::{Carrier, Escrow, Package, PackageStatus, Platform, Record, PACKAGE_ID_SPACE},
    Result,
};
use parcel_ledger::{
    spawn_ledger_actor, Address, KeyPair, Ledger, LedgerHandle, Metrics, Transaction,
    TransactionReceipt,
};

/// Marketplace client
#[derive(Debug, Clone)]
pub struct Marketplace {
    handle: LedgerHandle,
    program_id: Address,
    metrics: Option<Metrics>,
}

impl Marketplace {
    /// Wrap an existing ledger handle
    pub fn new(handle: LedgerHandle) -> Self {
        let program_id = handle.program_id();
        Self {
            handle,
            program_id,
            metrics: None,
        }
    }

    /// Open the configured ledger, host the program and spawn the writer
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn start(config: &Config) -> Result<Self> {
        config.marketplace.validate()?;

        let metrics = Metrics::new()
            .map_err(|e| ParcelError::Ledger(parcel_ledger::Error::Config(e.to_string())))?;
        let program = ParcelProgram::new(config.marketplace.clone());
        let ledger = Ledger::open(&config.ledger, program)?.with_metrics(metrics.clone());
        let handle = spawn_ledger_actor(ledger, config.ledger.mailbox_capacity);

        tracing::info!(program_id = %handle.program_id(), "Marketplace started");
        Ok(Self {
            metrics: Some(metrics),
            ..Self::new(handle)
        })
    }

    /// Underlying ledger handle
    pub fn handle(&self) -> &LedgerHandle {
        &self.handle
    }

    /// Ledger metrics, when started through [`Marketplace::start`]
    pub fn metrics(&self) -> Option<&Metrics> {
        self.metrics.as_ref()
    }

    /// Sign and submit one instruction
    pub async fn submit(
        &self,
        signer: &KeyPair,
        instruction: &ParcelInstruction,
    ) -> Result<TransactionReceipt> {
        let transaction = Transaction::new_signed(
            signer,
            self.program_id,
            rand::random(),
            instruction.pack()?,
        )?;
        Ok(self.handle.process_transaction(transaction).await?)
    }

    /// Fund a wallet from genesis (test and demo setup only)
    pub async fn airdrop(&self, address: &Address, lamports: u64) -> Result<()> {
        self.handle.credit_genesis(*address, lamports).await?;
        Ok(())
    }

    /// Create the platform with `authority` as administrator
    pub async fn initialize(
        &self,
        authority: &KeyPair,
        fee_rate: Option<u16>,
        default_token: Option<Address>,
    ) -> Result<Address> {
        self.submit(
            authority,
            &ParcelInstruction::Initialize {
                fee_rate,
                default_token,
            },
        )
        .await?;
        self.platform_address()
    }

    /// Register a package, returning its address
    pub async fn register_package(
        &self,
        sender: &KeyPair,
        description: impl Into<String>,
        weight: u64,
        dimensions: [u32; 3],
        price: u64,
        package_id: u8,
    ) -> Result<Address> {
        self.submit(
            sender,
            &ParcelInstruction::RegisterPackage {
                description: description.into(),
                weight,
                dimensions,
                price,
                package_id,
            },
        )
        .await?;
        self.package_address(package_id)
    }

    /// Register a package under [`Marketplace::next_package_id`], returning
    /// the id and address it landed on
    pub async fn register_next_package(
        &self,
        sender: &KeyPair,
        description: impl Into<String>,
        weight: u64,
        dimensions: [u32; 3],
        price: u64,
    ) -> Result<(u8, Address)> {
        let package_id = self.next_package_id()?;
        let address = self
            .register_package(sender, description, weight, dimensions, price, package_id)
            .await?;
        Ok((package_id, address))
    }

    /// Create the signer's carrier profile, returning its address
    pub async fn create_carrier(&self, authority: &KeyPair, initial_reputation: u32) -> Result<Address> {
        self.submit(authority, &ParcelInstruction::CreateCarrier { initial_reputation })
            .await?;
        Ok(carrier_address(&self.program_id, &authority.address())?.0)
    }

    /// Accept package `package_id` as `carrier`
    pub async fn accept_delivery(&self, carrier: &KeyPair, package_id: u8) -> Result<TransactionReceipt> {
        let package = self.package_address(package_id)?;
        self.submit(carrier, &ParcelInstruction::AcceptDelivery { package })
            .await
    }

    /// Allocate the escrow for package `package_id`, returning its address
    pub async fn initialize_escrow(&self, sender: &KeyPair, package_id: u8) -> Result<Address> {
        let package = self.package_address(package_id)?;
        self.submit(sender, &ParcelInstruction::InitializeEscrow { package })
            .await?;
        Ok(escrow_address(&self.program_id, &package)?.0)
    }

    /// Deposit `amount` into the escrow for package `package_id`
    pub async fn create_escrow(
        &self,
        sender: &KeyPair,
        package_id: u8,
        amount: u64,
    ) -> Result<TransactionReceipt> {
        let package = self.package_address(package_id)?;
        self.submit(sender, &ParcelInstruction::CreateEscrow { package, amount })
            .await
    }

    /// Close the delivery of package `package_id` and release its escrow
    pub async fn complete_delivery(&self, carrier: &KeyPair, package_id: u8) -> Result<TransactionReceipt> {
        let package = self.package_address(package_id)?;
        self.submit(carrier, &ParcelInstruction::CompleteDelivery { package })
            .await
    }

    /// Platform record address
    pub fn platform_address(&self) -> Result<Address> {
        Ok(platform_address(&self.program_id)?.0)
    }

    /// Address of package `package_id`
    pub fn package_address(&self, package_id: u8) -> Result<Address> {
        let platform = self.platform_address()?;
        Ok(package_address(&self.program_id, &platform, package_id)?.0)
    }

    /// First unused package id, probing upward from the platform counter
    ///
    /// The id is only a suggestion: a concurrent registration can still take
    /// it first, in which case submission fails with `DuplicatePackageId`.
    pub fn next_package_id(&self) -> Result<u8> {
        let platform = self.platform()?.ok_or(ParcelError::PlatformNotInitialized)?;
        if platform.total_packages >= PACKAGE_ID_SPACE {
            return Err(ParcelError::PackageIdSpaceExhausted);
        }

        let start = platform.total_packages;
        for offset in 0..PACKAGE_ID_SPACE {
            let package_id = ((start + offset) % PACKAGE_ID_SPACE) as u8;
            if self.package(package_id)?.is_none() {
                return Ok(package_id);
            }
        }
        Err(ParcelError::PackageIdSpaceExhausted)
    }

    /// Lamport balance of any account
    pub fn balance(&self, address: &Address) -> Result<u64> {
        Ok(self
            .handle
            .get_account(address)?
            .map_or(0, |account| account.lamports))
    }

    /// Platform record
    pub fn platform(&self) -> Result<Option<Platform>> {
        self.fetch(&self.platform_address()?)
    }

    /// Package `package_id`
    pub fn package(&self, package_id: u8) -> Result<Option<Package>> {
        self.fetch(&self.package_address(package_id)?)
    }

    /// Carrier profile owned by `authority`
    pub fn carrier(&self, authority: &Address) -> Result<Option<Carrier>> {
        self.fetch(&carrier_address(&self.program_id, authority)?.0)
    }

    /// Escrow of package `package_id`
    pub fn escrow(&self, package_id: u8) -> Result<Option<Escrow>> {
        let package = self.package_address(package_id)?;
        self.fetch(&escrow_address(&self.program_id, &package)?.0)
    }

    /// Every package, ordered by id
    pub fn packages(&self) -> Result<Vec<(Address, Package)>> {
        let mut packages = self.all::<Package>()?;
        packages.sort_by_key(|(_, package)| package.id);
        Ok(packages)
    }

    /// Packages registered by `sender`
    pub fn packages_by_sender(&self, sender: &Address) -> Result<Vec<(Address, Package)>> {
        self.packages_where(|package| package.sender == *sender)
    }

    /// Packages assigned to the carrier owned by `authority`
    pub fn packages_for_carrier(&self, authority: &Address) -> Result<Vec<(Address, Package)>> {
        let (carrier, _) = carrier_address(&self.program_id, authority)?;
        self.packages_where(|package| package.carrier == Some(carrier))
    }

    /// Packages waiting for a carrier
    pub fn open_packages(&self) -> Result<Vec<(Address, Package)>> {
        self.packages_where(|package| package.status == PackageStatus::Registered)
    }

    fn packages_where(&self, filter: impl Fn(&Package) -> bool) -> Result<Vec<(Address, Package)>> {
        Ok(self
            .packages()?
            .into_iter()
            .filter(|(_, package)| filter(package))
            .collect())
    }

    fn fetch<R: Record>(&self, address: &Address) -> Result<Option<R>> {
        match self.handle.get_account(address)? {
            Some(account) if account.owner == self.program_id => R::unpack(&account.data).map(Some),
            Some(account) if !account.is_vacant() => Err(ParcelError::InvalidRecord),
            _ => Ok(None),
        }
    }

    fn all<R: Record>(&self) -> Result<Vec<(Address, R)>> {
        self.handle
            .accounts_owned_by(&self.program_id)?
            .into_iter()
            .filter(|(_, account)| R::matches(&account.data))
            .map(|(address, account)| R::unpack(&account.data).map(|record| (address, record)))
            .collect()
    }
}
