//! Instruction handlers
//!
//! Every handler checks all of its preconditions against the staged view in
//! the [`InvokeContext`] before it stages any write. The ledger discards the
//! whole context when a handler returns an error.

use crate::{
    addresses::{carrier_address, escrow_address, package_address, platform_address},
    config::MarketplaceConfig,
    error::ParcelError,
    events::ParcelEvent,
    fees::{FeeSplit, BASIS_POINTS},
    instruction::ParcelInstruction,
    state::{
        Carrier, Escrow, EscrowStatus, Package, PackageStatus, Platform, Record,
        MAX_DESCRIPTION_LEN, PACKAGE_ID_SPACE,
    },
    Result, PROGRAM_ID,
};
use parcel_ledger::{Address, InvokeContext, Program};

/// The marketplace program
#[derive(Debug, Clone)]
pub struct ParcelProgram {
    program_id: Address,
    config: MarketplaceConfig,
}

impl Default for ParcelProgram {
    fn default() -> Self {
        Self::new(MarketplaceConfig::default())
    }
}

impl ParcelProgram {
    /// Program at the well-known [`PROGRAM_ID`]
    pub fn new(config: MarketplaceConfig) -> Self {
        Self::with_program_id(PROGRAM_ID, config)
    }

    /// Program at a custom address
    pub fn with_program_id(program_id: Address, config: MarketplaceConfig) -> Self {
        Self { program_id, config }
    }

    /// Rules in force
    pub fn config(&self) -> &MarketplaceConfig {
        &self.config
    }

    fn dispatch(&self, ctx: &mut InvokeContext<'_>, data: &[u8]) -> Result<()> {
        let instruction = ParcelInstruction::unpack(data)?;
        ctx.log(format!("Instruction: {}", instruction.name()));

        match instruction {
            ParcelInstruction::Initialize {
                fee_rate,
                default_token,
            } => self.initialize(ctx, fee_rate, default_token),
            ParcelInstruction::RegisterPackage {
                description,
                weight,
                dimensions,
                price,
                package_id,
            } => self.register_package(ctx, description, weight, dimensions, price, package_id),
            ParcelInstruction::CreateCarrier { initial_reputation } => {
                self.create_carrier(ctx, initial_reputation)
            }
            ParcelInstruction::AcceptDelivery { package } => self.accept_delivery(ctx, &package),
            ParcelInstruction::InitializeEscrow { package } => {
                self.initialize_escrow(ctx, &package)
            }
            ParcelInstruction::CreateEscrow { package, amount } => {
                self.create_escrow(ctx, &package, amount)
            }
            ParcelInstruction::CompleteDelivery { package } => {
                self.complete_delivery(ctx, &package)
            }
        }
    }

    fn initialize(
        &self,
        ctx: &mut InvokeContext<'_>,
        fee_rate: Option<u16>,
        default_token: Option<Address>,
    ) -> Result<()> {
        let (platform_key, bump) = platform_address(&self.program_id)?;
        if ctx.is_allocated(&platform_key)? {
            return Err(ParcelError::AlreadyInitialized);
        }

        let fee_rate = fee_rate.unwrap_or(self.config.default_fee_rate);
        if fee_rate > BASIS_POINTS {
            return Err(ParcelError::InvalidFeeRate);
        }

        let authority = ctx.signer();
        let platform = Platform {
            authority,
            fee_rate,
            total_packages: 0,
            default_token,
            bump,
            created_at: ctx.unix_timestamp(),
        };
        self.create(ctx, &platform_key, &platform)?;

        ctx.emit(&ParcelEvent::PlatformInitialized {
            platform: platform_key,
            authority,
            fee_rate,
        })?;
        tracing::info!(%authority, fee_rate, "Platform initialized");
        Ok(())
    }

    fn register_package(
        &self,
        ctx: &mut InvokeContext<'_>,
        description: String,
        weight: u64,
        dimensions: [u32; 3],
        price: u64,
        package_id: u8,
    ) -> Result<()> {
        if description.len() > self.config.max_description_len.min(MAX_DESCRIPTION_LEN) {
            return Err(ParcelError::DescriptionTooLong);
        }
        if weight == 0 {
            return Err(ParcelError::InvalidWeight);
        }
        if dimensions.iter().any(|d| *d == 0) {
            return Err(ParcelError::InvalidDimensions);
        }
        if price == 0 {
            return Err(ParcelError::InvalidPrice);
        }

        let (platform_key, _) = platform_address(&self.program_id)?;
        let mut platform: Platform = self
            .load(ctx, &platform_key)?
            .ok_or(ParcelError::PlatformNotInitialized)?;
        if platform.total_packages >= PACKAGE_ID_SPACE {
            return Err(ParcelError::PackageIdSpaceExhausted);
        }

        let (package_key, bump) = package_address(&self.program_id, &platform_key, package_id)?;
        if ctx.is_allocated(&package_key)? {
            return Err(ParcelError::DuplicatePackageId);
        }

        let sender = ctx.signer();
        let package = Package {
            id: package_id,
            sender,
            carrier: None,
            description,
            weight,
            dimensions,
            price,
            status: PackageStatus::Registered,
            created_at: ctx.unix_timestamp(),
            accepted_at: 0,
            delivered_at: 0,
            bump,
        };

        platform.total_packages = platform
            .total_packages
            .checked_add(1)
            .ok_or(ParcelError::ArithmeticOverflow)?;

        self.create(ctx, &package_key, &package)?;
        self.store(ctx, &platform_key, &platform)?;

        ctx.emit(&ParcelEvent::PackageRegistered {
            package: package_key,
            package_id,
            sender,
            price,
        })?;
        tracing::info!(package_id, %sender, price, "Package registered");
        Ok(())
    }

    fn create_carrier(&self, ctx: &mut InvokeContext<'_>, initial_reputation: u32) -> Result<()> {
        if initial_reputation > self.config.max_initial_reputation {
            return Err(ParcelError::InvalidReputation);
        }

        let authority = ctx.signer();
        let (carrier_key, bump) = carrier_address(&self.program_id, &authority)?;
        if ctx.is_allocated(&carrier_key)? {
            return Err(ParcelError::AlreadyExists);
        }

        let carrier = Carrier {
            authority,
            reputation: initial_reputation,
            completed_deliveries: 0,
            bump,
            created_at: ctx.unix_timestamp(),
        };
        self.create(ctx, &carrier_key, &carrier)?;

        ctx.emit(&ParcelEvent::CarrierCreated {
            carrier: carrier_key,
            authority,
            reputation: initial_reputation,
        })?;
        tracing::info!(%authority, reputation = initial_reputation, "Carrier created");
        Ok(())
    }

    fn accept_delivery(&self, ctx: &mut InvokeContext<'_>, package_key: &Address) -> Result<()> {
        let mut package: Package = self
            .load(ctx, package_key)?
            .ok_or(ParcelError::PackageNotFound)?;
        let (carrier_key, carrier) = self.signer_carrier(ctx)?;

        if package.status != PackageStatus::Registered {
            return Err(ParcelError::InvalidStatusTransition);
        }
        if carrier.reputation < self.config.min_accept_reputation {
            return Err(ParcelError::InsufficientReputation);
        }

        let now = ctx.unix_timestamp();
        package.accept(carrier_key, now)?;
        self.store(ctx, package_key, &package)?;

        ctx.emit(&ParcelEvent::DeliveryAccepted {
            package: *package_key,
            package_id: package.id,
            carrier: carrier_key,
            accepted_at: now,
        })?;
        tracing::info!(package_id = package.id, carrier = %carrier_key, "Delivery accepted");
        Ok(())
    }

    fn initialize_escrow(&self, ctx: &mut InvokeContext<'_>, package_key: &Address) -> Result<()> {
        let package: Package = self
            .load(ctx, package_key)?
            .ok_or(ParcelError::PackageNotFound)?;
        let sender = ctx.signer();
        if package.sender != sender {
            return Err(ParcelError::Unauthorized);
        }
        if package.status != PackageStatus::InTransit {
            return Err(ParcelError::PackageNotAccepted);
        }
        let carrier = package.assigned_carrier()?;

        let (escrow_key, bump) = escrow_address(&self.program_id, package_key)?;
        if ctx.is_allocated(&escrow_key)? {
            return Err(ParcelError::EscrowAlreadyInitialized);
        }

        let escrow = Escrow {
            package: *package_key,
            sender,
            carrier,
            amount: 0,
            status: EscrowStatus::Uninitialized,
            created_at: ctx.unix_timestamp(),
            funded_at: 0,
            released_at: 0,
            bump,
        };
        self.create(ctx, &escrow_key, &escrow)?;

        ctx.emit(&ParcelEvent::EscrowInitialized {
            escrow: escrow_key,
            package: *package_key,
        })?;
        tracing::info!(package_id = package.id, escrow = %escrow_key, "Escrow initialized");
        Ok(())
    }

    fn create_escrow(
        &self,
        ctx: &mut InvokeContext<'_>,
        package_key: &Address,
        amount: u64,
    ) -> Result<()> {
        let package: Package = self
            .load(ctx, package_key)?
            .ok_or(ParcelError::PackageNotFound)?;
        let sender = ctx.signer();
        if package.sender != sender {
            return Err(ParcelError::Unauthorized);
        }
        if package.status != PackageStatus::InTransit {
            return Err(ParcelError::PackageNotAccepted);
        }

        let (escrow_key, _) = escrow_address(&self.program_id, package_key)?;
        let mut escrow: Escrow = self
            .load(ctx, &escrow_key)?
            .ok_or(ParcelError::EscrowNotFound)?;
        if escrow.status != EscrowStatus::Uninitialized {
            return Err(ParcelError::AlreadyFunded);
        }
        if amount != package.price {
            return Err(ParcelError::AmountMismatch);
        }
        if ctx.lamports(&sender)? < amount {
            return Err(ParcelError::InsufficientFunds);
        }

        escrow.fund(amount, ctx.unix_timestamp())?;
        ctx.transfer(&sender, &escrow_key, amount)?;
        self.store(ctx, &escrow_key, &escrow)?;

        ctx.emit(&ParcelEvent::EscrowFunded {
            escrow: escrow_key,
            package: *package_key,
            amount,
        })?;
        tracing::info!(package_id = package.id, amount, "Escrow funded");
        Ok(())
    }

    fn complete_delivery(&self, ctx: &mut InvokeContext<'_>, package_key: &Address) -> Result<()> {
        let mut package: Package = self
            .load(ctx, package_key)?
            .ok_or(ParcelError::PackageNotFound)?;
        match package.status {
            PackageStatus::InTransit => {}
            PackageStatus::Delivered => return Err(ParcelError::AlreadyDelivered),
            PackageStatus::Registered => return Err(ParcelError::InvalidStatusTransition),
        }

        let (carrier_key, mut carrier) = self.signer_carrier(ctx)?;
        if package.carrier != Some(carrier_key) {
            return Err(ParcelError::NotAssignedCarrier);
        }

        let (escrow_key, _) = escrow_address(&self.program_id, package_key)?;
        let mut escrow: Escrow = self
            .load(ctx, &escrow_key)?
            .ok_or(ParcelError::EscrowNotFunded)?;
        if escrow.package != *package_key {
            return Err(ParcelError::EscrowPackageMismatch);
        }
        if escrow.status != EscrowStatus::Funded {
            return Err(ParcelError::EscrowNotFunded);
        }

        let (platform_key, _) = platform_address(&self.program_id)?;
        let platform: Platform = self
            .load(ctx, &platform_key)?
            .ok_or(ParcelError::PlatformNotInitialized)?;

        let split = FeeSplit::compute(escrow.amount, platform.fee_rate)?;
        let now = ctx.unix_timestamp();

        escrow.release(now)?;
        package.deliver(now)?;
        carrier.record_delivery()?;

        ctx.transfer(&escrow_key, &carrier.authority, split.carrier_payment)?;
        ctx.transfer(&escrow_key, &platform_key, split.platform_fee)?;
        self.store(ctx, &escrow_key, &escrow)?;
        self.store(ctx, package_key, &package)?;
        self.store(ctx, &carrier_key, &carrier)?;

        ctx.emit(&ParcelEvent::DeliveryCompleted {
            package: *package_key,
            package_id: package.id,
            carrier: carrier_key,
            carrier_payment: split.carrier_payment,
            platform_fee: split.platform_fee,
            released_at: now,
        })?;
        tracing::info!(
            package_id = package.id,
            carrier_payment = split.carrier_payment,
            platform_fee = split.platform_fee,
            "Delivery completed"
        );
        Ok(())
    }

    fn signer_carrier(&self, ctx: &mut InvokeContext<'_>) -> Result<(Address, Carrier)> {
        let (carrier_key, _) = carrier_address(&self.program_id, &ctx.signer())?;
        let carrier = self
            .load(ctx, &carrier_key)?
            .ok_or(ParcelError::CarrierNotFound)?;
        Ok((carrier_key, carrier))
    }

    fn load<R: Record>(&self, ctx: &mut InvokeContext<'_>, address: &Address) -> Result<Option<R>> {
        match ctx.account(address)? {
            Some(account) if !account.is_vacant() => {
                if account.owner != self.program_id {
                    return Err(ParcelError::InvalidRecord);
                }
                R::unpack(&account.data).map(Some)
            }
            _ => Ok(None),
        }
    }

    fn create<R: Record>(
        &self,
        ctx: &mut InvokeContext<'_>,
        address: &Address,
        record: &R,
    ) -> Result<()> {
        let payer = ctx.signer();
        ctx.create_account(&payer, address, R::SPACE)?;
        self.store(ctx, address, record)
    }

    fn store<R: Record>(&self, ctx: &mut InvokeContext<'_>, address: &Address, record: &R) -> Result<()> {
        ctx.write_data(address, record.pack()?)?;
        Ok(())
    }
}

impl Program for ParcelProgram {
    fn program_id(&self) -> Address {
        self.program_id
    }

    fn process(&self, ctx: &mut InvokeContext<'_>, data: &[u8]) -> parcel_ledger::Result<()> {
        self.dispatch(ctx, data).map_err(Into::into)
    }
}
