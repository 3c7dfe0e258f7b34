//! End-to-end delivery on a fresh marketplace
//!
//! Usage: `parcel-scenario [config.toml]`. Without a file, configuration is
//! read from `PARCEL_*` environment variables.

use parcel_ledger::{KeyPair, LAMPORTS_PER_UNIT};
use parcel_program::{Config, Marketplace, ParcelEvent};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    info!(backend = ?config.ledger.storage, "ParcelChain scenario starting");

    let market = Marketplace::start(&config).await?;

    let admin = KeyPair::generate();
    let sender = KeyPair::generate();
    let carrier = KeyPair::generate();
    for wallet in [&admin, &sender, &carrier] {
        market.airdrop(&wallet.address(), 5 * LAMPORTS_PER_UNIT).await?;
    }

    let platform = market.initialize(&admin, None, None).await?;
    let package_id = 1;
    let price = LAMPORTS_PER_UNIT;

    market
        .register_package(&sender, "Laptop", 3, [40, 30, 10], price, package_id)
        .await?;
    market.create_carrier(&carrier, 80).await?;
    market.accept_delivery(&carrier, package_id).await?;
    market.initialize_escrow(&sender, package_id).await?;
    market.create_escrow(&sender, package_id, price).await?;

    let platform_before = market.balance(&platform)?;
    let carrier_before = market.balance(&carrier.address())?;
    let receipt = market.complete_delivery(&carrier, package_id).await?;

    for raw in &receipt.events {
        if let Some(ParcelEvent::DeliveryCompleted {
            carrier_payment,
            platform_fee,
            ..
        }) = ParcelEvent::from_json(raw)
        {
            info!(carrier_payment, platform_fee, slot = receipt.slot, "Payout");
        }
    }

    info!(
        carrier_received = market.balance(&carrier.address())? - carrier_before,
        platform_received = market.balance(&platform)? - platform_before,
        "Balances settled"
    );

    let verified = market.handle().verify_journal()?;
    info!(entries = verified, "Journal verified");

    if let Some(metrics) = market.metrics() {
        println!("{}", metrics.render()?);
    }

    market.handle().shutdown().await?;
    Ok(())
}
