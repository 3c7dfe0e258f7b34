//! Property-based tests for marketplace invariants
//!
//! - Payout conservation: carrier + platform receive exactly the escrowed price
//! - Custody: a released escrow keeps only its reserve
//! - Counter: N registrations leave `total_packages == N`

use parcel_ledger::{KeyPair, Rent, LAMPORTS_PER_UNIT};
use parcel_program::{Config, Escrow, Marketplace, ParcelError, Record};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Property: every completed delivery splits the price exactly
    #[test]
    fn prop_payout_is_exact(price in 1u64..=5 * LAMPORTS_PER_UNIT, fee_rate in 0u16..=10_000) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let market = Marketplace::start(&Config::default()).await.unwrap();
            let admin = KeyPair::generate();
            let sender = KeyPair::generate();
            let carrier = KeyPair::generate();
            for wallet in [&admin, &sender, &carrier] {
                market.airdrop(&wallet.address(), 10 * LAMPORTS_PER_UNIT).await.unwrap();
            }

            let platform = market.initialize(&admin, Some(fee_rate), None).await.unwrap();
            market.register_package(&sender, "Crate", 2, [3, 4, 5], price, 0).await.unwrap();
            market.create_carrier(&carrier, 75).await.unwrap();
            market.accept_delivery(&carrier, 0).await.unwrap();
            let escrow = market.initialize_escrow(&sender, 0).await.unwrap();
            market.create_escrow(&sender, 0, price).await.unwrap();

            let platform_before = market.balance(&platform).unwrap();
            let carrier_before = market.balance(&carrier.address()).unwrap();
            market.complete_delivery(&carrier, 0).await.unwrap();

            let platform_fee = market.balance(&platform).unwrap() - platform_before;
            let carrier_payment = market.balance(&carrier.address()).unwrap() - carrier_before;

            prop_assert_eq!(platform_fee + carrier_payment, price);
            prop_assert_eq!(
                u128::from(platform_fee),
                u128::from(price) * u128::from(fee_rate) / 10_000
            );
            prop_assert_eq!(
                market.balance(&escrow).unwrap(),
                Rent::default().minimum_balance(Escrow::SPACE)
            );

            market.handle().shutdown().await.unwrap();
            Ok(())
        })?;
    }

    /// Property: the platform counter equals the number of registrations,
    /// and a reused id never bumps it
    #[test]
    fn prop_counter_matches_registrations(ids in prop::collection::vec(any::<u8>(), 1..16)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let market = Marketplace::start(&Config::default()).await.unwrap();
            let admin = KeyPair::generate();
            market.airdrop(&admin.address(), 10 * LAMPORTS_PER_UNIT).await.unwrap();
            market.initialize(&admin, None, None).await.unwrap();

            let mut registered = std::collections::HashSet::new();
            for id in ids {
                let result = market
                    .register_package(&admin, "Box", 1, [1, 1, 1], 1_000, id)
                    .await;
                if registered.insert(id) {
                    prop_assert!(result.is_ok());
                } else {
                    let is_duplicate = matches!(result, Err(ParcelError::DuplicatePackageId));
                    prop_assert!(is_duplicate);
                }
            }

            let platform = market.platform().unwrap().unwrap();
            prop_assert_eq!(platform.total_packages, registered.len() as u64);
            prop_assert_eq!(market.packages().unwrap().len(), registered.len());

            market.handle().shutdown().await.unwrap();
            Ok(())
        })?;
    }
}
