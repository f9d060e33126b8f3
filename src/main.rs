use std::sync::Arc;

use cpamm::{Address, AssetLedger, InMemoryLedger, Router, SCALE};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debug".into()),
        )
        .init();

    let native = Arc::new(InMemoryLedger::new());
    let token = Arc::new(InMemoryLedger::new());
    let router = Router::new(
        Address::from_low_u64(0xB0),
        Address::from_low_u64(0xA0),
        native.clone() as Arc<dyn AssetLedger>,
        token.clone() as Arc<dyn AssetLedger>,
    );

    let alice = Address::from_low_u64(1);
    let bob = Address::from_low_u64(2);
    for account in [alice, bob] {
        native.mint(account, 100 * SCALE).expect("funding");
        token.mint(account, 100 * SCALE).expect("funding");
        native.approve(account, router.address(), 100 * SCALE);
        token.approve(account, router.address(), 100 * SCALE);
    }

    let shares = router
        .add_liquidity(alice, 10 * SCALE, 10 * SCALE, 10 * SCALE)
        .expect("add liquidity");
    println!("alice supplied 10/10 and received {shares} shares");

    let out = router
        .swap_tokens(bob, 5 * SCALE, 0, 0, 0, 5 * SCALE)
        .expect("swap");
    println!("bob swapped 5 native for {out} token");

    let (reserve_native, reserve_token) = router.pair().reserves();
    println!("reserves: {reserve_native} native / {reserve_token} token");

    for event in router.pair().take_events() {
        println!("event: {event:?}");
    }
}
