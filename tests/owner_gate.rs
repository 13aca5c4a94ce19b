#![allow(non_snake_case)]
use achievement_client::{
    Account,
    client::{
        AppController,
        OwnerGate,
    },
    error::{
        CallError,
        FetchError,
    },
    sync::is_owner,
    test_helpers::{
        FakeWallet,
        InMemoryChain,
        TestContext,
    },
    wallet::WalletConnector,
};

#[test]
fn is_owner__ignores_address_letter_case() {
    assert!(is_owner(&Account::new("0xABC"), &Account::new("0xabc")));
    assert!(!is_owner(&Account::new("0xABC"), &Account::new("0xabd")));
}

#[tokio::test]
async fn refresh_owner_gate__owner_with_different_casing_passes() {
    // given
    let owner = Account::new("0x00000000000000000000000000000000000000AB");
    let chain = InMemoryChain::new(owner);
    let wallet = FakeWallet::authorized(["0x00000000000000000000000000000000000000ab"]);
    let mut controller = AppController::new(WalletConnector::with_provider(wallet), chain);
    controller.start().await.unwrap();

    // when
    let gate = controller.refresh_owner_gate().await.unwrap();

    // then
    assert_eq!(gate, &OwnerGate::Owner);
}

#[tokio::test]
async fn refresh_owner_gate__without_session_is_unknown() {
    let ctx = TestContext::new();
    let mut controller = ctx.controller(FakeWallet::unauthorized([ctx.owner()]));
    controller.start().await.unwrap();
    let gate = controller.refresh_owner_gate().await.unwrap();
    assert_eq!(gate, &OwnerGate::Unknown);
}

#[tokio::test]
async fn refresh_owner_gate__read_failure_is_surfaced() {
    // given
    let ctx = TestContext::new();
    let mut controller = ctx.controller(ctx.wallet_for(&ctx.owner()));
    controller.start().await.unwrap();
    ctx.chain()
        .fail_reads(Some(CallError::Transport("node offline".into())));

    // when
    let result = controller.refresh_owner_gate().await.cloned();

    // then
    assert_eq!(
        result,
        Err(FetchError::Call(CallError::Transport("node offline".into())))
    );
    assert_eq!(controller.owner_gate(), &OwnerGate::Unknown);
}
