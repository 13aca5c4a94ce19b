#![allow(non_snake_case)]
use achievement_client::{
    U256,
    error::{
        CallError,
        TransactionError,
    },
    orchestrator::{
        Mutation,
        TxState,
    },
    test_helpers::TestContext,
};

#[tokio::test]
async fn register_player__fresh_account_becomes_registered() {
    // given
    let ctx = TestContext::new();
    let mut controller = ctx.controller(ctx.wallet_for(&ctx.alice()));
    controller.start().await.unwrap();
    assert!(controller.view().catalog().is_empty());
    assert!(!controller.view().is_registered());

    // when
    let outcome = controller.register_player("bob").await.unwrap();

    // then
    assert!(outcome.is_confirmed());
    let player = controller.view().player().unwrap();
    assert_eq!(player.username, "bob");
    assert_eq!(player.high_score.to_string(), "0");
    assert_eq!(player.total_games.to_string(), "0");
    assert!(player.owned_achievement_ids.is_empty());
    assert!(controller.view().is_registered());
    assert!(matches!(
        controller.tx_state(),
        TxState::Confirmed {
            mutation: Mutation::RegisterPlayer,
            ..
        }
    ));
}

#[tokio::test]
async fn register_player__empty_username_sends_nothing() {
    // given
    let ctx = TestContext::new();
    let mut controller = ctx.controller(ctx.wallet_for(&ctx.alice()));
    controller.start().await.unwrap();

    // when
    let outcome = controller.register_player("").await.unwrap();

    // then
    assert!(!outcome.is_confirmed());
    assert_eq!(ctx.chain().submitted_transactions(), 0);
    assert_eq!(controller.tx_state(), &TxState::Idle);
}

#[tokio::test]
async fn register_player__already_registered_reverts_and_keeps_record() {
    // given
    let ctx = TestContext::new();
    ctx.chain().seed_player(&ctx.alice(), "alice", 40, 4);
    let mut controller = ctx.controller(ctx.wallet_for(&ctx.alice()));
    controller.start().await.unwrap();

    // when
    let result = controller.register_player("mallory").await;

    // then
    assert!(matches!(
        result,
        Err(TransactionError::Confirmation {
            source: CallError::Reverted { .. },
            ..
        })
    ));
    let player = controller.view().player().unwrap();
    assert_eq!(player.username, "alice");
    assert_eq!(player.high_score, U256::from(40));
    assert!(matches!(controller.tx_state(), TxState::Rejected { .. }));
}

#[tokio::test]
async fn register_player__declined_signature_changes_nothing() {
    // given
    let ctx = TestContext::new();
    let mut controller = ctx.controller(ctx.wallet_for(&ctx.alice()));
    controller.start().await.unwrap();
    ctx.chain().reject_next_signature();

    // when
    let result = controller.register_player("bob").await;

    // then
    assert_eq!(
        result,
        Err(TransactionError::Submission(CallError::UserRejected))
    );
    assert_eq!(ctx.chain().submitted_transactions(), 0);
    assert!(!controller.view().is_registered());
}
