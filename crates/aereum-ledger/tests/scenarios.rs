//! End-to-end ledger scenarios: blocks of real serialized instructions
//! validated against genesis state, committed across epoch boundaries.

use aereum_core::{Hash, Keypair, Signature, Token};
use aereum_instructions::{
    Content, CreateEphemeral, CreateStage, GrantPowerOfAttorney, JoinStage,
    RevokePowerOfAttorney, SponsorshipAcceptance, SponsorshipOffer, TokenValue, Transfer,
    ValidationError,
};
use aereum_ledger::{BlockBuilder, BlockError, GenesisConfig, State};
use bytes::Bytes;

fn transfer_bytes(from: &Keypair, to: Token, value: u64, fee: u64, epoch: u64) -> Vec<u8> {
    let mut transfer = Transfer {
        epoch_stamp: epoch,
        from: from.public_key(),
        to: vec![TokenValue { token: to, value }],
        reason: String::new(),
        fee,
        signature: Signature::ZERO,
    };
    transfer.sign(from);
    transfer.serialize()
}

fn create_stage_bytes(
    author: &Keypair,
    stage: Token,
    submission: Token,
    moderation: Token,
    epoch: u64,
) -> Vec<u8> {
    let mut create = CreateStage {
        epoch_stamp: epoch,
        author: author.public_key(),
        stage,
        submission,
        moderation,
        flag: 0,
        description: "a stage".into(),
        attorney: Token::ZERO,
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    };
    create.sign(author, Token::ZERO);
    create.pay_fee(0, author);
    create.serialize()
}

fn plain_content(author: Token, stage: Token, body: &'static [u8], epoch: u64) -> Content {
    Content {
        epoch_stamp: epoch,
        published: epoch,
        author,
        stage,
        content_type: "text/plain".into(),
        content: Bytes::from_static(body),
        hash: Hash::of(body).as_bytes().to_vec(),
        sponsored: false,
        encrypted: false,
        sub_signature: Signature::ZERO,
        moderator: Token::ZERO,
        mod_signature: Signature::ZERO,
        attorney: Token::ZERO,
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    }
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 1: genesis + mint
// ─────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn genesis_and_mint() {
    let (mut state, genesis) = State::genesis(GenesisConfig::default()).await;
    let receiver = Keypair::from_seed(&[1; 32]);

    let mut builder = BlockBuilder::new(&state);
    builder
        .push_bytes(&transfer_bytes(&genesis, receiver.public_key(), 100, 10, 0))
        .await
        .unwrap();
    let block = builder.seal();
    assert_eq!(block.fee_collected, 10);
    state.advance_epoch(&block.mutations).await;

    let genesis_hash = Hash::of_token(&genesis.public_key());
    let receiver_hash = Hash::of_token(&receiver.public_key());
    assert_eq!(state.wallets.balance(&genesis_hash).await, (true, 999_890));
    assert_eq!(state.wallets.balance(&receiver_hash).await, (true, 100));
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 2: double spend within one block
// ─────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn double_spend_is_rejected() {
    let (mut state, genesis) = State::genesis(GenesisConfig::default()).await;
    let receiver = Keypair::from_seed(&[2; 32]);

    let mut builder = BlockBuilder::new(&state);
    builder
        .push_bytes(&transfer_bytes(
            &genesis,
            receiver.public_key(),
            600_000,
            0,
            0,
        ))
        .await
        .unwrap();
    let second = builder
        .push_bytes(&transfer_bytes(
            &genesis,
            receiver.public_key(),
            600_000,
            0,
            0,
        ))
        .await;
    assert_eq!(
        second,
        Err(BlockError::Validation(ValidationError::InsufficientFunds))
    );

    let block = builder.seal();
    assert_eq!(block.instructions.len(), 1);
    state.advance_epoch(&block.mutations).await;

    let genesis_hash = Hash::of_token(&genesis.public_key());
    assert_eq!(state.wallets.balance(&genesis_hash).await, (true, 400_000));
}

#[tokio::test]
async fn transfer_without_fee_conserves_total_supply() {
    let (mut state, genesis) = State::genesis(GenesisConfig::default()).await;
    let receiver = Keypair::from_seed(&[3; 32]);

    let mut builder = BlockBuilder::new(&state);
    builder
        .push_bytes(&transfer_bytes(
            &genesis,
            receiver.public_key(),
            12_345,
            0,
            0,
        ))
        .await
        .unwrap();
    let block = builder.seal();
    state.advance_epoch(&block.mutations).await;

    let (_, a) = state
        .wallets
        .balance(&Hash::of_token(&genesis.public_key()))
        .await;
    let (_, b) = state
        .wallets
        .balance(&Hash::of_token(&receiver.public_key()))
        .await;
    assert_eq!(a + b, 1_000_000);
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 3: create stage then join, within one block
// ─────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_stage_then_join_same_block() {
    let (state, genesis) = State::genesis(GenesisConfig::default()).await;
    let stage = Token::from_bytes([10; 32]);

    let mut builder = BlockBuilder::new(&state);
    builder
        .push_bytes(&create_stage_bytes(
            &genesis,
            stage,
            Token::ZERO,
            Token::ZERO,
            0,
        ))
        .await
        .unwrap();

    let mut join = JoinStage {
        epoch_stamp: 0,
        author: genesis.public_key(),
        stage,
        diffie_hellman_key: Token::from_bytes([11; 32]),
        presentation: "hello".into(),
        attorney: Token::ZERO,
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    };
    join.sign(&genesis, Token::ZERO);
    join.pay_fee(0, &genesis);
    builder.push_bytes(&join.serialize()).await.unwrap();

    // a join referencing an unknown stage token is rejected
    let mut stray = JoinStage {
        stage: Token::from_bytes([99; 32]),
        signature: Signature::ZERO,
        wallet_signature: Signature::ZERO,
        ..join.clone()
    };
    stray.sign(&genesis, Token::ZERO);
    stray.pay_fee(0, &genesis);
    let rejected = builder.push_bytes(&stray.serialize()).await;
    assert_eq!(
        rejected,
        Err(BlockError::Validation(ValidationError::UnknownPrincipal(
            "stage"
        )))
    );
    assert_eq!(builder.len(), 2);
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 4: sponsored content happy path
// ─────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn sponsored_content_consumes_the_grant() {
    let (mut state, genesis) = State::genesis(GenesisConfig::default()).await;
    let stage = Token::from_bytes([20; 32]);

    let mut builder = BlockBuilder::new(&state);
    builder
        .push_bytes(&create_stage_bytes(
            &genesis,
            stage,
            Token::ZERO,
            Token::ZERO,
            0,
        ))
        .await
        .unwrap();
    let block = builder.seal();
    state.advance_epoch(&block.mutations).await;

    let body: &'static [u8] = b"a word from our sponsor";
    let mut offer = SponsorshipOffer {
        epoch_stamp: 1,
        author: genesis.public_key(),
        stage,
        content_type: "text/plain".into(),
        content: Bytes::from_static(body),
        expire: 5,
        revenue: 1_000,
        attorney: Token::ZERO,
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    };
    offer.sign(&genesis, Token::ZERO);
    offer.pay_fee(0, &genesis);

    let mut acceptance = SponsorshipAcceptance {
        epoch_stamp: 1,
        author: genesis.public_key(),
        offer: offer.clone(),
        attorney: Token::ZERO,
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    };
    acceptance.sign(&genesis, Token::ZERO);
    acceptance.pay_fee(0, &genesis);

    let mut sponsored = plain_content(genesis.public_key(), stage, body, 1);
    sponsored.sponsored = true;
    sponsored.sign(&genesis, Token::ZERO);
    sponsored.pay_fee(0, &genesis);

    let mut builder = BlockBuilder::new(&state);
    builder.push_bytes(&offer.serialize()).await.unwrap();
    builder.push_bytes(&acceptance.serialize()).await.unwrap();
    builder.push_bytes(&sponsored.serialize()).await.unwrap();

    // the grant authorizes exactly one publication
    let replay = builder.push_bytes(&sponsored.serialize()).await;
    assert_eq!(
        replay,
        Err(BlockError::Validation(ValidationError::UnknownPrincipal(
            "sponsor grant"
        )))
    );

    let block = builder.seal();
    state.advance_epoch(&block.mutations).await;
    let grant_hash = Hash::of_pair(&genesis.public_key(), &stage);
    assert_eq!(state.sponsor_granted.get_content_hash(&grant_hash).await, None);
}

#[tokio::test]
async fn sponsored_content_with_wrong_body_is_rejected() {
    let (mut state, genesis) = State::genesis(GenesisConfig::default()).await;
    let stage = Token::from_bytes([21; 32]);

    let mut builder = BlockBuilder::new(&state);
    builder
        .push_bytes(&create_stage_bytes(
            &genesis,
            stage,
            Token::ZERO,
            Token::ZERO,
            0,
        ))
        .await
        .unwrap();
    let block = builder.seal();
    state.advance_epoch(&block.mutations).await;

    let mut offer = SponsorshipOffer {
        epoch_stamp: 1,
        author: genesis.public_key(),
        stage,
        content_type: "text/plain".into(),
        content: Bytes::from_static(b"agreed body"),
        expire: 5,
        revenue: 0,
        attorney: Token::ZERO,
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    };
    offer.sign(&genesis, Token::ZERO);
    offer.pay_fee(0, &genesis);

    let mut acceptance = SponsorshipAcceptance {
        epoch_stamp: 1,
        author: genesis.public_key(),
        offer: offer.clone(),
        attorney: Token::ZERO,
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    };
    acceptance.sign(&genesis, Token::ZERO);
    acceptance.pay_fee(0, &genesis);

    let mut sponsored = plain_content(genesis.public_key(), stage, b"different body", 1);
    sponsored.sponsored = true;
    sponsored.sign(&genesis, Token::ZERO);
    sponsored.pay_fee(0, &genesis);

    let mut builder = BlockBuilder::new(&state);
    builder.push_bytes(&offer.serialize()).await.unwrap();
    builder.push_bytes(&acceptance.serialize()).await.unwrap();
    let rejected = builder.push_bytes(&sponsored.serialize()).await;
    assert!(matches!(
        rejected,
        Err(BlockError::Validation(ValidationError::Conflict(_)))
    ));
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 5: power of attorney granted then revoked in one block
// ─────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn revoke_shadows_grant_within_a_block() {
    let (mut state, genesis) = State::genesis(GenesisConfig::default()).await;
    let attorney = Keypair::from_seed(&[30; 32]);
    let stage = Token::from_bytes([31; 32]);

    let mut builder = BlockBuilder::new(&state);
    builder
        .push_bytes(&create_stage_bytes(
            &genesis,
            stage,
            Token::ZERO,
            Token::ZERO,
            0,
        ))
        .await
        .unwrap();
    let block = builder.seal();
    state.advance_epoch(&block.mutations).await;

    let mut grant = GrantPowerOfAttorney {
        epoch_stamp: 1,
        author: genesis.public_key(),
        attorney: attorney.public_key(),
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    };
    grant.sign(&genesis);
    grant.pay_fee(0, &genesis);

    let mut delegated = plain_content(genesis.public_key(), stage, b"via attorney", 1);
    delegated.sign(&attorney, attorney.public_key());
    delegated.pay_fee(0, &attorney);

    let mut revoke = RevokePowerOfAttorney {
        epoch_stamp: 1,
        author: genesis.public_key(),
        attorney: attorney.public_key(),
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    };
    revoke.sign(&genesis);
    revoke.pay_fee(0, &genesis);

    let mut after_revoke = plain_content(genesis.public_key(), stage, b"too late", 1);
    after_revoke.sign(&attorney, attorney.public_key());
    after_revoke.pay_fee(0, &attorney);

    let mut builder = BlockBuilder::new(&state);
    builder.push_bytes(&grant.serialize()).await.unwrap();
    builder.push_bytes(&delegated.serialize()).await.unwrap();
    builder.push_bytes(&revoke.serialize()).await.unwrap();
    let rejected = builder.push_bytes(&after_revoke.serialize()).await;
    assert_eq!(
        rejected,
        Err(BlockError::Validation(ValidationError::UnknownPrincipal(
            "attorney"
        )))
    );

    // granted then revoked in the same block: nothing lands in the store
    let block = builder.seal();
    state.advance_epoch(&block.mutations).await;
    let pair = Hash::of_pair(&genesis.public_key(), &attorney.public_key());
    assert!(!state.power_of_attorney.contains(&pair).await);
}

// ─────────────────────────────────────────────────────────────────────────
// Scenario 6: ephemeral expiry across epoch advances
// ─────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn ephemeral_token_expires_after_its_epoch() {
    let (mut state, genesis) = State::genesis(GenesisConfig::default()).await;
    for _ in 0..3 {
        let block = BlockBuilder::new(&state).seal();
        state.advance_epoch(&block.mutations).await;
    }
    assert_eq!(state.epoch(), 3);

    let ephemeral = Token::from_bytes([40; 32]);
    let mut create = CreateEphemeral {
        epoch_stamp: 3,
        author: genesis.public_key(),
        ephemeral_token: ephemeral,
        expire: 5,
        attorney: Token::ZERO,
        signature: Signature::ZERO,
        wallet: Token::ZERO,
        fee: 0,
        wallet_signature: Signature::ZERO,
    };
    create.sign(&genesis, Token::ZERO);
    create.pay_fee(0, &genesis);

    let mut builder = BlockBuilder::new(&state);
    builder.push_bytes(&create.serialize()).await.unwrap();
    let block = builder.seal();
    state.advance_epoch(&block.mutations).await; // now epoch 4

    let hash = Hash::of_token(&ephemeral);
    assert_eq!(state.ephemeral_tokens.get(&hash).await, 5);

    let block = BlockBuilder::new(&state).seal();
    state.advance_epoch(&block.mutations).await; // epoch 5: still visible
    assert_eq!(state.ephemeral_tokens.get(&hash).await, 5);

    let block = BlockBuilder::new(&state).seal();
    state.advance_epoch(&block.mutations).await; // epoch 6: swept
    assert_eq!(state.ephemeral_tokens.get(&hash).await, 0);
}

// ─────────────────────────────────────────────────────────────────────────
// Signature layering on content
// ─────────────────────────────────────────────────────────────────────────

async fn state_with_keyed_stage(
    stage: Token,
    submit_key: &Keypair,
    mod_key: &Keypair,
) -> (State, Keypair) {
    let (mut state, genesis) = State::genesis(GenesisConfig::default()).await;
    let mut builder = BlockBuilder::new(&state);
    builder
        .push_bytes(&create_stage_bytes(
            &genesis,
            stage,
            submit_key.public_key(),
            mod_key.public_key(),
            0,
        ))
        .await
        .unwrap();
    let block = builder.seal();
    state.advance_epoch(&block.mutations).await;
    (state, genesis)
}

#[tokio::test]
async fn tampered_submission_bulk_fails_submission_check() {
    let submit_key = Keypair::from_seed(&[50; 32]);
    let mod_key = Keypair::from_seed(&[51; 32]);
    let stage = Token::from_bytes([52; 32]);
    let (state, genesis) = state_with_keyed_stage(stage, &submit_key, &mod_key).await;

    let mut content = plain_content(genesis.public_key(), stage, b"original", 1);
    content.submit_sign(&submit_key);
    // tamper with the submission bulk after the submission MAC was made,
    // then re-sign the outer layers so only the submission check can fail
    content.content = Bytes::from_static(b"tampered");
    content.hash = Hash::of(b"tampered").as_bytes().to_vec();
    content.moderate_sign(mod_key.public_key(), &mod_key);
    content.sign(&mod_key, Token::ZERO);
    content.pay_fee(0, &mod_key);

    let mut builder = BlockBuilder::new(&state);
    let rejected = builder.push_bytes(&content.serialize()).await;
    assert_eq!(
        rejected,
        Err(BlockError::Validation(ValidationError::BadSignature(
            "submission"
        )))
    );
}

#[tokio::test]
async fn wrong_moderation_key_fails_only_the_moderation_check() {
    let submit_key = Keypair::from_seed(&[50; 32]);
    let mod_key = Keypair::from_seed(&[51; 32]);
    let impostor = Keypair::from_seed(&[53; 32]);
    let stage = Token::from_bytes([52; 32]);
    let (state, genesis) = state_with_keyed_stage(stage, &submit_key, &mod_key).await;

    let mut content = plain_content(genesis.public_key(), stage, b"moderated", 1);
    content.submit_sign(&submit_key);
    content.moderate_sign(mod_key.public_key(), &impostor);
    content.sign(&mod_key, Token::ZERO);
    content.pay_fee(0, &mod_key);

    let mut builder = BlockBuilder::new(&state);
    let rejected = builder.push_bytes(&content.serialize()).await;
    assert_eq!(
        rejected,
        Err(BlockError::Validation(ValidationError::BadSignature(
            "moderation"
        )))
    );
}

#[tokio::test]
async fn properly_layered_content_is_accepted() {
    let submit_key = Keypair::from_seed(&[50; 32]);
    let mod_key = Keypair::from_seed(&[51; 32]);
    let stage = Token::from_bytes([52; 32]);
    let (mut state, genesis) = state_with_keyed_stage(stage, &submit_key, &mod_key).await;

    let mut content = plain_content(genesis.public_key(), stage, b"clean", 1);
    content.published = 0; // moderated content may publish earlier than its stamp
    content.submit_sign(&submit_key);
    content.moderate_sign(mod_key.public_key(), &mod_key);
    content.sign(&mod_key, Token::ZERO);
    content.pay_fee(5, &genesis);

    let mut builder = BlockBuilder::new(&state);
    builder.push_bytes(&content.serialize()).await.unwrap();
    let block = builder.seal();
    assert_eq!(block.fee_collected, 5);
    state.advance_epoch(&block.mutations).await;
    assert_eq!(
        state
            .wallets
            .balance(&Hash::of_token(&genesis.public_key()))
            .await,
        (true, 999_995)
    );
}
