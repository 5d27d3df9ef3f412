//! Sniper Pipeline Integration Tests
//!
//! End-to-end flows through the public API:
//! 1. Scripted stream -> classifier -> enrichment -> filter -> observer
//! 2. Dedup, quota and fail-closed behavior across the whole pipeline
//! 3. Reconnection as seen by the observer
//!
//! All tests are deterministic (no real network calls) and run on a paused clock.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::transaction::{Transaction, VersionedTransaction};
use tokio_test::{assert_err, assert_ok};

use token_sniper::adapters::stream::ConnectionState;
use token_sniper::application::{ControllerState, SniperController, SniperSettings};
use token_sniper::domain::known_programs::{
    RAYDIUM_AMM_V4_PROGRAM, SPL_TOKEN_2022_PROGRAM, SPL_TOKEN_PROGRAM,
};
use token_sniper::domain::{
    SafetyFlags, SniperConfig, SniperConfigUpdate, SourceType, TokenMetadata, Verdict,
};
use token_sniper::ports::mocks::{MockTokenData, RecordingObserver, ScriptedConnector, SessionScript};
use token_sniper::ports::{SniperEvent, SniperObserver, StreamConnector, TokenDataPort};

// ============================================================================
// Test Fixtures
// ============================================================================

fn program(id: &str) -> Pubkey {
    Pubkey::from_str(id).unwrap()
}

/// Wrap instructions into the inbound `{type:"transaction"}` frame
fn frame(instructions: &[Instruction]) -> String {
    let message = Message::new(instructions, Some(&Pubkey::new_unique()));
    let tx = VersionedTransaction::from(Transaction::new_unsigned(message));
    serde_json::json!({
        "type": "transaction",
        "transaction": STANDARD.encode(bincode::serialize(&tx).unwrap()),
    })
    .to_string()
}

fn memo_instruction() -> Instruction {
    Instruction::new_with_bytes(Pubkey::new_unique(), b"hello", vec![])
}

fn initialize_mint(token_program: &str, mint: &Pubkey) -> Instruction {
    Instruction::new_with_bytes(
        program(token_program),
        &[0, 9],
        vec![AccountMeta::new(*mint, false)],
    )
}

/// Raydium AMM v4 Initialize2 with the token mint at account index 4
fn initialize_pool(mint: &Pubkey) -> Instruction {
    let system = program("11111111111111111111111111111111");
    Instruction::new_with_bytes(
        program(RAYDIUM_AMM_V4_PROGRAM),
        &[1, 254, 0, 0, 0],
        vec![
            AccountMeta::new_readonly(program(SPL_TOKEN_PROGRAM), false),
            AccountMeta::new(Pubkey::new_unique(), false),
            AccountMeta::new(Pubkey::new_unique(), false),
            AccountMeta::new_readonly(system, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new(Pubkey::new_unique(), false),
        ],
    )
}

fn metadata(symbol: &str, liquidity_usd: f64) -> TokenMetadata {
    TokenMetadata {
        symbol: symbol.to_string(),
        name: format!("{} Token", symbol),
        decimals: 9,
        liquidity_usd,
        volume_24h_usd: 2_500.0,
        price_usd: 0.0001,
    }
}

fn safe() -> SafetyFlags {
    SafetyFlags {
        is_lp_burned: true,
        is_mint_authority_revoked: true,
    }
}

struct Pipeline {
    controller: SniperController,
    observer: Arc<RecordingObserver>,
    token_data: Arc<MockTokenData>,
    connector: Arc<ScriptedConnector>,
}

async fn pipeline(
    token_data: MockTokenData,
    connector: ScriptedConnector,
    sniper: SniperConfig,
) -> Pipeline {
    let token_data = Arc::new(token_data);
    let observer = Arc::new(RecordingObserver::new());
    let connector = Arc::new(connector);

    let controller = SniperController::new(
        SniperSettings {
            sniper,
            ..Default::default()
        },
        Arc::clone(&token_data) as Arc<dyn TokenDataPort>,
        Arc::clone(&observer) as Arc<dyn SniperObserver>,
    )
    .unwrap();
    assert_ok!(
        controller
            .init(Arc::clone(&connector) as Arc<dyn StreamConnector>)
            .await
    );

    Pipeline {
        controller,
        observer,
        token_data,
        connector,
    }
}

async fn advance(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

// ============================================================================
// Classification through the pipeline
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_mint_instruction_after_unrelated_instructions() {
    let mint = Pubkey::new_unique();
    let connector = ScriptedConnector::new();
    let feed = connector.channel_session();
    let p = pipeline(
        MockTokenData::new()
            .with_default_metadata(metadata("NEW", 10_000.0))
            .with_default_safety(safe()),
        connector,
        SniperConfig::default(),
    )
    .await;
    assert_ok!(p.controller.start().await);
    advance(10).await;

    // Mint initialization is the third instruction
    feed.send(frame(&[
        memo_instruction(),
        memo_instruction(),
        initialize_mint(SPL_TOKEN_PROGRAM, &mint),
    ]))
    .unwrap();
    advance(10).await;

    let detected = p.observer.detected();
    assert_eq!(detected.len(), 1);
    assert_eq!(detected[0].mint_address, mint.to_string());
    assert_eq!(detected[0].source_type, SourceType::TokenCreation);
    assert_eq!(detected[0].symbol(), Some("NEW"));

    p.controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_pool_creation_and_token_2022_detection() {
    let pool_mint = Pubkey::new_unique();
    let mint_2022 = Pubkey::new_unique();
    let connector = ScriptedConnector::new();
    let feed = connector.channel_session();
    let p = pipeline(
        MockTokenData::new()
            .with_default_metadata(metadata("ANY", 10_000.0))
            .with_default_safety(safe()),
        connector,
        SniperConfig::default(),
    )
    .await;
    assert_ok!(p.controller.start().await);
    advance(10).await;

    feed.send(frame(&[initialize_pool(&pool_mint)])).unwrap();
    feed.send(frame(&[initialize_mint(SPL_TOKEN_2022_PROGRAM, &mint_2022)])).unwrap();
    // Noise: undecodable payload, unrelated program, ack message
    feed.send(r#"{"type":"transaction","transaction":"not-base64!"}"#.to_string()).unwrap();
    feed.send(frame(&[memo_instruction()])).unwrap();
    feed.send(r#"{"type":"subscribed"}"#.to_string()).unwrap();
    advance(10).await;

    let mut detected: Vec<_> = p
        .observer
        .detected()
        .into_iter()
        .map(|c| (c.mint_address, c.source_type))
        .collect();
    detected.sort_by(|a, b| a.0.cmp(&b.0));
    let mut expected = vec![
        (pool_mint.to_string(), SourceType::PoolCreation),
        (mint_2022.to_string(), SourceType::TokenCreation),
    ];
    expected.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(detected, expected);

    let metrics = p.controller.get_performance_metrics();
    assert_eq!(metrics.detections, 2);
    assert_eq!(metrics.pool_creations, 1);
    assert_eq!(metrics.token_creations, 1);

    p.controller.stop().await;
}

// ============================================================================
// Filtering
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_low_liquidity_candidate_filtered() {
    let mint = Pubkey::new_unique();
    let connector = ScriptedConnector::new();
    let feed = connector.channel_session();
    let p = pipeline(
        MockTokenData::new()
            .with_metadata(&mint.to_string(), metadata("THIN", 500.0))
            .with_default_safety(safe()),
        connector,
        SniperConfig {
            min_liquidity_threshold: 1_000.0,
            ..Default::default()
        },
    )
    .await;
    assert_ok!(p.controller.start().await);
    advance(10).await;

    feed.send(frame(&[initialize_mint(SPL_TOKEN_PROGRAM, &mint)])).unwrap();
    advance(10).await;

    assert!(p.observer.detected().is_empty());
    let filtered = p.observer.filtered();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0].verdict(), Verdict::Filtered);
    assert!(filtered[0].filter_reason().unwrap().to_lowercase().contains("liquidity"));

    p.controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_sixth_candidate_in_hour_exceeds_quota() {
    let connector = ScriptedConnector::new();
    let feed = connector.channel_session();
    let p = pipeline(
        MockTokenData::new()
            .with_default_metadata(metadata("OK", 10_000.0))
            .with_default_safety(safe()),
        connector,
        SniperConfig {
            max_snipes_per_hour: 5,
            ..Default::default()
        },
    )
    .await;
    assert_ok!(p.controller.start().await);
    advance(10).await;

    for _ in 0..6 {
        feed.send(frame(&[initialize_mint(SPL_TOKEN_PROGRAM, &Pubkey::new_unique())]))
            .unwrap();
        advance(60_000).await;
    }

    assert_eq!(p.observer.detected().len(), 5);
    let filtered = p.observer.filtered();
    assert_eq!(filtered.len(), 1);
    assert!(filtered[0].filter_reason().unwrap().contains("quota"));

    // A fresh hour admits candidates again
    advance(3_600_000).await;
    feed.send(frame(&[initialize_mint(SPL_TOKEN_PROGRAM, &Pubkey::new_unique())]))
        .unwrap();
    advance(10).await;
    assert_eq!(p.observer.detected().len(), 6);

    p.controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_unverified_safety_fails_closed() {
    let connector = ScriptedConnector::new();
    let feed = connector.channel_session();
    // No safety configured: the mock answers {false, false}
    let p = pipeline(
        MockTokenData::new().with_default_metadata(metadata("RISKY", 50_000.0)),
        connector,
        SniperConfig::default(),
    )
    .await;
    assert_ok!(p.controller.start().await);
    advance(10).await;

    feed.send(frame(&[initialize_mint(SPL_TOKEN_PROGRAM, &Pubkey::new_unique())]))
        .unwrap();
    advance(10).await;

    assert!(p.observer.detected().is_empty());
    assert_eq!(p.observer.filtered().len(), 1);

    // Relaxing the safety requirements at runtime lets the next one through
    assert_ok!(p.controller.update_config(SniperConfigUpdate {
        require_lp_burned: Some(false),
        require_mint_revoked: Some(false),
        ..Default::default()
    }));
    feed.send(frame(&[initialize_mint(SPL_TOKEN_PROGRAM, &Pubkey::new_unique())]))
        .unwrap();
    advance(10).await;
    assert_eq!(p.observer.detected().len(), 1);

    p.controller.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_repeated_mint_enriched_once() {
    let mint = Pubkey::new_unique();
    let connector = ScriptedConnector::new();
    let feed = connector.channel_session();
    let p = pipeline(
        MockTokenData::new()
            .with_default_metadata(metadata("DUP", 10_000.0))
            .with_default_safety(safe())
            .with_delay(Duration::from_millis(300)),
        connector,
        SniperConfig::default(),
    )
    .await;
    assert_ok!(p.controller.start().await);
    advance(10).await;

    // Same mint seen as token creation and later as pool creation
    feed.send(frame(&[initialize_mint(SPL_TOKEN_PROGRAM, &mint)])).unwrap();
    feed.send(frame(&[initialize_mint(SPL_TOKEN_PROGRAM, &mint)])).unwrap();
    feed.send(frame(&[initialize_pool(&mint)])).unwrap();
    advance(1_000).await;

    assert_eq!(p.token_data.metadata_calls().len(), 1);
    assert_eq!(p.token_data.safety_calls().len(), 1);
    assert_eq!(p.observer.detected().len(), 1);

    let metrics = p.controller.get_performance_metrics();
    assert_eq!(metrics.detections, 3);
    assert_eq!(metrics.duplicates, 2);
    assert_eq!(metrics.total_attempts, 1);
    assert_eq!(metrics.successes, 1);
    assert!(metrics.average_detection_time_ms >= 300.0);

    p.controller.stop().await;
}

// ============================================================================
// Connection lifecycle
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_unexpected_close() {
    let first_mint = Pubkey::new_unique();
    let second_mint = Pubkey::new_unique();
    let connector = ScriptedConnector::new()
        .session(SessionScript::new().text(frame(&[initialize_mint(SPL_TOKEN_PROGRAM, &first_mint)])));
    let feed = connector.channel_session();
    let p = pipeline(
        MockTokenData::new()
            .with_default_metadata(metadata("RC", 10_000.0))
            .with_default_safety(safe()),
        connector,
        SniperConfig::default(),
    )
    .await;
    assert_ok!(p.controller.start().await);
    advance(5_000).await;

    let kinds: Vec<&'static str> = p
        .observer
        .events()
        .iter()
        .filter_map(|e| match e {
            SniperEvent::Connected => Some("connected"),
            SniperEvent::Disconnected => Some("disconnected"),
            _ => None,
        })
        .collect();
    assert_eq!(kinds, vec!["connected", "disconnected", "connected"]);

    let times = p.connector.attempt_times();
    assert_eq!(times.len(), 2);
    assert_eq!(times[1] - times[0], Duration::from_millis(1_000));
    assert_eq!(p.controller.connection_state().await, ConnectionState::Connected);

    // Resubscribed on the new connection
    let subscriptions = p
        .connector
        .sent()
        .iter()
        .filter(|s| s.contains(r#""type":"transaction""#))
        .count();
    assert_eq!(subscriptions, 2);

    feed.send(frame(&[initialize_mint(SPL_TOKEN_PROGRAM, &second_mint)])).unwrap();
    advance(10).await;
    assert_eq!(p.observer.detected().len(), 2);
    assert!(p.observer.errors().is_empty());

    p.controller.stop().await;
    assert_eq!(p.controller.state().await, ControllerState::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_gives_up_after_reconnect_budget() {
    let mut connector = ScriptedConnector::new();
    for _ in 0..20 {
        connector = connector.fail("connection refused");
    }
    let p = pipeline(MockTokenData::new(), connector, SniperConfig::default()).await;
    assert_ok!(p.controller.start().await);

    advance(600_000).await;

    assert_eq!(p.connector.attempts(), 11);
    assert_eq!(p.observer.errors().len(), 1);
    assert_eq!(p.observer.count_connected(), 0);
    assert_eq!(p.controller.state().await, ControllerState::Idle);

    // Restartable after a fatal stop
    assert_ok!(p.controller.init(Arc::new(ScriptedConnector::new())).await);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_runtime_update_keeps_previous_config() {
    let p = pipeline(
        MockTokenData::new(),
        ScriptedConnector::new(),
        SniperConfig::default(),
    )
    .await;

    assert_err!(p.controller.update_config(SniperConfigUpdate {
        min_volume_threshold: Some(f64::NAN),
        max_snipes_per_hour: Some(20),
        ..Default::default()
    }));
    assert_eq!(p.controller.config(), SniperConfig::default());
}
