//! End-to-end engine harness
//!
//! Drives the full action pipeline against a file-backed store:
//! eligibility → stake deduction → resolution → settlement.


use economy_engine::models::{ActionRequest, ColorChoice, GameOutcome, Rejection, RoundResult};
use economy_engine::{db, Engine, EngineError, PolicyPatch};
use scripted::ScriptedDraws;
use tempfile::TempDir;

async fn engine_fixture() -> (TempDir, Engine) {
    let dir = tempfile::tempdir().expect("tempdir");
    let engine = open_engine(&dir).await;
    (dir, engine)
}

/// Open (or re-open) an engine over the fixture's database file.
async fn open_engine(dir: &TempDir) -> Engine {
    let url = format!("sqlite://{}", dir.path().join("economy.db").display());
    let pool = db::init_db(&url).await.expect("init db");
    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");
    Engine::new(pool).await.expect("engine")
}

/// Bring a user up to `balance` starting from the default account.
async fn seed_balance(engine: &Engine, user: &str, balance: i64) {
    let current = engine.query_balance(user).await.expect("balance");
    engine
        .admin_adjust_balance(user, balance - current)
        .await
        .expect("adjust");
}

#[tokio::test]
async fn first_contact_creates_account_with_starting_balance() {
    let (_dir, engine) = engine_fixture().await;

    assert_eq!(engine.query_balance("alice").await.unwrap(), 1000);
    // Idempotent on the second read.
    assert_eq!(engine.query_balance("alice").await.unwrap(), 1000);
}

#[tokio::test]
async fn dice_win_nets_stake_times_multiplier_minus_stake() {
    let (_dir, engine) = engine_fixture().await;
    seed_balance(&engine, "alice", 20_000).await;

    let mut draws = ScriptedDraws::new().with_ranges(&[4]);
    let result = engine
        .perform_action_with("alice", ActionRequest::Dice { guess: 4 }, &mut draws)
        .await
        .unwrap();

    assert!(result.accepted);
    assert_eq!(result.stake_deducted, 500);
    assert_eq!(result.payout_credited, 2500);
    assert_eq!(result.new_balance, 22_000);
    assert_eq!(engine.query_balance("alice").await.unwrap(), 22_000);
}

#[tokio::test]
async fn slot_triple_pays_from_the_table() {
    let (_dir, engine) = engine_fixture().await;
    seed_balance(&engine, "alice", 20_000).await;

    let mut draws = ScriptedDraws::new().with_picks(&[0, 0, 0]);
    let result = engine
        .perform_action_with("alice", ActionRequest::Slot, &mut draws)
        .await
        .unwrap();

    assert!(result.accepted);
    assert_eq!(result.stake_deducted, 1000);
    assert_eq!(result.payout_credited, 5000);
    assert_eq!(result.new_balance, 24_000);

    match result.outcome {
        Some(GameOutcome::Slot(spin)) => assert_eq!(spin.reels, vec!["🍒", "🍒", "🍒"]),
        other => panic!("expected a slot outcome, got {:?}", other),
    }

    // An unlisted key pays nothing.
    let mut draws = ScriptedDraws::new().with_picks(&[0, 1, 2]);
    let result = engine
        .perform_action_with("alice", ActionRequest::Slot, &mut draws)
        .await
        .unwrap();

    assert_eq!(result.payout_credited, 0);
    assert_eq!(result.new_balance, 23_000);
}

#[tokio::test]
async fn color_white_hit_pays_white_multiplier() {
    let (_dir, engine) = engine_fixture().await;
    seed_balance(&engine, "alice", 20_000).await;

    let mut draws = ScriptedDraws::new().with_units(&[0.01]);
    let result = engine
        .perform_action_with(
            "alice",
            ActionRequest::Color {
                choice: ColorChoice::White,
            },
            &mut draws,
        )
        .await
        .unwrap();

    assert!(result.accepted);
    assert_eq!(result.stake_deducted, 1000);
    assert_eq!(result.payout_credited, 10_000);
    assert_eq!(result.new_balance, 29_000);
}

#[tokio::test]
async fn blackjack_push_leaves_balance_unchanged() {
    let (_dir, engine) = engine_fixture().await;
    seed_balance(&engine, "alice", 20_000).await;

    let mut draws = ScriptedDraws::new().with_ranges(&[19, 19]);
    let result = engine
        .perform_action_with("alice", ActionRequest::Blackjack, &mut draws)
        .await
        .unwrap();

    assert!(result.accepted);
    assert_eq!(result.stake_deducted, 2000);
    assert_eq!(result.payout_credited, 2000);
    assert_eq!(result.new_balance, 20_000);
    assert_eq!(engine.query_balance("alice").await.unwrap(), 20_000);

    match result.outcome {
        Some(GameOutcome::Blackjack(round)) => assert_eq!(round.result, RoundResult::Push),
        other => panic!("expected a blackjack outcome, got {:?}", other),
    }
}

#[tokio::test]
async fn blackjack_player_bust_loses_even_when_dealer_busts() {
    let (_dir, engine) = engine_fixture().await;
    seed_balance(&engine, "alice", 20_000).await;

    let mut draws = ScriptedDraws::new().with_ranges(&[22, 22]);
    let result = engine
        .perform_action_with("alice", ActionRequest::Blackjack, &mut draws)
        .await
        .unwrap();

    assert_eq!(result.payout_credited, 0);
    assert_eq!(result.new_balance, 18_000);
}

#[tokio::test]
async fn wager_below_table_minimum_is_rejected_without_mutation() {
    let (_dir, engine) = engine_fixture().await;

    let mut draws = ScriptedDraws::new();
    let result = engine
        .perform_action_with("alice", ActionRequest::Slot, &mut draws)
        .await
        .unwrap();

    assert!(!result.accepted);
    assert_eq!(
        result.rejection,
        Some(Rejection::InsufficientFunds {
            required: 10_000,
            balance: 1000
        })
    );
    assert_eq!(engine.query_balance("alice").await.unwrap(), 1000);
}

#[tokio::test]
async fn balance_checks_run_before_parameter_checks() {
    let (_dir, engine) = engine_fixture().await;

    // Below the table minimum AND an out-of-range guess: the funds check
    // wins.
    let mut draws = ScriptedDraws::new();
    let result = engine
        .perform_action_with("alice", ActionRequest::Dice { guess: 9 }, &mut draws)
        .await
        .unwrap();

    assert!(matches!(
        result.rejection,
        Some(Rejection::InsufficientFunds { .. })
    ));
}

#[tokio::test]
async fn out_of_range_dice_guess_is_rejected_without_mutation() {
    let (_dir, engine) = engine_fixture().await;
    seed_balance(&engine, "alice", 20_000).await;

    let mut draws = ScriptedDraws::new();
    let result = engine
        .perform_action_with("alice", ActionRequest::Dice { guess: 9 }, &mut draws)
        .await
        .unwrap();

    assert!(!result.accepted);
    assert!(matches!(
        result.rejection,
        Some(Rejection::InvalidParameter { .. })
    ));
    assert_eq!(engine.query_balance("alice").await.unwrap(), 20_000);
}

#[tokio::test]
async fn stake_above_balance_is_rejected_after_policy_update() {
    let (_dir, engine) = engine_fixture().await;
    seed_balance(&engine, "alice", 12_000).await;

    engine
        .admin_update_policy(PolicyPatch::Slot {
            cost: Some(15_000),
            symbols: None,
            payouts: None,
        })
        .await
        .unwrap();

    let mut draws = ScriptedDraws::new();
    let result = engine
        .perform_action_with("alice", ActionRequest::Slot, &mut draws)
        .await
        .unwrap();

    assert_eq!(
        result.rejection,
        Some(Rejection::InsufficientFunds {
            required: 15_000,
            balance: 12_000
        })
    );
    assert_eq!(engine.query_balance("alice").await.unwrap(), 12_000);
}

#[tokio::test]
async fn policy_update_is_visible_to_the_next_action() {
    let (_dir, engine) = engine_fixture().await;
    seed_balance(&engine, "alice", 20_000).await;

    engine
        .admin_update_policy(PolicyPatch::Dice {
            bet: Some(800),
            multiplier: None,
        })
        .await
        .unwrap();

    let mut draws = ScriptedDraws::new().with_ranges(&[1]);
    let result = engine
        .perform_action_with("alice", ActionRequest::Dice { guess: 2 }, &mut draws)
        .await
        .unwrap();

    assert_eq!(result.stake_deducted, 800);
    assert_eq!(result.new_balance, 19_200);
}

#[tokio::test]
async fn invalid_policy_patch_changes_nothing() {
    let (_dir, engine) = engine_fixture().await;

    let before = engine.current_policy().await;
    let result = engine
        .admin_update_policy(PolicyPatch::Slot {
            cost: None,
            symbols: Some(vec!["🍒".to_string(), "🍋".to_string(), "🍇".to_string()]),
            payouts: None,
        })
        .await;

    assert!(matches!(result, Err(EngineError::InvalidPolicy(_))));
    assert_eq!(engine.current_policy().await, before);
}

#[tokio::test]
async fn work_credits_reward_and_enforces_cooldown() {
    let (_dir, engine) = engine_fixture().await;

    let mut draws = ScriptedDraws::new().with_ranges(&[300]);
    let result = engine
        .perform_action_with("alice", ActionRequest::Work, &mut draws)
        .await
        .unwrap();

    assert!(result.accepted);
    assert_eq!(result.stake_deducted, 0);
    assert_eq!(result.payout_credited, 300);
    assert_eq!(result.new_balance, 1300);

    // Second attempt inside the window: rejected, nothing drawn, nothing
    // credited.
    let mut draws = ScriptedDraws::new();
    let result = engine
        .perform_action_with("alice", ActionRequest::Work, &mut draws)
        .await
        .unwrap();

    assert!(!result.accepted);
    match result.rejection {
        Some(Rejection::CooldownActive { remaining_secs }) => {
            assert!(remaining_secs > 0 && remaining_secs <= 3600);
        }
        other => panic!("expected an active cooldown, got {:?}", other),
    }
    assert_eq!(engine.query_balance("alice").await.unwrap(), 1300);
}

#[tokio::test]
async fn cooldown_and_policy_survive_a_restart() {
    let dir = tempfile::tempdir().expect("tempdir");

    {
        let engine = open_engine(&dir).await;
        let mut draws = ScriptedDraws::new().with_ranges(&[300]);
        let result = engine
            .perform_action_with("alice", ActionRequest::Work, &mut draws)
            .await
            .unwrap();
        assert!(result.accepted);

        engine
            .admin_update_policy(PolicyPatch::Dice {
                bet: Some(800),
                multiplier: None,
            })
            .await
            .unwrap();
    }

    let engine = open_engine(&dir).await;

    assert_eq!(engine.query_balance("alice").await.unwrap(), 1300);
    assert_eq!(engine.current_policy().await.dice.bet, 800);

    let mut draws = ScriptedDraws::new();
    let result = engine
        .perform_action_with("alice", ActionRequest::Work, &mut draws)
        .await
        .unwrap();
    assert!(matches!(
        result.rejection,
        Some(Rejection::CooldownActive { .. })
    ));
}

#[tokio::test]
async fn admin_decrement_clamps_at_zero() {
    let (_dir, engine) = engine_fixture().await;

    let new_balance = engine.admin_adjust_balance("alice", -5000).await.unwrap();
    assert_eq!(new_balance, 0);
}

#[tokio::test]
async fn ranking_is_sorted_limited_and_stable() {
    let (_dir, engine) = engine_fixture().await;
    seed_balance(&engine, "alice", 15_000).await;
    seed_balance(&engine, "bob", 5000).await;
    seed_balance(&engine, "carol", 15_000).await;

    let top = engine.get_ranking(2).await.unwrap();
    assert_eq!(top.len(), 2);
    assert_eq!(top[0].user_id, "alice");
    assert_eq!(top[1].user_id, "carol");

    // Ties keep their order across repeated calls with no intervening
    // mutation.
    let again = engine.get_ranking(2).await.unwrap();
    assert_eq!(top, again);

    let all = engine.get_ranking(10).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[2].user_id, "bob");
}

#[tokio::test]
async fn concurrent_deltas_for_one_user_all_apply_exactly_once() {
    let (_dir, engine) = engine_fixture().await;
    assert_eq!(engine.query_balance("dave").await.unwrap(), 1000);

    let mut tasks = Vec::new();
    for i in 0..10 {
        let engine = engine.clone();
        let delta = if i % 2 == 0 { 100 } else { -50 };
        tasks.push(tokio::spawn(async move {
            engine.admin_adjust_balance("dave", delta).await
        }));
    }
    for task in tasks {
        task.await.expect("join").expect("adjust");
    }

    assert_eq!(engine.query_balance("dave").await.unwrap(), 1250);
}

#[tokio::test]
async fn concurrent_plays_cannot_double_spend() {
    let (_dir, engine) = engine_fixture().await;
    // Enough for exactly one losing slot play: after it the balance drops
    // below the table minimum.
    seed_balance(&engine, "eve", 10_500).await;

    let mut tasks = Vec::new();
    for _ in 0..2 {
        let engine = engine.clone();
        tasks.push(tokio::spawn(async move {
            let mut draws = ScriptedDraws::new().with_picks(&[0, 1, 2]);
            engine
                .perform_action_with("eve", ActionRequest::Slot, &mut draws)
                .await
        }));
    }

    let mut accepted = 0;
    let mut rejected = 0;
    for task in tasks {
        let result = task.await.expect("join").expect("action");
        if result.accepted {
            accepted += 1;
        } else {
            assert!(matches!(
                result.rejection,
                Some(Rejection::InsufficientFunds { .. })
            ));
            rejected += 1;
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(rejected, 1);
    assert_eq!(engine.query_balance("eve").await.unwrap(), 9500);
}
