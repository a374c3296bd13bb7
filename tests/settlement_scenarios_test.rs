//! End-to-end rounds through the `Casino` facade with scripted draws

use neon_casino::{
    config::CasinoConfig,
    errors::{CasinoError, GameError},
    games::{CoinSide, GameType, Reveal, Tick},
    odds::{resolve_entry, OddsEntry},
    promo::{apply_promo, InMemoryPromoService, PromoCode},
    random::ScriptedDraws,
    BalanceOwner, Casino, Wallet,
};
use std::sync::Arc;
use std::time::Duration;

fn casino_with(draws: Vec<f64>) -> Casino {
    let config = CasinoConfig::default();
    let wallet = Arc::new(Wallet::in_memory(&config.wallet));
    Casino::new(config, wallet, Box::new(ScriptedDraws::new(draws)))
}

#[test]
fn test_case_balance_equals_price_and_resolved_payout() {
    let config = CasinoConfig::default();
    let case = config.case("Новичок").expect("stock case").clone();

    for unit in [0.0, 0.3, 0.6, 0.75, 0.9, 0.999] {
        let casino = casino_with(vec![unit]);
        let before = casino.balance();
        let opening = casino.open_case(&case.name).expect("open");
        casino.settle_case(opening.clone()).expect("settle");

        let expected = resolve_entry(&case.outcomes, unit * 100.0).expect("non-empty").payout;
        assert_eq!(opening.payout, expected);
        assert!((casino.balance() - (before - case.price + expected)).abs() < 1e-9);
    }
}

#[test]
fn test_rich_case_gap_falls_back_to_first_prize() {
    // 95 lies past the 91.1 total weight
    let casino = casino_with(vec![0.95]);
    casino.wallet().credit(400.0).expect("credit");

    let opening = casino.open_case("Богатый").expect("open");
    assert!(opening.fallback);
    assert_eq!(opening.payout, 200.0);
    assert_eq!(opening.entry_index, 0);
    assert_eq!(casino.balance(), 200.0);

    assert_eq!(casino.settle_case(opening).expect("settle"), 400.0);
}

#[test]
fn test_crash_cash_out_scenario() {
    let casino = casino_with(vec![0.0, 0.75]);
    let id = casino.start_crash(30.0).expect("start");

    assert!(matches!(casino.crash_tick(id).unwrap(), Tick::Rose(m) if (m - 1.1).abs() < 1e-9));
    assert!(matches!(casino.crash_tick(id).unwrap(), Tick::Rose(m) if (m - 1.2).abs() < 1e-9));

    let settlement = casino.crash_cash_out(id).expect("cash out");
    assert!((settlement.payout - 36.0).abs() < 1e-9);
    assert!(casino.crash_tick(id).is_err());
}

#[test]
fn test_crash_below_minimum_is_invalid_stake() {
    let casino = casino_with(vec![]);
    assert!(matches!(
        casino.start_crash(20.0),
        Err(CasinoError::Game(GameError::InvalidStake { .. }))
    ));
    assert_eq!(casino.balance(), 100.0);
}

#[test]
fn test_mines_clear_whole_board_pays_seven_times() {
    let casino = casino_with(vec![0.0; 5]);
    let id = casino.start_mines(10.0).expect("start");

    let mut last = None;
    for index in 5..25 {
        last = Some(casino.reveal_cell(id, index).expect("reveal"));
    }
    match last {
        Some(Reveal::Cleared(settlement)) => assert!((settlement.payout - 70.0).abs() < 1e-9),
        other => panic!("expected cleared board, got {other:?}"),
    }
    assert!((casino.balance() - 160.0).abs() < 1e-9);
    assert_eq!(casino.live_sessions(), 0);
}

#[test]
fn test_mines_cash_out_without_reveal_rejected() {
    let casino = casino_with(vec![0.0; 5]);
    let id = casino.start_mines(10.0).expect("start");
    assert!(matches!(
        casino.mines_cash_out(id),
        Err(CasinoError::Game(GameError::InvalidTransition { .. }))
    ));
    assert_eq!(casino.live_sessions(), 1);
}

#[test]
fn test_coinflip_match_can_still_lose() {
    // heads, gate fails
    let casino = casino_with(vec![0.2, 0.5]);
    let result = casino.play_coinflip(CoinSide::Heads, 15.0).expect("play");
    assert_eq!(result.outcome, CoinSide::Heads);
    assert!(!result.won);
    assert_eq!(casino.balance(), 85.0);
}

#[test]
fn test_history_and_stats_track_every_round() {
    let casino = casino_with(vec![0.9, 0.1, 0.1, 0.0, 0.0, 0.0, 0.0, 0.0]);
    casino.play_coinflip(CoinSide::Heads, 15.0).unwrap();
    casino.play_coinflip(CoinSide::Heads, 15.0).unwrap();
    let id = casino.start_mines(10.0).unwrap();
    casino.reveal_cell(id, 0).unwrap();

    let history = casino.history();
    let games: Vec<GameType> = history.iter().map(|r| r.game).collect();
    assert_eq!(games, vec![GameType::CoinFlip, GameType::CoinFlip, GameType::Mines]);

    let stats = casino.stats();
    assert_eq!(stats.rounds, 3);
    assert_eq!(stats.wagered, 40.0);
    assert_eq!(stats.paid_out, 30.0);
    assert!((stats.house_edge - 0.25).abs() < 1e-9);
}

#[tokio::test]
async fn test_promo_credit_through_casino_wallet() {
    let casino = casino_with(vec![]);
    let service = InMemoryPromoService::new([PromoCode::new("WELCOME", 25.0, 10)]);

    let balance = apply_promo(&service, casino.wallet().as_ref(), "u1", "WELCOME")
        .await
        .expect("redeem");
    assert_eq!(balance, 125.0);
    assert!(apply_promo(&service, casino.wallet().as_ref(), "u1", "WELCOME").await.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_coinflip_payout_lands_after_animation() {
    let casino = Arc::new(casino_with(vec![0.1, 0.1]));
    let task = {
        let casino = casino.clone();
        tokio::spawn(async move { casino.play_coinflip_revealed(CoinSide::Heads, 15.0).await })
    };

    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(casino.balance(), 85.0);

    let result = task.await.unwrap().unwrap();
    assert!(result.won);
    assert_eq!(casino.balance(), 115.0);
}

#[test]
fn test_custom_table_order_breaks_ties() {
    let outcomes = [OddsEntry::new(5.0, 50.0), OddsEntry::new(7.0, 50.0)];
    assert_eq!(resolve_entry(&outcomes, 50.0).map(|r| r.payout), Some(5.0));
    assert_eq!(resolve_entry(&outcomes, 50.01).map(|r| r.payout), Some(7.0));
}
