// crates/gammastake-router/tests/router_pools_vesting.rs
//
// Pool LP staking and vesting through the router.

mod common;

use common::{between, raw, units, user, Harness, DAY, ES_GS_PER_SECOND};
use gammastake_core::{Address, Amount, ProtocolEvent, StakeError, TokenInfo};
use gammastake_router::TrackerId;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Register an LP token and set up pool staking paying esGS.
fn setup_pool(h: &mut Harness) -> (Address, Address) {
    let gov = h.gov;
    let pool = user("gs-weth-lp");
    let es_gs = h.router.es_gs();
    let ledger = h.router.ledger_mut();
    ledger
        .register_token(pool, gov, TokenInfo::new("GS/WETH LP", "GSLP"))
        .unwrap();
    ledger.set_minter(&pool, gov, gov, true).unwrap();
    h.router.setup_pool_staking(gov, pool, es_gs).unwrap();
    (pool, es_gs)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn test_pool_staking_and_claims() {
    let mut h = Harness::new();
    let gov = h.gov;
    let manager = user("manager");
    let user0 = user("user0");
    let user1 = user("user1");
    let (pool, es_gs) = setup_pool(&mut h);
    let id = TrackerId::Pool { pool, es_token: es_gs };
    h.router.set_manager(gov, manager, true).unwrap();

    let distributor = h.router.distributor_address(id).unwrap();
    h.router
        .set_tokens_per_interval(gov, id, raw(ES_GS_PER_SECOND))
        .unwrap();
    h.mint(es_gs, distributor, units(50_000));
    h.mint(pool, user0, units(1000));
    h.mint(pool, manager, units(1000));

    let err = h
        .router
        .stake_lp_for_account(user1, pool, es_gs, user0, units(1000))
        .unwrap_err();
    assert!(matches!(err, StakeError::Forbidden(_)));
    let err = h
        .router
        .stake_lp(user0, Address::ZERO, Address::ZERO, units(1000))
        .unwrap_err();
    assert!(matches!(err, StakeError::TrackerNotFound(_)));

    h.router.stake_lp(user0, pool, es_gs, units(1000)).unwrap();
    assert!(h.router.take_events().contains(&ProtocolEvent::StakedLp {
        account: user0,
        pool,
        amount: units(1000),
    }));
    h.router
        .stake_lp_for_account(manager, pool, es_gs, user1, units(1000))
        .unwrap();
    assert_eq!(h.balance(pool, manager), Amount::ZERO);

    let tracker = h.router.pool(pool, es_gs).unwrap().tracker.clone();
    for account in [user0, user1] {
        assert_eq!(h.balance(tracker.address(), account), units(1000));
        assert_eq!(tracker.staked_amount(&account), units(1000));
        assert_eq!(tracker.deposit_balance(&account, &pool), units(1000));
    }

    h.advance(DAY);
    assert!(between(h.router.pool_claimable(pool, es_gs, &user0).unwrap(), 892, 893));
    assert!(between(h.router.pool_claimable(pool, es_gs, &user1).unwrap(), 892, 893));

    h.mint(pool, user0, units(1000));
    h.router.stake_lp(user0, pool, es_gs, units(1000)).unwrap();
    h.router
        .unstake_lp_for_account(gov, pool, es_gs, user1, units(500))
        .unwrap();
    assert!(h.router.take_events().contains(&ProtocolEvent::UnstakedLp {
        account: user1,
        pool,
        amount: units(500),
    }));
    assert_eq!(h.balance(pool, user1), units(500));

    h.advance(DAY);
    assert!(between(h.router.pool_claimable(pool, es_gs, &user0).unwrap(), 892 + 1428, 893 + 1429));
    assert!(between(h.router.pool_claimable(pool, es_gs, &user1).unwrap(), 892 + 357, 893 + 358));
    assert_eq!(
        h.router.get_average_staked_amount(Some(pool), es_gs, &user0).unwrap(),
        units(1000)
    );
    assert_eq!(
        h.router.get_average_staked_amount(Some(pool), es_gs, &user1).unwrap(),
        units(1000)
    );

    h.router.unstake_lp(user0, pool, es_gs, units(1000)).unwrap();
    let tracker = &h.router.pool(pool, es_gs).unwrap().tracker;
    assert_eq!(tracker.staked_amount(&user0), units(1000));
    assert_eq!(tracker.staked_amount(&user1), units(500));
    assert_eq!(tracker.deposit_balance(&user1, &pool), units(500));

    let err = h
        .router
        .claim_pool(user0, Address::ZERO, Address::ZERO, true, true)
        .unwrap_err();
    assert!(matches!(err, StakeError::TrackerNotFound(_)));
    let err = h
        .router
        .claim_pool(user0, Address::ZERO, Address::ZERO, false, true)
        .unwrap_err();
    assert!(matches!(err, StakeError::VesterNotFound(_)));

    let claim0 = h.router.claim_pool(user0, pool, es_gs, true, true).unwrap();
    let claim1 = h.router.claim_pool(user1, pool, es_gs, true, true).unwrap();
    assert_eq!(claim0.vested, Amount::ZERO);
    assert!(between(h.balance(es_gs, user0), 892 + 1428, 893 + 1429));
    assert!(between(h.balance(es_gs, user1), 892 + 357, 893 + 358));
    assert_eq!(h.balance(es_gs, user1), claim1.es_token);
    assert!(between(
        h.router.get_average_staked_amount(Some(pool), es_gs, &user0).unwrap(),
        1615,
        1616
    ));
    assert!(between(
        h.router.get_average_staked_amount(Some(pool), es_gs, &user1).unwrap(),
        857,
        858
    ));
}

#[test]
fn test_vest_and_withdraw_core_and_pool() {
    let mut h = Harness::new();
    let gov = h.gov;
    let user0 = user("user0");
    let user1 = user("user1");
    let (pool, es_gs) = setup_pool(&mut h);
    let gs = h.router.gs();
    let core_vester = h.router.core().vester.address();
    let pool_vester = h.router.pool(pool, es_gs).unwrap().vester.address();
    h.mint(gs, core_vester, units(1000));
    h.mint(gs, pool_vester, units(1000));
    h.mint(es_gs, user0, units(1000));
    h.mint(es_gs, user1, units(1000));

    let err = h.router.vest_es_gs(user0, units(1000)).unwrap_err();
    assert!(matches!(err, StakeError::MaxVestableExceeded(_)));
    h.router
        .set_bonus_rewards(gov, TrackerId::Reward, user0, units(1000))
        .unwrap();
    h.router.vest_es_gs(user0, units(1000)).unwrap();

    let err = h
        .router
        .vest_es_token_for_pool(user1, Address::ZERO, Address::ZERO, units(1000))
        .unwrap_err();
    assert!(matches!(err, StakeError::VesterNotFound(_)));
    let err = h
        .router
        .vest_es_token_for_pool(user1, pool, es_gs, units(1000))
        .unwrap_err();
    assert!(matches!(err, StakeError::MaxVestableExceeded(_)));
    h.router
        .set_bonus_rewards(gov, TrackerId::Pool { pool, es_token: es_gs }, user1, units(1000))
        .unwrap();
    h.router
        .vest_es_token_for_pool(user1, pool, es_gs, units(1000))
        .unwrap();
    assert_eq!(h.balance(es_gs, user1), Amount::ZERO);

    h.advance(30 * DAY);
    h.router.withdraw_es_gs(user0).unwrap();
    let err = h
        .router
        .withdraw_es_token_for_pool(user1, Address::ZERO, Address::ZERO)
        .unwrap_err();
    assert!(matches!(err, StakeError::VesterNotFound(_)));
    h.router.withdraw_es_token_for_pool(user1, pool, es_gs).unwrap();

    // 1000 * 30 / 365 ~= 82.19 vested, the rest refunded as escrow
    for account in [user0, user1] {
        assert!(between(h.balance(gs, account), 82, 83));
        assert!(between(h.balance(es_gs, account), 917, 918));
    }
    assert_eq!(h.router.core().vester.balance_of(&user0), Amount::ZERO);
}

#[test]
fn test_claim_vested_gs_releases_linearly() {
    let mut h = Harness::new();
    let gov = h.gov;
    let user0 = user("user0");
    let gs = h.router.gs();
    let es_gs = h.router.es_gs();
    let core_vester = h.router.core().vester.address();
    h.mint(gs, core_vester, units(1000));
    h.mint(es_gs, user0, units(365));
    h.router
        .set_bonus_rewards(gov, TrackerId::Reward, user0, units(365))
        .unwrap();
    h.router.vest_es_gs(user0, units(365)).unwrap();

    h.advance(10 * DAY);
    let claimed = h.router.claim_vested_gs(user0).unwrap();
    assert!(between(claimed, 9, 11));
    assert_eq!(h.balance(gs, user0), claimed);
    // claimed escrow is burned
    assert!(between(h.router.ledger().total_supply(&es_gs), 354, 356));

    // nothing more vests without time passing
    assert_eq!(h.router.claim_vested_gs(user0).unwrap(), Amount::ZERO);

    let err = h
        .router
        .withdraw_vester_token(gov, TrackerId::Reward, es_gs, gov, units(1))
        .unwrap_err();
    assert!(matches!(err, StakeError::Forbidden(_)));
    assert!(matches!(
        h.router
            .withdraw_vester_token(gov, TrackerId::Bonus, gs, gov, units(1)),
        Err(StakeError::VesterNotFound(_))
    ));
}
