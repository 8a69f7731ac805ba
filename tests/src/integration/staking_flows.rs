//! # Staking Lifecycle Flows
//!
//! Multi-block scenarios through the public `StakingApi`:
//!
//! ```text
//! deliver(msg)* ──→ end_block ──→ ValidatorUpdate[] ──→ next block ...
//!       │                │
//!       └── slash/jail ──┘   (evidence, between messages)
//! ```
//!
//! Every scenario checks token conservation after each committed block.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use qc_18_staking::{
        BondStatus, Dec, GovernanceQuery, MsgResult, StakingConfig, StakingError, StakingEvent,
        StakingMsg, ValidatorUpdate,
    };

    fn status(chain: &Chain, id: u8) -> BondStatus {
        chain.service.validator(&account(id)).unwrap().status
    }

    fn update(id: u8, power: u64) -> ValidatorUpdate {
        ValidatorUpdate {
            pubkey: pubkey(id),
            power,
        }
    }

    #[test]
    fn test_validator_set_follows_delegations() {
        init_test_tracing();
        let mut chain = Chain::new(
            fast_config(),
            &[(1, 1_000), (2, 1_000), (3, 1_000), (4, 1_000), (10, 1_000), (11, 1_000)],
        )
        .unwrap();

        for (id, bond) in [(1, 100), (2, 200), (3, 300), (4, 50)] {
            chain.deliver(create_validator_msg(id, tokens(bond))).unwrap();
        }
        let updates = chain.commit().unwrap();
        assert_eq!(updates, vec![update(3, 300), update(2, 200), update(1, 100)]);
        assert_eq!(status(&chain, 4), BondStatus::Unbonded);
        chain.check_conservation().unwrap();

        // Validator 4 overtakes validator 1
        chain.delegate(10, 4, 500).unwrap();
        let updates = chain.commit().unwrap();
        assert_eq!(updates, vec![update(4, 550), update(1, 0)]);
        assert_eq!(status(&chain, 1), BondStatus::Unbonding);
        assert_eq!(status(&chain, 4), BondStatus::Bonded);
        chain.check_conservation().unwrap();

        // Three-way tie at 300 ranks by operator address
        chain.delegate(11, 2, 100).unwrap();
        let started = chain
            .deliver(StakingMsg::Undelegate {
                delegator: account(10),
                validator: account(4),
                shares: tokens(250),
            })
            .unwrap();
        let MsgResult::UnbondingStarted {
            completion_time, ..
        } = started
        else {
            panic!("unexpected result {started:?}");
        };
        let updates = chain.commit().unwrap();
        assert_eq!(updates, vec![update(2, 300), update(4, 300)]);
        chain.check_conservation().unwrap();

        chain.commit_until(completion_time).unwrap();
        assert_eq!(chain.balance(10), tokens(750));
        assert_eq!(status(&chain, 1), BondStatus::Unbonded);
        assert!(chain
            .service
            .unbonding_delegation(&account(10), &account(4))
            .is_none());
        chain.check_conservation().unwrap();
    }

    #[test]
    fn test_slash_reaches_unbonding_and_redelegation() {
        init_test_tracing();
        let mut chain =
            Chain::new(fast_config(), &[(1, 1_000), (2, 1_000), (10, 1_000)]).unwrap();

        chain.deliver(create_validator_msg(1, tokens(100))).unwrap();
        chain.deliver(create_validator_msg(2, tokens(100))).unwrap();
        chain.delegate(10, 1, 100).unwrap();
        chain.commit().unwrap();

        let infraction_height = chain.height;
        chain
            .deliver(StakingMsg::Undelegate {
                delegator: account(10),
                validator: account(1),
                shares: tokens(40),
            })
            .unwrap();
        chain
            .deliver(StakingMsg::BeginRedelegate {
                delegator: account(10),
                src: account(1),
                dst: account(2),
                shares: tokens(60),
            })
            .unwrap();
        chain.commit().unwrap();

        let fraction = Dec::from_ratio_digits(10, 2).unwrap();
        let burned = chain.slash(1, infraction_height, fraction).unwrap();

        // 10 from the validator, 4 from the unbonding entry, 6 from the
        // redelegated stake at the destination
        assert_eq!(burned, tokens(20));
        assert_eq!(chain.service.validator(&account(1)).unwrap().tokens, tokens(90));
        assert_eq!(chain.service.validator(&account(2)).unwrap().tokens, tokens(154));
        assert_eq!(
            chain
                .service
                .delegation(&account(10), &account(2))
                .unwrap()
                .shares,
            tokens(54)
        );
        assert!(chain.bus.get_events().contains(&StakingEvent::Slashed {
            validator: account(1),
            infraction_height,
            fraction,
            burned: tokens(20),
        }));
        chain.check_conservation().unwrap();

        let completion = chain
            .service
            .unbonding_delegation(&account(10), &account(1))
            .unwrap()
            .entries[0]
            .completion_time;
        chain.commit_until(completion).unwrap();

        assert_eq!(chain.balance(10), tokens(936));
        assert_eq!(chain.bank.burned(), tokens(20));
        chain.check_conservation().unwrap();
    }

    #[test]
    fn test_restart_mid_unbonding_matches_uninterrupted_chain() {
        let funded = [(1, 1_000), (2, 1_000), (10, 1_000)];
        let script = |chain: &mut Chain| {
            chain.deliver(create_validator_msg(1, tokens(100))).unwrap();
            chain.deliver(create_validator_msg(2, tokens(70))).unwrap();
            chain.delegate(10, 2, 80).unwrap();
            chain.commit().unwrap();
            chain
                .deliver(StakingMsg::Undelegate {
                    delegator: account(10),
                    validator: account(2),
                    shares: tokens(30),
                })
                .unwrap();
            chain.commit().unwrap();
        };

        let mut uninterrupted = Chain::new(fast_config(), &funded).unwrap();
        script(&mut uninterrupted);
        let mut restarted = Chain::new(fast_config(), &funded).unwrap();
        script(&mut restarted);
        let mut restarted = restarted.restart(fast_config()).unwrap();
        assert_eq!(restarted.service.snapshot(), uninterrupted.service.snapshot());

        let target = uninterrupted.ctx().time + 120;
        uninterrupted.commit_until(target).unwrap();
        restarted.commit_until(target).unwrap();

        assert_eq!(
            restarted.service.snapshot().encode().unwrap(),
            uninterrupted.service.snapshot().encode().unwrap()
        );
        assert_eq!(restarted.balance(10), tokens(950));
        restarted.check_conservation().unwrap();
    }

    #[test]
    fn test_governance_reads_finalized_history() {
        let config = StakingConfig {
            max_validators: 1,
            ..fast_config()
        };
        let mut chain = Chain::new(config, &[(1, 1_000), (2, 1_000), (10, 1_000)]).unwrap();

        chain.deliver(create_validator_msg(1, tokens(100))).unwrap();
        chain.deliver(create_validator_msg(2, tokens(50))).unwrap();
        chain.commit().unwrap();
        chain.delegate(10, 2, 100).unwrap();
        chain.commit().unwrap();

        let gov = &chain.service;
        assert_eq!(gov.voting_power(&account(1), 1).unwrap(), tokens(100));
        assert_eq!(gov.voting_power(&account(2), 1).unwrap(), Dec::zero());
        assert_eq!(gov.voting_power(&account(1), 2).unwrap(), Dec::zero());
        assert_eq!(gov.voting_power(&account(2), 2).unwrap(), tokens(150));
        assert_eq!(gov.total_bonded_tokens(1).unwrap(), tokens(100));
        assert_eq!(gov.total_bonded_tokens(2).unwrap(), tokens(150));
        assert!(matches!(
            gov.voting_power(&account(1), 3),
            Err(StakingError::HeightNotFinalized {
                requested: 3,
                last_committed: Some(2)
            })
        ));
    }

    #[test]
    fn test_jailed_validator_rejoins_after_unbonding() {
        let mut chain = Chain::new(fast_config(), &[(1, 1_000), (2, 1_000)]).unwrap();
        chain.deliver(create_validator_msg(1, tokens(100))).unwrap();
        chain.deliver(create_validator_msg(2, tokens(100))).unwrap();
        chain.commit().unwrap();

        chain.jail(1).unwrap();
        let updates = chain.commit().unwrap();
        assert_eq!(updates, vec![update(1, 0)]);

        chain
            .deliver(StakingMsg::Unjail {
                operator: account(1),
            })
            .unwrap();
        let completion = chain
            .service
            .validator(&account(1))
            .unwrap()
            .unbonding_completion_time;

        let updates = chain.commit_until(completion).unwrap();
        assert_eq!(updates, vec![update(1, 100)]);
        assert_eq!(status(&chain, 1), BondStatus::Bonded);
        chain.check_conservation().unwrap();
    }

    #[test]
    fn test_maturity_pays_once() {
        let mut chain = Chain::new(fast_config(), &[(1, 1_000), (10, 1_000)]).unwrap();
        chain.deliver(create_validator_msg(1, tokens(100))).unwrap();
        chain.delegate(10, 1, 40).unwrap();
        chain.commit().unwrap();
        chain
            .deliver(StakingMsg::Undelegate {
                delegator: account(10),
                validator: account(1),
                shares: tokens(40),
            })
            .unwrap();
        let completion = chain.ctx().time + 60;

        chain.commit_until(completion).unwrap();
        assert_eq!(chain.balance(10), tokens(1_000));

        // A second pass over the same instant and an explicit completion
        // both find nothing left
        let again = chain.deliver(StakingMsg::CompleteUnbonding {
            delegator: account(10),
            validator: account(1),
        });
        assert!(matches!(
            again,
            Err(StakingError::UnbondingDelegationNotFound { .. })
        ));
        chain.commit().unwrap();
        assert_eq!(chain.balance(10), tokens(1_000));
        chain.check_conservation().unwrap();
    }

    #[test]
    fn test_events_follow_commit_order() {
        let mut chain = Chain::new(fast_config(), &[(1, 1_000), (10, 1_000)]).unwrap();
        chain.deliver(create_validator_msg(1, tokens(100))).unwrap();
        // Rejected: nothing published
        assert!(chain.delegate(10, 9, 5).is_err());
        chain.delegate(10, 1, 5).unwrap();
        chain.commit().unwrap();

        let names: Vec<&str> = chain.bus.get_events().iter().map(|e| e.name()).collect();
        assert_eq!(
            names,
            vec!["validator_created", "delegated", "validator_status_changed"]
        );
    }
}
