//! # Ledger Properties
//!
//! Random streams of staking operations, interleaved with block commits,
//! must preserve:
//!
//! 1. Token conservation: user balances + module account + burned is constant,
//!    and the module account holds exactly the pool total.
//! 2. Replica determinism: two services fed the same stream end bit-identical.
//! 3. Without slashing, a validator's tokens-per-share never decreases.
//!
//! Rejected operations are expected; they must leave the ledger untouched.

#[cfg(test)]
mod tests {
    use crate::fixtures::*;
    use proptest::prelude::*;
    use qc_18_staking::{Address, Dec, StakingMsg};
    use std::collections::BTreeMap;

    const VALIDATORS: u8 = 4;
    const DELEGATORS: [u8; 3] = [10, 11, 12];

    #[derive(Clone, Debug)]
    enum Op {
        Delegate { delegator: u8, validator: u8, amount: u64 },
        Undelegate { delegator: u8, validator: u8, percent: u64 },
        Redelegate { delegator: u8, src: u8, dst: u8, percent: u64 },
        Slash { validator: u8, percent: u64, lookback: u64 },
        Jail { validator: u8 },
        Unjail { validator: u8 },
        Commit,
    }

    fn validator_id() -> impl Strategy<Value = u8> {
        1..=VALIDATORS
    }

    fn delegator_id() -> impl Strategy<Value = u8> {
        prop::sample::select(DELEGATORS.to_vec())
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (delegator_id(), validator_id(), 1u64..200).prop_map(
                |(delegator, validator, amount)| Op::Delegate { delegator, validator, amount }
            ),
            2 => (delegator_id(), validator_id(), 1u64..=100).prop_map(
                |(delegator, validator, percent)| Op::Undelegate { delegator, validator, percent }
            ),
            2 => (delegator_id(), validator_id(), validator_id(), 1u64..=100).prop_map(
                |(delegator, src, dst, percent)| Op::Redelegate { delegator, src, dst, percent }
            ),
            1 => (validator_id(), 1u64..=100, 0u64..12).prop_map(
                |(validator, percent, lookback)| Op::Slash { validator, percent, lookback }
            ),
            1 => validator_id().prop_map(|validator| Op::Jail { validator }),
            1 => validator_id().prop_map(|validator| Op::Unjail { validator }),
            3 => Just(Op::Commit),
        ]
    }

    fn funded() -> Vec<(u8, u64)> {
        (1..=VALIDATORS)
            .chain(DELEGATORS)
            .map(|id| (id, 10_000))
            .collect()
    }

    fn bootstrap() -> Chain {
        let mut chain = Chain::new(fast_config(), &funded()).unwrap();
        for id in 1..=VALIDATORS {
            chain
                .deliver(create_validator_msg(id, tokens(50 * u64::from(id))))
                .unwrap();
        }
        chain.commit().unwrap();
        chain
    }

    fn percent_of(shares: Dec, percent: u64) -> Dec {
        shares
            .mul_truncate(Dec::from_ratio_digits(percent, 2).unwrap())
            .unwrap()
    }

    fn delegated_shares(chain: &Chain, delegator: u8, validator: u8) -> Dec {
        chain
            .service
            .delegation(&account(delegator), &account(validator))
            .map(|d| d.shares)
            .unwrap_or_default()
    }

    /// Apply one operation. Rejections must leave the ledger as it was.
    fn apply(chain: &mut Chain, op: &Op) -> Result<(), TestCaseError> {
        let before = chain.service.snapshot();
        let result = match *op {
            Op::Delegate {
                delegator,
                validator,
                amount,
            } => chain.delegate(delegator, validator, amount).map(|_| ()),
            Op::Undelegate {
                delegator,
                validator,
                percent,
            } => {
                let shares = percent_of(delegated_shares(chain, delegator, validator), percent);
                chain
                    .deliver(StakingMsg::Undelegate {
                        delegator: account(delegator),
                        validator: account(validator),
                        shares,
                    })
                    .map(|_| ())
            }
            Op::Redelegate {
                delegator,
                src,
                dst,
                percent,
            } => {
                let shares = percent_of(delegated_shares(chain, delegator, src), percent);
                chain
                    .deliver(StakingMsg::BeginRedelegate {
                        delegator: account(delegator),
                        src: account(src),
                        dst: account(dst),
                        shares,
                    })
                    .map(|_| ())
            }
            Op::Slash {
                validator,
                percent,
                lookback,
            } => {
                let infraction_height = chain.height.saturating_sub(lookback).max(1);
                chain
                    .slash(
                        validator,
                        infraction_height,
                        Dec::from_ratio_digits(percent, 2).unwrap(),
                    )
                    .map(|_| ())
            }
            Op::Jail { validator } => chain.jail(validator),
            Op::Unjail { validator } => chain
                .deliver(StakingMsg::Unjail {
                    operator: account(validator),
                })
                .map(|_| ()),
            Op::Commit => {
                let committed = chain.commit();
                prop_assert!(committed.is_ok(), "end block failed: {:?}", committed);
                Ok(())
            }
        };

        if let Err(err) = result {
            prop_assert!(!err.is_fatal(), "fatal error on {:?}: {}", op, err);
            prop_assert_eq!(chain.service.snapshot(), before);
        }
        Ok(())
    }

    /// tokens / shares as a cross-multiplied pair, for exact comparison.
    fn rates(chain: &Chain) -> BTreeMap<Address, (u128, u128)> {
        chain
            .service
            .validators()
            .into_iter()
            .filter(|v| v.delegator_shares.is_positive())
            .map(|v| (v.operator, (v.tokens.raw(), v.delegator_shares.raw())))
            .collect()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_tokens_are_conserved(ops in prop::collection::vec(op_strategy(), 1..60)) {
            let mut chain = bootstrap();
            for op in &ops {
                apply(&mut chain, op)?;
                if let Err(violation) = chain.check_conservation() {
                    return Err(TestCaseError::fail(format!("after {op:?}: {violation}")));
                }
            }
            let committed = chain.commit();
            prop_assert!(committed.is_ok());
        }

        #[test]
        fn prop_replicas_stay_identical(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let mut left = bootstrap();
            let mut right = bootstrap();
            for op in &ops {
                apply(&mut left, op)?;
                apply(&mut right, op)?;
            }
            left.commit().unwrap();
            right.commit().unwrap();
            prop_assert_eq!(
                left.service.snapshot().encode().unwrap(),
                right.service.snapshot().encode().unwrap()
            );
            prop_assert_eq!(left.bus.get_events(), right.bus.get_events());
        }

        #[test]
        fn prop_share_value_never_falls_without_slashing(
            ops in prop::collection::vec(op_strategy(), 1..60)
        ) {
            let mut chain = bootstrap();
            let mut previous = rates(&chain);
            for op in ops.iter().filter(|op| !matches!(op, Op::Slash { .. })) {
                apply(&mut chain, op)?;
                let current = rates(&chain);
                for (operator, (tokens_now, shares_now)) in &current {
                    if let Some((tokens_before, shares_before)) = previous.get(operator) {
                        prop_assert!(
                            tokens_now * shares_before >= tokens_before * shares_now,
                            "rate of {} fell after {:?}",
                            operator,
                            op
                        );
                    }
                }
                previous = current;
            }
        }
    }
}
