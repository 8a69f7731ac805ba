//! # Test Fixtures
//!
//! A simulated chain that drives the staking service block by block with
//! in-memory bank, event bus and snapshot store.

use qc_18_staking::{
    Address, BankKeeper, BlockContext, CommissionRates, ConsensusPubKey, Dec, Description,
    InMemoryBank, InMemoryEventBus, InMemoryStateStore, MsgCreateValidator, MsgResult,
    StakingApi, StakingConfig, StakingDependencies, StakingError, StakingMsg, StakingResult,
    StakingService, ValidatorUpdate, STAKING_MODULE_ACCOUNT,
};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const GENESIS_TIME: u64 = 1_700_000_000;
pub const BLOCK_SECS: u64 = 6;

pub type TestService = StakingService<InMemoryBank, InMemoryEventBus, InMemoryStateStore>;

pub fn account(id: u8) -> Address {
    Address([id; 20])
}

pub fn pubkey(id: u8) -> ConsensusPubKey {
    ConsensusPubKey([id; 32])
}

pub fn tokens(n: u64) -> Dec {
    Dec::from_int(n)
}

/// Short unbonding window so maturity is reached within a few dozen blocks.
pub fn fast_config() -> StakingConfig {
    StakingConfig {
        unbonding_time_secs: 60,
        unbonding_period_blocks: 10,
        max_validators: 3,
        max_entries: 4,
        commission_update_interval_secs: 60,
        check_invariants: true,
        ..Default::default()
    }
}

pub fn create_validator_msg(id: u8, self_bond: Dec) -> StakingMsg {
    StakingMsg::CreateValidator(MsgCreateValidator::new(
        account(id),
        pubkey(id),
        self_bond,
        Description::new(&format!("validator-{id}"), "", "", ""),
        CommissionRates::new(
            Dec::from_ratio_digits(5, 2).unwrap_or_default(),
            Dec::from_ratio_digits(20, 2).unwrap_or_default(),
            Dec::from_ratio_digits(1, 2).unwrap_or_default(),
        ),
    ))
}

/// Install a test-friendly subscriber; `RUST_LOG` overrides the default level.
pub fn init_test_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

pub struct Chain {
    pub service: TestService,
    pub bank: Arc<InMemoryBank>,
    pub bus: Arc<InMemoryEventBus>,
    pub store: Arc<InMemoryStateStore>,
    /// Height of the block currently being built
    pub height: u64,
    initial_supply: Dec,
}

impl Chain {
    pub fn new(config: StakingConfig, funded: &[(u8, u64)]) -> StakingResult<Self> {
        let bank = Arc::new(InMemoryBank::new());
        for (id, amount) in funded {
            bank.credit(account(*id), tokens(*amount))?;
        }
        let initial_supply = bank.total_supply().ok_or(StakingError::Overflow)?;
        let bus = Arc::new(InMemoryEventBus::new());
        let store = Arc::new(InMemoryStateStore::new());

        let service = StakingService::new(StakingDependencies {
            bank: Arc::clone(&bank),
            event_bus: Arc::clone(&bus),
            store: Arc::clone(&store),
            config,
        })?;

        Ok(Self {
            service,
            bank,
            bus,
            store,
            height: 1,
            initial_supply,
        })
    }

    /// Rebuild the service from the snapshot store, as a restarted node would.
    pub fn restart(&self, config: StakingConfig) -> StakingResult<Self> {
        let bus = Arc::new(InMemoryEventBus::new());
        let service = StakingService::restore(StakingDependencies {
            bank: Arc::clone(&self.bank),
            event_bus: Arc::clone(&bus),
            store: Arc::clone(&self.store),
            config,
        })?;
        Ok(Self {
            service,
            bank: Arc::clone(&self.bank),
            bus,
            store: Arc::clone(&self.store),
            height: self.height,
            initial_supply: self.initial_supply,
        })
    }

    pub fn ctx(&self) -> BlockContext {
        BlockContext::new(self.height, GENESIS_TIME + self.height * BLOCK_SECS)
    }

    pub fn deliver(&self, msg: StakingMsg) -> StakingResult<MsgResult> {
        self.service.deliver(self.ctx(), msg)
    }

    pub fn delegate(&self, delegator: u8, validator: u8, amount: u64) -> StakingResult<MsgResult> {
        self.deliver(StakingMsg::Delegate {
            delegator: account(delegator),
            validator: account(validator),
            amount: tokens(amount),
        })
    }

    /// Slash for an infraction at `infraction_height`, reporting the
    /// validator's current power as the power at that height.
    pub fn slash(&self, validator: u8, infraction_height: u64, fraction: Dec) -> StakingResult<Dec> {
        let power = self
            .service
            .validator(&account(validator))
            .map(|v| v.power())
            .unwrap_or(0);
        self.service.slash(
            self.ctx(),
            account(validator),
            infraction_height,
            power,
            fraction,
        )
    }

    pub fn jail(&self, validator: u8) -> StakingResult<()> {
        self.service.jail(self.ctx(), account(validator))
    }

    /// Finish the current block and open the next one.
    pub fn commit(&mut self) -> StakingResult<Vec<ValidatorUpdate>> {
        let updates = self.service.end_block(self.ctx())?;
        self.height += 1;
        Ok(updates)
    }

    /// Commit blocks until one with a timestamp at or after `time` is committed.
    pub fn commit_until(&mut self, time: u64) -> StakingResult<Vec<ValidatorUpdate>> {
        let mut all = Vec::new();
        loop {
            let reached = self.ctx().time >= time;
            all.extend(self.commit()?);
            if reached {
                return Ok(all);
            }
        }
    }

    pub fn balance(&self, id: u8) -> Dec {
        self.bank.balance(&account(id))
    }

    /// Tokens are neither minted nor lost, and the module account backs the pool exactly.
    pub fn check_conservation(&self) -> Result<(), String> {
        let supply = self.bank.total_supply().ok_or("supply overflow")?;
        if supply != self.initial_supply {
            return Err(format!(
                "supply changed: {} -> {}",
                self.initial_supply, supply
            ));
        }
        let pool = self.service.pool();
        let pool_total = pool.total().ok_or("pool overflow")?;
        let module = self.bank.balance(&STAKING_MODULE_ACCOUNT);
        if pool_total != module {
            return Err(format!("pool {pool_total} != module account {module}"));
        }
        Ok(())
    }
}
