use std::{fmt, fs, path::Path, path::PathBuf};

use chef_core::chef::{Chef, ChefConfig, ClaimMode, ClaimReceipt};
use chef_core::emission::EmissionSchedule;
use chef_core::{Amount, BlockNumber, ChefError};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ledger::{LedgerError, LedgerSnapshot, TokenLedger};

/// Token quantity written either as a JSON number or a decimal string;
/// 18-decimal amounts overflow JSON numbers, so plans usually use strings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AmountArg(pub Amount);

impl<'de> Deserialize<'de> for AmountArg {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AmountVisitor;

        impl<'de> Visitor<'de> for AmountVisitor {
            type Value = AmountArg;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a non-negative integer or a decimal string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<AmountArg, E> {
                Ok(AmountArg(Amount::from(v)))
            }

            fn visit_u128<E: de::Error>(self, v: u128) -> Result<AmountArg, E> {
                Ok(AmountArg(v))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<AmountArg, E> {
                v.trim().parse().map(AmountArg).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(AmountVisitor)
    }
}

impl Serialize for AmountArg {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

fn amounts(args: &[AmountArg]) -> Vec<Amount> {
    args.iter().map(|a| a.0).collect()
}

#[derive(Clone, Debug, Deserialize)]
pub struct EmissionConfig {
    pub start_block: BlockNumber,
    pub rates: Vec<AmountArg>,
    pub offsets: Vec<BlockNumber>,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            start_block: 0,
            rates: vec![AmountArg(5_000_000_000_000_000_000)],
            offsets: vec![0],
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Expectation {
    pub user: String,
    pub pid: usize,
    pub locked: Option<AmountArg>,
    pub unlocked: Option<AmountArg>,
    pub pending_length: Option<usize>,
    pub pending_tokens: Option<AmountArg>,
    pub balance: Option<AmountArg>,
    pub staked: Option<AmountArg>,
    /// Allowed absolute difference, for values that carry share-precision
    /// truncation.
    pub tolerance: AmountArg,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ScenarioStep {
    Mint {
        to: String,
        amount: AmountArg,
    },
    AddPool {
        alloc_point: u64,
        want: String,
        #[serde(default)]
        strategy: String,
        #[serde(default)]
        with_update: bool,
    },
    SetAllocPoint {
        pid: usize,
        alloc_point: u64,
        #[serde(default)]
        with_update: bool,
    },
    Deposit {
        pid: usize,
        user: String,
        amount: AmountArg,
    },
    Withdraw {
        pid: usize,
        user: String,
        amount: AmountArg,
    },
    Harvest {
        pid: usize,
        user: String,
    },
    Mine {
        blocks: BlockNumber,
    },
    Claim {
        user: String,
        mode: ClaimMode,
    },
    UpdateEmissionSchedule {
        start_block: BlockNumber,
        rates: Vec<AmountArg>,
        offsets: Vec<BlockNumber>,
    },
    SetPenaltyAddress {
        address: String,
    },
    Expect(Expectation),
}

/// Scripted run against a fresh chef. `block` is the latest mined block:
/// each transaction step executes in the next block, `mine` skips blocks
/// and `expect` reads state at the latest block.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct Scenario {
    pub chef: ChefConfig,
    pub emission: EmissionConfig,
    pub max_supply: Option<AmountArg>,
    pub start_block: BlockNumber,
    pub steps: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self, ScenarioError> {
        let bytes = fs::read(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ScenarioError::Malformed {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed scenario {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid chef setup: {0}")]
    Setup(#[source] ChefError),
    #[error("step {step}: {source}")]
    Chef {
        step: usize,
        #[source]
        source: ChefError,
    },
    #[error("step {step}: {source}")]
    Ledger {
        step: usize,
        #[source]
        source: LedgerError,
    },
    #[error("step {step}: block height overflow")]
    BlockOverflow { step: usize },
    #[error("step {step}: expected {what} = {expected} (±{tolerance}), got {actual}")]
    Expectation {
        step: usize,
        what: &'static str,
        expected: Amount,
        tolerance: Amount,
        actual: Amount,
    },
}

#[derive(Debug, Serialize)]
pub struct ScenarioReport {
    pub final_block: BlockNumber,
    pub steps_run: usize,
    pub claims: Vec<ClaimReceipt>,
    pub chef: Chef,
    pub ledger: LedgerSnapshot,
}

struct Runner {
    chef: Chef,
    token: TokenLedger,
    block: BlockNumber,
    claims: Vec<ClaimReceipt>,
}

impl Runner {
    fn advance(&mut self, idx: usize, blocks: BlockNumber) -> Result<BlockNumber, ScenarioError> {
        self.block = self
            .block
            .checked_add(blocks)
            .ok_or(ScenarioError::BlockOverflow { step: idx })?;
        Ok(self.block)
    }

    fn step(&mut self, idx: usize, step: &ScenarioStep) -> Result<(), ScenarioError> {
        let chef_err = |source| ScenarioError::Chef { step: idx, source };
        match step {
            ScenarioStep::Mint { to, amount } => {
                let block = self.advance(idx, 1)?;
                self.token
                    .mint(to, amount.0, Some("genesis".into()))
                    .map_err(|source| ScenarioError::Ledger { step: idx, source })?;
                println!("[{block}] mint {} to {to}", amount.0);
            }
            ScenarioStep::AddPool {
                alloc_point,
                want,
                strategy,
                with_update,
            } => {
                let block = self.advance(idx, 1)?;
                let pid = self
                    .chef
                    .add_pool(*alloc_point, want, strategy, *with_update, block)
                    .map_err(chef_err)?;
                println!("[{block}] add pool {pid}: {want} x{alloc_point}");
            }
            ScenarioStep::SetAllocPoint {
                pid,
                alloc_point,
                with_update,
            } => {
                let block = self.advance(idx, 1)?;
                self.chef
                    .set_alloc_point(*pid, *alloc_point, *with_update, block)
                    .map_err(chef_err)?;
                println!("[{block}] set pool {pid} alloc point {alloc_point}");
            }
            ScenarioStep::Deposit { pid, user, amount } => {
                let block = self.advance(idx, 1)?;
                let harvested = self
                    .chef
                    .deposit(*pid, user, amount.0, block)
                    .map_err(chef_err)?;
                println!("[{block}] {user} deposit {} into {pid}, harvested {harvested}", amount.0);
            }
            ScenarioStep::Withdraw { pid, user, amount } => {
                let block = self.advance(idx, 1)?;
                let harvested = self
                    .chef
                    .withdraw(*pid, user, amount.0, block)
                    .map_err(chef_err)?;
                println!("[{block}] {user} withdraw {} from {pid}, harvested {harvested}", amount.0);
            }
            ScenarioStep::Harvest { pid, user } => {
                let block = self.advance(idx, 1)?;
                let harvested = self.chef.deposit(*pid, user, 0, block).map_err(chef_err)?;
                println!("[{block}] {user} harvest {pid}: {harvested}");
            }
            ScenarioStep::Mine { blocks } => {
                let block = self.advance(idx, *blocks)?;
                println!("[{block}] mined {blocks} blocks");
            }
            ScenarioStep::Claim { user, mode } => {
                let block = self.advance(idx, 1)?;
                let receipt = self
                    .chef
                    .claim(user, *mode, block, &mut self.token)
                    .map_err(chef_err)?;
                println!(
                    "[{block}] {user} claim {mode}: payout {}, penalty {}",
                    receipt.payout, receipt.penalty
                );
                self.claims.push(receipt);
            }
            ScenarioStep::UpdateEmissionSchedule {
                start_block,
                rates,
                offsets,
            } => {
                let block = self.advance(idx, 1)?;
                self.chef
                    .update_emission_rate_schedule(*start_block, &amounts(rates), offsets, block)
                    .map_err(chef_err)?;
                println!("[{block}] emission schedule from {start_block}, {} steps", rates.len());
            }
            ScenarioStep::SetPenaltyAddress { address } => {
                let block = self.advance(idx, 1)?;
                self.chef.set_penalty_address(address);
                println!("[{block}] penalty address {address}");
            }
            ScenarioStep::Expect(expect) => self.check(idx, expect)?,
        }
        Ok(())
    }

    fn check(&self, idx: usize, expect: &Expectation) -> Result<(), ScenarioError> {
        let block = self.block;
        let user = expect.user.as_str();
        let tolerance = expect.tolerance.0;
        let compare = |what: &'static str, expected: Option<AmountArg>, actual: Amount| {
            let Some(AmountArg(expected)) = expected else {
                return Ok(());
            };
            if expected.abs_diff(actual) > tolerance {
                return Err(ScenarioError::Expectation {
                    step: idx,
                    what,
                    expected,
                    tolerance,
                    actual,
                });
            }
            Ok(())
        };
        let chef_err = |source| ScenarioError::Chef { step: idx, source };

        compare("locked", expect.locked, self.chef.locked_tokens(user, block))?;
        compare("unlocked", expect.unlocked, self.chef.unlocked_tokens(user, block))?;
        compare(
            "pending_length",
            expect.pending_length.map(|n| AmountArg(n as Amount)),
            self.chef.pending_length(user) as Amount,
        )?;
        compare("balance", expect.balance, self.token.balance_of(user))?;
        if expect.pending_tokens.is_some() {
            let pending = self
                .chef
                .pending_tokens(expect.pid, user, block)
                .map_err(chef_err)?;
            compare("pending_tokens", expect.pending_tokens, pending)?;
        }
        if expect.staked.is_some() {
            let staked = self
                .chef
                .staked_want_tokens(expect.pid, user)
                .map_err(chef_err)?;
            compare("staked", expect.staked, staked)?;
        }
        println!("[{block}] expectations for {user} hold");
        Ok(())
    }
}

pub fn run(scenario: &Scenario) -> Result<ScenarioReport, ScenarioError> {
    let emission = &scenario.emission;
    let schedule = EmissionSchedule::new(emission.start_block, &amounts(&emission.rates), &emission.offsets)
        .map_err(ScenarioError::Setup)?;
    let chef = Chef::new(scenario.chef.clone(), schedule).map_err(ScenarioError::Setup)?;
    let mut runner = Runner {
        chef,
        token: TokenLedger::new(scenario.max_supply.map(|cap| cap.0)),
        block: scenario.start_block,
        claims: Vec::new(),
    };
    for (idx, step) in scenario.steps.iter().enumerate() {
        runner.step(idx, step)?;
    }
    Ok(ScenarioReport {
        final_block: runner.block,
        steps_run: scenario.steps.len(),
        ledger: runner.token.snapshot(),
        claims: runner.claims,
        chef: runner.chef,
    })
}
