//! Protocol upgrades and the fork schedule

use crate::gas::GasSchedule;
use crate::precompiles::PrecompileSet;
use crate::table::OpcodeTable;
use once_cell::sync::Lazy;
use pyrite_primitives::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Supported protocol upgrades, oldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Fork {
    /// Launch rules
    Frontier,
    /// EIP-2, EIP-7 (DELEGATECALL)
    Homestead,
    /// EIP-150 gas repricing
    TangerineWhistle,
    /// EIP-155/158/160/161/170
    SpuriousDragon,
    /// EIP-140/196/197/198/211/214
    Byzantium,
}

impl Fork {
    /// Every fork, oldest first
    pub const ALL: [Fork; 5] = [
        Fork::Frontier,
        Fork::Homestead,
        Fork::TangerineWhistle,
        Fork::SpuriousDragon,
        Fork::Byzantium,
    ];

    /// Canonical name, as used in test fixtures
    pub fn name(self) -> &'static str {
        match self {
            Fork::Frontier => "Frontier",
            Fork::Homestead => "Homestead",
            Fork::TangerineWhistle => "TangerineWhistle",
            Fork::SpuriousDragon => "SpuriousDragon",
            Fork::Byzantium => "Byzantium",
        }
    }

    /// Rules in force for this fork
    pub fn spec(self) -> &'static ForkSpec {
        match self {
            Fork::Frontier => &FRONTIER,
            Fork::Homestead => &HOMESTEAD,
            Fork::TangerineWhistle => &TANGERINE_WHISTLE,
            Fork::SpuriousDragon => &SPURIOUS_DRAGON,
            Fork::Byzantium => &BYZANTIUM,
        }
    }
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Fork {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Fork::ALL
            .iter()
            .copied()
            .find(|fork| fork.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError::invalid(format!("unknown fork: {s}")))
    }
}

static FRONTIER: Lazy<ForkSpec> = Lazy::new(|| ForkSpec::build(Fork::Frontier));
static HOMESTEAD: Lazy<ForkSpec> = Lazy::new(|| ForkSpec::build(Fork::Homestead));
static TANGERINE_WHISTLE: Lazy<ForkSpec> = Lazy::new(|| ForkSpec::build(Fork::TangerineWhistle));
static SPURIOUS_DRAGON: Lazy<ForkSpec> = Lazy::new(|| ForkSpec::build(Fork::SpuriousDragon));
static BYZANTIUM: Lazy<ForkSpec> = Lazy::new(|| ForkSpec::build(Fork::Byzantium));

/// Everything a computation needs to know about its fork.
pub struct ForkSpec {
    /// Which fork
    pub fork: Fork,
    /// Fork-dependent gas costs
    pub schedule: GasSchedule,
    /// Opcode dispatch table
    pub opcodes: OpcodeTable,
    /// Precompiled contracts by address
    pub precompiles: PrecompileSet,
}

impl ForkSpec {
    fn build(fork: Fork) -> Self {
        let schedule = GasSchedule::for_fork(fork);
        tracing::debug!(?fork, "building fork rules");
        Self {
            fork,
            schedule,
            opcodes: OpcodeTable::for_fork(fork, &schedule),
            precompiles: PrecompileSet::for_fork(fork),
        }
    }

    /// Whether `fork`'s rules apply
    pub fn is_enabled(&self, fork: Fork) -> bool {
        self.fork >= fork
    }
}

impl fmt::Debug for ForkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForkSpec")
            .field("fork", &self.fork)
            .field("schedule", &self.schedule)
            .field("precompiles", &self.precompiles.len())
            .finish()
    }
}

/// Fork activation block numbers; `None` means never activated.
///
/// Deserializes from the geth-style genesis `config` object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// Homestead activation
    #[serde(default)]
    pub homestead_block: Option<u64>,
    /// Tangerine Whistle activation
    #[serde(default, rename = "eip150Block")]
    pub eip150_block: Option<u64>,
    /// Spurious Dragon activation
    #[serde(default, rename = "eip158Block")]
    pub eip158_block: Option<u64>,
    /// Byzantium activation
    #[serde(default)]
    pub byzantium_block: Option<u64>,
}

impl ChainConfig {
    /// Ethereum mainnet schedule
    pub fn mainnet() -> Self {
        Self {
            homestead_block: Some(1_150_000),
            eip150_block: Some(2_463_000),
            eip158_block: Some(2_675_000),
            byzantium_block: Some(4_370_000),
        }
    }

    /// Every fork up to and including `fork` active from genesis
    pub fn at_fork(fork: Fork) -> Self {
        let active = |candidate: Fork| (fork >= candidate).then_some(0);
        Self {
            homestead_block: active(Fork::Homestead),
            eip150_block: active(Fork::TangerineWhistle),
            eip158_block: active(Fork::SpuriousDragon),
            byzantium_block: active(Fork::Byzantium),
        }
    }

    fn activation(&self, fork: Fork) -> Option<u64> {
        match fork {
            Fork::Frontier => Some(0),
            Fork::Homestead => self.homestead_block,
            Fork::TangerineWhistle => self.eip150_block,
            Fork::SpuriousDragon => self.eip158_block,
            Fork::Byzantium => self.byzantium_block,
        }
    }

    /// Fork in force at `block_number`
    pub fn fork_at(&self, block_number: u64) -> Fork {
        Fork::ALL
            .iter()
            .rev()
            .copied()
            .find(|fork| matches!(self.activation(*fork), Some(at) if at <= block_number))
            .unwrap_or(Fork::Frontier)
    }
}
