//! Combinatorial Thompson-sampling bandit
//!
//! Each arm is a (place, verb, scenario) combination with its own Beta
//! posterior. Arms appear lazily the first time retrieval offers them and are
//! never removed.

mod belief;
mod key;
mod selector;
mod store;

pub use belief::{BetaBelief, CombinationBelief, clamp_reward};
pub use key::{CombinationKey, KEY_SEPARATOR, is_key_component};
pub use selector::{CandidateSet, SelectionResult, Selector};
pub use store::{BanditStore, Durability, RankedCombination, UpdateOutcome};
