#[macro_use]
extern crate log;

pub use hypnostat_algos as algo;
pub use hypnostat_types as types;

mod input;
pub use input::{HypnogramInput, InputError, StageLabel};
