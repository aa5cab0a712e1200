//! Engine profile configuration and argument substitution

mod profile;
mod substitution;

pub use profile::*;
pub use substitution::*;
