mod money;

pub mod op;

mod secret;

pub mod helpers;

pub use money::{AmountParseError, MinorUnits};
pub use secret::Secret;
