//! Domain models for the stock balance engine

mod balance;
mod movement;
mod product;

pub use balance::*;
pub use movement::*;
pub use product::*;
