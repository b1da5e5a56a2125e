//! Commands shipped with the bot.

mod bang;
mod fed;
mod help;
mod lookup;

pub use bang::BangCommand;
pub use fed::{FedCommand, FedDefinition, FedError};
pub use help::HelpCommand;
pub use lookup::LookupCommand;
