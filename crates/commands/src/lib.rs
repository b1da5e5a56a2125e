//! Chat commands for hbot.
//!
//! [`router::CommandMessageHandler`] is the [`hbot_slack::EventHandler`] that
//! recognises prefixed messages and dispatches them to the [`command::Command`]s
//! held in a [`registry::CommandRegistry`]. Built-in commands live in
//! [`builtin`]; market data providers for the lookup commands live in [`quotes`].

pub mod builtin;
pub mod command;
pub mod quotes;
pub mod registry;
pub mod router;

#[cfg(test)]
mod test_support;

pub use builtin::{BangCommand, FedCommand, FedDefinition, FedError, HelpCommand, LookupCommand};
pub use command::{Command, CommandError, CommandInvocation};
pub use quotes::{CoinbaseTickerClient, LookupError, Quote, QuoteLookup, YahooQuoteClient};
pub use registry::CommandRegistry;
pub use router::{CommandMessageHandler, RouteOutcome};
