use std::sync::Arc;

use async_trait::async_trait;
use hbot_slack::{MessageSender, OutboundMessage};
use tracing::warn;

use crate::{
    command::{Command, CommandError, CommandInvocation},
    quotes::{format_quote_line, QuoteLookup},
};

/// Looks up each argument against a [`QuoteLookup`] and replies once with one
/// line per symbol, in argument order. Per-symbol failures become inline lines.
pub struct LookupCommand {
    name: &'static str,
    help: &'static str,
    lookup: Arc<dyn QuoteLookup>,
}

impl LookupCommand {
    pub fn new(name: &'static str, help: &'static str, lookup: Arc<dyn QuoteLookup>) -> Self {
        Self { name, help, lookup }
    }

    pub fn stocks(lookup: Arc<dyn QuoteLookup>) -> Self {
        Self::new("stocks", "ticker quotes", lookup)
    }

    pub fn crypto(lookup: Arc<dyn QuoteLookup>) -> Self {
        Self::new("crypto", "Coinbase crypto prices", lookup)
    }

    async fn line_for(&self, argument: &str) -> String {
        let symbol = argument.to_uppercase();
        let result = self.lookup.lookup(&symbol).await;
        if let Err(error) = &result {
            warn!(
                event_name = "command.lookup_failed",
                command = self.name,
                symbol = %symbol,
                error = %error,
                "quote lookup failed"
            );
        }
        format_quote_line(&symbol, &result)
    }
}

#[async_trait]
impl Command for LookupCommand {
    fn name(&self) -> &str {
        self.name
    }

    fn help(&self) -> &str {
        self.help
    }

    async fn execute(
        &self,
        invocation: &CommandInvocation,
        bot: &dyn MessageSender,
    ) -> Result<(), CommandError> {
        let mut reply = String::new();
        // Empty arguments are not symbols; they get no line and no lookup.
        for argument in invocation.arguments.iter().filter(|argument| !argument.is_empty()) {
            reply.push_str(&self.line_for(argument).await);
        }
        bot.send_message(&invocation.channel_id, OutboundMessage::text(reply)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashMap, sync::Arc};

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tokio::sync::Mutex;

    use super::LookupCommand;
    use crate::{
        command::Command,
        quotes::{LookupError, Quote, QuoteLookup},
        test_support::{invocation, RecordingSender},
    };

    #[derive(Default)]
    struct FakeLookup {
        quotes: HashMap<&'static str, Quote>,
        requested: Mutex<Vec<String>>,
    }

    impl FakeLookup {
        fn with(mut self, symbol: &'static str, price: i64, open: Option<i64>) -> Self {
            self.quotes.insert(
                symbol,
                Quote { price: Decimal::from(price), open: open.map(Decimal::from) },
            );
            self
        }
    }

    #[async_trait]
    impl QuoteLookup for FakeLookup {
        async fn lookup(&self, symbol: &str) -> Result<Quote, LookupError> {
            self.requested.lock().await.push(symbol.to_owned());
            self.quotes.get(symbol).cloned().ok_or(LookupError::NotFound)
        }
    }

    #[tokio::test]
    async fn one_reply_with_lines_in_argument_order() {
        let lookup = Arc::new(FakeLookup::default().with("AAPL", 150, None));
        let command = LookupCommand::stocks(lookup.clone());
        let sender = RecordingSender::default();

        let request = invocation("stocks", &["AAPL", "ZZZZ"]);

        command.execute(&request, &sender).await.expect("stocks");

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].1.text, "AAPL: 150.00\nZZZZ: not found\n");
    }

    #[tokio::test]
    async fn symbols_are_uppercased_and_open_is_shown() {
        let lookup = Arc::new(FakeLookup::default().with("MSFT", 410, Some(405)));
        let command = LookupCommand::stocks(lookup.clone());
        let sender = RecordingSender::default();

        command.execute(&invocation("stocks", &["msft"]), &sender).await.expect("stocks");

        assert_eq!(sender.sent().await[0].1.text, "MSFT: 410.00 (open 405.00)\n");
        assert_eq!(*lookup.requested.lock().await, vec!["MSFT"]);
    }

    #[tokio::test]
    async fn empty_arguments_are_skipped() {
        let lookup = Arc::new(FakeLookup::default().with("BTC-USD", 43000, None));
        let command = LookupCommand::crypto(lookup.clone());
        let sender = RecordingSender::default();

        let request = invocation("crypto", &["", "btc-usd", ""]);

        command.execute(&request, &sender).await.expect("crypto");

        assert_eq!(sender.sent().await[0].1.text, "BTC-USD: 43000.00\n");
        assert_eq!(lookup.requested.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn no_arguments_sends_an_empty_reply() {
        let command = LookupCommand::crypto(Arc::new(FakeLookup::default()));
        let sender = RecordingSender::default();

        command.execute(&invocation("crypto", &[]), &sender).await.expect("crypto");

        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.text.is_empty());
    }

    #[test]
    fn built_in_names_and_help() {
        let stocks = LookupCommand::stocks(Arc::new(FakeLookup::default()));
        let crypto = LookupCommand::crypto(Arc::new(FakeLookup::default()));

        assert_eq!((stocks.name(), stocks.help()), ("stocks", "ticker quotes"));
        assert_eq!((crypto.name(), crypto.help()), ("crypto", "Coinbase crypto prices"));
    }
}
