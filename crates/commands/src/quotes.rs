use std::str::FromStr;

use async_trait::async_trait;
use reqwest::{header::USER_AGENT, Client, StatusCode};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_COINBASE_BASE_URL: &str = "https://api.exchange.coinbase.com";
const CLIENT_USER_AGENT: &str = concat!("hbot/", env!("CARGO_PKG_VERSION"));
const MAX_SYMBOL_LEN: usize = 32;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Quote {
    pub price: Decimal,
    pub open: Option<Decimal>,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("not found")]
    NotFound,
    #[error("invalid symbol")]
    InvalidSymbol,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unreadable response: {0}")]
    Decode(String),
    #[error("provider error: {0}")]
    Provider(String),
}

/// Price source for one instrument symbol. Symbols arrive uppercased.
#[async_trait]
pub trait QuoteLookup: Send + Sync {
    async fn lookup(&self, symbol: &str) -> Result<Quote, LookupError>;
}

/// Symbols go into URLs verbatim, so only a conservative character set passes.
pub fn validate_symbol(symbol: &str) -> Result<(), LookupError> {
    let valid = !symbol.is_empty()
        && symbol.len() <= MAX_SYMBOL_LEN
        && symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '^' | '='));
    if valid {
        Ok(())
    } else {
        Err(LookupError::InvalidSymbol)
    }
}

/// One reply line: `SYM: 1.23 (open 1.20)`, `SYM: 1.23`, or `SYM: <error>`.
/// Prices are rounded half away from zero to cents.
pub fn format_quote_line(symbol: &str, result: &Result<Quote, LookupError>) -> String {
    match result {
        Ok(Quote { price, open: Some(open) }) => {
            format!("{symbol}: {:.2} (open {:.2})\n", cents(*price), cents(*open))
        }
        Ok(Quote { price, open: None }) => format!("{symbol}: {:.2}\n", cents(*price)),
        Err(error) => format!("{symbol}: {error}\n"),
    }
}

fn cents(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Anything other than success is reported before the body is parsed; 404 is
/// how both providers answer for an unknown symbol.
fn check_status(status: StatusCode) -> Result<(), LookupError> {
    if status == StatusCode::NOT_FOUND {
        Err(LookupError::NotFound)
    } else if !status.is_success() {
        Err(LookupError::Provider(status.to_string()))
    } else {
        Ok(())
    }
}

/// Equity quotes from Yahoo Finance's `v7/finance/quote` endpoint.
pub struct YahooQuoteClient {
    client: Client,
    base_url: String,
}

impl YahooQuoteClient {
    pub fn new(base_url: &str) -> Self {
        Self { client: Client::new(), base_url: base_url.trim_end_matches('/').to_owned() }
    }
}

impl Default for YahooQuoteClient {
    fn default() -> Self {
        Self::new(DEFAULT_YAHOO_BASE_URL)
    }
}

#[async_trait]
impl QuoteLookup for YahooQuoteClient {
    async fn lookup(&self, symbol: &str) -> Result<Quote, LookupError> {
        validate_symbol(symbol)?;
        let url = format!("{}/v7/finance/quote", self.base_url);
        debug!(provider = "yahoo", symbol, "requesting quote");

        let response = self
            .client
            .get(&url)
            .query(&[("symbols", symbol)])
            .header(USER_AGENT, CLIENT_USER_AGENT)
            .send()
            .await?;
        let status = response.status();
        let body = response.text().await?;
        check_status(status)?;
        parse_yahoo_quote(symbol, &body)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooEnvelope {
    quote_response: YahooQuoteResponse,
}

#[derive(Debug, Deserialize)]
struct YahooQuoteResponse {
    #[serde(default)]
    result: Vec<YahooQuote>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YahooQuote {
    symbol: String,
    regular_market_price: Option<f64>,
    regular_market_open: Option<f64>,
}

pub(crate) fn parse_yahoo_quote(symbol: &str, body: &str) -> Result<Quote, LookupError> {
    let envelope: YahooEnvelope =
        serde_json::from_str(body).map_err(|error| LookupError::Decode(error.to_string()))?;
    let response = envelope.quote_response;
    if let Some(error) = response.error.filter(|error| !error.is_null()) {
        return Err(LookupError::Provider(error.to_string()));
    }

    let quote = response
        .result
        .into_iter()
        .find(|quote| quote.symbol.eq_ignore_ascii_case(symbol))
        .ok_or(LookupError::NotFound)?;
    let price = quote.regular_market_price.ok_or(LookupError::NotFound)?;

    Ok(Quote {
        price: to_decimal(price)?,
        open: quote.regular_market_open.map(to_decimal).transpose()?,
    })
}

fn to_decimal(value: f64) -> Result<Decimal, LookupError> {
    Decimal::try_from(value).map_err(|error| LookupError::Decode(error.to_string()))
}

/// Spot prices from the Coinbase Exchange public ticker.
pub struct CoinbaseTickerClient {
    client: Client,
    base_url: String,
}

impl CoinbaseTickerClient {
    pub fn new(base_url: &str) -> Self {
        Self { client: Client::new(), base_url: base_url.trim_end_matches('/').to_owned() }
    }
}

impl Default for CoinbaseTickerClient {
    fn default() -> Self {
        Self::new(DEFAULT_COINBASE_BASE_URL)
    }
}

#[async_trait]
impl QuoteLookup for CoinbaseTickerClient {
    async fn lookup(&self, product_id: &str) -> Result<Quote, LookupError> {
        validate_symbol(product_id)?;
        let url = format!("{}/products/{product_id}/ticker", self.base_url);
        debug!(provider = "coinbase", product_id, "requesting ticker");

        let response =
            self.client.get(&url).header(USER_AGENT, CLIENT_USER_AGENT).send().await?;
        let status = response.status();
        let body = response.text().await?;
        check_status(status)?;
        parse_coinbase_ticker(&body)
    }
}

#[derive(Debug, Deserialize)]
struct CoinbaseTicker {
    price: Option<String>,
    message: Option<String>,
}

pub(crate) fn parse_coinbase_ticker(body: &str) -> Result<Quote, LookupError> {
    let ticker: CoinbaseTicker =
        serde_json::from_str(body).map_err(|error| LookupError::Decode(error.to_string()))?;

    match (ticker.price, ticker.message) {
        (Some(price), _) => {
            let price = Decimal::from_str(&price)
                .map_err(|error| LookupError::Decode(format!("price `{price}`: {error}")))?;
            Ok(Quote { price, open: None })
        }
        (None, Some(message)) if is_not_found_message(&message) => Err(LookupError::NotFound),
        (None, Some(message)) => Err(LookupError::Provider(message)),
        (None, None) => Err(LookupError::Decode("ticker has no price".to_owned())),
    }
}

fn is_not_found_message(message: &str) -> bool {
    message.replace(' ', "").eq_ignore_ascii_case("notfound")
}
