//! Payment-code generation and extraction.
//!
//! An order number is a fixed prefix, followed by one upper-case letter and six zero-padded digits, e.g.
//! `POINTBOARDA000123`. The codes are short enough for a customer to type into the narration field of a bank transfer,
//! while leaving 26 million codes per prefix.
use std::future::Future;

use log::*;
use rand::Rng;
use regex::Regex;

use crate::{db_types::OrderNumber, traits::OrderFlowError};

pub const DEFAULT_ORDER_PREFIX: &str = "POINTBOARD";
pub const DEFAULT_GENERATION_ATTEMPTS: u32 = 10;

//--------------------------------------  OrderNumberFormat    ---------------------------------------------------------
#[derive(Debug, Clone)]
pub struct OrderNumberFormat {
    prefix: String,
    pattern: Regex,
}

impl OrderNumberFormat {
    /// Creates a new format for the given prefix. The prefix must be non-empty and ASCII alphanumeric. It is stored in
    /// upper case.
    pub fn new(prefix: &str) -> Result<Self, OrderFlowError> {
        let prefix = prefix.trim().to_ascii_uppercase();
        if prefix.is_empty() || !prefix.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(OrderFlowError::ValidationError(format!(
                "Order number prefix '{prefix}' must be a non-empty alphanumeric string"
            )));
        }
        // The six digits may not be followed by a seventh, otherwise we'd be matching on a truncated code.
        let pattern = Regex::new(&format!(r"(?i)({}[A-Z][0-9]{{6}})(?:[^0-9]|$)", regex::escape(&prefix)))
            .map_err(|e| OrderFlowError::ValidationError(format!("Invalid order number prefix. {e}")))?;
        Ok(Self { prefix, pattern })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Draws a random order number with a uniform letter and a uniform 6-digit number.
    pub fn random<R: Rng + ?Sized>(&self, rng: &mut R) -> OrderNumber {
        let letter = char::from(b'A' + rng.gen_range(0..26u8));
        let number = rng.gen_range(0..1_000_000u32);
        OrderNumber::new(format!("{}{letter}{number:06}", self.prefix))
    }

    /// Returns true if `token` is exactly one order number (in any letter case) and nothing else.
    pub fn is_well_formed(&self, token: &str) -> bool {
        let token = token.trim();
        token.len() == self.prefix.len() + 7 && self.extract(token).is_some()
    }

    /// Finds the first order number in the given free text and returns it in upper case.
    pub fn extract(&self, text: &str) -> Option<OrderNumber> {
        self.pattern.captures(text).and_then(|c| c.get(1)).map(|m| OrderNumber::new(m.as_str()))
    }

    /// Returns every order number contained in `text`, in order of appearance.
    pub fn extract_all(&self, text: &str) -> Vec<OrderNumber> {
        self.pattern
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| OrderNumber::new(m.as_str()))
            .collect()
    }

    /// True if `text` mentions the given order number.
    pub fn mentions(&self, text: &str, order_number: &OrderNumber) -> bool {
        self.extract_all(text).iter().any(|n| n == order_number)
    }
}

impl Default for OrderNumberFormat {
    fn default() -> Self {
        // The default prefix is a valid constant, so this cannot fail
        match Self::new(DEFAULT_ORDER_PREFIX) {
            Ok(f) => f,
            Err(e) => unreachable!("The default order prefix is invalid. {e}"),
        }
    }
}

//-------------------------------------- OrderNumberGenerator  ---------------------------------------------------------
/// Draws random order numbers until it finds one that is not in use yet.
///
/// The generator does not reserve the numbers it hands out. Two concurrent calls can draw the same code before either
/// order is written; the unique index on `orders.order_number` is the real guarantee, and callers should treat a
/// uniqueness violation on insert as a signal to generate again.
#[derive(Debug, Clone, Default)]
pub struct OrderNumberGenerator {
    format: OrderNumberFormat,
    max_attempts: Option<u32>,
}

impl OrderNumberGenerator {
    pub fn new(format: OrderNumberFormat) -> Self {
        Self { format, max_attempts: None }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    pub fn format(&self) -> &OrderNumberFormat {
        &self.format
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.unwrap_or(DEFAULT_GENERATION_ATTEMPTS)
    }

    /// Generates a new order number. `exists` is called with each candidate and must return true if an order with
    /// that number is already stored.
    ///
    /// Fails with [`OrderFlowError::GenerationExhausted`] if every attempt collides.
    pub async fn generate<F, Fut>(&self, mut exists: F) -> Result<OrderNumber, OrderFlowError>
    where
        F: FnMut(OrderNumber) -> Fut,
        Fut: Future<Output = Result<bool, OrderFlowError>>,
    {
        let attempts = self.max_attempts();
        for attempt in 1..=attempts {
            let candidate = self.format.random(&mut rand::thread_rng());
            if exists(candidate.clone()).await? {
                debug!("🎟️ Order number {candidate} is taken (attempt {attempt}/{attempts})");
                continue;
            }
            trace!("🎟️ Generated order number {candidate} on attempt {attempt}");
            return Ok(candidate);
        }
        warn!("🎟️ Could not find a free order number after {attempts} attempts");
        Err(OrderFlowError::GenerationExhausted(attempts))
    }
}
