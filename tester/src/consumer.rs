//! A named client driven by a strategy.

use crate::client::Client;
use crate::error::StrategyError;
use crate::strategy::Strategy;

/// Pairs a [`Client`] with a [`Strategy`] under a name used in logs and errors.
#[derive(Debug)]
pub struct Consumer<C> {
    name: String,
    client: C,
    strategy: Strategy,
}

impl<C: Client> Consumer<C> {
    /// Create a consumer.
    pub fn new(name: impl Into<String>, client: C, strategy: impl Into<Strategy>) -> Self {
        Self {
            name: name.into(),
            client,
            strategy: strategy.into(),
        }
    }

    /// Name used in logs and errors.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Borrow the underlying client.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Run one strategy step with this consumer's client.
    ///
    /// # Errors
    ///
    /// Propagates the strategy's [`StrategyError`].
    pub async fn tick(&mut self) -> Result<bool, StrategyError> {
        self.strategy.execute(&self.name, &mut self.client).await
    }
}
