//! Named [`CryptoProvider`]s.
//!
//! Everything in this crate that needs cryptography takes its
//! [`CryptoProvider`] from a [`ProviderRegistry`] handed to it
//! explicitly. The process-global default provider, if one has been
//! installed, is only consulted once, when the registry's default entry
//! is chosen.

use rustls::crypto::CryptoProvider;
use std::sync::Arc;
use thiserror::Error;

/// Name under which the aws-lc-rs provider is registered.
pub const AWS_LC_RS: &str = "aws-lc-rs";
/// Name under which the ring provider is registered.
#[cfg(feature = "ring")]
pub const RING: &str = "ring";

/// Error type returned by [`ProviderRegistry::get`].
#[derive(Debug, Error)]
pub enum ProviderError {
    /// No provider is registered under the requested name.
    #[error("no such provider: {0}")]
    NoSuchProvider(String),
}

/// A set of [`CryptoProvider`]s looked up by name, plus a default.
#[derive(Clone, Debug)]
pub struct ProviderRegistry {
    providers: Vec<(String, Arc<CryptoProvider>)>,
    default: Arc<CryptoProvider>,
}

impl Default for ProviderRegistry {
    /// The default is the process-global default [`CryptoProvider`] if
    /// there is one, otherwise aws-lc-rs.
    fn default() -> Self {
        let aws_lc_rs = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
        let default = CryptoProvider::get_default()
            .cloned()
            .unwrap_or_else(|| Arc::clone(&aws_lc_rs));
        let mut registry = Self::with_default(default);
        registry.register(AWS_LC_RS, aws_lc_rs);
        #[cfg(feature = "ring")]
        registry.register(RING, Arc::new(rustls::crypto::ring::default_provider()));
        registry
    }
}

impl ProviderRegistry {
    /// A registry with nothing registered by name and the given default.
    pub fn with_default(default: Arc<CryptoProvider>) -> Self {
        Self {
            providers: Vec::new(),
            default,
        }
    }

    /// Register a provider, replacing any other provider of the same name.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<CryptoProvider>) {
        let name = name.into();
        match self.providers.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = provider,
            None => self.providers.push((name, provider)),
        }
    }

    /// Look up a provider by name.
    pub fn get(&self, name: &str) -> Result<Arc<CryptoProvider>, ProviderError> {
        self.providers
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, p)| Arc::clone(p))
            .ok_or_else(|| ProviderError::NoSuchProvider(name.into()))
    }

    /// The provider used when none is named.
    pub fn default_provider(&self) -> Arc<CryptoProvider> {
        Arc::clone(&self.default)
    }

    /// Names of all registered providers, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|(n, _)| n.as_str())
    }
}
