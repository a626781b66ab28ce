//! Validated construction of a [`SecureContextConfig`].
//!
//! A [`SecureContextBuilder`] starts out with nothing configured and
//! accepts exactly one of one-way authentication, two-way authentication
//! or disabled security. Store details are checked and stores are loaded
//! as each call is made, so a misconfiguration is reported by the call
//! that caused it with a precise message, before any rustls object is
//! built. Every method consumes the builder; a failed call leaves nothing
//! to continue with.
//!
//! ```no_run
//! use kickstart_tls::SecureContextBuilder;
//!
//! # fn main() -> Result<(), kickstart_tls::builder::ConfigError> {
//! let config = SecureContextBuilder::new()
//!     .with_one_way_authentication("truststore.pem", "changeit")?
//!     .with_protocol("TLSv1.3")
//!     .build()?;
//! assert!(config.is_one_way_authentication_enabled());
//! # Ok(())
//! # }
//! ```

use kickstart_traits::identity::IdentityProvider;
use kickstart_traits::store::{Store, StoreError, StoreLoader, StorePassword, StoreSource};
use kickstart_traits::trust::TrustAuthority;
use rustls::crypto::CryptoProvider;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::composite::combine;
use crate::config::{Authentication, IdentityMaterial, SecureContextConfig, TrustMaterial};
use crate::crypto_provider::{ProviderError, ProviderRegistry};
use crate::hostname::hostname_verifier;
use crate::identity::{IdentityError, KeyMaterial};
use crate::pem::PemStoreLoader;
use crate::trust::{StoreTrustAuthority, TrustError};

/// Protocol token used unless [`SecureContextBuilder::with_protocol`] is
/// called.
pub const DEFAULT_PROTOCOL: &str = "TLS";

/// The authentication mode of a builder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Mode {
    /// Only the peer is authenticated.
    OneWay,
    /// Both sides are authenticated.
    TwoWay,
    /// No TLS at all.
    SecurityDisabled,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OneWay => "one-way authentication",
            Self::TwoWay => "two-way authentication",
            Self::SecurityDisabled => "disabled security",
        })
    }
}

/// Error type returned by [`SecureContextBuilder`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// One-way authentication was requested without a trust store.
    #[error(
        "TrustStore details are empty, which are required to be present when SSL/TLS is enabled"
    )]
    EmptyTrustStoreDetails,
    /// Two-way authentication was requested without a trust store or a
    /// key store.
    #[error(
        "TrustStore or KeyStore details are empty, which are required to be present when SSL is enabled"
    )]
    EmptyStoreDetails,
    /// A store does not exist.
    #[error("Could not find the keystore file")]
    StoreNotFound(#[source] StoreError),
    /// A store exists but could not be parsed.
    #[error("Could not parse the keystore file: {cause}")]
    StoreUnparseable {
        /// What was wrong with it.
        cause: String,
        /// The loader's error.
        source: StoreError,
    },
    /// A store could not be read.
    #[error("Could not read the keystore file")]
    StoreUnreadable(#[source] StoreError),
    /// Security is enabled but no authentication mode was configured.
    #[error("SSL/TLS is enabled but neither one-way nor two-way authentication is configured")]
    NoAuthentication,
    /// An authentication mode was requested when another was already
    /// configured.
    #[error("Cannot configure {requested}: {configured} was already configured")]
    ConflictingAuthentication {
        /// The mode already configured.
        configured: Mode,
        /// The mode requested.
        requested: Mode,
    },
    /// Building a trust authority failed.
    #[error("{0}")]
    Trust(#[from] TrustError),
    /// Building an identity provider failed.
    #[error("{0}")]
    Identity(#[from] IdentityError),
    /// The requested crypto provider does not exist.
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

impl From<StoreError> for ConfigError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_, _) => Self::StoreNotFound(e),
            StoreError::Parse(_, ref cause) => Self::StoreUnparseable {
                cause: cause.clone(),
                source: e,
            },
            StoreError::Io(_) => Self::StoreUnreadable(e),
        }
    }
}

enum State {
    Empty,
    OneWay(TrustMaterial),
    TwoWay(TrustMaterial, IdentityMaterial),
    SecurityDisabled,
}

impl State {
    fn mode(&self) -> Option<Mode> {
        match self {
            Self::Empty => None,
            Self::OneWay(_) => Some(Mode::OneWay),
            Self::TwoWay(_, _) => Some(Mode::TwoWay),
            Self::SecurityDisabled => Some(Mode::SecurityDisabled),
        }
    }
}

/// Builder for [`SecureContextConfig`]. See the module documentation.
pub struct SecureContextBuilder {
    state: State,
    protocol: String,
    hostname_verification: bool,
    extra_trust: Vec<Arc<dyn TrustAuthority>>,
    crypto_provider: Arc<CryptoProvider>,
    loader: Arc<dyn StoreLoader>,
}

impl Default for SecureContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureContextBuilder {
    /// A builder using the default crypto provider and loading PEM stores.
    pub fn new() -> Self {
        Self::using(
            ProviderRegistry::default().default_provider(),
            Arc::new(PemStoreLoader),
        )
    }

    /// A builder using the given crypto provider and store loader.
    pub fn using(crypto_provider: Arc<CryptoProvider>, loader: Arc<dyn StoreLoader>) -> Self {
        Self {
            state: State::Empty,
            protocol: DEFAULT_PROTOCOL.into(),
            hostname_verification: true,
            extra_trust: Vec::new(),
            crypto_provider,
            loader,
        }
    }

    fn check_unconfigured(&self, requested: Mode) -> Result<(), ConfigError> {
        match self.state.mode() {
            None => Ok(()),
            Some(configured) => Err(ConfigError::ConflictingAuthentication {
                configured,
                requested,
            }),
        }
    }

    fn load(
        &self,
        source: &StoreSource,
        password: &StorePassword,
    ) -> Result<Arc<Store>, ConfigError> {
        Ok(Arc::new(self.loader.load(source, password)?))
    }

    fn trust_from(&self, store: Arc<Store>) -> Result<TrustMaterial, ConfigError> {
        let authority = StoreTrustAuthority::from_store(&store, &self.crypto_provider)?;
        Ok(TrustMaterial {
            authority: Arc::new(authority),
            stores: vec![store],
        })
    }

    /// Authenticate peers against the certificates in a trust store.
    pub fn with_one_way_authentication(
        self,
        trust_source: impl Into<StoreSource>,
        trust_password: impl Into<StorePassword>,
    ) -> Result<Self, ConfigError> {
        let (trust_source, trust_password) = (trust_source.into(), trust_password.into());
        if trust_source.is_empty() || trust_password.is_empty() {
            return Err(ConfigError::EmptyTrustStoreDetails);
        }
        self.check_unconfigured(Mode::OneWay)?;
        let trust = self.trust_from(self.load(&trust_source, &trust_password)?)?;
        log::info!("One-way authentication configured from {}", trust_source);
        Ok(Self {
            state: State::OneWay(trust),
            ..self
        })
    }

    /// Authenticate peers against the certificates in a trust store and
    /// present the private key entries of a key store as our identity.
    pub fn with_two_way_authentication(
        self,
        key_source: impl Into<StoreSource>,
        key_password: impl Into<StorePassword>,
        trust_source: impl Into<StoreSource>,
        trust_password: impl Into<StorePassword>,
    ) -> Result<Self, ConfigError> {
        let (key_source, key_password) = (key_source.into(), key_password.into());
        let (trust_source, trust_password) = (trust_source.into(), trust_password.into());
        if key_source.is_empty()
            || key_password.is_empty()
            || trust_source.is_empty()
            || trust_password.is_empty()
        {
            return Err(ConfigError::EmptyStoreDetails);
        }
        self.check_unconfigured(Mode::TwoWay)?;
        let key_store = self.load(&key_source, &key_password)?;
        let identity = KeyMaterial::from_store(&key_store, &self.crypto_provider)?;
        let trust = self.trust_from(self.load(&trust_source, &trust_password)?)?;
        log::info!(
            "Two-way authentication configured from {} and {}",
            key_source,
            trust_source
        );
        Ok(Self {
            state: State::TwoWay(
                trust,
                IdentityMaterial {
                    provider: Arc::new(identity),
                    store: Some(key_store),
                },
            ),
            ..self
        })
    }

    /// Two-way authentication with an identity provider and trust
    /// authority that were built elsewhere.
    pub fn with_two_way_authentication_from(
        self,
        identity: Arc<dyn IdentityProvider>,
        trust: Arc<dyn TrustAuthority>,
    ) -> Result<Self, ConfigError> {
        self.check_unconfigured(Mode::TwoWay)?;
        if !identity.has_any_identity() {
            return Err(IdentityError::NoPrivateKey.into());
        }
        Ok(Self {
            state: State::TwoWay(
                TrustMaterial {
                    authority: trust,
                    stores: Vec::new(),
                },
                IdentityMaterial {
                    provider: identity,
                    store: None,
                },
            ),
            ..self
        })
    }

    /// Additionally trust whatever `authority` trusts. Additional
    /// authorities are combined with the store-backed one; with no
    /// authentication mode configured they alone make up a one-way
    /// configuration.
    pub fn with_trust_authority(
        mut self,
        authority: Arc<dyn TrustAuthority>,
    ) -> Result<Self, ConfigError> {
        if let State::SecurityDisabled = self.state {
            return Err(ConfigError::ConflictingAuthentication {
                configured: Mode::SecurityDisabled,
                requested: Mode::OneWay,
            });
        }
        log::info!("Adding trust authority {}", authority.name());
        self.extra_trust.push(authority);
        Ok(self)
    }

    /// Additionally trust the platform's trusted root certificates. Does
    /// nothing, apart from logging a warning, if the platform has none.
    #[cfg(feature = "native")]
    pub fn with_system_trust(self) -> Result<Self, ConfigError> {
        match crate::native::system_trust_authority(&self.crypto_provider)? {
            Some(authority) => self.with_trust_authority(Arc::new(authority)),
            None => Ok(self),
        }
    }

    /// Additionally trust the root certificates bundled with this crate,
    /// independently of the platform.
    #[cfg(feature = "bundled")]
    pub fn with_bundled_trust(self) -> Result<Self, ConfigError> {
        let authority = crate::bundled::bundled_trust_authority(&self.crypto_provider)?;
        self.with_trust_authority(Arc::new(authority))
    }

    /// Disable security altogether. Any trust or identity material
    /// already configured is discarded.
    pub fn without_security(self) -> Self {
        if self.state.mode().is_some() || !self.extra_trust.is_empty() {
            log::warn!("Security disabled: discarding configured trust and identity material");
        }
        Self {
            state: State::SecurityDisabled,
            extra_trust: Vec::new(),
            ..self
        }
    }

    /// Whether server certificates must match the name connected to.
    /// Enabled by default.
    pub fn with_hostname_verifier_enabled(self, enabled: bool) -> Self {
        Self {
            hostname_verification: enabled,
            ..self
        }
    }

    /// The protocol version token. It is stored as given and interpreted
    /// only when a [`crate::SecureContext`] is assembled.
    pub fn with_protocol(self, protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            ..self
        }
    }

    /// Validate and produce the configuration.
    pub fn build(self) -> Result<SecureContextConfig, ConfigError> {
        let extra_trust = self.extra_trust;
        let with_extra = |trust: TrustMaterial| -> Result<TrustMaterial, ConfigError> {
            if extra_trust.is_empty() {
                return Ok(trust);
            }
            let delegates = std::iter::once(trust.authority).chain(extra_trust.iter().cloned());
            let combined = combine(delegates).map_err(TrustError::from)?;
            Ok(TrustMaterial {
                authority: Arc::new(combined),
                stores: trust.stores,
            })
        };
        let authentication = match self.state {
            State::Empty if extra_trust.is_empty() => return Err(ConfigError::NoAuthentication),
            State::Empty => {
                let combined = combine(extra_trust.iter().cloned()).map_err(TrustError::from)?;
                Authentication::OneWay {
                    trust: TrustMaterial {
                        authority: Arc::new(combined),
                        stores: Vec::new(),
                    },
                }
            }
            State::OneWay(trust) => Authentication::OneWay {
                trust: with_extra(trust)?,
            },
            State::TwoWay(trust, identity) => {
                if !identity.provider.has_any_identity() {
                    return Err(IdentityError::NoPrivateKey.into());
                }
                Authentication::TwoWay {
                    trust: with_extra(trust)?,
                    identity,
                }
            }
            State::SecurityDisabled => Authentication::Disabled,
        };
        let config = SecureContextConfig {
            authentication,
            protocol_version: self.protocol,
            hostname_verifier: hostname_verifier(self.hostname_verification),
            crypto_provider: self.crypto_provider,
        };
        log::info!("Secure context configuration: {}", config.describe());
        Ok(config)
    }
}

#[cfg(feature = "args")]
impl SecureContextBuilder {
    /// A builder configured from command line flags, validated by the same
    /// rules as the individual methods. The crypto provider named by
    /// `--crypto-provider` is looked up in `registry`.
    pub fn from_args(
        args: crate::args::Args,
        registry: &ProviderRegistry,
    ) -> Result<Self, ConfigError> {
        let crypto_provider = match args.crypto_provider {
            Some(ref name) => registry.get(name)?,
            None => registry.default_provider(),
        };
        let builder = Self::using(crypto_provider, Arc::new(PemStoreLoader))
            .with_protocol(args.tls_protocol)
            .with_hostname_verifier_enabled(!args.no_hostname_verification);
        if args.without_security {
            return Ok(builder.without_security());
        }
        if args.keystore.is_none() && args.keystore_password.is_some() {
            return Err(ConfigError::EmptyStoreDetails);
        }
        let trust_password = args.truststore_password.unwrap_or_default();
        match (args.keystore, args.truststore) {
            (Some(keystore), Some(truststore)) => builder.with_two_way_authentication(
                keystore,
                args.keystore_password.unwrap_or_default(),
                truststore,
                trust_password,
            ),
            (None, Some(truststore)) => {
                builder.with_one_way_authentication(truststore, trust_password)
            }
            (Some(_), None) => Err(ConfigError::EmptyStoreDetails),
            (None, None) => Ok(builder),
        }
    }
}
