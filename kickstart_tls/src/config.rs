//! The validated, immutable secure-context configuration produced by
//! [`crate::builder::SecureContextBuilder::build`].
//!
//! Material that the configuration does not have (for instance the
//! identity provider of a one-way configuration, or anything at all when
//! security is disabled) is reported through [`UnavailableError`] rather
//! than `None`, so callers propagate its absence with `?`.

use kickstart_traits::hostname::HostnameVerifier;
use kickstart_traits::identity::IdentityProvider;
use kickstart_traits::store::Store;
use kickstart_traits::trust::TrustAuthority;
use rustls::crypto::CryptoProvider;
use rustls_pki_types::CertificateDer;
use std::sync::Arc;
use thiserror::Error;

use crate::trust::subject_of;

/// Error type returned by [`SecureContextConfig`] accessors for material
/// the configuration does not have.
#[derive(Clone, Copy, Debug, Eq, Error, PartialEq)]
pub enum UnavailableError {
    /// No trust authority.
    #[error("The TrustManager could not be provided because it is not available")]
    TrustManager,
    /// No identity provider.
    #[error("The KeyManager could not be provided because it is not available")]
    KeyManager,
    /// No trust store.
    #[error("The TrustStore could not be provided because it is not available")]
    TrustStore,
    /// No key store.
    #[error("The KeyStore could not be provided because it is not available")]
    KeyStore,
}

#[derive(Clone, Debug)]
pub(crate) struct TrustMaterial {
    pub(crate) authority: Arc<dyn TrustAuthority>,
    pub(crate) stores: Vec<Arc<Store>>,
}

#[derive(Clone, Debug)]
pub(crate) struct IdentityMaterial {
    pub(crate) provider: Arc<dyn IdentityProvider>,
    pub(crate) store: Option<Arc<Store>>,
}

#[derive(Clone, Debug)]
pub(crate) enum Authentication {
    Disabled,
    OneWay {
        trust: TrustMaterial,
    },
    TwoWay {
        trust: TrustMaterial,
        identity: IdentityMaterial,
    },
}

/// A validated secure-context configuration.
///
/// One-way and two-way authentication are never both enabled. If either
/// is enabled a trust authority is present, and two-way authentication
/// additionally has an identity provider.
#[derive(Clone, Debug)]
pub struct SecureContextConfig {
    pub(crate) authentication: Authentication,
    pub(crate) protocol_version: String,
    pub(crate) hostname_verifier: Arc<dyn HostnameVerifier>,
    pub(crate) crypto_provider: Arc<CryptoProvider>,
}

impl SecureContextConfig {
    fn trust(&self) -> Option<&TrustMaterial> {
        match self.authentication {
            Authentication::Disabled => None,
            Authentication::OneWay { ref trust } | Authentication::TwoWay { ref trust, .. } => {
                Some(trust)
            }
        }
    }

    fn identity(&self) -> Option<&IdentityMaterial> {
        match self.authentication {
            Authentication::TwoWay { ref identity, .. } => Some(identity),
            _ => None,
        }
    }

    /// False if and only if the configuration was built with security
    /// disabled.
    pub fn is_security_enabled(&self) -> bool {
        !matches!(self.authentication, Authentication::Disabled)
    }

    /// Only the peer is authenticated.
    pub fn is_one_way_authentication_enabled(&self) -> bool {
        matches!(self.authentication, Authentication::OneWay { .. })
    }

    /// Both sides are authenticated.
    pub fn is_two_way_authentication_enabled(&self) -> bool {
        matches!(self.authentication, Authentication::TwoWay { .. })
    }

    /// The (possibly composite) trust authority.
    pub fn trust_authority(&self) -> Result<Arc<dyn TrustAuthority>, UnavailableError> {
        self.trust()
            .map(|t| Arc::clone(&t.authority))
            .ok_or(UnavailableError::TrustManager)
    }

    /// The issuers accepted by the trust authority.
    pub fn trusted_certificates(&self) -> Result<&[CertificateDer<'static>], UnavailableError> {
        self.trust()
            .map(|t| t.authority.accepted_issuers())
            .ok_or(UnavailableError::TrustManager)
    }

    /// The stores the trust authority was loaded from. Authorities added
    /// programmatically have no store.
    pub fn trust_stores(&self) -> Result<&[Arc<Store>], UnavailableError> {
        self.trust()
            .map(|t| t.stores.as_slice())
            .filter(|s| !s.is_empty())
            .ok_or(UnavailableError::TrustStore)
    }

    /// The local identity provider.
    pub fn identity_provider(&self) -> Result<Arc<dyn IdentityProvider>, UnavailableError> {
        self.identity()
            .map(|i| Arc::clone(&i.provider))
            .ok_or(UnavailableError::KeyManager)
    }

    /// The store the identity provider was loaded from.
    pub fn key_store(&self) -> Result<&Arc<Store>, UnavailableError> {
        self.identity()
            .and_then(|i| i.store.as_ref())
            .ok_or(UnavailableError::KeyStore)
    }

    /// The protocol version token, exactly as configured.
    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// The hostname verifier for client connections.
    pub fn hostname_verifier(&self) -> Arc<dyn HostnameVerifier> {
        Arc::clone(&self.hostname_verifier)
    }

    /// The crypto provider for everything built from this configuration.
    pub fn crypto_provider(&self) -> Arc<CryptoProvider> {
        Arc::clone(&self.crypto_provider)
    }

    /// A one-line human readable summary, for logs.
    pub fn describe(&self) -> String {
        let mode = match self.authentication {
            Authentication::Disabled => return "security disabled".into(),
            Authentication::OneWay { .. } => "one-way authentication",
            Authentication::TwoWay { .. } => "two-way authentication",
        };
        let issuers = self
            .trust()
            .map(|t| {
                t.authority
                    .accepted_issuers()
                    .iter()
                    .map(subject_of)
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();
        format!(
            "{}, protocol {}, hostname verification {}, trusted issuers [{}]",
            mode,
            self.protocol_version,
            if self.hostname_verifier.is_strict() {
                "enabled"
            } else {
                "disabled"
            },
            issuers
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hostname::hostname_verifier;
    use crate::identity::KeyMaterial;
    use crate::testdata;
    use crate::trust::StoreTrustAuthority;
    use std::io::Cursor;

    fn trust() -> TrustMaterial {
        TrustMaterial {
            authority: Arc::new(
                StoreTrustAuthority::from_certificates(
                    "corp",
                    testdata::certs(testdata::CACERT),
                    &testdata::provider(),
                )
                .unwrap(),
            ),
            stores: Vec::new(),
        }
    }

    fn config(authentication: Authentication) -> SecureContextConfig {
        SecureContextConfig {
            authentication,
            protocol_version: "TLSv1.3".into(),
            hostname_verifier: hostname_verifier(true),
            crypto_provider: testdata::provider(),
        }
    }

    #[test]
    fn disabled() {
        let c = config(Authentication::Disabled);
        assert!(!c.is_security_enabled());
        assert!(!c.is_one_way_authentication_enabled());
        assert!(!c.is_two_way_authentication_enabled());
        assert_eq!(
            c.trust_authority().unwrap_err().to_string(),
            "The TrustManager could not be provided because it is not available"
        );
        assert_eq!(
            c.identity_provider().unwrap_err().to_string(),
            "The KeyManager could not be provided because it is not available"
        );
        assert_eq!(c.trust_stores().unwrap_err(), UnavailableError::TrustStore);
        assert_eq!(c.key_store().unwrap_err(), UnavailableError::KeyStore);
        assert_eq!(c.describe(), "security disabled");
    }

    #[test]
    fn one_way() {
        let c = config(Authentication::OneWay { trust: trust() });
        assert!(c.is_security_enabled());
        assert!(c.is_one_way_authentication_enabled());
        assert!(!c.is_two_way_authentication_enabled());
        assert_eq!(c.trusted_certificates().unwrap().len(), 1);
        assert_eq!(
            c.identity_provider().unwrap_err(),
            UnavailableError::KeyManager
        );
        // Programmatic trust has no backing store.
        assert_eq!(c.trust_stores().unwrap_err(), UnavailableError::TrustStore);
        assert_eq!(c.protocol_version(), "TLSv1.3");
        let d = c.describe();
        assert!(d.starts_with("one-way authentication, protocol TLSv1.3"));
        assert!(d.contains("Kickstart Test Root CA"));
    }

    #[test]
    fn two_way() {
        let key = rustls_pemfile::private_key(&mut Cursor::new(testdata::CLIENT_KEY))
            .unwrap()
            .unwrap();
        let identity = IdentityMaterial {
            provider: Arc::new(
                KeyMaterial::single(
                    testdata::certs(testdata::CLIENT_CERT),
                    key,
                    &testdata::provider(),
                )
                .unwrap(),
            ),
            store: None,
        };
        let c = config(Authentication::TwoWay {
            trust: trust(),
            identity,
        });
        assert!(c.is_two_way_authentication_enabled());
        assert!(!c.is_one_way_authentication_enabled());
        assert!(c.identity_provider().unwrap().has_any_identity());
        assert_eq!(c.key_store().unwrap_err(), UnavailableError::KeyStore);
        assert!(c.describe().starts_with("two-way authentication"));
    }
}
