//! Local identities loaded from key material.
//!
//! [`KeyMaterial`] implements [`IdentityProvider`] over either a single
//! certificate chain and key, or every private key entry of a [`Store`].
//! When several identities are available, one is selected by, in order:
//!
//! 1. the alias requested by local configuration,
//! 2. the SNI name sent by the client (servers only),
//! 3. whether its issuer is among the root hint subjects sent by the peer,
//! 4. failing all of the above, the first identity.

use kickstart_traits::identity::{IdentityHints, IdentityProvider};
use kickstart_traits::store::Store;
use rustls::crypto::CryptoProvider;
use rustls::server::ParsedCertificate;
use rustls::sign::CertifiedKey;
use rustls::{DistinguishedName, InconsistentKeys};
use rustls_pki_types::{CertificateDer, PrivateKeyDer, ServerName};
use std::sync::Arc;
use thiserror::Error;
use time::OffsetDateTime;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

/// Error type returned when loading identities.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The store has no private key entries.
    #[error("KeyStore does not contain any private key entry")]
    NoPrivateKey,
    /// A private key entry has no certificates.
    #[error("private key entry {0} has no certificate chain")]
    EmptyChain(String),
    /// Wrapper for rustls::Error
    #[error("{0}")]
    TLSError(#[from] rustls::Error),
}

/// Where the identities of a [`KeyMaterial`] came from.
#[derive(Debug)]
pub enum CredentialSource {
    /// A single certificate chain and key supplied directly.
    Single(Arc<CertifiedKey>),
    /// Every private key entry of a store, by alias.
    StoreBacked(Vec<(String, Arc<CertifiedKey>)>),
}

/// An [`IdentityProvider`] over fixed key material.
#[derive(Debug)]
pub struct KeyMaterial {
    source: CredentialSource,
    valid_until: Option<OffsetDateTime>,
}

fn certified_key(
    chain: Vec<CertificateDer<'static>>,
    key: PrivateKeyDer<'static>,
    crypto_provider: &CryptoProvider,
) -> Result<Arc<CertifiedKey>, rustls::Error> {
    let signing_key = crypto_provider.key_provider.load_private_key(key)?;
    let certified_key = CertifiedKey::new(chain, signing_key);
    match certified_key.keys_match() {
        // Some keys cannot report their public half.
        Ok(()) | Err(rustls::Error::InconsistentKeys(InconsistentKeys::Unknown)) => {
            Ok(Arc::new(certified_key))
        }
        Err(e) => Err(e),
    }
}

fn not_after(cert: &CertificateDer<'_>) -> Option<OffsetDateTime> {
    X509Certificate::from_der(cert.as_ref())
        .ok()
        .map(|(_, c)| c.validity().not_after.to_datetime())
}

fn earliest_expiry<'a>(
    keys: impl Iterator<Item = &'a Arc<CertifiedKey>>,
) -> Option<OffsetDateTime> {
    keys.filter_map(|k| not_after(k.cert.first()?)).min()
}

fn issued_by_any(key: &CertifiedKey, subjects: &[DistinguishedName]) -> bool {
    let Some(ee) = key.cert.first() else {
        return false;
    };
    let Ok((_, parsed)) = X509Certificate::from_der(ee.as_ref()) else {
        return false;
    };
    let issuer = parsed.issuer().as_raw();
    subjects.iter().any(|dn| dn.as_ref() == issuer)
}

fn valid_for_name(key: &CertifiedKey, sni: &str) -> bool {
    let (Some(ee), Ok(name)) = (key.cert.first(), ServerName::try_from(sni)) else {
        return false;
    };
    ParsedCertificate::try_from(ee)
        .and_then(|parsed| rustls::client::verify_server_name(&parsed, &name))
        .is_ok()
}

impl KeyMaterial {
    /// An identity made of one certificate chain (end-entity first) and
    /// its private key.
    pub fn single(
        chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
        crypto_provider: &CryptoProvider,
    ) -> Result<Self, IdentityError> {
        if chain.is_empty() {
            return Err(IdentityError::EmptyChain("single".into()));
        }
        let key = certified_key(chain, key, crypto_provider)?;
        let valid_until = earliest_expiry(std::iter::once(&key));
        Ok(Self {
            source: CredentialSource::Single(key),
            valid_until,
        })
    }

    /// Every private key entry of `store`.
    pub fn from_store(
        store: &Store,
        crypto_provider: &CryptoProvider,
    ) -> Result<Self, IdentityError> {
        let keys = store
            .private_keys()
            .map(|(alias, key, chain)| {
                if chain.is_empty() {
                    return Err(IdentityError::EmptyChain(alias.into()));
                }
                Ok((
                    alias.to_string(),
                    certified_key(chain.to_vec(), key.clone_key(), crypto_provider)?,
                ))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Err(IdentityError::NoPrivateKey);
        }
        let valid_until = earliest_expiry(keys.iter().map(|(_, k)| k));
        log::info!(
            "Loaded {} identities from store {}",
            keys.len(),
            store.name()
        );
        Ok(Self {
            source: CredentialSource::StoreBacked(keys),
            valid_until,
        })
    }

    /// Where the identities came from.
    pub fn source(&self) -> &CredentialSource {
        &self.source
    }
}

impl IdentityProvider for KeyMaterial {
    fn has_any_identity(&self) -> bool {
        match self.source {
            CredentialSource::Single(_) => true,
            CredentialSource::StoreBacked(ref keys) => !keys.is_empty(),
        }
    }

    fn select_identity(&self, hints: &IdentityHints<'_>) -> Option<Arc<CertifiedKey>> {
        let keys = match self.source {
            CredentialSource::Single(ref key) => return Some(Arc::clone(key)),
            CredentialSource::StoreBacked(ref keys) => keys,
        };
        let by_alias = || {
            hints
                .alias
                .and_then(|alias| keys.iter().find(|(a, _)| a == alias))
        };
        let by_sni = || {
            hints
                .sni
                .and_then(|sni| keys.iter().find(|(_, k)| valid_for_name(k, sni)))
        };
        let by_issuer = || {
            hints
                .root_hint_subjects
                .filter(|subjects| !subjects.is_empty())
                .and_then(|subjects| keys.iter().find(|(_, k)| issued_by_any(k, subjects)))
        };
        by_alias()
            .or_else(by_sni)
            .or_else(by_issuer)
            .or_else(|| keys.first())
            .map(|(_, k)| Arc::clone(k))
    }

    fn identity_valid_until(&self) -> Option<OffsetDateTime> {
        self.valid_until
    }
}
