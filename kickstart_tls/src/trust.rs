//! Trust authorities backed by a fixed set of trust anchors.
//!
//! A [`StoreTrustAuthority`] verifies chains with webpki against the
//! certificates it was built from, using the signature algorithms of an
//! injected [`CryptoProvider`]. Verification failures are reported as
//! [`Decision::Reject`] so that a [`CompositeTrustAuthority`] can go on to
//! ask other authorities.

use kickstart_traits::store::Store;
use kickstart_traits::trust::{Decision, TrustAuthority, Usage};
use rustls::client::verify_server_cert_signed_by_trust_anchor;
use rustls::crypto::{CryptoProvider, WebPkiSupportedAlgorithms};
use rustls::server::danger::ClientCertVerifier;
use rustls::server::{ParsedCertificate, VerifierBuilderError, WebPkiClientVerifier};
use rustls::{CertificateError, DistinguishedName, RootCertStore};
use rustls_pki_types::{CertificateDer, UnixTime};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use x509_parser::certificate::X509Certificate;
use x509_parser::prelude::FromDer;

use crate::composite::{AggregationError, CompositeTrustAuthority, combine};

/// Error type returned when constructing trust authorities.
#[derive(Debug, Error)]
pub enum TrustError {
    /// The client certificate verifier could not be built.
    #[error("{0}")]
    Verifier(#[from] VerifierBuilderError),
    /// Combining authorities failed.
    #[error("{0}")]
    Aggregation(#[from] AggregationError),
}

/// A [`TrustAuthority`] that trusts chains issued by a fixed list of
/// trust anchors.
#[derive(Debug)]
pub struct StoreTrustAuthority {
    name: String,
    issuers: Vec<CertificateDer<'static>>,
    roots: Arc<RootCertStore>,
    supported_algs: WebPkiSupportedAlgorithms,
    client_verifier: Option<Arc<dyn ClientCertVerifier>>,
}

impl StoreTrustAuthority {
    /// Build an authority trusting `certs`. Duplicate certificates are
    /// ignored and certificates that cannot serve as trust anchors are
    /// skipped with a warning.
    pub fn from_certificates(
        name: impl Into<String>,
        certs: impl IntoIterator<Item = CertificateDer<'static>>,
        crypto_provider: &Arc<CryptoProvider>,
    ) -> Result<Self, TrustError> {
        let name = name.into();
        let mut seen: HashSet<Vec<u8>> = HashSet::new();
        let mut issuers = Vec::new();
        let mut roots = RootCertStore::empty();
        let mut skipped = 0usize;
        for cert in certs {
            if !seen.insert(cert.as_ref().to_vec()) {
                continue;
            }
            let anchor = webpki::anchor_from_trusted_cert(&cert).map(|a| a.to_owned());
            match anchor {
                Ok(anchor) => {
                    roots.roots.push(anchor);
                    issuers.push(cert);
                }
                Err(e) => {
                    skipped += 1;
                    log::warn!(
                        "Skipping certificate {} in {}: not usable as a trust anchor: {}",
                        subject_of(&cert),
                        name,
                        e
                    );
                }
            }
        }
        let roots = Arc::new(roots);
        let client_verifier = if roots.is_empty() {
            log::warn!("Trust authority {} has no trust anchors", name);
            None
        } else {
            Some(
                WebPkiClientVerifier::builder_with_provider(
                    Arc::clone(&roots),
                    Arc::clone(crypto_provider),
                )
                .build()?,
            )
        };
        log::info!(
            "Trust authority {}: {} trust anchors ({} skipped)",
            name,
            issuers.len(),
            skipped
        );
        Ok(Self {
            name,
            issuers,
            roots,
            supported_algs: crypto_provider.signature_verification_algorithms,
            client_verifier,
        })
    }

    /// Build an authority trusting the trusted certificate entries of
    /// `store`.
    pub fn from_store(
        store: &Store,
        crypto_provider: &Arc<CryptoProvider>,
    ) -> Result<Self, TrustError> {
        if store.trusted_certificates().next().is_none() {
            log::warn!("Store {} contains no trusted certificates", store.name());
        }
        Self::from_certificates(
            store.name(),
            store.trusted_certificates().cloned(),
            crypto_provider,
        )
    }

    fn verify(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        usage: Usage,
        now: UnixTime,
    ) -> Result<(), rustls::Error> {
        match usage {
            Usage::Server => {
                let parsed = ParsedCertificate::try_from(end_entity)?;
                verify_server_cert_signed_by_trust_anchor(
                    &parsed,
                    &self.roots,
                    intermediates,
                    now,
                    self.supported_algs.all,
                )
            }
            Usage::Client => match self.client_verifier {
                Some(ref verifier) => verifier
                    .verify_client_cert(end_entity, intermediates, now)
                    .map(|_| ()),
                None => Err(rustls::Error::InvalidCertificate(
                    CertificateError::UnknownIssuer,
                )),
            },
        }
    }
}

impl TrustAuthority for StoreTrustAuthority {
    fn name(&self) -> &str {
        &self.name
    }

    fn accepted_issuers(&self) -> &[CertificateDer<'static>] {
        &self.issuers
    }

    fn check_trusted(&self, chain: &[CertificateDer<'_>], usage: Usage, now: UnixTime) -> Decision {
        let Some((end_entity, intermediates)) = chain.split_first() else {
            return Decision::reject(&self.name, rustls::Error::NoCertificatesPresented);
        };
        if self.issuers.is_empty() {
            return Decision::reject(
                &self.name,
                rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer),
            );
        }
        match self.verify(end_entity, intermediates, usage, now) {
            Ok(()) => {
                log::debug!(
                    "{} accepted {} certificate {}",
                    self.name,
                    usage,
                    subject_of(end_entity)
                );
                Decision::Accept
            }
            Err(e) => {
                log::debug!(
                    "{} rejected {} certificate {}: {}",
                    self.name,
                    usage,
                    subject_of(end_entity),
                    e
                );
                Decision::reject(&self.name, e)
            }
        }
    }
}

/// One [`StoreTrustAuthority`] per store, combined.
pub fn from_stores<'a>(
    stores: impl IntoIterator<Item = &'a Store>,
    crypto_provider: &Arc<CryptoProvider>,
) -> Result<CompositeTrustAuthority, TrustError> {
    let authorities = stores
        .into_iter()
        .map(|store| {
            StoreTrustAuthority::from_store(store, crypto_provider)
                .map(|a| Arc::new(a) as Arc<dyn TrustAuthority>)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(combine(authorities)?)
}

/// The subject distinguished names of `issuers`, as sent to peers in
/// certificate requests.
pub fn root_hint_subjects(issuers: &[CertificateDer<'static>]) -> Vec<DistinguishedName> {
    let mut roots = RootCertStore::empty();
    roots.add_parsable_certificates(issuers.iter().cloned());
    roots.subjects()
}

/// Human readable subject of a certificate.
pub fn subject_of(cert: &CertificateDer<'_>) -> String {
    X509Certificate::from_der(cert.as_ref())
        .map(|(_, c)| c.subject().to_string())
        .unwrap_or_else(|_| "<unparseable certificate>".into())
}
