//! Adapters from [`TrustAuthority`], [`HostnameVerifier`] and
//! [`IdentityProvider`] to the rustls verifier and resolver traits.
//!
//! This is where a trust [`Decision::Reject`] turns into a
//! [`rustls::Error`] and fails the handshake.

use kickstart_traits::hostname::HostnameVerifier;
use kickstart_traits::identity::{IdentityHints, IdentityProvider};
use kickstart_traits::trust::{Decision, Rejection, TrustAuthority, Usage};
use rustls::client::ResolvesClientCert;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{
    CryptoProvider, WebPkiSupportedAlgorithms, verify_tls12_signature, verify_tls13_signature,
};
use rustls::server::danger::{ClientCertVerified, ClientCertVerifier};
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::{CertificateError, DigitallySignedStruct, DistinguishedName, SignatureScheme};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use std::sync::Arc;

use crate::trust::root_hint_subjects;

/// The error reported to rustls for a rejected chain: the first reason
/// that is not [`CertificateError::UnknownIssuer`] if there is one, since
/// that is the most specific, otherwise `UnknownIssuer`.
pub(crate) fn rejection_error(reasons: Vec<Rejection>) -> rustls::Error {
    for r in &reasons {
        log::warn!("Certificate rejected by {}", r);
    }
    reasons
        .into_iter()
        .map(|r| r.error)
        .find(|e| *e != rustls::Error::InvalidCertificate(CertificateError::UnknownIssuer))
        .unwrap_or(rustls::Error::InvalidCertificate(
            CertificateError::UnknownIssuer,
        ))
}

fn chain<'a>(
    end_entity: &CertificateDer<'a>,
    intermediates: &[CertificateDer<'a>],
) -> Vec<CertificateDer<'a>> {
    std::iter::once(end_entity)
        .chain(intermediates)
        .cloned()
        .collect()
}

/// [`ServerCertVerifier`] consulting a [`TrustAuthority`] and then a
/// [`HostnameVerifier`].
#[derive(Debug)]
pub struct ServerTrustVerifier {
    authority: Arc<dyn TrustAuthority>,
    hostname_verifier: Arc<dyn HostnameVerifier>,
    supported_algs: WebPkiSupportedAlgorithms,
}

impl ServerTrustVerifier {
    /// Verify servers with `authority` and `hostname_verifier`, checking
    /// handshake signatures with the algorithms of `crypto_provider`.
    pub fn new(
        authority: Arc<dyn TrustAuthority>,
        hostname_verifier: Arc<dyn HostnameVerifier>,
        crypto_provider: &CryptoProvider,
    ) -> Self {
        Self {
            authority,
            hostname_verifier,
            supported_algs: crypto_provider.signature_verification_algorithms,
        }
    }
}

impl ServerCertVerifier for ServerTrustVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match self
            .authority
            .check_trusted(&chain(end_entity, intermediates), Usage::Server, now)
        {
            Decision::Accept => self
                .hostname_verifier
                .verify(end_entity, server_name)
                .map(|()| ServerCertVerified::assertion()),
            Decision::Reject(reasons) => Err(rejection_error(reasons)),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.supported_algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.supported_algs)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported_algs.supported_schemes()
    }
}

/// [`ClientCertVerifier`] consulting a [`TrustAuthority`]. Client
/// certificates are mandatory.
#[derive(Debug)]
pub struct ClientTrustVerifier {
    authority: Arc<dyn TrustAuthority>,
    subjects: Vec<DistinguishedName>,
    supported_algs: WebPkiSupportedAlgorithms,
}

impl ClientTrustVerifier {
    /// Verify clients with `authority`, checking handshake signatures with
    /// the algorithms of `crypto_provider`.
    pub fn new(authority: Arc<dyn TrustAuthority>, crypto_provider: &CryptoProvider) -> Self {
        let subjects = root_hint_subjects(authority.accepted_issuers());
        Self {
            authority,
            subjects,
            supported_algs: crypto_provider.signature_verification_algorithms,
        }
    }
}

impl ClientCertVerifier for ClientTrustVerifier {
    fn root_hint_subjects(&self) -> &[DistinguishedName] {
        &self.subjects
    }

    fn verify_client_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        now: UnixTime,
    ) -> Result<ClientCertVerified, rustls::Error> {
        match self
            .authority
            .check_trusted(&chain(end_entity, intermediates), Usage::Client, now)
        {
            Decision::Accept => Ok(ClientCertVerified::assertion()),
            Decision::Reject(reasons) => Err(rejection_error(reasons)),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(message, cert, dss, &self.supported_algs)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(message, cert, dss, &self.supported_algs)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.supported_algs.supported_schemes()
    }
}

/// [`ResolvesClientCert`] backed by an [`IdentityProvider`].
#[derive(Debug)]
pub struct ClientIdentityResolver {
    provider: Arc<dyn IdentityProvider>,
    alias: Option<String>,
}

impl ClientIdentityResolver {
    /// Present identities from `provider`, preferring the one called
    /// `alias` if given.
    pub fn new(provider: Arc<dyn IdentityProvider>, alias: Option<String>) -> Self {
        Self { provider, alias }
    }
}

impl ResolvesClientCert for ClientIdentityResolver {
    fn resolve(
        &self,
        root_hint_subjects: &[&[u8]],
        _sigschemes: &[SignatureScheme],
    ) -> Option<Arc<CertifiedKey>> {
        let dns = root_hint_subjects
            .iter()
            .map(|raw| raw.to_vec().into())
            .collect::<Vec<_>>();
        let hints = IdentityHints {
            sni: None,
            root_hint_subjects: Some(&dns),
            alias: self.alias.as_deref(),
        };
        self.provider.select_identity(&hints)
    }

    fn has_certs(&self) -> bool {
        self.provider.has_any_identity()
    }
}

/// [`ResolvesServerCert`] backed by an [`IdentityProvider`].
#[derive(Debug)]
pub struct ServerIdentityResolver {
    provider: Arc<dyn IdentityProvider>,
}

impl ServerIdentityResolver {
    /// Present identities from `provider`.
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }
}

impl ResolvesServerCert for ServerIdentityResolver {
    fn resolve(&self, client_hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
        let hints = IdentityHints {
            sni: client_hello.server_name(),
            root_hint_subjects: client_hello.certificate_authorities(),
            alias: None,
        };
        self.provider.select_identity(&hints)
    }
}
