//! Assembly of rustls client and server configurations from a validated
//! [`SecureContextConfig`].
//!
//! The protocol version token is interpreted here and nowhere else:
//! `TLSv1.2`, `TLSv1.3`, or `TLS` for whichever of the two the peers
//! prefer.

use rustls::server::{ServerSessionMemoryCache, StoresServerSessions};
use rustls::{ClientConfig, ServerConfig, SupportedProtocolVersion};
use std::sync::Arc;
use thiserror::Error;

use crate::config::{SecureContextConfig, UnavailableError};
use crate::verifier::{
    ClientIdentityResolver, ClientTrustVerifier, ServerIdentityResolver, ServerTrustVerifier,
};

static TLS12_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Error type returned by [`SecureContext`].
#[derive(Debug, Error)]
pub enum ContextError {
    /// Error from rustls.
    #[error("{0}")]
    TLSError(#[from] rustls::Error),
    /// The protocol version token is not one of `TLSv1.2`, `TLSv1.3` or
    /// `TLS`.
    #[error("unsupported TLS protocol: {0}")]
    UnsupportedProtocol(String),
    /// The configuration lacks material needed for the requested side.
    #[error("{0}")]
    Unavailable(#[from] UnavailableError),
    /// The configuration has security disabled, so there is nothing to
    /// assemble.
    #[error("security is disabled")]
    SecurityDisabled,
}

fn protocol_versions(
    token: &str,
) -> Result<&'static [&'static SupportedProtocolVersion], ContextError> {
    match token {
        "TLSv1.2" => Ok(TLS12_ONLY),
        "TLSv1.3" => Ok(TLS13_ONLY),
        "TLS" => Ok(rustls::DEFAULT_VERSIONS),
        _ => Err(ContextError::UnsupportedProtocol(token.into())),
    }
}

/// rustls configurations wired to the trust authority, hostname verifier
/// and identity provider of a [`SecureContextConfig`].
#[derive(Debug)]
pub struct SecureContext {
    config: SecureContextConfig,
    versions: &'static [&'static SupportedProtocolVersion],
    session_storage: Arc<dyn StoresServerSessions>,
}

impl SecureContext {
    /// Check that `config` can be assembled. Fails if security is disabled
    /// or the protocol token is not recognised.
    pub fn new(config: SecureContextConfig) -> Result<Self, ContextError> {
        if !config.is_security_enabled() {
            return Err(ContextError::SecurityDisabled);
        }
        let versions = protocol_versions(config.protocol_version())?;
        Ok(Self {
            config,
            versions,
            session_storage: ServerSessionMemoryCache::new(256),
        })
    }

    /// The configuration this context was assembled from.
    pub fn config(&self) -> &SecureContextConfig {
        &self.config
    }

    /// A [`ClientConfig`] that verifies servers with the trust authority
    /// and hostname verifier. With two-way authentication it presents a
    /// client certificate when the server asks for one.
    pub fn client_config(&self) -> Result<ClientConfig, ContextError> {
        self.client_config_with_alias(None)
    }

    /// Like [`Self::client_config`], preferring the identity called
    /// `alias` if there is one.
    pub fn client_config_with_alias(
        &self,
        alias: Option<&str>,
    ) -> Result<ClientConfig, ContextError> {
        let crypto_provider = self.config.crypto_provider();
        let verifier = ServerTrustVerifier::new(
            self.config.trust_authority()?,
            self.config.hostname_verifier(),
            &crypto_provider,
        );
        let builder = ClientConfig::builder_with_provider(Arc::clone(&crypto_provider))
            .with_protocol_versions(self.versions)?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(verifier));
        Ok(match self.config.identity_provider() {
            Ok(identity) => builder.with_client_cert_resolver(Arc::new(
                ClientIdentityResolver::new(identity, alias.map(String::from)),
            )),
            Err(_) => builder.with_no_client_auth(),
        })
    }

    /// A [`ServerConfig`] that presents our identity and requires clients
    /// to present a certificate the trust authority accepts. Needs two-way
    /// authentication.
    pub fn server_config(&self) -> Result<ServerConfig, ContextError> {
        let crypto_provider = self.config.crypto_provider();
        let identity = self.config.identity_provider()?;
        let verifier = ClientTrustVerifier::new(self.config.trust_authority()?, &crypto_provider);
        let mut sc = ServerConfig::builder_with_provider(Arc::clone(&crypto_provider))
            .with_protocol_versions(self.versions)?
            .with_client_cert_verifier(Arc::new(verifier))
            .with_cert_resolver(Arc::new(ServerIdentityResolver::new(identity)));
        sc.session_storage = Arc::clone(&self.session_storage);
        Ok(sc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::SecureContextBuilder;
    use crate::pem::PemStoreLoader;
    use crate::testdata;
    use futures::future::Either;
    use rustls::ProtocolVersion;
    use rustls_pki_types::ServerName;
    use std::io::Cursor;
    use std::path::PathBuf;
    use std::pin::pin;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio_rustls::{Accept, Connect, TlsAcceptor, TlsConnector};

    fn builder() -> SecureContextBuilder {
        SecureContextBuilder::using(testdata::provider(), Arc::new(PemStoreLoader))
    }

    fn two_way(key: PathBuf, trust: PathBuf) -> SecureContextBuilder {
        builder()
            .with_two_way_authentication(key, testdata::PASSWORD, trust, testdata::PASSWORD)
            .unwrap()
    }

    fn context(b: SecureContextBuilder) -> SecureContext {
        SecureContext::new(b.build().unwrap()).unwrap()
    }

    fn pair(
        cc: ClientConfig,
        sc: ServerConfig,
        name: &'static str,
    ) -> (Connect<DuplexStream>, Accept<DuplexStream>) {
        let (client, server) = tokio::io::duplex(16 * 1024);
        let client = TlsConnector::from(Arc::new(cc))
            .connect(ServerName::try_from(name).unwrap(), client);
        let server = TlsAcceptor::from(Arc::new(sc)).accept(server);
        (client, server)
    }

    async fn talk(
        client: Connect<DuplexStream>,
        server: Accept<DuplexStream>,
    ) -> Option<ProtocolVersion> {
        let client_task = pin!(async move {
            let mut stream = client.await.expect("client connected");
            stream
                .write_all(b"hello")
                .await
                .expect("write hello to client");
            let mut buf = vec![0u8; 3];
            stream
                .read_exact(&mut buf)
                .await
                .expect("read bye from server");
            assert_eq!(buf, b"bye");
            stream.get_ref().1.protocol_version()
        });
        let server_task = pin!(async move {
            let mut stream = server.await.expect("server accepted");
            let mut buf = vec![0u8; 5];
            stream
                .read_exact(&mut buf)
                .await
                .expect("read hello from client");
            assert_eq!(buf, b"hello");
            stream.write_all(b"bye").await.expect("write bye to client");
            stream.shutdown().await.expect("shutdown");
        });
        match futures::future::select(client_task, server_task).await {
            Either::Left((version, _)) => version,
            Either::Right((_, client_task)) => client_task.await,
        }
    }

    async fn client_refuses(client: Connect<DuplexStream>, server: Accept<DuplexStream>) {
        let client_task = pin!(async move {
            let err = client.await.expect_err("should refuse");
            assert!(err.to_string().contains("certificate"));
        });
        match futures::future::select(client_task, server).await {
            Either::Left((_, _)) => (),
            Either::Right((_, client_task)) => client_task.await,
        }
    }

    async fn server_refuses(client: Connect<DuplexStream>, server: Accept<DuplexStream>) {
        let server_task = pin!(async move {
            let err = server.await.expect_err("should refuse");
            assert!(err.to_string().contains("certificate"));
        });
        match futures::future::select(client, server_task).await {
            Either::Left((_, server_task)) => server_task.await,
            Either::Right((_, _)) => (),
        }
    }

    fn server_context(files: &testdata::StoreFiles) -> SecureContext {
        context(two_way(files.identity(), files.truststore()))
    }

    #[tokio::test]
    async fn mutual_authentication() {
        let files = testdata::StoreFiles::new().unwrap();
        let server = server_context(&files);
        let client = context(two_way(files.client_identity(), files.truststore()));
        let (c, s) = pair(
            client.client_config().unwrap(),
            server.server_config().unwrap(),
            "localhost",
        );
        assert!(talk(c, s).await.is_some());
    }

    #[tokio::test]
    async fn client_refuses_unknown_issuer() {
        let files = testdata::StoreFiles::new().unwrap();
        let server = server_context(&files);
        let client = context(two_way(files.client_identity(), files.other_truststore()));
        let (c, s) = pair(
            client.client_config().unwrap(),
            server.server_config().unwrap(),
            "localhost",
        );
        client_refuses(c, s).await;
    }

    #[tokio::test]
    async fn server_refuses_unknown_client() {
        let files = testdata::StoreFiles::new().unwrap();
        let server = server_context(&files);
        let client = context(two_way(files.stranger_identity(), files.truststore()));
        let (c, s) = pair(
            client.client_config().unwrap(),
            server.server_config().unwrap(),
            "localhost",
        );
        server_refuses(c, s).await;
    }

    #[tokio::test]
    async fn hostname_verification() {
        let files = testdata::StoreFiles::new().unwrap();
        let server = server_context(&files);
        let client = context(two_way(files.client_identity(), files.truststore()));
        let (c, s) = pair(
            client.client_config().unwrap(),
            server.server_config().unwrap(),
            "example.com",
        );
        client_refuses(c, s).await;

        let client = context(
            two_way(files.client_identity(), files.truststore())
                .with_hostname_verifier_enabled(false),
        );
        let (c, s) = pair(
            client.client_config().unwrap(),
            server.server_config().unwrap(),
            "example.com",
        );
        assert!(talk(c, s).await.is_some());
    }

    #[tokio::test]
    async fn one_way_client() {
        let files = testdata::StoreFiles::new().unwrap();
        let client = context(
            builder()
                .with_one_way_authentication(files.truststore(), testdata::PASSWORD)
                .unwrap(),
        );
        let sc = ServerConfig::builder_with_provider(testdata::provider())
            .with_safe_default_protocol_versions()
            .unwrap()
            .with_no_client_auth()
            .with_single_cert(
                testdata::certs(testdata::SERVER_CERT),
                rustls_pemfile::private_key(&mut Cursor::new(testdata::SERVER_KEY))
                    .unwrap()
                    .unwrap(),
            )
            .unwrap();
        let (c, s) = pair(client.client_config().unwrap(), sc, "localhost");
        assert!(talk(c, s).await.is_some());
    }

    #[tokio::test]
    async fn protocol_pinned() {
        let files = testdata::StoreFiles::new().unwrap();
        let server = server_context(&files);
        for (token, version) in [
            ("TLSv1.2", ProtocolVersion::TLSv1_2),
            ("TLSv1.3", ProtocolVersion::TLSv1_3),
        ] {
            let client = context(
                two_way(files.client_identity(), files.truststore()).with_protocol(token),
            );
            let cc = client.client_config().unwrap();
            let (c, s) = pair(cc, server.server_config().unwrap(), "localhost");
            assert_eq!(talk(c, s).await, Some(version));
        }
    }

    #[test]
    fn unsupported_protocol() {
        let files = testdata::StoreFiles::new().unwrap();
        let config = builder()
            .with_one_way_authentication(files.truststore(), testdata::PASSWORD)
            .unwrap()
            .with_protocol("SSLv3")
            .build()
            .unwrap();
        let err = SecureContext::new(config).unwrap_err();
        assert_eq!(err.to_string(), "unsupported TLS protocol: SSLv3");
    }

    #[test]
    fn security_disabled() {
        let config = builder().without_security().build().unwrap();
        assert!(matches!(
            SecureContext::new(config),
            Err(ContextError::SecurityDisabled)
        ));
    }

    #[test]
    fn server_needs_identity() {
        let files = testdata::StoreFiles::new().unwrap();
        let ctx = context(
            builder()
                .with_one_way_authentication(files.truststore(), testdata::PASSWORD)
                .unwrap(),
        );
        assert!(ctx.config().is_one_way_authentication_enabled());
        assert!(matches!(
            ctx.server_config(),
            Err(ContextError::Unavailable(UnavailableError::KeyManager))
        ));
    }

    #[test]
    fn client_prefers_alias() {
        let files = testdata::StoreFiles::new().unwrap();
        let ctx = server_context(&files);
        let cc = ctx.client_config_with_alias(Some("localhost")).unwrap();
        assert!(cc.client_auth_cert_resolver.has_certs());
    }
}
