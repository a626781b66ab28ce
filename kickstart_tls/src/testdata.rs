use rustls::crypto::CryptoProvider;
use rustls_pki_types::{CertificateDer, UnixTime};
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const CACERT: &[u8] = include_bytes!("../testdata/cacert.pem");
pub(crate) const OTHER_CACERT: &[u8] = include_bytes!("../testdata/other_cacert.pem");
pub(crate) const SERVER_CERT: &[u8] = include_bytes!("../testdata/server.pem");
pub(crate) const SERVER_KEY: &[u8] = include_bytes!("../testdata/server.key");
pub(crate) const CLIENT_CERT: &[u8] = include_bytes!("../testdata/client.pem");
pub(crate) const CLIENT_KEY: &[u8] = include_bytes!("../testdata/client.key");
pub(crate) const STRANGER_CERT: &[u8] = include_bytes!("../testdata/stranger.pem");
pub(crate) const STRANGER_KEY: &[u8] = include_bytes!("../testdata/stranger.key");

pub(crate) const PASSWORD: &str = "changeit";

pub(crate) fn certs(pem: &[u8]) -> Vec<CertificateDer<'static>> {
    rustls_pemfile::certs(&mut Cursor::new(pem))
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

pub(crate) fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::aws_lc_rs::default_provider())
}

pub(crate) fn now() -> UnixTime {
    UnixTime::since_unix_epoch(Duration::from_secs(1727733659))
}

pub(crate) fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

/// Stores written to a temporary directory.
pub(crate) struct StoreFiles {
    pub(crate) dir: tempfile::TempDir,
}

impl StoreFiles {
    pub(crate) fn new() -> std::io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let p = dir.path();
        std::fs::write(p.join("truststore.pem"), CACERT)?;
        std::fs::write(p.join("other-truststore.pem"), OTHER_CACERT)?;
        std::fs::write(p.join("identity.pem"), concat(&[SERVER_KEY, SERVER_CERT]))?;
        std::fs::write(
            p.join("client-identity.pem"),
            concat(&[CLIENT_KEY, CLIENT_CERT]),
        )?;
        std::fs::write(
            p.join("stranger-identity.pem"),
            concat(&[STRANGER_KEY, STRANGER_CERT]),
        )?;
        std::fs::write(p.join("garbage.pem"), "this is not a store\n")?;
        Ok(Self { dir })
    }

    pub(crate) fn truststore(&self) -> PathBuf {
        self.dir.path().join("truststore.pem")
    }

    pub(crate) fn other_truststore(&self) -> PathBuf {
        self.dir.path().join("other-truststore.pem")
    }

    pub(crate) fn identity(&self) -> PathBuf {
        self.dir.path().join("identity.pem")
    }

    pub(crate) fn client_identity(&self) -> PathBuf {
        self.dir.path().join("client-identity.pem")
    }

    pub(crate) fn stranger_identity(&self) -> PathBuf {
        self.dir.path().join("stranger-identity.pem")
    }

    pub(crate) fn garbage(&self) -> PathBuf {
        self.dir.path().join("garbage.pem")
    }

    pub(crate) fn missing(&self) -> PathBuf {
        self.dir.path().join("does-not-exist.pem")
    }
}
