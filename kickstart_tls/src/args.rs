//! Command line flags for [`crate::SecureContextBuilder::from_args`].
//!
//! # Command line flags
//!
//! | Flag                         | Default | Meaning                 |
//! |------------------------------|---------|-------------------------|
//! | `--truststore`               | None    | Store of trusted certificates for verifying peers |
//! | `--truststore-password`      | None    | Password for `--truststore`, also `$KICKSTART_TRUSTSTORE_PASSWORD` |
//! | `--keystore`                 | None    | Store with our private key and certificate chain, for mutual authentication |
//! | `--keystore-password`        | None    | Password for `--keystore`, also `$KICKSTART_KEYSTORE_PASSWORD` |
//! | `--tls-protocol`             | `TLS`   | `TLSv1.2`, `TLSv1.3` or `TLS` for both |
//! | `--no-hostname-verification` | false   | Accept server certificates issued for any name |
//! | `--without-security`         | false   | Do not use TLS |
//! | `--crypto-provider`          | None    | Name of the rustls crypto provider to use |

use kickstart_traits::store::StorePassword;
use std::path::PathBuf;

/// Command line arguments for building a secure context.
#[derive(clap::Args, Debug)]
#[group(id = "kickstart_tls_args")]
pub struct Args {
    #[arg(
        long,
        help = "Path to the store of trusted certificates for verifying peers, in PEM format."
    )]
    pub(crate) truststore: Option<PathBuf>,

    #[arg(
        long,
        env = "KICKSTART_TRUSTSTORE_PASSWORD",
        hide_env_values = true,
        help = "Password for --truststore."
    )]
    pub(crate) truststore_password: Option<StorePassword>,

    #[arg(
        long,
        help = "Path to the store holding the local private key and certificate chain, in PEM format. Enables mutual authentication."
    )]
    pub(crate) keystore: Option<PathBuf>,

    #[arg(
        long,
        env = "KICKSTART_KEYSTORE_PASSWORD",
        hide_env_values = true,
        help = "Password for --keystore."
    )]
    pub(crate) keystore_password: Option<StorePassword>,

    #[arg(
        long,
        default_value = crate::builder::DEFAULT_PROTOCOL,
        help = "TLS protocol version: TLSv1.2, TLSv1.3 or TLS for either."
    )]
    pub(crate) tls_protocol: String,

    #[arg(long, help = "Do not check that server certificates match the server name.")]
    pub(crate) no_hostname_verification: bool,

    #[arg(long, help = "Disable TLS entirely.")]
    pub(crate) without_security: bool,

    #[arg(long, help = "Name of the rustls crypto provider to use.")]
    pub(crate) crypto_provider: Option<String>,
}
