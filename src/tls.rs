//! TLS identity loading.
//!
//! Turns certificate and private key PEM files into a
//! [`TlsAcceptor`](tokio_rustls::TlsAcceptor) at server construction time.
//! Invalid material fails `build()`; it never surfaces mid-connection.

// ============================================================================
// Imports
// ============================================================================

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use tokio_rustls::TlsAcceptor;
use tokio_rustls::rustls::ServerConfig as RustlsServerConfig;
use tokio_rustls::rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use crate::error::{Error, Result};

// ============================================================================
// Acceptor Loading
// ============================================================================

/// Loads a TLS acceptor from certificate chain and private key PEM files.
///
/// # Errors
///
/// Returns [`Error::Tls`] if either file cannot be read, contains no
/// usable material, or the pair is rejected by rustls.
pub(crate) fn load_acceptor(cert_path: &Path, key_path: &Path) -> Result<TlsAcceptor> {
    let certs = load_certs(cert_path)?;
    let key = load_private_key(key_path)?;

    let config = RustlsServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(|e| Error::tls(format!("invalid certificate/key pair: {e}")))?;

    debug!(
        cert = %cert_path.display(),
        key = %key_path.display(),
        "TLS identity loaded"
    );

    Ok(TlsAcceptor::from(Arc::new(config)))
}

/// Reads the certificate chain from a PEM file.
fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(path)
        .map_err(|e| Error::tls(format!("reading certificate {}: {e}", path.display())))?;

    let certs: Vec<_> = rustls_pemfile::certs(&mut BufReader::new(file))
        .collect::<std::io::Result<_>>()
        .map_err(|e| Error::tls(format!("parsing certificate {}: {e}", path.display())))?;

    if certs.is_empty() {
        return Err(Error::tls(format!(
            "no certificates found in {}",
            path.display()
        )));
    }

    Ok(certs)
}

/// Reads the private key from a PEM file.
fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(path)
        .map_err(|e| Error::tls(format!("reading private key {}: {e}", path.display())))?;

    rustls_pemfile::private_key(&mut BufReader::new(file))
        .map_err(|e| Error::tls(format!("parsing private key {}: {e}", path.display())))?
        .ok_or_else(|| Error::tls(format!("no private key found in {}", path.display())))
}

// ============================================================================
// Test Fixtures
// ============================================================================

/// Writes a freshly generated self-signed identity to temp PEM files.
#[cfg(test)]
pub(crate) fn self_signed_identity() -> (tempfile::NamedTempFile, tempfile::NamedTempFile) {
    use std::io::Write;

    let cert = rcgen::generate_simple_self_signed(vec!["localhost".into()])
        .expect("certificate generation");

    let mut cert_file = tempfile::NamedTempFile::new().expect("cert temp file");
    cert_file
        .write_all(cert.cert.pem().as_bytes())
        .expect("write cert");

    let mut key_file = tempfile::NamedTempFile::new().expect("key temp file");
    key_file
        .write_all(cert.key_pair.serialize_pem().as_bytes())
        .expect("write key");

    (cert_file, key_file)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    use tempfile::NamedTempFile;

    #[test]
    fn test_load_valid_identity() {
        let (cert_file, key_file) = self_signed_identity();
        let acceptor = load_acceptor(cert_file.path(), key_file.path());
        assert!(acceptor.is_ok());
    }

    #[test]
    fn test_missing_cert_file_fails() {
        let (_, key_file) = self_signed_identity();
        let result = load_acceptor(Path::new("/nonexistent/cert.pem"), key_file.path());
        assert!(matches!(result, Err(Error::Tls { .. })));
    }

    #[test]
    fn test_garbage_cert_fails() {
        let mut cert_file = NamedTempFile::new().expect("cert temp file");
        cert_file
            .write_all(b"not a certificate")
            .expect("write garbage");
        let (_, key_file) = self_signed_identity();

        let result = load_acceptor(cert_file.path(), key_file.path());
        assert!(matches!(result, Err(Error::Tls { .. })));
    }

    #[test]
    fn test_key_without_material_fails() {
        let (cert_file, _) = self_signed_identity();
        let key_file = NamedTempFile::new().expect("key temp file");

        let result = load_acceptor(cert_file.path(), key_file.path());
        assert!(matches!(result, Err(Error::Tls { .. })));
    }
}
