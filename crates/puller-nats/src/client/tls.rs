//! Mutual TLS material loading and validation.

use std::path::{Path, PathBuf};

use crate::{Error, Result, TRACING_TARGET_CLIENT};

/// Validated paths to the three PEM files used for mutual TLS.
///
/// The files are parsed once up front so that malformed material is reported
/// as a TLS failure instead of surfacing later as an opaque connection error.
#[derive(Debug, Clone)]
pub struct TlsMaterial {
    ca: PathBuf,
    key: PathBuf,
    cert: PathBuf,
}

impl TlsMaterial {
    /// Loads and validates the CA bundle, client key, and client certificate.
    #[tracing::instrument(target = TRACING_TARGET_CLIENT, skip_all)]
    pub async fn load(
        ca: impl AsRef<Path>,
        key: impl AsRef<Path>,
        cert: impl AsRef<Path>,
    ) -> Result<Self> {
        let (ca, key, cert) = (ca.as_ref(), key.as_ref(), cert.as_ref());

        let cert_count = count_certificates(cert, &read_pem(cert).await?)?;
        let has_key = rustls_pemfile::private_key(&mut read_pem(key).await?.as_slice())
            .map_err(|e| Error::tls(key, e.to_string()))?
            .is_some();
        if !has_key {
            return Err(Error::tls(key, "no private key found"));
        }
        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            cert = %cert.display(),
            key = %key.display(),
            chain_len = cert_count,
            "Loaded client certificate and key"
        );

        let ca_count = count_certificates(ca, &read_pem(ca).await?)?;
        tracing::info!(
            target: TRACING_TARGET_CLIENT,
            ca = %ca.display(),
            roots = ca_count,
            "Loaded CA bundle"
        );

        Ok(Self {
            ca: ca.to_path_buf(),
            key: key.to_path_buf(),
            cert: cert.to_path_buf(),
        })
    }

    /// Returns the CA bundle path.
    #[inline]
    pub fn ca(&self) -> &Path {
        &self.ca
    }

    /// Returns the client private key path.
    #[inline]
    pub fn key(&self) -> &Path {
        &self.key
    }

    /// Returns the client certificate path.
    #[inline]
    pub fn cert(&self) -> &Path {
        &self.cert
    }
}

async fn read_pem(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .map_err(|e| Error::tls(path, e.to_string()))
}

fn count_certificates(path: &Path, pem: &[u8]) -> Result<usize> {
    let mut reader = pem;
    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::tls(path, e.to_string()))?;

    if certs.is_empty() {
        return Err(Error::tls(path, "no certificates found"));
    }
    Ok(certs.len())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn pem_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_missing_file_is_tls_error() {
        let err = TlsMaterial::load("/nonexistent/ca.pem", "/nonexistent/k", "/nonexistent/c")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Tls { .. }));
    }

    #[tokio::test]
    async fn test_file_without_certificates_is_rejected() {
        let empty = pem_file("not a pem file\n");
        let err = TlsMaterial::load(empty.path(), empty.path(), empty.path())
            .await
            .unwrap_err();

        match err {
            Error::Tls { path, reason } => {
                assert_eq!(path, empty.path());
                assert_eq!(reason, "no certificates found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_count_certificates_rejects_empty_bundle() {
        let result = count_certificates(Path::new("ca.pem"), b"");
        assert!(result.is_err());
    }
}
