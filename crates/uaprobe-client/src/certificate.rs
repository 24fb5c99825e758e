// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Client application certificate.
//!
//! The certificate is loaded once and handed to the secured channel open
//! request. Its contents are not validated here; trust decisions belong to
//! the server.
//!
//! Accepted file formats:
//!
//! ```text
//! DER  - raw bytes
//! PEM  - base64 between -----BEGIN CERTIFICATE----- / -----END CERTIFICATE-----
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use sha2::{Digest, Sha256};

use crate::error::{ConfigurationError, ProbeError, ProbeResult};

const PEM_BEGIN: &str = "-----BEGIN CERTIFICATE-----";
const PEM_END: &str = "-----END CERTIFICATE-----";

/// Where a certificate came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertificateSource {
    /// Loaded from a file.
    File(PathBuf),
    /// Supplied as bytes.
    Memory,
    /// Derived locally from the application URI.
    SelfIssued,
}

/// A client certificate in DER form.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCertificate {
    der: Vec<u8>,
    source: CertificateSource,
}

impl ClientCertificate {
    /// Loads a DER or PEM certificate from disk.
    pub fn from_file(path: impl AsRef<Path>) -> ProbeResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();

        let raw = std::fs::read(path).map_err(|e| {
            ProbeError::configuration(ConfigurationError::certificate(&display, e.to_string()))
        })?;

        let der = match std::str::from_utf8(&raw) {
            Ok(text) if text.contains(PEM_BEGIN) => decode_pem(text).map_err(|reason| {
                ProbeError::configuration(ConfigurationError::certificate(&display, reason))
            })?,
            _ => raw,
        };

        if der.is_empty() {
            return Err(ProbeError::configuration(ConfigurationError::certificate(
                display,
                "file is empty",
            )));
        }

        let cert = Self {
            der,
            source: CertificateSource::File(path.to_path_buf()),
        };
        tracing::debug!(
            path = %path.display(),
            thumbprint = %cert.thumbprint(),
            "Loaded client certificate"
        );
        Ok(cert)
    }

    /// Wraps DER bytes.
    pub fn from_der(der: impl Into<Vec<u8>>) -> Self {
        Self {
            der: der.into(),
            source: CertificateSource::Memory,
        }
    }

    /// Derives a placeholder identity from the application URI.
    ///
    /// Used when no certificate file is configured so secured endpoints of
    /// test servers can still be exercised.
    pub fn self_issued(application_uri: &str) -> Self {
        let mut der = b"uaprobe-self-issued:".to_vec();
        der.extend_from_slice(application_uri.as_bytes());
        Self {
            der,
            source: CertificateSource::SelfIssued,
        }
    }

    /// Returns the DER bytes.
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Returns where the certificate came from.
    pub fn source(&self) -> &CertificateSource {
        &self.source
    }

    /// Returns `true` if derived locally.
    pub fn is_self_issued(&self) -> bool {
        matches!(self.source, CertificateSource::SelfIssued)
    }

    /// SHA-256 thumbprint as lowercase hex.
    pub fn thumbprint(&self) -> String {
        hex::encode(Sha256::digest(&self.der))
    }

    /// Base64 of the DER bytes, as carried on the wire.
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.der)
    }
}

impl fmt::Debug for ClientCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCertificate")
            .field("thumbprint", &self.thumbprint())
            .field("source", &self.source)
            .field("len", &self.der.len())
            .finish()
    }
}

fn decode_pem(text: &str) -> Result<Vec<u8>, String> {
    let start = text
        .find(PEM_BEGIN)
        .ok_or_else(|| "missing BEGIN marker".to_string())?
        + PEM_BEGIN.len();
    let end = text[start..]
        .find(PEM_END)
        .ok_or_else(|| "missing END marker".to_string())?
        + start;

    let body: String = text[start..end]
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    BASE64
        .decode(body)
        .map_err(|e| format!("invalid PEM body: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_der() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0x30, 0x82, 0x01, 0x0a]).unwrap();

        let cert = ClientCertificate::from_file(file.path()).unwrap();
        assert_eq!(cert.der(), &[0x30, 0x82, 0x01, 0x0a]);
        assert!(matches!(cert.source(), CertificateSource::File(_)));
    }

    #[test]
    fn test_load_pem() {
        let der = vec![0x30u8, 0x03, 0x02, 0x01, 0x05];
        let pem = format!(
            "{}\n{}\n{}\n",
            PEM_BEGIN,
            BASE64.encode(&der),
            PEM_END
        );
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(pem.as_bytes()).unwrap();

        let cert = ClientCertificate::from_file(file.path()).unwrap();
        assert_eq!(cert.der(), der.as_slice());
        assert_eq!(cert.to_base64(), BASE64.encode(&der));
    }

    #[test]
    fn test_load_errors() {
        let err = ClientCertificate::from_file("/nonexistent/client.der").unwrap_err();
        assert!(matches!(
            err,
            ProbeError::Configuration(ConfigurationError::Certificate { .. })
        ));

        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(ClientCertificate::from_file(file.path()).is_err());

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(PEM_BEGIN.as_bytes()).unwrap();
        assert!(ClientCertificate::from_file(file.path()).is_err());
    }

    #[test]
    fn test_thumbprint() {
        let cert = ClientCertificate::from_der(b"abc".to_vec());
        assert_eq!(
            cert.thumbprint(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert!(format!("{:?}", cert).contains("ba7816bf"));
    }

    #[test]
    fn test_self_issued() {
        let cert = ClientCertificate::self_issued("urn:uaprobe:probe");
        assert!(cert.is_self_issued());
        assert!(!cert.der().is_empty());
    }
}
