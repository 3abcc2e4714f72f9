//! Certificate authority bundles
//!
//! Bundles are kept as raw PEM bytes. Kubeconfigs and login plugin flags carry
//! them base64-encoded.

use std::fmt;
use std::path::PathBuf;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{Error, Result};

const CERTIFICATE_TAG: &str = "CERTIFICATE";

/// PEM-encoded certificate authority bundle
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CaBundle(Vec<u8>);

impl CaBundle {
    pub fn new(pem: impl Into<Vec<u8>>) -> Self {
        Self(pem.into())
    }

    /// Decode a base64 bundle as found in kubeconfigs and Concierge objects.
    pub fn from_base64(data: &str) -> std::result::Result<Self, base64::DecodeError> {
        STANDARD.decode(data.trim()).map(Self)
    }

    /// Load and concatenate bundles from repeatable `--*-ca-bundle` flags.
    ///
    /// Each file must contain at least one PEM certificate.
    pub fn from_files(paths: &[PathBuf]) -> Result<Option<Self>> {
        if paths.is_empty() {
            return Ok(None);
        }

        let mut pem = Vec::new();
        for path in paths {
            let contents = std::fs::read(path).map_err(|e| {
                Error::input(format!(
                    "could not read CA bundle path {}: {}",
                    path.display(),
                    e
                ))
            })?;
            if Self::new(contents.clone()).count() == 0 {
                return Err(Error::input(format!(
                    "failed to load any CA certificates from {}",
                    path.display()
                )));
            }
            if !pem.is_empty() && !pem.ends_with(b"\n") {
                pem.push(b'\n');
            }
            pem.extend_from_slice(&contents);
        }
        Ok(Some(Self(pem)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Parse every `CERTIFICATE` block in the bundle.
    ///
    /// Other PEM blocks are ignored. A bundle that is not valid PEM yields no
    /// certificates.
    pub fn certificates(&self) -> Vec<reqwest::Certificate> {
        let Ok(blocks) = pem::parse_many(&self.0) else {
            return Vec::new();
        };
        blocks
            .iter()
            .filter(|block| block.tag() == CERTIFICATE_TAG)
            .filter_map(|block| reqwest::Certificate::from_der(block.contents()).ok())
            .collect()
    }

    /// Number of certificates in the bundle.
    pub fn count(&self) -> usize {
        self.certificates().len()
    }
}

impl fmt::Debug for CaBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaBundle")
            .field("bytes", &self.0.len())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A freshly generated self-signed certificate in PEM form.
    pub(crate) fn test_ca_pem() -> String {
        rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .unwrap()
            .cert
            .pem()
    }

    #[test]
    fn counts_certificates() {
        let bundle = CaBundle::new(format!("{}\n{}", test_ca_pem(), test_ca_pem()));
        assert_eq!(bundle.count(), 2);
    }

    #[test]
    fn ignores_non_certificate_blocks() {
        let key = rcgen::generate_simple_self_signed(vec!["localhost".to_string()])
            .unwrap()
            .signing_key
            .serialize_pem();
        let bundle = CaBundle::new(format!("{}\n{}", key, test_ca_pem()));
        assert_eq!(bundle.count(), 1);
        assert_eq!(CaBundle::new(key).count(), 0);
    }

    #[test]
    fn garbage_has_no_certificates() {
        assert_eq!(CaBundle::new("not a certificate").count(), 0);
        assert_eq!(CaBundle::new(vec![0u8, 0, 0]).count(), 0);
        assert_eq!(CaBundle::default().count(), 0);
    }

    #[test]
    fn base64_roundtrip_preserves_bytes() {
        let pem = test_ca_pem();
        let bundle = CaBundle::new(pem.clone());
        let decoded = CaBundle::from_base64(&bundle.to_base64()).unwrap();
        assert_eq!(decoded.as_bytes(), pem.as_bytes());
    }

    #[test]
    fn invalid_base64_is_an_error() {
        assert!(CaBundle::from_base64("not base64!!").is_err());
    }

    #[test]
    fn loads_and_concatenates_files() {
        let dir = std::env::temp_dir().join(format!("kestrel-ca-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let first = dir.join("first.pem");
        let second = dir.join("second.pem");
        std::fs::write(&first, test_ca_pem()).unwrap();
        std::fs::write(&second, test_ca_pem()).unwrap();

        let bundle = CaBundle::from_files(&[first, second]).unwrap().unwrap();
        assert_eq!(bundle.count(), 2);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_file_without_certificates() {
        let path = std::env::temp_dir().join(format!("kestrel-bad-ca-{}.pem", std::process::id()));
        std::fs::write(&path, "hello").unwrap();

        let err = CaBundle::from_files(std::slice::from_ref(&path)).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("failed to load any CA certificates from"));

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn no_paths_means_no_bundle() {
        assert!(CaBundle::from_files(&[]).unwrap().is_none());
    }
}
