//! Resource kinds served by a vault

use std::borrow::Cow;

use secrecy::{ExposeSecret, SecretString};

use crate::model::{CertificateImport, CertificateRecord, JsonWebKey, KeyRecord, SecretRecord};

/// Payload of a write, fingerprinted before it is sent.
pub trait WriteValue: Send + Sync {
    /// Bytes the content fingerprint is computed over
    fn fingerprint_bytes(&self) -> Cow<'_, [u8]>;
}

impl WriteValue for SecretString {
    fn fingerprint_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(self.expose_secret().as_bytes())
    }
}

impl WriteValue for JsonWebKey {
    fn fingerprint_bytes(&self) -> Cow<'_, [u8]> {
        // Field order is fixed by the struct, so the encoding is stable.
        Cow::Owned(serde_json::to_vec(self).unwrap_or_default())
    }
}

impl WriteValue for CertificateImport {
    fn fingerprint_bytes(&self) -> Cow<'_, [u8]> {
        Cow::Borrowed(&self.certificate)
    }
}

/// Secret, key or certificate.
pub trait ResourceKind: Send + Sync + 'static {
    /// Used in log fields, metric labels and error messages
    const NAME: &'static str;

    type Value: WriteValue + 'static;
    type Record: Send + Sync + 'static;
}

pub struct Secrets;

pub struct Keys;

pub struct Certificates;

impl ResourceKind for Secrets {
    const NAME: &'static str = "secret";
    type Value = SecretString;
    type Record = SecretRecord;
}

impl ResourceKind for Keys {
    const NAME: &'static str = "key";
    type Value = JsonWebKey;
    type Record = KeyRecord;
}

impl ResourceKind for Certificates {
    const NAME: &'static str = "certificate";
    type Value = CertificateImport;
    type Record = CertificateRecord;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secret_fingerprint_bytes_are_the_value() {
        let secret = SecretString::new("hunter2".to_string());
        assert_eq!(secret.fingerprint_bytes().as_ref(), b"hunter2");
    }

    #[test]
    fn test_key_fingerprint_bytes_are_stable() {
        let key = JsonWebKey {
            kty: "RSA".to_string(),
            n: Some(vec![1, 2, 3]),
            e: Some(vec![1, 0, 1]),
            ..Default::default()
        };
        let copy = key.clone();
        assert_eq!(key.fingerprint_bytes(), copy.fingerprint_bytes());
        assert!(!key.fingerprint_bytes().is_empty());
    }
}
