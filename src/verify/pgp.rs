//! OpenPGP detached signature verification.
//!
//! Keys and signatures both arrive ASCII-armored. Signing subkeys are
//! common for release keys, so verification tries the primary key first and
//! falls back to each subkey.

use std::fs;
use std::path::Path;

use pgp::types::KeyTrait;
use pgp::{Deserializable, SignedPublicKey, StandaloneSignature};
use tracing::trace;

use super::VerifyError;

/// Verify an armored detached signature over `content`.
pub fn verify_detached(
    key_path: &Path,
    signature_path: &Path,
    content: &[u8],
) -> Result<(), VerifyError> {
    let key_text = fs::read_to_string(key_path)?;
    let (public_key, _) = SignedPublicKey::from_string(&key_text)
        .map_err(|e| VerifyError::SignatureInvalid(format!("failed to parse public key: {e}")))?;

    let signature_text = fs::read_to_string(signature_path)?;
    let (signature, _) = StandaloneSignature::from_string(&signature_text)
        .map_err(|e| VerifyError::SignatureInvalid(format!("failed to parse signature: {e}")))?;

    if signature.verify(&public_key, content).is_ok() {
        return Ok(());
    }

    for subkey in &public_key.public_subkeys {
        trace!(key_id = ?subkey.key_id(), "trying signing subkey");
        if signature.verify(subkey, content).is_ok() {
            return Ok(());
        }
    }

    Err(VerifyError::SignatureInvalid(
        "signature verification failed".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content).unwrap();
        f
    }

    #[test]
    fn malformed_key_is_rejected() {
        let key = write_temp(b"not a key");
        let sig = write_temp(b"not a signature");
        let err = verify_detached(key.path(), sig.path(), b"content").unwrap_err();
        assert!(matches!(err, VerifyError::SignatureInvalid(_)));
    }

    #[test]
    fn malformed_signature_is_rejected() {
        // A structurally valid but unusable armor block still fails cleanly.
        let key = write_temp(
            b"-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nAAAA\n-----END PGP PUBLIC KEY BLOCK-----\n",
        );
        let sig = write_temp(b"garbage");
        let err = verify_detached(key.path(), sig.path(), b"content").unwrap_err();
        assert!(matches!(err, VerifyError::SignatureInvalid(_)));
    }
}
