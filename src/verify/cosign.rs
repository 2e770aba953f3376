//! ECDSA (cosign-style) signature verification.
//!
//! The public key arrives as a PEM `PUBLIC KEY` block (PKIX) or a PEM
//! certificate carrying an ECDSA key, either raw or base64-wrapped as
//! cosign publishes them. The signature is base64 or raw bytes holding
//! the `r` and `s` scalars as two equal halves. Keyless releases carry
//! both pieces in a JSON bundle next to the checksum manifest.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use p256::ecdsa::{Signature, VerifyingKey};
use p256::pkcs8::DecodePublicKey;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{trace, warn};

use super::VerifyError;

/// Verifier material carried inline by a keyless signature file.
#[derive(Debug, Deserialize)]
pub struct Bundle {
    #[serde(rename = "certificate")]
    pub certificate: String,
    #[serde(rename = "signature")]
    pub signature: String,
}

/// Verify `content` against the signature, returning `false` when
/// verification was skipped (keyless signature without a bundle).
pub fn verify(
    key_data: Option<&[u8]>,
    signature_data: &[u8],
    content: &[u8],
) -> Result<bool, VerifyError> {
    let (key_material, signature_material): (Vec<u8>, Vec<u8>) = match key_data {
        Some(key) => (key.to_vec(), signature_data.to_vec()),
        None => {
            // No key asset: the signature file may be a keyless bundle.
            let Ok(bundle) = serde_json::from_slice::<Bundle>(signature_data) else {
                warn!("skipping signature verification (no key)");
                return Ok(false);
            };
            (
                bundle.certificate.into_bytes(),
                bundle.signature.into_bytes(),
            )
        }
    };

    let public_key = parse_public_key(&decode_base64_or_raw(&key_material))?;
    let signature = decode_signature(&decode_base64_or_raw(&signature_material))?;

    let digest = Sha256::digest(content);
    trace!(hash = %hex::encode(&digest), "verifying ecdsa signature over content hash");

    public_key
        .verify_prehash(digest.as_slice(), &signature)
        .map_err(|e| VerifyError::SignatureInvalid(e.to_string()))?;

    Ok(true)
}

/// cosign publishes `.pub`/`.pem` files base64-wrapped; fall back to the
/// raw bytes when they do not decode.
fn decode_base64_or_raw(data: &[u8]) -> Vec<u8> {
    let trimmed: Vec<u8> = data
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    match BASE64.decode(&trimmed) {
        Ok(decoded) => decoded,
        Err(_) => data.to_vec(),
    }
}

/// Parse PEM key material: a `PUBLIC KEY` block or a certificate whose
/// subject key is ECDSA P-256.
pub fn parse_public_key(pem_data: &[u8]) -> Result<VerifyingKey, VerifyError> {
    let text = std::str::from_utf8(pem_data)
        .map_err(|_| VerifyError::SignatureInvalid("key material is not valid PEM".into()))?;

    if text.contains("-----BEGIN PUBLIC KEY-----") {
        return VerifyingKey::from_public_key_pem(text)
            .map_err(|e| VerifyError::SignatureInvalid(format!("not an ECDSA public key: {e}")));
    }

    if text.contains("-----BEGIN CERTIFICATE-----") {
        let (_, pem) = x509_parser::pem::parse_x509_pem(pem_data)
            .map_err(|e| VerifyError::SignatureInvalid(format!("bad certificate PEM: {e}")))?;
        let cert = pem
            .parse_x509()
            .map_err(|e| VerifyError::SignatureInvalid(format!("bad certificate: {e}")))?;
        return VerifyingKey::from_public_key_der(cert.public_key().raw)
            .map_err(|e| VerifyError::SignatureInvalid(format!("not an ECDSA public key: {e}")));
    }

    Err(VerifyError::SignatureInvalid(
        "failed to decode PEM block containing public key or certificate".into(),
    ))
}

/// Split raw signature bytes into the `(r, s)` scalar pair.
fn decode_signature(sig: &[u8]) -> Result<Signature, VerifyError> {
    if sig.is_empty() || sig.len() % 2 != 0 {
        return Err(VerifyError::SignatureInvalid(
            "signature has odd length".into(),
        ));
    }
    let (r, s) = sig.split_at(sig.len() / 2);
    let r = left_pad_scalar(r)?;
    let s = left_pad_scalar(s)?;
    Signature::from_scalars(p256::FieldBytes::from(r), p256::FieldBytes::from(s))
        .map_err(|e| VerifyError::SignatureInvalid(format!("bad signature scalars: {e}")))
}

/// Normalize a big-endian scalar to exactly 32 bytes.
fn left_pad_scalar(bytes: &[u8]) -> Result<[u8; 32], VerifyError> {
    let trimmed: &[u8] = {
        let mut b = bytes;
        while b.len() > 32 && b[0] == 0 {
            b = &b[1..];
        }
        b
    };
    if trimmed.len() > 32 {
        return Err(VerifyError::SignatureInvalid(
            "signature scalar out of range".into(),
        ));
    }
    let mut out = [0u8; 32];
    out[32 - trimmed.len()..].copy_from_slice(trimmed);
    Ok(out)
}
