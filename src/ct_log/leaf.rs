// src/ct_log/leaf.rs
//! Decoding of RFC 6962 `MerkleTreeLeaf` structures into [`RawEntry`].
//!
//! Layout of a v1 timestamped leaf:
//!
//! ```text
//! version(1) leaf_type(1) timestamp(8) entry_type(2) signed_entry(..)
//! ```
//!
//! `x509_entry` carries a 3-byte length followed by the DER certificate.
//! `precert_entry` carries a 32-byte issuer key hash, then a 3-byte length
//! and the TBSCertificate.

use base64::Engine;

use super::types::{LogEntry, RawEntry};

const VERSION_V1: u8 = 0;
const LEAF_TYPE_TIMESTAMPED_ENTRY: u8 = 0;
pub const ENTRY_TYPE_X509: u16 = 0;
pub const ENTRY_TYPE_PRECERT: u16 = 1;

const HEADER_LEN: usize = 12;
const ISSUER_KEY_HASH_LEN: usize = 32;

/// Decode a get-entries item. Undecodable leaves become `RawEntry::Unknown`
/// so one bad leaf never fails the whole batch.
pub fn decode_entry(entry: &LogEntry) -> RawEntry {
    match base64::engine::general_purpose::STANDARD.decode(&entry.leaf_input) {
        Ok(bytes) => decode_leaf(&bytes),
        Err(_) => RawEntry::Unknown { entry_type: None },
    }
}

pub fn decode_leaf(bytes: &[u8]) -> RawEntry {
    if bytes.len() < HEADER_LEN
        || bytes[0] != VERSION_V1
        || bytes[1] != LEAF_TYPE_TIMESTAMPED_ENTRY
    {
        return RawEntry::Unknown { entry_type: None };
    }

    let mut ts = [0u8; 8];
    ts.copy_from_slice(&bytes[2..10]);
    let timestamp = Some(u64::from_be_bytes(ts));
    let entry_type = u16::from_be_bytes([bytes[10], bytes[11]]);
    let body = &bytes[HEADER_LEN..];

    match entry_type {
        ENTRY_TYPE_X509 => RawEntry::X509 {
            cert_der: read_u24_prefixed(body).to_vec(),
            timestamp,
        },
        ENTRY_TYPE_PRECERT => {
            let tbs = body.get(ISSUER_KEY_HASH_LEN..).map(read_u24_prefixed).unwrap_or(&[]);
            RawEntry::Precert {
                tbs_der: tbs.to_vec(),
                timestamp,
            }
        }
        other => RawEntry::Unknown {
            entry_type: Some(other),
        },
    }
}

/// Truncated input yields whatever bytes are present; the certificate
/// parser reports the damage.
fn read_u24_prefixed(body: &[u8]) -> &[u8] {
    if body.len() < 3 {
        return &[];
    }
    let len = ((body[0] as usize) << 16) | ((body[1] as usize) << 8) | (body[2] as usize);
    let end = std::cmp::min(3 + len, body.len());
    &body[3..end]
}

/// Encode an x509 leaf. Used by tests and mock logs.
pub fn encode_x509_leaf(timestamp: u64, cert_der: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 3 + cert_der.len() + 2);
    out.push(VERSION_V1);
    out.push(LEAF_TYPE_TIMESTAMPED_ENTRY);
    out.extend_from_slice(&timestamp.to_be_bytes());
    out.extend_from_slice(&ENTRY_TYPE_X509.to_be_bytes());
    push_u24_prefixed(&mut out, cert_der);
    // CtExtensions, always empty
    out.extend_from_slice(&[0, 0]);
    out
}

pub fn encode_precert_leaf(timestamp: u64, issuer_key_hash: &[u8; 32], tbs_der: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + 32 + 3 + tbs_der.len() + 2);
    out.push(VERSION_V1);
    out.push(LEAF_TYPE_TIMESTAMPED_ENTRY);
    out.extend_from_slice(&timestamp.to_be_bytes());
    out.extend_from_slice(&ENTRY_TYPE_PRECERT.to_be_bytes());
    out.extend_from_slice(issuer_key_hash);
    push_u24_prefixed(&mut out, tbs_der);
    out.extend_from_slice(&[0, 0]);
    out
}

fn push_u24_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    let len = data.len() as u32;
    out.extend_from_slice(&len.to_be_bytes()[1..]);
    out.extend_from_slice(data);
}
