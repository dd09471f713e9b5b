// src/cert_parser.rs
use anyhow::Result;
use sha2::{Digest, Sha256};
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::*;

/// Fields of an X.509 certificate that end up in a summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCert {
    /// DNS subject alternative names, in certificate order
    pub dns_names: Vec<String>,
    pub common_name: Option<String>,
    /// Full issuer distinguished name
    pub issuer: String,
    pub fingerprint: String,
}

impl ParsedCert {
    /// DNS names joined with ", ", or the subject CN when there are none
    pub fn display_names(&self) -> String {
        if self.dns_names.is_empty() {
            self.common_name.clone().unwrap_or_default()
        } else {
            self.dns_names.join(", ")
        }
    }
}

/// Certificate parser for extracting names and issuer
pub struct CertificateParser;

impl CertificateParser {
    /// Parse a DER-encoded certificate
    pub fn parse_der(der_bytes: &[u8]) -> Result<ParsedCert> {
        let fingerprint = {
            let mut hasher = Sha256::new();
            hasher.update(der_bytes);
            hex::encode(hasher.finalize())
        };

        let (_, cert) = X509Certificate::from_der(der_bytes)
            .map_err(|e| anyhow::anyhow!("Failed to parse certificate from DER: {:?}", e))?;

        let mut dns_names = Vec::new();

        for ext in cert.extensions() {
            if let ParsedExtension::SubjectAlternativeName(san) = ext.parsed_extension() {
                for general_name in &san.general_names {
                    if let GeneralName::DNSName(dns_name) = general_name {
                        dns_names.push(dns_name.to_string());
                    }
                }
            }
        }

        Ok(ParsedCert {
            dns_names,
            common_name: Self::extract_cn(&cert),
            issuer: cert.issuer().to_string(),
            fingerprint,
        })
    }

    /// Extract Common Name (CN) from certificate subject
    fn extract_cn(cert: &X509Certificate) -> Option<String> {
        cert.subject()
            .iter_common_name()
            .find_map(|attr| attr.as_str().ok().map(str::to_string))
    }
}
