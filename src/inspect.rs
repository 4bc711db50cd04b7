//! Resumen legible de un certificado PEM (`certflow inspect`).
use std::fmt;

use cert_domain::{parse_certificate_pem, DomainError, ParsedCertificate};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateReport {
    pub parsed: ParsedCertificate,
    pub expired: bool,
    pub days_left: i64,
}

impl CertificateReport {
    pub fn from_pem(pem: &str, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let parsed = parse_certificate_pem(pem)?;
        let expired = parsed.is_expired_at(now);
        let days_left = (parsed.not_after - now).num_days();
        Ok(Self { parsed, expired, days_left })
    }
}

impl fmt::Display for CertificateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.parsed;
        writeln!(f, "subject CN : {}", p.subject_cn.as_deref().unwrap_or("-"))?;
        writeln!(f, "domains    : {}", p.domains().join(", "))?;
        writeln!(f, "issuer     : {}", p.issuer_org.as_deref().unwrap_or("-"))?;
        writeln!(f, "serial     : {}", p.serial_number)?;
        writeln!(f, "key        : {}", p.key_algorithm)?;
        writeln!(f, "not before : {}", p.not_before.to_rfc3339())?;
        writeln!(f, "not after  : {}", p.not_after.to_rfc3339())?;
        writeln!(f, "sha256     : {}", p.fingerprint)?;
        if self.expired {
            write!(f, "status     : EXPIRED")
        } else {
            write!(f, "status     : valid ({} days left)", self.days_left)
        }
    }
}
