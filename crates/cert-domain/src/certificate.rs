//! Modelo de certificado y validador de material PEM.
//!
//! Reglas:
//! - Sólo se analiza el primer bloque `CERTIFICATE` (la hoja de la cadena).
//! - La huella es SHA-256 sobre el DER, en hex minúsculas.
//! - Un certificado que no parsea o que ya expiró no debe persistirse ni
//!   entregarse a un adaptador; los nodos aplican `ensure_not_expired` antes
//!   de cualquier efecto.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use x509_parser::extensions::GeneralName;
use x509_parser::pem::Pem;
use x509_parser::public_key::PublicKey;

use crate::DomainError;

const ED25519_OID: &str = "1.3.101.112";

/// Origen del certificado persistido.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateSource {
    /// Material subido manualmente por un nodo `upload`.
    Uploaded,
    /// Emitido por la autoridad ACME desde un nodo `apply`.
    Issued,
}

impl CertificateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CertificateSource::Uploaded => "uploaded",
            CertificateSource::Issued => "issued",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "uploaded" => Some(CertificateSource::Uploaded),
            "issued" => Some(CertificateSource::Issued),
            _ => None,
        }
    }
}

/// Datos derivados de un certificado X.509 en PEM.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCertificate {
    pub subject_cn: Option<String>,
    pub subject_alt_names: Vec<String>,
    pub serial_number: String,
    pub issuer_org: Option<String>,
    pub key_algorithm: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub fingerprint: String,
}

impl ParsedCertificate {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.not_after
    }

    /// Falla con `CertificateExpired` si `now > notAfter`. Un certificado que
    /// vence exactamente en `now` todavía se acepta.
    pub fn ensure_not_expired(&self, now: DateTime<Utc>) -> Result<(), DomainError> {
        if self.is_expired_at(now) {
            return Err(DomainError::CertificateExpired { not_after: self.not_after });
        }
        Ok(())
    }

    /// `true` si el certificado vence dentro de los próximos `days` días.
    /// Un margen fuera del rango de fechas cubre cualquier vencimiento.
    pub fn expires_within(&self, now: DateTime<Utc>, days: i64) -> bool {
        match Duration::try_days(days).and_then(|margin| now.checked_add_signed(margin)) {
            Some(limit) => self.not_after <= limit,
            None => days > 0,
        }
    }

    /// Dominios cubiertos: SANs DNS o, en su defecto, el CN.
    pub fn domains(&self) -> Vec<String> {
        if !self.subject_alt_names.is_empty() {
            return self.subject_alt_names.clone();
        }
        self.subject_cn.iter().cloned().collect()
    }
}

/// Analiza el primer certificado de un PEM (admite cadenas completas).
pub fn parse_certificate_pem(pem: &str) -> Result<ParsedCertificate, DomainError> {
    let block = first_block(pem, |label| label == "CERTIFICATE")?
        .ok_or_else(|| DomainError::CertificateInvalid("no CERTIFICATE block found".into()))?;
    let x509 = block.parse_x509()
                    .map_err(|e| DomainError::CertificateInvalid(format!("malformed x509: {e}")))?;

    let subject_cn = x509.subject()
                         .iter_common_name()
                         .next()
                         .and_then(|cn| cn.as_str().ok())
                         .map(str::to_string);
    let issuer_org = x509.issuer()
                         .iter_organization()
                         .next()
                         .and_then(|o| o.as_str().ok())
                         .map(str::to_string);

    let mut subject_alt_names = Vec::new();
    if let Ok(Some(san)) = x509.subject_alternative_name() {
        for name in san.value.general_names.iter() {
            if let GeneralName::DNSName(dns) = name {
                subject_alt_names.push(dns.to_string());
            }
        }
    }

    let spki = x509.public_key();
    let key_algorithm = match spki.parsed() {
        Ok(PublicKey::RSA(_)) => "RSA",
        Ok(PublicKey::EC(_)) => "EC",
        _ if spki.algorithm.algorithm.to_id_string() == ED25519_OID => "Ed25519",
        _ => "UNKNOWN",
    };

    let validity = x509.validity();
    let not_before = to_utc(validity.not_before.timestamp())?;
    let not_after = to_utc(validity.not_after.timestamp())?;

    Ok(ParsedCertificate { subject_cn,
                           subject_alt_names,
                           serial_number: x509.raw_serial_as_string().replace(':', ""),
                           issuer_org,
                           key_algorithm: key_algorithm.to_string(),
                           not_before,
                           not_after,
                           fingerprint: hex::encode(Sha256::digest(&block.contents)) })
}

/// Exige un bloque PEM de clave privada no cifrada.
pub fn validate_private_key_pem(pem: &str) -> Result<(), DomainError> {
    match first_block(pem, |label| label.ends_with("PRIVATE KEY") && !label.starts_with("ENCRYPTED"))? {
        Some(_) => Ok(()),
        None => Err(DomainError::CertificateInvalid("no unencrypted PRIVATE KEY block found".into())),
    }
}

fn first_block(pem: &str, accept: impl Fn(&str) -> bool) -> Result<Option<Pem>, DomainError> {
    for item in Pem::iter_from_buffer(pem.trim().as_bytes()) {
        let block = item.map_err(|e| DomainError::CertificateInvalid(format!("malformed PEM: {e}")))?;
        if accept(block.label.as_str()) {
            return Ok(Some(block));
        }
    }
    Ok(None)
}

fn to_utc(ts: i64) -> Result<DateTime<Utc>, DomainError> {
    DateTime::<Utc>::from_timestamp(ts, 0).ok_or_else(|| DomainError::CertificateInvalid(format!("validity timestamp out of range: {ts}")))
}

/// Certificado persistido con referencias al workflow que lo produjo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: String,
    pub source: CertificateSource,
    pub subject_alt_names: Vec<String>,
    pub serial_number: String,
    pub issuer_org: Option<String>,
    pub key_algorithm: String,
    pub certificate: String,
    pub private_key: String,
    pub effect_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
    pub fingerprint: String,
    pub workflow_id: Option<String>,
    pub workflow_run_id: Option<String>,
    pub workflow_node_id: Option<String>,
    pub workflow_output_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Certificate {
    /// Construye la entidad (sin id ni back-references) a partir del
    /// material PEM. Valida certificado y clave; no valida expiración.
    pub fn from_pem(source: CertificateSource, cert_pem: &str, key_pem: &str) -> Result<Self, DomainError> {
        let parsed = parse_certificate_pem(cert_pem)?;
        validate_private_key_pem(key_pem)?;
        Ok(Self { id: String::new(),
                  source,
                  subject_alt_names: parsed.domains(),
                  serial_number: parsed.serial_number,
                  issuer_org: parsed.issuer_org,
                  key_algorithm: parsed.key_algorithm,
                  certificate: cert_pem.to_string(),
                  private_key: key_pem.to_string(),
                  effect_at: parsed.not_before,
                  expire_at: parsed.not_after,
                  fingerprint: parsed.fingerprint,
                  workflow_id: None,
                  workflow_run_id: None,
                  workflow_node_id: None,
                  workflow_output_id: None,
                  created_at: None,
                  updated_at: None })
    }

    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }

    /// Vuelve a analizar el PEM almacenado (p.ej. antes de desplegarlo).
    pub fn parse(&self) -> Result<ParsedCertificate, DomainError> {
        parse_certificate_pem(&self.certificate)
    }
}
