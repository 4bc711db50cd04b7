//! Material de prueba: certificados autofirmados con ventanas de validez
//! controladas. Sólo disponible con el feature `test-support`.
use rcgen::{CertificateParams, DnType, KeyPair};
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone)]
pub struct TestCertificate {
    pub cert_pem: String,
    pub key_pem: String,
}

/// Certificado válido desde hace `days_since_issue` días hasta dentro de
/// `days_until_expiry` días (negativo = ya expirado).
pub fn self_signed(domains: &[&str], days_since_issue: i64, days_until_expiry: i64) -> TestCertificate {
    let sans: Vec<String> = domains.iter().map(|d| d.to_string()).collect();
    let mut params = CertificateParams::new(sans).expect("valid SANs");
    if let Some(first) = domains.first() {
        params.distinguished_name.push(DnType::CommonName, *first);
    }
    params.distinguished_name.push(DnType::OrganizationName, "certflow test CA");
    let now = OffsetDateTime::now_utc();
    params.not_before = now - Duration::days(days_since_issue);
    params.not_after = now + Duration::days(days_until_expiry);

    let key_pair = KeyPair::generate().expect("generate key pair");
    let cert = params.self_signed(&key_pair).expect("self-sign");
    TestCertificate { cert_pem: cert.pem(),
                      key_pem: key_pair.serialize_pem() }
}

/// Válido 30 días más, como un certificado recién subido.
pub fn valid_for_30_days(domain: &str) -> TestCertificate {
    self_signed(&[domain], 1, 30)
}

/// Expirado hace un día.
pub fn expired_yesterday(domain: &str) -> TestCertificate {
    self_signed(&[domain], 90, -1)
}
