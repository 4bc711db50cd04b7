//! Normalización de dominios comodín según la convención de cada proveedor.

/// Forma que espera la API del proveedor para `*.example.com`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WildcardStyle {
    /// `.example.com` (CDN de Aliyun).
    LeadingDot,
    /// `example.com`.
    BareSuffix,
}

/// Quita el prefijo comodín. Dominios sin comodín pasan intactos.
pub fn normalize_wildcard_domain(domain: &str, style: WildcardStyle) -> String {
    let domain = domain.trim();
    match domain.strip_prefix("*.") {
        Some(suffix) => match style {
            WildcardStyle::LeadingDot => format!(".{suffix}"),
            WildcardStyle::BareSuffix => suffix.to_string(),
        },
        None => domain.to_string(),
    }
}
