//! Constantes del núcleo de ejecución.

/// Versión lógica del núcleo. Forma parte del hash de configuración de un
/// nodo, de modo que un cambio incompatible invalida los "skip" basados en
/// el último output exitoso.
pub const CORE_VERSION: &str = "C1.0";

/// Plazo por defecto de un nodo si el orquestador no indica otro.
pub const DEFAULT_NODE_TIMEOUT_SECS: u64 = 300;

/// Prefijo de los nombres de certificado que se registran en proveedores.
pub const CERT_NAME_PREFIX: &str = "certflow";
