//! Contrato del sumidero de logs compartido por procesadores y adaptadores.
use std::fmt::Display;

use cert_domain::LogLevel;
use serde_json::Value;

/// Sumidero de logs inyectado por constructor.
///
/// - `add_output`: agrega una entrada al log del nodo.
/// - `logt`: traza de progreso de un adaptador con datos estructurados
///   (respuesta de un proveedor, parámetros de una llamada).
pub trait LogSink: Send + Sync {
    fn add_output(&self, level: LogLevel, content: &str, error: Option<&str>);

    fn logt(&self, message: &str, data: &Value);

    fn info(&self, content: &str) {
        self.add_output(LogLevel::Info, content, None);
    }

    fn warn(&self, content: &str) {
        self.add_output(LogLevel::Warn, content, None);
    }

    /// Mensaje legible más el detalle crudo del error.
    fn error(&self, content: &str, error: &dyn Display) {
        self.add_output(LogLevel::Error, content, Some(&error.to_string()));
    }
}

/// Descarta todo. Valor por defecto de los adaptadores construidos sin
/// logger.
#[derive(Debug, Default, Clone, Copy)]
pub struct NilLogSink;

impl LogSink for NilLogSink {
    fn add_output(&self, _level: LogLevel, _content: &str, _error: Option<&str>) {}

    fn logt(&self, _message: &str, _data: &Value) {}
}
