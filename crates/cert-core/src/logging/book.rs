//! Libro de logs de un run: un `WorkflowRunLog` por nodo, append-only.
//!
//! `NodeLogger` es la implementación de `LogSink` que reciben los
//! procesadores y sus adaptadores; además de acumular registros en el libro
//! los replica en el facade `log` para la salida del proceso.
use std::sync::Arc;

use cert_domain::{LogLevel, LogRecord, WorkflowNode, WorkflowRunLog};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde_json::Value;

use super::sink::LogSink;

#[derive(Debug, Clone, Default)]
pub struct RunLogBook {
    inner: Arc<Mutex<Vec<WorkflowRunLog>>>,
}

impl RunLogBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logger dedicado a un nodo. El bloque del nodo se crea de inmediato
    /// para que el orden del libro siga el orden de ejecución.
    pub fn logger_for(&self, node: &WorkflowNode) -> Arc<NodeLogger> {
        {
            let mut logs = self.inner.lock();
            if !logs.iter().any(|l| l.node_id == node.id) {
                logs.push(WorkflowRunLog { node_id: node.id.clone(),
                                           node_name: node.name.clone(),
                                           records: Vec::new() });
            }
        }
        Arc::new(NodeLogger { node_id: node.id.clone(),
                              node_name: node.name.clone(),
                              book: self.clone() })
    }

    fn append(&self, node_id: &str, record: LogRecord) {
        let mut logs = self.inner.lock();
        if let Some(log) = logs.iter_mut().find(|l| l.node_id == node_id) {
            log.records.push(record);
        }
    }

    /// Copia de todos los logs acumulados.
    pub fn snapshot(&self) -> Vec<WorkflowRunLog> {
        self.inner.lock().clone()
    }

    pub fn node_log(&self, node_id: &str) -> Option<WorkflowRunLog> {
        self.inner.lock().iter().find(|l| l.node_id == node_id).cloned()
    }
}

#[derive(Debug, Clone)]
pub struct NodeLogger {
    node_id: String,
    node_name: String,
    book: RunLogBook,
}

impl NodeLogger {
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Registros de este nodo hasta el momento.
    pub fn records(&self) -> Vec<LogRecord> {
        self.book
            .node_log(&self.node_id)
            .map(|l| l.records)
            .unwrap_or_default()
    }
}

impl LogSink for NodeLogger {
    fn add_output(&self, level: LogLevel, content: &str, err: Option<&str>) {
        let detail = err.map(|e| format!(" ({e})")).unwrap_or_default();
        match level {
            LogLevel::Debug => debug!("[{}] {content}{detail}", self.node_name),
            LogLevel::Info => info!("[{}] {content}{detail}", self.node_name),
            LogLevel::Warn => warn!("[{}] {content}{detail}", self.node_name),
            LogLevel::Error => error!("[{}] {content}{detail}", self.node_name),
        }
        self.book
            .append(&self.node_id, LogRecord::new(level, content, err.map(str::to_string)));
    }

    fn logt(&self, message: &str, data: &Value) {
        debug!("[{}] {message}: {data}", self.node_name);
        self.book
            .append(&self.node_id, LogRecord::new(LogLevel::Info, format!("{message}: {data}"), None));
    }
}
