//! Definición de workflow: nodos tipados y su configuración.
//!
//! Un `WorkflowNode` es inmutable una vez que el run arranca; los
//! procesadores trabajan sobre una copia (snapshot) que además se guarda en
//! el output.
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::output::CERTIFICATE_SLOT;
use crate::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Start,
    Apply,
    Upload,
    Deploy,
    Notify,
    End,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Start => "start",
            NodeType::Apply => "apply",
            NodeType::Upload => "upload",
            NodeType::Deploy => "deploy",
            NodeType::Notify => "notify",
            NodeType::End => "end",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Slot de salida declarado por un nodo (p.ej. `certificate`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNodeIo {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl WorkflowNodeIo {
    pub fn certificate_slot() -> Self {
        Self { name: CERTIFICATE_SLOT.to_string(),
               kind: "certificate".to_string(),
               label: "Certificate".to_string(),
               required: true,
               value: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub outputs: Vec<WorkflowNodeIo>,
}

impl WorkflowNode {
    pub fn new(id: &str, name: &str, node_type: NodeType, config: Value) -> Self {
        Self { id: id.to_string(),
               name: name.to_string(),
               node_type,
               config,
               outputs: Vec::new() }
    }

    pub fn with_outputs(mut self, outputs: Vec<WorkflowNodeIo>) -> Self {
        self.outputs = outputs;
        self
    }

    /// Deserializa y valida la configuración propia del tipo de nodo.
    /// Cualquier campo ausente o malformado es `InvalidConfiguration`.
    pub fn typed_config<T: NodeConfig>(&self) -> Result<T, DomainError> {
        let cfg: T = serde_json::from_value(self.config.clone()).map_err(|e| {
                                                                     DomainError::InvalidConfiguration(format!("node '{}' ({}): {e}",
                                                                                                               self.id, self.node_type))
                                                                 })?;
        cfg.validate()
           .map_err(|e| DomainError::InvalidConfiguration(format!("node '{}' ({}): {e}", self.id, self.node_type)))?;
        Ok(cfg)
    }
}

/// Configuración tipada de un nodo.
pub trait NodeConfig: DeserializeOwned {
    /// Reglas que serde no puede expresar (cadenas vacías, formatos).
    fn validate(&self) -> Result<(), String>;
}

fn require(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("missing required field '{field}'"));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadNodeConfig {
    pub certificate: String,
    pub private_key: String,
}

impl NodeConfig for UploadNodeConfig {
    fn validate(&self) -> Result<(), String> {
        require("certificate", &self.certificate)?;
        require("privateKey", &self.private_key)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployNodeConfig {
    pub provider: String,
    #[serde(default)]
    pub provider_config: Value,
    /// Referencia `"<nodeId>#certificate"` al nodo que produjo el material.
    pub certificate: String,
    #[serde(default = "default_true")]
    pub skip_on_last_succeeded: bool,
}

impl DeployNodeConfig {
    /// Id del nodo origen del certificado.
    pub fn certificate_source_node(&self) -> Result<&str, String> {
        match self.certificate.split_once('#') {
            Some((node_id, slot)) if !node_id.is_empty() && slot == CERTIFICATE_SLOT => Ok(node_id),
            _ => Err(format!("certificate reference '{}' must look like '<nodeId>#{CERTIFICATE_SLOT}'",
                             self.certificate)),
        }
    }
}

impl NodeConfig for DeployNodeConfig {
    fn validate(&self) -> Result<(), String> {
        require("provider", &self.provider)?;
        self.certificate_source_node().map(|_| ())
    }
}

fn default_renewal_days() -> i64 {
    30
}

/// Margen máximo de renovación aceptado en `skipBeforeExpiryDays`.
pub const MAX_RENEWAL_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyNodeConfig {
    pub domains: Vec<String>,
    pub contact_email: String,
    /// Proveedor DNS para el challenge; lo interpreta el emisor ACME.
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub provider_config: Value,
    #[serde(default)]
    pub key_algorithm: Option<String>,
    #[serde(default = "default_renewal_days")]
    pub skip_before_expiry_days: i64,
}

impl NodeConfig for ApplyNodeConfig {
    fn validate(&self) -> Result<(), String> {
        if self.domains.is_empty() || self.domains.iter().any(|d| d.trim().is_empty()) {
            return Err("'domains' must contain at least one non-empty domain".into());
        }
        require("contactEmail", &self.contact_email)?;
        if !self.contact_email.contains('@') {
            return Err(format!("'contactEmail' is not an email address: {}", self.contact_email));
        }
        if !(0..=MAX_RENEWAL_DAYS).contains(&self.skip_before_expiry_days) {
            return Err(format!("'skipBeforeExpiryDays' must be between 0 and {MAX_RENEWAL_DAYS}, got {}",
                               self.skip_before_expiry_days));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifyNodeConfig {
    pub channel: String,
    #[serde(default)]
    pub channel_config: Value,
    pub subject: String,
    pub message: String,
}

impl NodeConfig for NotifyNodeConfig {
    fn validate(&self) -> Result<(), String> {
        require("channel", &self.channel)?;
        require("subject", &self.subject)?;
        require("message", &self.message)
    }
}

/// Workflow lineal tal como lo entrega el orquestador.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub nodes: Vec<WorkflowNode>,
}
