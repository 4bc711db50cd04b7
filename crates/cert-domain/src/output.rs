use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::workflow::{WorkflowNode, WorkflowNodeIo};

/// Nombre del slot de salida que referencia al certificado producido.
pub const CERTIFICATE_SLOT: &str = "certificate";

/// Resultado persistido de la última ejecución de un nodo.
///
/// Hay un único output "vigente" por (workflow, nodo): una re-ejecución
/// reutiliza el `id` previo y sobrescribe el registro. Un `id` vacío indica
/// que todavía no se ha persistido.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowOutput {
    pub id: String,
    pub workflow_id: String,
    pub run_id: String,
    pub node_id: String,
    pub node: WorkflowNode,
    pub outputs: Vec<WorkflowNodeIo>,
    pub succeeded: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl WorkflowOutput {
    /// Output nuevo a partir del snapshot del nodo; copia sus slots declarados.
    pub fn new(workflow_id: &str, run_id: &str, node: &WorkflowNode) -> Self {
        Self { id: String::new(),
               workflow_id: workflow_id.to_string(),
               run_id: run_id.to_string(),
               node_id: node.id.clone(),
               node: node.clone(),
               outputs: node.outputs.clone(),
               succeeded: false,
               created_at: None,
               updated_at: None }
    }

    pub fn is_persisted(&self) -> bool {
        !self.id.is_empty()
    }

    pub fn output_value(&self, name: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|io| io.name == name)
            .and_then(|io| io.value.as_deref())
    }

    /// Actualiza el slot `name`; si el nodo no lo declaró, se agrega.
    pub fn set_output_value(&mut self, name: &str, value: &str) {
        match self.outputs.iter_mut().find(|io| io.name == name) {
            Some(io) => io.value = Some(value.to_string()),
            None => {
                let mut io = if name == CERTIFICATE_SLOT {
                    WorkflowNodeIo::certificate_slot()
                } else {
                    WorkflowNodeIo { name: name.to_string(),
                                     kind: "string".to_string(),
                                     label: name.to_string(),
                                     required: false,
                                     value: None }
                };
                io.value = Some(value.to_string());
                self.outputs.push(io);
            }
        }
    }

    pub fn certificate_id(&self) -> Option<&str> {
        self.output_value(CERTIFICATE_SLOT).filter(|v| !v.is_empty())
    }
}
