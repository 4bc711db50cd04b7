//! Contexto de ejecución de un nodo: identidad del run y señal de
//! cancelación / plazo.
//!
//! Toda llamada externa (adaptadores) y toda escritura en persistencia desde
//! un procesador pasa por `NodeContext::guard`, que compite la operación
//! contra la cancelación y el plazo. Si gana la cancelación, el future en
//! vuelo se descarta (la llamada externa queda sin completar) y se devuelve
//! `AdapterError::Canceled`.
use std::future::Future;
use std::time::Duration;

use log::warn;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::errors::AdapterError;

#[derive(Debug, Clone)]
pub struct NodeContext {
    pub workflow_id: String,
    pub run_id: String,
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl NodeContext {
    pub fn new(workflow_id: &str, run_id: &str) -> Self {
        Self { workflow_id: workflow_id.to_string(),
               run_id: run_id.to_string(),
               cancel: CancellationToken::new(),
               deadline: None }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Fija un plazo relativo; nunca extiende uno ya existente. Un plazo
    /// que no cabe en `Instant` equivale a no tener plazo.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        let Some(candidate) = Instant::now().checked_add(timeout) else {
            warn!("timeout {timeout:?} is out of range, keeping current deadline");
            return self;
        };
        self.deadline = Some(match self.deadline {
                                 Some(existing) if existing < candidate => existing,
                                 _ => candidate,
                             });
        self
    }

    /// Contexto hijo: se cancela cuando el padre se cancela, pero cancelarlo
    /// no afecta al padre.
    pub fn child(&self) -> Self {
        Self { workflow_id: self.workflow_id.clone(),
               run_id: self.run_id.clone(),
               cancel: self.cancel.child_token(),
               deadline: self.deadline }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_canceled(&self) -> bool {
        self.cancel.is_cancelled() || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Ejecuta `fut` observando cancelación y plazo.
    pub async fn guard<F, T, E>(&self, operation: &str, fut: F) -> Result<T, E>
        where F: Future<Output = Result<T, E>>,
              E: From<AdapterError>
    {
        let canceled = || E::from(AdapterError::Canceled { operation: operation.to_string() });
        if self.is_canceled() {
            return Err(canceled());
        }
        let deadline = async {
            match self.deadline {
                Some(d) => tokio::time::sleep_until(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                warn!("operation '{operation}' canceled (run={})", self.run_id);
                Err(canceled())
            }
            _ = deadline => {
                warn!("operation '{operation}' exceeded deadline (run={})", self.run_id);
                Err(canceled())
            }
            res = fut => res,
        }
    }
}
