//! Orquestador mínimo: ejecuta los nodos de un workflow en orden y es el
//! único dueño de las transiciones del `WorkflowRun`.
pub mod builder;
pub mod runner;

pub use builder::{RunnerBuilder, RunnerBuilderInit};
pub use runner::WorkflowRunner;
