//! Logs de ejecución (por nodo) y el contrato `LogSink`.
pub mod book;
pub mod sink;

pub use book::{NodeLogger, RunLogBook};
pub use sink::{LogSink, NilLogSink};
