#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use cert_core::provider::NotifierFactory;
use cert_core::{AdapterError, CertificateIssuer, DeployResult, Deployer, DeployerFactory, InMemoryCertificateRepository,
                InMemoryWorkflowOutputRepository, InMemoryWorkflowRunRepository, IssueRequest, IssuedCertificate, LogSink,
                NodeContext, Notifier, OutputPersistence, ProcessorDeps};
use cert_domain::fixtures::{self, TestCertificate};
use cert_domain::{NodeType, WorkflowNode, WorkflowNodeIo};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    Succeed,
    Fail,
    Hang,
}

/// Fábrica de adaptadores que registra cada llamada.
pub struct RecordingProviders {
    pub behavior: Mutex<Behavior>,
    pub deploy_calls: Arc<AtomicUsize>,
    pub notify_calls: Arc<AtomicUsize>,
    pub deployed_pems: Arc<Mutex<Vec<String>>>,
}

impl RecordingProviders {
    pub fn new(behavior: Behavior) -> Arc<Self> {
        Arc::new(Self { behavior: Mutex::new(behavior),
                        deploy_calls: Arc::new(AtomicUsize::new(0)),
                        notify_calls: Arc::new(AtomicUsize::new(0)),
                        deployed_pems: Arc::new(Mutex::new(Vec::new())) })
    }

    pub fn deploys(&self) -> usize {
        self.deploy_calls.load(Ordering::SeqCst)
    }

    pub fn notifications(&self) -> usize {
        self.notify_calls.load(Ordering::SeqCst)
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }
}

struct RecordingDeployer {
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
    pems: Arc<Mutex<Vec<String>>>,
    logger: Arc<dyn LogSink>,
}

#[async_trait]
impl Deployer for RecordingDeployer {
    async fn deploy(&self, ctx: &NodeContext, cert_pem: &str, _key_pem: &str) -> Result<DeployResult, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.logger.logt("fake.Deploy request", &json!({ "bytes": cert_pem.len() }));
        match self.behavior {
            Behavior::Succeed => {
                self.pems.lock().push(cert_pem.to_string());
                Ok(DeployResult::default().with("target", "fake"))
            }
            Behavior::Fail => Err(AdapterError::request("fake", "fake.Deploy", "upstream returned 500")),
            Behavior::Hang => ctx.guard("fake.Deploy", std::future::pending()).await,
        }
    }
}

struct RecordingNotifier {
    behavior: Behavior,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, _ctx: &NodeContext, _subject: &str, _message: &str) -> Result<(), AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            Behavior::Fail => Err(AdapterError::request("fake", "fake.Notify", "rejected")),
            _ => Ok(()),
        }
    }
}

impl DeployerFactory for RecordingProviders {
    fn create_deployer(&self, provider: &str, config: &Value, logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Deployer>, AdapterError> {
        if provider != "fake" {
            return Err(AdapterError::config(provider, "unknown provider"));
        }
        if config.get("target").and_then(Value::as_str).unwrap_or_default().is_empty() {
            return Err(AdapterError::config(provider, "missing 'target'"));
        }
        Ok(Box::new(RecordingDeployer { behavior: *self.behavior.lock(),
                                        calls: self.deploy_calls.clone(),
                                        pems: self.deployed_pems.clone(),
                                        logger }))
    }
}

impl NotifierFactory for RecordingProviders {
    fn create_notifier(&self, channel: &str, _config: &Value, _logger: Arc<dyn LogSink>)
                       -> Result<Box<dyn Notifier>, AdapterError> {
        if channel != "fake" {
            return Err(AdapterError::config(channel, "unknown channel"));
        }
        Ok(Box::new(RecordingNotifier { behavior: *self.behavior.lock(),
                                        calls: self.notify_calls.clone() }))
    }
}

/// Emisor ACME falso: genera un certificado autofirmado válido 90 días.
pub struct FakeIssuer {
    pub calls: AtomicUsize,
    pub days_valid: i64,
}

impl FakeIssuer {
    pub fn new(days_valid: i64) -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0), days_valid })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CertificateIssuer for FakeIssuer {
    async fn obtain(&self, _ctx: &NodeContext, request: &IssueRequest) -> Result<IssuedCertificate, AdapterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let domains: Vec<&str> = request.domains.iter().map(String::as_str).collect();
        let material = fixtures::self_signed(&domains, 0, self.days_valid);
        Ok(IssuedCertificate { certificate_pem: material.cert_pem,
                               private_key_pem: material.key_pem })
    }
}

pub struct Stores {
    pub outputs: Arc<InMemoryWorkflowOutputRepository>,
    pub certificates: Arc<InMemoryCertificateRepository>,
    pub runs: Arc<InMemoryWorkflowRunRepository>,
}

impl Stores {
    pub fn new() -> Self {
        Self { outputs: Arc::new(InMemoryWorkflowOutputRepository::new()),
               certificates: Arc::new(InMemoryCertificateRepository::new()),
               runs: Arc::new(InMemoryWorkflowRunRepository::new()) }
    }

    pub fn deps(&self, providers: Arc<RecordingProviders>, issuer: Option<Arc<FakeIssuer>>) -> ProcessorDeps {
        ProcessorDeps { outputs: OutputPersistence::new(self.outputs.clone(), self.certificates.clone()),
                        certificates: self.certificates.clone(),
                        deployers: providers.clone(),
                        notifiers: providers,
                        issuer: issuer.map(|i| i as Arc<dyn CertificateIssuer>) }
    }
}

pub fn upload_node(id: &str, material: &TestCertificate) -> WorkflowNode {
    WorkflowNode::new(id,
                      "upload certificate",
                      NodeType::Upload,
                      json!({ "certificate": material.cert_pem, "privateKey": material.key_pem }))
        .with_outputs(vec![WorkflowNodeIo::certificate_slot()])
}

pub fn deploy_node(id: &str, source: &str) -> WorkflowNode {
    WorkflowNode::new(id,
                      "deploy to fake",
                      NodeType::Deploy,
                      json!({
                          "provider": "fake",
                          "providerConfig": { "target": "edge-1" },
                          "certificate": format!("{source}#certificate"),
                      }))
}
