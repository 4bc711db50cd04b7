mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cert_core::{CertificateRepository, ErrorKind, NodeContext, ProcessorRegistry, RepositoryError, RunLogBook,
                WorkflowOutputRepository};
use cert_domain::fixtures;
use cert_domain::{Certificate, CertificateSource, LogLevel, NodeType, WorkflowNode};
use common::{deploy_node, upload_node, Behavior, FakeIssuer, RecordingProviders, Stores};
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn ctx() -> NodeContext {
    NodeContext::new("wf-1", "run-1")
}

#[tokio::test]
async fn upload_valid_certificate_creates_output_and_certificate() {
    let stores = Stores::new();
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), None);
    let book = RunLogBook::new();
    let material = fixtures::valid_for_30_days("shop.example.com");
    let node = upload_node("upload-1", &material);

    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, book.logger_for(&node))
                                                 .unwrap();
    assert_ok!(processor.run(&ctx()).await);

    let output = stores.outputs.get_by_node_id("upload-1").await.unwrap();
    assert!(output.succeeded);
    assert_eq!(output.workflow_id, "wf-1");
    assert_eq!(output.run_id, "run-1");
    let cert_id = output.certificate_id().expect("certificate slot populated");
    let cert = stores.certificates.get_by_id(cert_id).await.unwrap();
    assert_eq!(cert.source, CertificateSource::Uploaded);
    assert_eq!(cert.workflow_output_id.as_deref(), Some(output.id.as_str()));
    assert_eq!(cert.subject_alt_names, vec!["shop.example.com".to_string()]);
}

#[tokio::test]
async fn upload_expired_certificate_is_rejected_without_output() {
    let stores = Stores::new();
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), None);
    let book = RunLogBook::new();
    let material = fixtures::expired_yesterday("old.example.com");
    let node = upload_node("upload-1", &material);

    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, book.logger_for(&node))
                                                 .unwrap();
    let err = assert_err!(processor.run(&ctx()).await);
    assert_eq!(err.kind(), ErrorKind::CertificateExpired);

    assert!(stores.outputs.is_empty());
    assert!(stores.certificates.is_empty());
    let log = book.node_log("upload-1").unwrap();
    assert!(log.records
               .iter()
               .any(|r| r.level == LogLevel::Error && r.content.contains("expired")));
}

#[tokio::test]
async fn upload_garbage_is_certificate_invalid() {
    let stores = Stores::new();
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), None);
    let node = WorkflowNode::new("upload-1",
                                 "upload",
                                 NodeType::Upload,
                                 json!({ "certificate": "hello", "privateKey": "world" }));
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                 .unwrap();
    let err = processor.run(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CertificateInvalid);
    assert!(stores.outputs.is_empty());
}

#[tokio::test]
async fn upload_missing_key_is_configuration_invalid() {
    let stores = Stores::new();
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), None);
    let material = fixtures::valid_for_30_days("a.example.com");
    let node = WorkflowNode::new("upload-1", "upload", NodeType::Upload, json!({ "certificate": material.cert_pem }));
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                 .unwrap();
    let err = processor.run(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
}

#[tokio::test]
async fn rerunning_upload_keeps_a_single_output() {
    let stores = Stores::new();
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), None);
    let material = fixtures::valid_for_30_days("shop.example.com");
    let node = upload_node("upload-1", &material);
    let registry = ProcessorRegistry::standard();

    for run in ["run-1", "run-2", "run-3"] {
        let processor = registry.create(node.clone(), &deps, RunLogBook::new().logger_for(&node)).unwrap();
        processor.run(&NodeContext::new("wf-1", run)).await.unwrap();
    }

    assert_eq!(stores.outputs.count_for_node("upload-1"), 1);
    let output = stores.outputs.get_by_node_id("upload-1").await.unwrap();
    assert_eq!(output.run_id, "run-3");
    // cada ejecución registra un certificado nuevo; el output apunta al último
    let latest = stores.certificates.get_by_workflow_node_id("upload-1").await.unwrap();
    assert_eq!(output.certificate_id(), Some(latest.id.as_str()));
}

/// Certificados que fallan la primera vez y luego funcionan.
struct FlakyCertificates {
    inner: cert_core::InMemoryCertificateRepository,
    failures_left: parking_lot::Mutex<u32>,
}

#[async_trait]
impl CertificateRepository for FlakyCertificates {
    async fn get_by_id(&self, id: &str) -> Result<Certificate, RepositoryError> {
        self.inner.get_by_id(id).await
    }

    async fn get_by_workflow_node_id(&self, node_id: &str) -> Result<Certificate, RepositoryError> {
        self.inner.get_by_workflow_node_id(node_id).await
    }

    async fn save(&self, certificate: Certificate) -> Result<Certificate, RepositoryError> {
        {
            let mut left = self.failures_left.lock();
            if *left > 0 {
                *left -= 1;
                return Err(RepositoryError::Storage("connection reset".into()));
            }
        }
        self.inner.save(certificate).await
    }
}

#[tokio::test]
async fn partial_failure_then_retry_does_not_duplicate_output() {
    let stores = Stores::new();
    let flaky = Arc::new(FlakyCertificates { inner: cert_core::InMemoryCertificateRepository::new(),
                                             failures_left: parking_lot::Mutex::new(1) });
    let mut deps = stores.deps(RecordingProviders::new(Behavior::Succeed), None);
    deps.outputs = cert_core::OutputPersistence::new(stores.outputs.clone(), flaky.clone());
    deps.certificates = flaky.clone() as Arc<dyn CertificateRepository>;

    let material = fixtures::valid_for_30_days("shop.example.com");
    let node = upload_node("upload-1", &material);
    let registry = ProcessorRegistry::standard();

    let first = registry.create(node.clone(), &deps, RunLogBook::new().logger_for(&node)).unwrap();
    let err = first.run(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PersistenceFailed);
    let dangling = stores.outputs.get_by_node_id("upload-1").await.unwrap();
    assert_eq!(dangling.certificate_id(), None);

    let retry = registry.create(node.clone(), &deps, RunLogBook::new().logger_for(&node)).unwrap();
    retry.run(&ctx()).await.unwrap();
    assert_eq!(stores.outputs.count_for_node("upload-1"), 1);
    let output = stores.outputs.get_by_node_id("upload-1").await.unwrap();
    assert_eq!(output.id, dangling.id);
    assert!(output.certificate_id().is_some());
}

async fn seed_upload(stores: &Stores, deps: &cert_core::ProcessorDeps, material: &fixtures::TestCertificate) {
    let node = upload_node("upload-1", material);
    let processor = ProcessorRegistry::standard().create(node.clone(), deps, RunLogBook::new().logger_for(&node))
                                                 .unwrap();
    processor.run(&ctx()).await.unwrap();
    assert_eq!(stores.outputs.count_for_node("upload-1"), 1);
}

#[tokio::test]
async fn deploy_uses_certificate_from_source_node() {
    let stores = Stores::new();
    let providers = RecordingProviders::new(Behavior::Succeed);
    let deps = stores.deps(providers.clone(), None);
    let material = fixtures::valid_for_30_days("shop.example.com");
    seed_upload(&stores, &deps, &material).await;

    let node = deploy_node("deploy-1", "upload-1");
    let book = RunLogBook::new();
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, book.logger_for(&node))
                                                 .unwrap();
    processor.run(&ctx()).await.unwrap();

    assert_eq!(providers.deploys(), 1);
    assert_eq!(providers.deployed_pems.lock()[0], material.cert_pem);
    let output = stores.outputs.get_by_node_id("deploy-1").await.unwrap();
    let uploaded = stores.certificates.get_by_workflow_node_id("upload-1").await.unwrap();
    assert_eq!(output.certificate_id(), Some(uploaded.id.as_str()));
    // la traza del adaptador llega al log del nodo
    assert!(book.node_log("deploy-1")
                .unwrap()
                .records
                .iter()
                .any(|r| r.content.contains("fake.Deploy request")));
}

#[tokio::test]
async fn deploy_skips_when_already_deployed() {
    let stores = Stores::new();
    let providers = RecordingProviders::new(Behavior::Succeed);
    let deps = stores.deps(providers.clone(), None);
    seed_upload(&stores, &deps, &fixtures::valid_for_30_days("shop.example.com")).await;

    let node = deploy_node("deploy-1", "upload-1");
    for _ in 0..2 {
        let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                     .unwrap();
        processor.run(&ctx()).await.unwrap();
    }
    assert_eq!(providers.deploys(), 1);
    assert_eq!(stores.outputs.count_for_node("deploy-1"), 1);
}

#[tokio::test]
async fn deploy_refuses_expired_certificate_without_calling_adapter() {
    let stores = Stores::new();
    let providers = RecordingProviders::new(Behavior::Succeed);
    let deps = stores.deps(providers.clone(), None);
    // se persiste directamente un certificado ya vencido como si viniera de upload-1
    let material = fixtures::expired_yesterday("old.example.com");
    let mut cert = Certificate::from_pem(CertificateSource::Uploaded, &material.cert_pem, &material.key_pem).unwrap();
    cert.workflow_node_id = Some("upload-1".into());
    stores.certificates.save(cert).await.unwrap();

    let node = deploy_node("deploy-1", "upload-1");
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                 .unwrap();
    let err = processor.run(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CertificateExpired);
    assert_eq!(providers.deploys(), 0);
    assert_eq!(stores.outputs.count_for_node("deploy-1"), 0);
}

#[tokio::test]
async fn deploy_without_source_certificate_is_record_not_found() {
    let stores = Stores::new();
    let providers = RecordingProviders::new(Behavior::Succeed);
    let deps = stores.deps(providers.clone(), None);
    let node = deploy_node("deploy-1", "upload-1");
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                 .unwrap();
    let err = processor.run(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RecordNotFound);
    assert_eq!(providers.deploys(), 0);
}

#[tokio::test]
async fn deploy_with_invalid_provider_config_never_calls_out() {
    let stores = Stores::new();
    let providers = RecordingProviders::new(Behavior::Succeed);
    let deps = stores.deps(providers.clone(), None);
    seed_upload(&stores, &deps, &fixtures::valid_for_30_days("shop.example.com")).await;
    let node = WorkflowNode::new("deploy-1",
                                 "deploy",
                                 NodeType::Deploy,
                                 json!({ "provider": "fake", "providerConfig": {}, "certificate": "upload-1#certificate" }));
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                 .unwrap();
    let err = processor.run(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    assert_eq!(providers.deploys(), 0);
}

#[tokio::test]
async fn deploy_failure_is_external_call_failed_and_not_persisted() {
    let stores = Stores::new();
    let providers = RecordingProviders::new(Behavior::Succeed);
    let deps = stores.deps(providers.clone(), None);
    seed_upload(&stores, &deps, &fixtures::valid_for_30_days("shop.example.com")).await;
    providers.set_behavior(Behavior::Fail);

    let node = deploy_node("deploy-1", "upload-1");
    let book = RunLogBook::new();
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, book.logger_for(&node))
                                                 .unwrap();
    let err = processor.run(&ctx()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExternalCallFailed);
    assert!(err.to_string().contains("fake.Deploy"));
    assert_eq!(stores.outputs.count_for_node("deploy-1"), 0);
    let failing = book.node_log("deploy-1").unwrap();
    assert!(failing.records
                   .iter()
                   .any(|r| r.error.as_deref().is_some_and(|e| e.contains("upstream returned 500"))));
}

#[tokio::test]
async fn canceling_a_hanging_deploy_yields_canceled() {
    let stores = Stores::new();
    let providers = RecordingProviders::new(Behavior::Succeed);
    let deps = stores.deps(providers.clone(), None);
    seed_upload(&stores, &deps, &fixtures::valid_for_30_days("shop.example.com")).await;
    providers.set_behavior(Behavior::Hang);

    let node = deploy_node("deploy-1", "upload-1");
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                 .unwrap();
    let ctx = ctx();
    let token = ctx.cancellation_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });
    let err = tokio::time::timeout(Duration::from_secs(5), processor.run(&ctx))
        .await
        .expect("cancellation within deadline")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Canceled);
    assert_eq!(providers.deploys(), 1);
    assert_eq!(stores.outputs.count_for_node("deploy-1"), 0);
}

#[tokio::test]
async fn apply_issues_once_and_then_skips_while_valid() {
    let stores = Stores::new();
    let issuer = FakeIssuer::new(90);
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), Some(issuer.clone()));
    let node = WorkflowNode::new("apply-1",
                                 "apply",
                                 NodeType::Apply,
                                 json!({ "domains": ["example.com"], "contactEmail": "ops@example.com" }));

    for _ in 0..2 {
        let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                     .unwrap();
        processor.run(&ctx()).await.unwrap();
    }
    assert_eq!(issuer.calls(), 1);
    let cert = stores.certificates.get_by_workflow_node_id("apply-1").await.unwrap();
    assert_eq!(cert.source, CertificateSource::Issued);
    let output = stores.outputs.get_by_node_id("apply-1").await.unwrap();
    assert_eq!(output.certificate_id(), Some(cert.id.as_str()));
}

#[tokio::test]
async fn apply_renews_when_certificate_is_close_to_expiry() {
    let stores = Stores::new();
    // 10 días de validez < 30 días de margen: cada ejecución renueva
    let issuer = FakeIssuer::new(10);
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), Some(issuer.clone()));
    let node = WorkflowNode::new("apply-1",
                                 "apply",
                                 NodeType::Apply,
                                 json!({ "domains": ["example.com"], "contactEmail": "ops@example.com" }));
    for _ in 0..2 {
        let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                     .unwrap();
        processor.run(&ctx()).await.unwrap();
    }
    assert_eq!(issuer.calls(), 2);
    assert_eq!(stores.outputs.count_for_node("apply-1"), 1);
}

#[tokio::test]
async fn apply_with_out_of_range_renewal_margin_fails_cleanly() {
    let stores = Stores::new();
    let issuer = FakeIssuer::new(90);
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), Some(issuer.clone()));
    let node = WorkflowNode::new("apply-1",
                                 "apply",
                                 NodeType::Apply,
                                 json!({
                                     "domains": ["example.com"],
                                     "contactEmail": "ops@example.com",
                                     "skipBeforeExpiryDays": 1_000_000_000_000i64
                                 }));
    for _ in 0..2 {
        let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                     .unwrap();
        let err = processor.run(&ctx()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    }
    assert_eq!(issuer.calls(), 0);
    assert_eq!(stores.outputs.count_for_node("apply-1"), 0);
}

#[tokio::test]
async fn apply_without_issuer_is_configuration_invalid() {
    let stores = Stores::new();
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), None);
    let node = WorkflowNode::new("apply-1",
                                 "apply",
                                 NodeType::Apply,
                                 json!({ "domains": ["example.com"], "contactEmail": "ops@example.com" }));
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                 .unwrap();
    assert_eq!(processor.run(&ctx()).await.unwrap_err().kind(), ErrorKind::ConfigurationInvalid);
}

#[tokio::test]
async fn notify_sends_and_records_output() {
    let stores = Stores::new();
    let providers = RecordingProviders::new(Behavior::Succeed);
    let deps = stores.deps(providers.clone(), None);
    let node = WorkflowNode::new("notify-1",
                                 "notify",
                                 NodeType::Notify,
                                 json!({ "channel": "fake", "subject": "done", "message": "certificate deployed" }));
    let processor = ProcessorRegistry::standard().create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                                                 .unwrap();
    processor.run(&ctx()).await.unwrap();
    assert_eq!(providers.notifications(), 1);
    assert!(stores.outputs.get_by_node_id("notify-1").await.unwrap().succeeded);
}

#[tokio::test]
async fn unregistered_node_type_is_configuration_invalid() {
    let stores = Stores::new();
    let deps = stores.deps(RecordingProviders::new(Behavior::Succeed), None);
    let mut registry = ProcessorRegistry::empty();
    registry.register(NodeType::Start, cert_core::processor::ControlNode::construct);
    let node = WorkflowNode::new("n", "notify", NodeType::Notify, json!({}));
    let err = registry.create(node.clone(), &deps, RunLogBook::new().logger_for(&node))
                      .err()
                      .expect("notify not registered");
    assert_eq!(err.kind(), ErrorKind::ConfigurationInvalid);
    assert!(registry.supports(NodeType::Start));
}
