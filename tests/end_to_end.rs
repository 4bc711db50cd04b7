//! Runs completos a través de `Runtime::in_memory`, con el registro real
//! de proveedores.
use std::time::Duration;

use certflow::domain::fixtures::{self, TestCertificate};
use certflow::domain::{CertificateSource, NodeType, RunStatus, RunTrigger, Workflow, WorkflowNode, WorkflowNodeIo};
use certflow::{AppConfig, Backend, Runtime};
use serde_json::json;
use tokio_util::sync::CancellationToken;

fn runtime() -> Runtime {
    let config = AppConfig::default().with_node_timeout(Duration::from_secs(5));
    Runtime::in_memory(&config)
}

fn upload(id: &str, material: &TestCertificate) -> WorkflowNode {
    WorkflowNode::new(id,
                      "upload certificate",
                      NodeType::Upload,
                      json!({ "certificate": material.cert_pem, "privateKey": material.key_pem }))
        .with_outputs(vec![WorkflowNodeIo::certificate_slot()])
}

fn workflow(nodes: Vec<WorkflowNode>) -> Workflow {
    Workflow { id: "wf-e2e".into(),
               name: "e2e".into(),
               nodes }
}

#[tokio::test]
async fn upload_persists_certificate_and_output() {
    let rt = runtime();
    assert_eq!(rt.backend(), Backend::Memory);
    let material = fixtures::valid_for_30_days("shop.example.com");
    let wf = workflow(vec![upload("upload-1", &material)]);

    let run = rt.run(&wf, RunTrigger::Manual, CancellationToken::new()).await.unwrap();
    assert_eq!(run.status, RunStatus::Succeeded);

    let deps = rt.runner().deps();
    let output = deps.outputs.get_by_node_id("upload-1").await.unwrap();
    assert!(output.succeeded);
    let cert_id = output.certificate_id().unwrap().to_string();
    let cert = deps.certificates.get_by_id(&cert_id).await.unwrap();
    assert_eq!(cert.source, CertificateSource::Uploaded);
    assert_eq!(cert.subject_alt_names, vec!["shop.example.com".to_string()]);
    assert_eq!(cert.workflow_node_id.as_deref(), Some("upload-1"));
    assert_eq!(cert.workflow_output_id.as_deref(), Some(output.id.as_str()));
}

#[tokio::test]
async fn expired_upload_fails_without_output() {
    let rt = runtime();
    let expired = fixtures::expired_yesterday("old.example.com");
    let wf = workflow(vec![upload("upload-1", &expired)]);

    let run = rt.run(&wf, RunTrigger::Manual, CancellationToken::new()).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error.as_deref().unwrap().contains("expired"));
    assert!(run.logs[0].has_errors());
    assert!(rt.runner().deps().outputs.find_by_node_id("upload-1").await.unwrap().is_none());
}

#[tokio::test]
async fn waf_deploy_without_instance_fails_before_any_call() {
    let rt = runtime();
    let material = fixtures::valid_for_30_days("*.test.com");
    let deploy = WorkflowNode::new("deploy-1",
                                   "deploy to waf",
                                   NodeType::Deploy,
                                   json!({
                                       "provider": "aliyun-waf",
                                       "providerConfig": {
                                           "accessKeyId": "ak",
                                           "accessKeySecret": "sk",
                                           "region": "cn-hangzhou",
                                           "domain": "*.test.com"
                                       },
                                       "certificate": "upload-1#certificate"
                                   }));
    let wf = workflow(vec![upload("upload-1", &material), deploy]);

    let run = rt.run(&wf, RunTrigger::Manual, CancellationToken::new()).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    let error = run.error.as_deref().unwrap();
    assert!(error.contains("deploy-1"));
    assert!(error.contains("instanceId"));
    assert_eq!(run.logs.len(), 2);
    assert!(run.logs[1].has_errors());
    assert!(rt.runner().deps().outputs.find_by_node_id("deploy-1").await.unwrap().is_none());
}

#[tokio::test]
async fn rerun_overwrites_the_same_output() {
    let rt = runtime();
    let material = fixtures::valid_for_30_days("shop.example.com");
    let wf = workflow(vec![upload("upload-1", &material)]);

    let first = rt.run(&wf, RunTrigger::Manual, CancellationToken::new()).await.unwrap();
    let out_first = rt.runner().deps().outputs.get_by_node_id("upload-1").await.unwrap();
    let second = rt.run(&wf, RunTrigger::Scheduled, CancellationToken::new()).await.unwrap();
    let out_second = rt.runner().deps().outputs.get_by_node_id("upload-1").await.unwrap();

    assert_eq!(second.status, RunStatus::Succeeded);
    assert_ne!(first.id, second.id);
    assert_eq!(out_first.id, out_second.id);
    assert_eq!(out_second.run_id, second.id);
}

#[tokio::test]
async fn unknown_deployer_is_a_configuration_failure() {
    let rt = runtime();
    let material = fixtures::valid_for_30_days("shop.example.com");
    let deploy = WorkflowNode::new("deploy-1",
                                   "deploy",
                                   NodeType::Deploy,
                                   json!({ "provider": "tencent-clb", "certificate": "upload-1#certificate" }));
    let wf = workflow(vec![upload("upload-1", &material), deploy]);

    let run = rt.run(&wf, RunTrigger::Webhook, CancellationToken::new()).await.unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.error.as_deref().unwrap().contains("tencent-clb"));
}

#[tokio::test]
async fn canceled_before_start_is_recorded() {
    let rt = runtime();
    let material = fixtures::valid_for_30_days("shop.example.com");
    let token = CancellationToken::new();
    token.cancel();

    let run = rt.run(&workflow(vec![upload("upload-1", &material)]), RunTrigger::Manual, token)
                .await
                .unwrap();
    assert_eq!(run.status, RunStatus::Canceled);
    assert!(rt.runner().deps().outputs.find_by_node_id("upload-1").await.unwrap().is_none());
}
