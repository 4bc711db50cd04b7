mod common;

use std::sync::Arc;
use std::time::Duration;

use cert_adapters::aliyun::{AliyunCasUploader, AliyunDcdnConfig, AliyunDcdnDeployer, AliyunWafConfig,
                            AliyunWafDeployer};
use cert_core::{AdapterError, Deployer, ErrorKind, LogSink, NilLogSink, NodeContext, RunLogBook, Uploader,
                WorkflowError};
use cert_domain::fixtures;
use cert_domain::{parse_certificate_pem, NodeType, WorkflowNode};
use common::{access, FakeOpenApi};
use serde_json::{json, Value};

fn nil() -> Arc<dyn LogSink> {
    Arc::new(NilLogSink)
}

fn ctx() -> NodeContext {
    NodeContext::new("wf-1", "run-1")
}

fn waf_config(extra: Value) -> AliyunWafConfig {
    let mut config = access();
    config["region"] = json!("cn-hangzhou");
    for (k, v) in extra.as_object().cloned().unwrap_or_default() {
        config[k.as_str()] = v;
    }
    serde_json::from_value(config).unwrap()
}

/// Uploader CAS sobre un cliente falso que siempre sube con id 123.
fn cas_uploader() -> (Arc<FakeOpenApi>, Box<dyn Uploader>) {
    let cas = FakeOpenApi::new();
    cas.respond("ListUserCertificateOrder", json!({ "CertificateOrderList": [], "TotalCount": 0 }));
    cas.respond("UploadUserCertificate", json!({ "CertId": 123, "RequestId": "req-1" }));
    let uploader = AliyunCasUploader::with_client(cas.clone(), nil());
    (cas, Box::new(uploader))
}

#[tokio::test]
async fn waf_without_instance_makes_no_calls() {
    let waf = FakeOpenApi::new();
    let (cas, uploader) = cas_uploader();
    let config = waf_config(json!({ "domain": "*.test.com" }));

    let err = AliyunWafDeployer::with_clients(config, waf.clone(), uploader, nil()).err().unwrap();

    assert!(matches!(err, AdapterError::Configuration { ref provider, .. } if provider == "aliyun-waf"));
    assert!(waf.actions().is_empty());
    assert!(cas.actions().is_empty());
}

#[tokio::test]
async fn waf_default_certificate_keeps_tls_settings() {
    let material = fixtures::valid_for_30_days("example.com");
    let waf = FakeOpenApi::new();
    waf.respond("DescribeDefaultHttps",
                json!({ "DefaultHttps": { "TLSVersion": "tlsv1.2", "EnableTLSv3": true } }));
    let (cas, uploader) = cas_uploader();
    let deployer =
        AliyunWafDeployer::with_clients(waf_config(json!({ "instanceId": "waf-1" })), waf.clone(), uploader, nil())
            .unwrap();

    let result = deployer.deploy(&ctx(), &material.cert_pem, &material.key_pem).await.unwrap();

    assert_eq!(cas.actions(), vec!["ListUserCertificateOrder", "UploadUserCertificate"]);
    assert_eq!(waf.actions(), vec!["DescribeDefaultHttps", "ModifyDefaultHttps"]);
    let modify = waf.params_of("ModifyDefaultHttps");
    assert_eq!(modify["CertId"], "123-cn-hangzhou");
    assert_eq!(modify["TLSVersion"], "tlsv1.2");
    assert_eq!(modify["EnableTLSv3"], "true");
    assert_eq!(modify["InstanceId"], "waf-1");
    assert_eq!(result.extra["certId"], json!("123-cn-hangzhou"));
}

#[tokio::test]
async fn waf_wildcard_domain_is_sent_without_asterisk() {
    let material = fixtures::valid_for_30_days("test.com");
    let waf = FakeOpenApi::new();
    waf.respond("DescribeDomainDetail",
                json!({ "Listen": { "TLSVersion": "tlsv1.1", "EnableTLSv3": false, "FocusHttps": true } }));
    let (_cas, uploader) = cas_uploader();
    let config = waf_config(json!({ "instanceId": "waf-1", "domain": "*.test.com" }));
    let deployer = AliyunWafDeployer::with_clients(config, waf.clone(), uploader, nil()).unwrap();

    deployer.deploy(&ctx(), &material.cert_pem, &material.key_pem).await.unwrap();

    assert_eq!(waf.actions(), vec!["DescribeDomainDetail", "ModifyDomain"]);
    for action in ["DescribeDomainDetail", "ModifyDomain"] {
        assert_eq!(waf.params_of(action)["Domain"], "test.com");
    }
    let listen: Value = serde_json::from_str(&waf.params_of("ModifyDomain")["Listen"]).unwrap();
    assert_eq!(listen,
               json!({ "CertId": "123-cn-hangzhou", "TLSVersion": "tlsv1.1", "EnableTLSv3": false, "FocusHttps": true }));
}

#[tokio::test]
async fn waf_request_failure_names_the_operation() {
    let material = fixtures::valid_for_30_days("test.com");
    let waf = FakeOpenApi::new();
    waf.fail("ModifyDomain", "Waf.DomainNotExist", "the domain does not exist");
    let (_cas, uploader) = cas_uploader();
    let config = waf_config(json!({ "instanceId": "waf-1", "domain": "www.test.com" }));
    let deployer = AliyunWafDeployer::with_clients(config, waf.clone(), uploader, nil()).unwrap();

    let err = deployer.deploy(&ctx(), &material.cert_pem, &material.key_pem).await.unwrap_err();

    match err {
        AdapterError::Request { provider, operation, message } => {
            assert_eq!(provider, "aliyun-waf");
            assert_eq!(operation, "waf.ModifyDomain");
            assert!(message.contains("Waf.DomainNotExist"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn waf_logs_upload_trace() {
    let material = fixtures::valid_for_30_days("example.com");
    let book = RunLogBook::new();
    let node = WorkflowNode::new("deploy-1", "deploy", NodeType::Deploy, json!({}));
    let logger = book.logger_for(&node);
    let (_cas, uploader) = cas_uploader();
    let deployer = AliyunWafDeployer::with_clients(waf_config(json!({ "instanceId": "waf-1" })),
                                                   FakeOpenApi::new(),
                                                   uploader,
                                                   logger.clone()).unwrap();

    deployer.deploy(&ctx(), &material.cert_pem, &material.key_pem).await.unwrap();

    let records = logger.records();
    assert!(records.iter().any(|r| r.content.starts_with("certificate file uploaded")));
    assert!(records.iter().any(|r| r.content.starts_with("waf.ModifyDefaultHttps completed")));
}

#[tokio::test]
async fn dcdn_wildcard_uses_leading_dot() {
    let material = fixtures::valid_for_30_days("example.com");
    let dcdn = FakeOpenApi::new();
    let mut config = access();
    config["domain"] = json!("*.example.com");
    let config: AliyunDcdnConfig = serde_json::from_value(config).unwrap();
    let deployer = AliyunDcdnDeployer::with_client(config, dcdn.clone(), nil()).unwrap();

    deployer.deploy(&ctx(), &material.cert_pem, &material.key_pem).await.unwrap();

    let sent = dcdn.params_of("SetDcdnDomainSSLCertificate");
    assert_eq!(sent["DomainName"], ".example.com");
    assert_eq!(sent["CertType"], "upload");
    assert_eq!(sent["SSLProtocol"], "on");
    assert_eq!(sent["SSLPub"], material.cert_pem);
    assert_eq!(sent["SSLPri"], material.key_pem);
    assert!(sent["CertName"].starts_with("certflow-"));
}

#[tokio::test]
async fn cas_reuses_certificate_with_same_fingerprint() {
    let material = fixtures::valid_for_30_days("example.com");
    let fingerprint = parse_certificate_pem(&material.cert_pem).unwrap().fingerprint.to_uppercase();
    let cas = FakeOpenApi::new();
    cas.respond("ListUserCertificateOrder",
                json!({
                    "TotalCount": 2,
                    "CertificateOrderList": [
                        { "CertificateId": 7, "Name": "other", "Fingerprint": "00FF" },
                        { "CertificateId": 9, "Name": "certflow-1700000000000", "Fingerprint": fingerprint },
                    ],
                }));
    let uploader = AliyunCasUploader::with_client(cas.clone(), nil());

    let result = uploader.upload(&ctx(), &material.cert_pem, &material.key_pem).await.unwrap();

    assert_eq!(result.cert_id, "9");
    assert_eq!(result.cert_name, "certflow-1700000000000");
    assert_eq!(cas.actions(), vec!["ListUserCertificateOrder"]);
}

#[tokio::test]
async fn cas_rejects_unparseable_certificate_before_any_call() {
    let (cas, uploader) = cas_uploader();

    let err = uploader.upload(&ctx(), "not a pem", "key").await.unwrap_err();

    assert!(matches!(err, AdapterError::Certificate { ref provider, .. } if provider == "aliyun-cas"));
    assert_eq!(WorkflowError::from(err).kind(), ErrorKind::CertificateInvalid);
    assert!(cas.actions().is_empty());
}

#[tokio::test]
async fn cas_uploads_when_nothing_matches() {
    let material = fixtures::valid_for_30_days("example.com");
    let (cas, uploader) = cas_uploader();

    let result = uploader.upload(&ctx(), &material.cert_pem, &material.key_pem).await.unwrap();

    assert_eq!(result.cert_id, "123");
    assert!(result.cert_name.starts_with("certflow-"));
    let sent = cas.params_of("UploadUserCertificate");
    assert_eq!(sent["Cert"], material.cert_pem);
    assert_eq!(sent["Key"], material.key_pem);
}

#[tokio::test]
async fn cancellation_interrupts_a_hanging_call() {
    let material = fixtures::valid_for_30_days("example.com");
    let mut config = access();
    config["domain"] = json!("example.com");
    let config: AliyunDcdnConfig = serde_json::from_value(config).unwrap();
    let deployer = AliyunDcdnDeployer::with_client(config, FakeOpenApi::hanging(), nil()).unwrap();
    let ctx = ctx();
    let token = ctx.cancellation_token().clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        token.cancel();
    });

    let err = tokio::time::timeout(Duration::from_secs(5),
                                   deployer.deploy(&ctx, &material.cert_pem, &material.key_pem))
        .await
        .expect("deploy must return once canceled")
        .unwrap_err();

    assert_eq!(err, AdapterError::Canceled { operation: "dcdn.SetDcdnDomainSSLCertificate".into() });
}

#[tokio::test]
async fn deadline_interrupts_a_hanging_call() {
    let material = fixtures::valid_for_30_days("example.com");
    let cas = FakeOpenApi::hanging();
    let uploader = AliyunCasUploader::with_client(cas.clone(), nil());
    let ctx = ctx().with_timeout(Duration::from_millis(50));

    let err = uploader.upload(&ctx, &material.cert_pem, &material.key_pem).await.unwrap_err();

    assert!(matches!(err, AdapterError::Canceled { ref operation } if operation == "cas.ListUserCertificateOrder"));
    assert_eq!(cas.actions(), vec!["ListUserCertificateOrder"]);
}
