//! Audit creation, polling, and report download through the binary.


use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use assert_cmd::cargo::cargo_bin_cmd;
use fixtures::{audit, can_bind_localhost, fast_polling_config, store_token, temp_home, user};
use predicates::prelude::*;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn signed_in_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user()))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_new_audit_is_watched_until_completed() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    store_token(home.path(), "good");
    fast_polling_config(home.path());
    let server = signed_in_server().await;

    Mock::given(method("POST"))
        .and(path("/audits/"))
        .and(body_json(json!({"url": "example.com", "output_language": "en"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(audit("pending")))
        .expect(1)
        .mount(&server)
        .await;

    let polls = Arc::new(AtomicUsize::new(0));
    let polls_clone = Arc::clone(&polls);
    Mock::given(method("GET"))
        .and(path("/audits/a1"))
        .respond_with(move |_: &wiremock::Request| {
            let n = polls_clone.fetch_add(1, Ordering::SeqCst);
            let status = if n == 0 { "running" } else { "completed" };
            ResponseTemplate::new(200).set_body_json(audit(status))
        })
        .expect(2)
        .mount(&server)
        .await;

    cargo_bin_cmd!("auditpulse")
        .env("AUDITPULSE_HOME", home.path())
        .env("AUDITPULSE_API_URL", server.uri())
        .args(["audits", "new", "example.com", "--watch"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Audit a1 submitted"))
        .stdout(predicate::str::contains("Running"))
        .stdout(predicate::str::contains("Overall score"))
        .stdout(predicate::str::contains("87"))
        .stdout(predicate::str::contains("Security"))
        .stdout(predicate::str::contains("auditpulse audits download a1"));

    assert_eq!(polls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_audit_shows_server_error() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    store_token(home.path(), "good");
    let server = signed_in_server().await;

    let mut failed = audit("failed");
    failed["error_message"] = "Site did not respond".into();
    Mock::given(method("GET"))
        .and(path("/audits/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(failed))
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("auditpulse")
        .env("AUDITPULSE_HOME", home.path())
        .env("AUDITPULSE_API_URL", server.uri())
        .args(["audits", "watch", "a1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Audit failed"))
        .stdout(predicate::str::contains("Site did not respond"));
}

#[tokio::test]
async fn test_quota_rejection_is_shown_verbatim() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    store_token(home.path(), "good");
    let server = signed_in_server().await;

    Mock::given(method("POST"))
        .and(path("/audits/"))
        .respond_with(
            ResponseTemplate::new(402)
                .set_body_json(json!({"detail": "Monthly audit limit reached"})),
        )
        .mount(&server)
        .await;

    cargo_bin_cmd!("auditpulse")
        .env("AUDITPULSE_HOME", home.path())
        .env("AUDITPULSE_API_URL", server.uri())
        .args(["audits", "new", "example.com"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Monthly audit limit reached"));

    // Business errors leave the session intact.
    assert_eq!(fixtures::stored(home.path())["ap_token"], "good");
}

#[tokio::test]
async fn test_download_writes_report() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    store_token(home.path(), "good");
    let out = TempDir::new().unwrap();
    let server = signed_in_server().await;

    Mock::given(method("GET"))
        .and(path("/audits/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(audit("completed")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audits/a1/download"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "content-disposition",
                    r#"attachment; filename="seo_audit_example.pdf""#,
                )
                .set_body_bytes(b"%PDF-1.7 report".to_vec()),
        )
        .expect(1)
        .mount(&server)
        .await;

    cargo_bin_cmd!("auditpulse")
        .env("AUDITPULSE_HOME", home.path())
        .env("AUDITPULSE_API_URL", server.uri())
        .args(["audits", "download", "a1", "--out"])
        .arg(out.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("seo_audit_example.pdf"));

    let saved = fs::read(out.path().join("seo_audit_example.pdf")).unwrap();
    assert_eq!(saved, b"%PDF-1.7 report");
}

#[tokio::test]
async fn test_download_needs_report() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    store_token(home.path(), "good");
    let server = signed_in_server().await;

    Mock::given(method("GET"))
        .and(path("/audits/a1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(audit("running")))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/audits/a1/download"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    cargo_bin_cmd!("auditpulse")
        .env("AUDITPULSE_HOME", home.path())
        .env("AUDITPULSE_API_URL", server.uri())
        .args(["audits", "download", "a1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not available yet"));
}

#[tokio::test]
async fn test_dashboard_shows_stats_and_audits() {
    if !can_bind_localhost() {
        eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
        return;
    }
    let home = temp_home();
    store_token(home.path(), "good");
    let server = signed_in_server().await;

    let mut second = audit("completed");
    second["id"] = "a2".into();
    second["overall_score"] = 60.into();
    Mock::given(method("GET"))
        .and(path("/audits/"))
        .and(query_param("skip", "0"))
        .and(query_param("limit", "20"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([audit("completed"), second])),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "s1",
            "plan": "professional",
            "status": "active",
            "audits_per_month": 50,
            "audits_used_this_month": 2,
            "free_months_remaining": 0,
            "cancel_at_period_end": false
        })))
        .mount(&server)
        .await;

    cargo_bin_cmd!("auditpulse")
        .env("AUDITPULSE_HOME", home.path())
        .env("AUDITPULSE_API_URL", server.uri())
        .arg("dashboard")
        .assert()
        .success()
        .stdout(predicate::str::contains("Average score"))
        .stdout(predicate::str::contains("74"))
        .stdout(predicate::str::contains("professional"))
        .stdout(predicate::str::contains("2 / 50"))
        .stdout(predicate::str::contains("a2"));
}
