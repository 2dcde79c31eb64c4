mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use monoliet_portal::entities::{executions, prelude::*};
use monoliet_portal::services::billing::{monthly_recurring_revenue, send_invoice_reminders};
use monoliet_portal::services::health::{check_workflow_health, IssueKind};
use monoliet_portal::services::notifier::Notifier;
use monoliet_portal::services::sync_status::{self, jobs};

use crate::common::{
    auth_token, create_client, create_invoice, create_user, create_workflow, date, send,
    setup_test_db, test_app, test_settings, ADMIN_KEY,
};

const NO_N8N: &str = "http://127.0.0.1:9";

fn admin() -> Option<(&'static str, String)> {
    Some(("x-api-key", ADMIN_KEY.to_string()))
}

fn token(user: &monoliet_portal::entities::users::Model) -> Option<(&'static str, String)> {
    Some(("authorization", auth_token(user)))
}

#[tokio::test]
async fn test_health_is_public() {
    let db = setup_test_db().await;
    let app = test_app(db, NO_N8N);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_requests_without_credentials_are_rejected() {
    let db = setup_test_db().await;
    let app = test_app(db, NO_N8N);

    let (status, body) = send(&app, "GET", "/api/workflows", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let bad_token = Some(("authorization", "Token nope".to_string()));
    let (status, _) = send(&app, "GET", "/api/workflows", bad_token, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let bad_key = Some(("x-api-key", "wrong".to_string()));
    let (status, _) = send(&app, "GET", "/api/clients", bad_key, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_client_user_only_sees_own_records() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let globex = create_client(&db, "Globex").await;
    let own = create_workflow(&db, &acme, "wf-acme", "active").await;
    let other = create_workflow(&db, &globex, "wf-globex", "active").await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;
    let app = test_app(db, NO_N8N);

    let (status, body) = send(&app, "GET", "/api/workflows", token(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["id"], own.id.to_string());

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/workflows/{}", other.id),
        token(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        "GET",
        &format!("/api/clients/{}", globex.id),
        token(&user),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Staff see everything
    let (status, body) = send(&app, "GET", "/api/workflows", admin(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_user_without_client_sees_nothing() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    create_workflow(&db, &acme, "wf-acme", "active").await;
    let orphan = create_user(&db, "orphan", false, None).await;
    let app = test_app(db, NO_N8N);

    let (status, body) = send(&app, "GET", "/api/workflows", token(&orphan), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_array().unwrap().is_empty());

    let (status, _) = send(&app, "GET", "/api/clients/me", token(&orphan), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_view_hides_fees_and_notes() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;
    let staff = create_user(&db, "ops", true, None).await;
    let app = test_app(db, NO_N8N);
    let uri = format!("/api/clients/{}", acme.id);

    let (status, body) = send(&app, "GET", &uri, token(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["company_name"], "Acme BV");
    assert!(body.get("monthly_fee").is_none());
    assert!(body.get("setup_fee").is_none());
    assert!(body.get("notes").is_none());

    let (status, body) = send(&app, "GET", &uri, token(&staff), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["notes"], "Pays late");
    assert!(body.get("monthly_fee").is_some());

    let (status, body) = send(&app, "GET", "/api/clients/me", token(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], acme.id.to_string());
}

#[tokio::test]
async fn test_staff_only_writes() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;
    let app = test_app(db, NO_N8N);

    let payload = json!({
        "client_id": acme.id,
        "workflow_name": "Order sync",
        "n8n_workflow_id": "wf-new",
    });

    let (status, body) =
        send(&app, "POST", "/api/workflows", token(&user), Some(payload.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "FORBIDDEN");

    let (status, body) = send(&app, "POST", "/api/workflows", admin(), Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "active");
    assert_eq!(body["execution_count"], 0);
    assert_eq!(body["n8n_workflow_url"], format!("{}/workflow/wf-new", NO_N8N));

    // Same n8n id twice is refused
    let duplicate = json!({
        "client_id": acme.id,
        "workflow_name": "Order sync again",
        "n8n_workflow_id": "wf-new",
    });
    let (status, _) = send(&app, "POST", "/api/workflows", admin(), Some(duplicate)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_credentials_are_encrypted_and_hidden_from_clients() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;
    let app = test_app(db, NO_N8N);

    let payload = json!({
        "client_id": acme.id,
        "service_name": "Shopify",
        "credential_type": "api_key",
        "data": { "api_key": "shpat_secret" },
    });
    let (status, body) = send(&app, "POST", "/api/credentials", admin(), Some(payload)).await;
    assert_eq!(status, StatusCode::OK);
    let ciphertext = body["encrypted_data"].as_str().unwrap();
    assert!(!ciphertext.contains("shpat_secret"));

    let (status, body) = send(&app, "GET", "/api/credentials", token(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    let listed = body.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["service_name"], "Shopify");
    assert!(listed[0].get("encrypted_data").is_none());
}

#[tokio::test]
async fn test_ticket_is_bound_to_users_client() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let globex = create_client(&db, "Globex").await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;
    let app = test_app(db, NO_N8N);

    let (status, body) = send(
        &app,
        "POST",
        "/api/support-tickets",
        token(&user),
        Some(json!({ "subject": "Sync stuck", "description": "No orders since Monday" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["client_id"], acme.id.to_string());
    assert_eq!(body["status"], "open");
    assert_eq!(body["priority"], "medium");
    assert!(body["resolved_at"].is_null());

    let (status, _) = send(
        &app,
        "POST",
        "/api/support-tickets",
        token(&user),
        Some(json!({
            "client_id": globex.id,
            "subject": "Not mine",
            "description": "",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Staff must say which client
    let (status, _) = send(
        &app,
        "POST",
        "/api/support-tickets",
        admin(),
        Some(json!({ "subject": "Internal", "description": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_resolved_at_is_stamped_once() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;
    let app = test_app(db, NO_N8N);

    let (_, ticket) = send(
        &app,
        "POST",
        "/api/support-tickets",
        token(&user),
        Some(json!({ "subject": "Broken", "description": "", "priority": "high" })),
    )
    .await;
    let uri = format!("/api/support-tickets/{}", ticket["id"].as_str().unwrap());

    let (status, _) = send(
        &app,
        "PATCH",
        &uri,
        token(&user),
        Some(json!({ "status": "resolved" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, resolved) =
        send(&app, "PATCH", &uri, admin(), Some(json!({ "status": "resolved" }))).await;
    assert_eq!(status, StatusCode::OK);
    let stamped = resolved["resolved_at"].as_str().unwrap().to_string();

    let (_, reopened) =
        send(&app, "PATCH", &uri, admin(), Some(json!({ "status": "in_progress" }))).await;
    assert_eq!(reopened["resolved_at"], stamped.as_str());

    let (_, again) = send(&app, "PATCH", &uri, admin(), Some(json!({ "status": "resolved" }))).await;
    assert_eq!(again["resolved_at"], stamped.as_str());
}

#[tokio::test]
async fn test_invoice_numbers_are_sequential_per_year() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let app = test_app(db, NO_N8N);
    let due = (Utc::now().date_naive() + Duration::days(14)).to_string();

    let mut numbers = Vec::new();
    for _ in 0..2 {
        let (status, body) = send(
            &app,
            "POST",
            "/api/invoices",
            admin(),
            Some(json!({
                "client_id": acme.id,
                "amount": "499.00",
                "type": "monthly",
                "due_date": due,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "pending");
        numbers.push(body["invoice_number"].as_str().unwrap().to_string());
    }

    let year = Utc::now().date_naive().format("%Y");
    assert_eq!(numbers[0], format!("INV-{}-001", year));
    assert_eq!(numbers[1], format!("INV-{}-002", year));

    let (status, _) = send(
        &app,
        "POST",
        "/api/invoices",
        admin(),
        Some(json!({
            "client_id": acme.id,
            "amount": "-1.00",
            "type": "additional",
            "due_date": due,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_mark_paid_twice_is_rejected() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let invoice = create_invoice(&db, &acme, "INV-2024-001", "pending", date(2024, 2, 1)).await;
    let app = test_app(db, NO_N8N);
    let uri = format!("/api/invoices/{}/mark-paid", invoice.id);

    let (status, body) = send(&app, "POST", &uri, admin(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "paid");
    assert!(!body["paid_date"].is_null());

    let (status, _) = send(&app, "POST", &uri, admin(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        "POST",
        &format!("/api/invoices/{}/mark-paid", Uuid::new_v4()),
        admin(),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_execution_stats_are_scoped() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let globex = create_client(&db, "Globex").await;
    let acme_wf = create_workflow(&db, &acme, "wf-acme", "active").await;
    let globex_wf = create_workflow(&db, &globex, "wf-globex", "active").await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;

    let today = Utc::now().date_naive();
    for (workflow, total, success) in [(&acme_wf, 10, 8), (&globex_wf, 4, 1)] {
        executions::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(workflow.client_id),
            workflow_id: Set(workflow.id),
            execution_date: Set(today - Duration::days(1)),
            total_count: Set(total),
            success_count: Set(success),
            error_count: Set(total - success),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&db)
        .await
        .unwrap();
    }
    let app = test_app(db, NO_N8N);

    let (status, body) = send(&app, "GET", "/api/executions/stats", token(&user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_executions"], 10);
    assert_eq!(body["total_successes"], 8);
    assert_eq!(body["total_errors"], 2);
    assert_eq!(body["success_rate"], 80.0);

    let (_, body) = send(&app, "GET", "/api/executions/stats?days=7", admin(), None).await;
    assert_eq!(body["total_executions"], 14);

    let (status, _) = send(&app, "GET", "/api/executions/stats?days=-1", admin(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = send(&app, "GET", "/api/executions", token(&user), None).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_admin_sync_runs_against_n8n() {
    let db = setup_test_db().await;
    let server = MockServer::start().await;
    let acme = create_client(&db, "Acme BV").await;
    create_workflow(&db, &acme, "wf-1", "active").await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;

    Mock::given(method("GET"))
        .and(path("/api/v1/executions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                { "id": 1, "workflowId": "wf-1", "status": "success", "startedAt": "2024-01-20T08:00:00Z" },
                { "id": 2, "workflowId": "wf-1", "status": "crashed", "startedAt": "2024-01-20T09:00:00Z" },
                { "id": 3, "workflowId": "ghost", "status": "success", "startedAt": "2024-01-20T09:00:00Z" },
            ],
        })))
        .mount(&server)
        .await;

    let app = test_app(db.clone(), &server.uri());

    let (status, _) = send(&app, "POST", "/api/admin/sync", token(&user), Some(json!({}))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) =
        send(&app, "POST", "/api/admin/sync", admin(), Some(json!({ "limit": 50 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["created"], 1);
    assert_eq!(body["updated"], 0);
    assert_eq!(body["skipped"], 1);
    assert_eq!(body["errors"], 0);
    assert!(body.get("fetch_error").is_none());

    let row = Executions::find().one(&db).await.unwrap().unwrap();
    assert_eq!((row.total_count, row.success_count, row.error_count), (2, 1, 1));

    let (status, body) = send(&app, "GET", "/api/admin/jobs", admin(), None).await;
    assert_eq!(status, StatusCode::OK);
    let job = &body.as_array().unwrap()[0];
    assert_eq!(job["job_name"], jobs::EXECUTION_SYNC);
    assert_eq!(job["success_count"], 1);
}

#[tokio::test]
async fn test_admin_sync_reports_fetch_failure() {
    let db = setup_test_db().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/executions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&server)
        .await;

    let app = test_app(db.clone(), &server.uri());
    let (status, body) =
        send(&app, "POST", "/api/admin/sync", admin(), Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["errors"], 1);
    assert!(body["fetch_error"].as_str().is_some());

    let recorded = sync_status::all_jobs(&db).await.unwrap();
    assert_eq!(recorded[0].error_count, 1);
    assert!(recorded[0].last_success_at.is_none());
}

#[tokio::test]
async fn test_n8n_health_reports_connection() {
    let db = setup_test_db().await;
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let app = test_app(db, &server.uri());
    let (status, body) = send(&app, "GET", "/api/admin/n8n/health", admin(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["connected"], true);
    assert_eq!(body["status"], "connected");
}

#[tokio::test]
async fn test_reminders_mark_past_due_invoices_overdue() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let today = date(2024, 3, 10);
    let late = create_invoice(&db, &acme, "INV-2024-001", "pending", date(2024, 3, 1)).await;
    let soon = create_invoice(&db, &acme, "INV-2024-002", "pending", date(2024, 3, 12)).await;
    create_invoice(&db, &acme, "INV-2024-003", "pending", date(2024, 4, 30)).await;
    create_invoice(&db, &acme, "INV-2024-004", "paid", date(2024, 3, 1)).await;

    let notifier = Notifier::from_settings(test_settings(NO_N8N));
    let run = send_invoice_reminders(&db, &notifier, today).await.unwrap();

    assert_eq!(run.checked, 3);
    assert_eq!(run.sent, 2);
    assert_eq!(run.marked_overdue, 1);
    assert_eq!(run.errors, 0);

    let late = Invoices::find_by_id(late.id).one(&db).await.unwrap().unwrap();
    assert_eq!(late.status, "overdue");
    let soon = Invoices::find_by_id(soon.id).one(&db).await.unwrap().unwrap();
    assert_eq!(soon.status, "pending");
}

#[tokio::test]
async fn test_mrr_counts_active_clients_only() {
    let db = setup_test_db().await;
    create_client(&db, "Acme BV").await;
    let paused = create_client(&db, "Globex").await;

    let mut active: monoliet_portal::entities::clients::ActiveModel = paused.into();
    active.status = Set("paused".to_string());
    active.update(&db).await.unwrap();

    let mrr: Decimal = monthly_recurring_revenue(&db).await.unwrap();
    assert_eq!(mrr, dec!(499.00));
}

#[tokio::test]
async fn test_health_check_flags_error_and_low_success() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let broken = create_workflow(&db, &acme, "wf-broken", "error").await;
    let flaky = create_workflow(&db, &acme, "wf-flaky", "active").await;
    create_workflow(&db, &acme, "wf-paused", "paused").await;

    let today = date(2024, 3, 10);
    executions::ActiveModel {
        id: Set(Uuid::new_v4()),
        client_id: Set(acme.id),
        workflow_id: Set(flaky.id),
        execution_date: Set(date(2024, 3, 8)),
        total_count: Set(10),
        success_count: Set(5),
        error_count: Set(5),
        created_at: Set(Utc::now().fixed_offset()),
    }
    .insert(&db)
    .await
    .unwrap();

    let report = check_workflow_health(&db, 80, today).await.unwrap();
    assert_eq!(report.workflows_checked, 2);
    assert!(!report.is_healthy());

    let kinds: Vec<_> = report
        .issues
        .iter()
        .map(|issue| (issue.workflow_id, issue.kind))
        .collect();
    assert!(kinds.contains(&(broken.id, IssueKind::ErrorStatus)));
    assert!(kinds.contains(&(flaky.id, IssueKind::LowSuccessRate)));
    assert_eq!(report.issues.len(), 2);
}

#[tokio::test]
async fn test_admin_dashboard_totals() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    create_workflow(&db, &acme, "wf-1", "error").await;
    create_invoice(&db, &acme, "INV-2024-001", "overdue", date(2024, 1, 1)).await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;
    let app = test_app(db, NO_N8N);

    let (status, _) = send(&app, "GET", "/api/admin/dashboard", token(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/api/admin/dashboard", admin(), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["clients"]["total"], 1);
    assert_eq!(body["clients"]["active"], 1);
    assert_eq!(body["overdue_invoices"], 1);
    assert_eq!(body["workflows_in_error"], 1);
}

#[tokio::test]
async fn test_execution_chart_series() {
    let db = setup_test_db().await;
    let acme = create_client(&db, "Acme BV").await;
    let globex = create_client(&db, "Globex").await;
    let acme_wf = create_workflow(&db, &acme, "wf-acme", "active").await;
    let globex_wf = create_workflow(&db, &globex, "wf-globex", "active").await;
    let user = create_user(&db, "jan", false, Some(&acme)).await;

    let today = Utc::now().date_naive();
    for (workflow, days_ago, total, success) in [
        (&acme_wf, 2, 10, 8),
        (&acme_wf, 0, 3, 3),
        (&globex_wf, 2, 4, 1),
        (&globex_wf, 30, 9, 9),
    ] {
        executions::ActiveModel {
            id: Set(Uuid::new_v4()),
            client_id: Set(workflow.client_id),
            workflow_id: Set(workflow.id),
            execution_date: Set(today - Duration::days(days_ago)),
            total_count: Set(total),
            success_count: Set(success),
            error_count: Set(total - success),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(&db)
        .await
        .unwrap();
    }
    let app = test_app(db, NO_N8N);

    let (status, _) =
        send(&app, "GET", "/api/admin/executions/chart", token(&user), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Default window: today and the seven days before it
    let (status, body) = send(&app, "GET", "/api/admin/executions/chart", admin(), None).await;
    assert_eq!(status, StatusCode::OK);
    let labels = body["labels"].as_array().unwrap();
    assert_eq!(labels.len(), 8);
    assert_eq!(labels[7], today.format("%Y-%m-%d").to_string());
    assert_eq!(body["success"], json!([0, 0, 0, 0, 0, 9, 0, 3]));
    assert_eq!(body["errors"], json!([0, 0, 0, 0, 0, 5, 0, 0]));

    let (_, body) = send(
        &app,
        "GET",
        "/api/admin/executions/chart?days=2&workflow=wf-acme",
        admin(),
        None,
    )
    .await;
    assert_eq!(body["success"], json!([8, 0, 3]));
    assert_eq!(body["errors"], json!([2, 0, 0]));

    let uri = format!("/api/admin/executions/chart?days=2&client={}", globex.id);
    let (_, body) = send(&app, "GET", &uri, admin(), None).await;
    assert_eq!(body["success"], json!([1, 0, 0]));
    assert_eq!(body["errors"], json!([3, 0, 0]));

    let (_, body) = send(
        &app,
        "GET",
        "/api/admin/executions/chart?days=1&workflow=not-registered",
        admin(),
        None,
    )
    .await;
    assert_eq!(body["success"], json!([0, 0]));

    let (status, _) =
        send(&app, "GET", "/api/admin/executions/chart?days=-3", admin(), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_activate_workflow_puts_full_body_and_refreshes_list() {
    let db = setup_test_db().await;
    let server = MockServer::start().await;

    // First list fetch sees it inactive; any later fetch sees it active
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "wf-9", "name": "Lead intake", "active": false }],
        })))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/workflows"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "id": "wf-9", "name": "Lead intake", "active": true }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/v1/workflows/wf-9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wf-9",
            "name": "Lead intake",
            "active": false,
            "nodes": [{ "name": "Webhook" }],
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/workflows/wf-9"))
        .and(body_partial_json(json!({
            "active": true,
            "name": "Lead intake",
            "nodes": [{ "name": "Webhook" }],
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "wf-9",
            "name": "Lead intake",
            "active": true,
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = test_app(db, &server.uri());

    let (_, body) = send(&app, "GET", "/api/admin/n8n/workflows", admin(), None).await;
    assert_eq!(body[0]["active"], false);
    // Served from the cache
    let (_, body) = send(&app, "GET", "/api/admin/n8n/workflows", admin(), None).await;
    assert_eq!(body[0]["active"], false);

    let (status, body) = send(
        &app,
        "POST",
        "/api/admin/n8n/workflows/wf-9/activate",
        admin(),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["active"], true);
    assert_eq!(body["action"], "activate");

    let (_, body) = send(&app, "GET", "/api/admin/n8n/workflows", admin(), None).await;
    assert_eq!(body[0]["active"], true);
}
