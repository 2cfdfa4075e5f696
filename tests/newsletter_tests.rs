mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use common::{body_json, json_request, MockSender};
use journeys::entities::{DeliveryStatus, NewsletterDelivery, PublishStatus};
use journeys::newsletter::{self, NO_SUBSCRIBERS};
use journeys::store::articles::{self, NewArticle};
use journeys::store::subscribers::{self, Subscription};
use sea_orm::EntityTrait;
use serde_json::json;

fn payload(emails: &[&str]) -> serde_json::Value {
    let subscribers: Vec<_> = emails.iter().map(|e| json!({ "email": e, "name": "قارئ" })).collect();
    json!({
        "title": "عنوان المقال",
        "content": "<p>محتوى المقال</p>",
        "type": "article",
        "subscribers": subscribers,
    })
}

#[tokio::test]
async fn sends_to_every_subscriber() {
    let app = common::test_app().await;

    let response = app
        .send(json_request("POST", "/send-newsletter", payload(&["a@x.com", "b@x.com", "c@x.com"])))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["sent"], 3);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["message"], "تم إرسال النشرة البريدية بنجاح إلى 3 مشترك");

    let sent = app.sender.sent.lock().unwrap();
    assert_eq!(sent.len(), 3);
    assert!(sent.iter().all(|e| e.subject == "مقال جديد: عنوان المقال"));
    assert!(sent.iter().all(|e| e.text.contains("محتوى المقال...")));
}

#[tokio::test]
async fn partial_failure_still_returns_200_with_counts() {
    let app = common::test_app_with(Some(MockSender::rejecting(&["b@x.com"]))).await;

    let response = app
        .send(json_request("POST", "/send-newsletter", payload(&["a@x.com", "b@x.com", "c@x.com"])))
        .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["sent"], 2);
    assert_eq!(body["failed"], 1);
    assert_eq!(
        body["message"],
        "تم إرسال النشرة البريدية بنجاح إلى 2 مشترك وفشل في إرسالها إلى 1 مشترك"
    );
}

#[tokio::test]
async fn deliveries_are_recorded_per_recipient() {
    let app = common::test_app_with(Some(MockSender::rejecting(&["b@x.com"]))).await;
    app.send(json_request("POST", "/send-newsletter", payload(&["a@x.com", "b@x.com"])))
        .await;

    let rows = NewsletterDelivery::find().all(&app.state.store.db).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].batch_id, rows[1].batch_id);
    let failed = rows.iter().find(|r| r.email == "b@x.com").unwrap();
    assert_eq!(failed.status, DeliveryStatus::Failed);
    assert_eq!(failed.attempts, 1);
    assert!(failed.error.is_some());
    let sent = rows.iter().find(|r| r.email == "a@x.com").unwrap();
    assert_eq!(sent.status, DeliveryStatus::Sent);
}

#[tokio::test]
async fn empty_subscriber_list_is_rejected_without_calling_provider() {
    let app = common::test_app().await;

    let response = app.send(json_request("POST", "/send-newsletter", payload(&[]))).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], NO_SUBSCRIBERS);
    assert_eq!(app.sender.calls(), 0);
}

#[tokio::test]
async fn missing_fields_are_rejected() {
    let app = common::test_app().await;
    let mut body = payload(&["a@x.com"]);
    body.as_object_mut().unwrap().remove("title");

    let response = app.send(json_request("POST", "/send-newsletter", body)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["error"],
        "Missing required fields: title, content, or type"
    );
    assert_eq!(app.sender.calls(), 0);
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = common::test_app().await;
    let request = Request::builder()
        .method("POST")
        .uri("/send-newsletter")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["error"].is_string());
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let app = common::test_app().await;
    let request = Request::builder()
        .method("GET")
        .uri("/send-newsletter")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(body_json(response).await["error"], "Method not allowed");
}

#[tokio::test]
async fn preflight_returns_cors_headers() {
    let app = common::test_app().await;
    let request = Request::builder()
        .method("OPTIONS")
        .uri("/send-newsletter")
        .header("origin", "https://blog.example.com")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["access-control-allow-origin"], "*");
    assert_eq!(headers["access-control-allow-methods"], "POST, OPTIONS");
    assert_eq!(
        headers["access-control-allow-headers"],
        "authorization, x-client-info, apikey, content-type"
    );
}

#[tokio::test]
async fn missing_provider_key_is_a_server_error() {
    let app = common::test_app_without_email().await;

    let response = app
        .send(json_request("POST", "/send-newsletter", payload(&["a@x.com"])))
        .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Email provider API key not configured"
    );
}

#[tokio::test]
async fn announce_sends_to_active_subscribers_only() {
    let app = common::test_app().await;
    let store = &app.state.store;

    let article = articles::create(
        store,
        NewArticle {
            title: "مقال منشور".to_string(),
            excerpt: "ملخص".to_string(),
            content: None,
            category: "عام".to_string(),
            image_url: None,
            status: PublishStatus::Published,
        },
    )
    .await
    .unwrap();

    let active = subscribers::subscribe(
        store,
        Subscription {
            name: "أ".to_string(),
            email: "a@x.com".to_string(),
        },
    )
    .await
    .unwrap();
    let gone = subscribers::subscribe(
        store,
        Subscription {
            name: "ب".to_string(),
            email: "b@x.com".to_string(),
        },
    )
    .await
    .unwrap();
    subscribers::update_status(store, gone.id, journeys::entities::SubscriberStatus::Unsubscribed)
        .await
        .unwrap();

    let dispatcher = app.state.dispatcher().unwrap();
    let response = newsletter::announce_article(store, &dispatcher, article.id).await.unwrap();

    assert_eq!((response.sent, response.failed), (1, 0));
    let sent = app.sender.sent.lock().unwrap();
    assert_eq!(sent[0].to.email, active.email);
    assert!(sent[0].text.contains("ملخص..."));
}

#[tokio::test]
async fn announcing_without_subscribers_is_rejected() {
    let app = common::test_app().await;
    let dispatcher = app.state.dispatcher().unwrap();

    let err = newsletter::announce(
        &app.state.store,
        &dispatcher,
        "t",
        "c",
        journeys::entities::ContentKind::Company,
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), NO_SUBSCRIBERS);
    assert_eq!(app.sender.calls(), 0);
}
