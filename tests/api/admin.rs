use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

async fn create_unconfirmed_subscriber(test_app: &TestApp, email: &str) {
    // When executing a mock with the method mount_as_scoped, the mock will stop to listen the /mail/send endpoint when it goes out of scope (so, when the execution of create_unconfirmed_subscriber
    // ends).
    let _mock_guard = Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .named("Create unconfirmed subscriber")
        .expect(1)
        .mount_as_scoped(&test_app.email_server)
        .await;

    test_app.subscribe(email).await;
}

async fn create_confirmed_subscriber(test_app: &TestApp, email: &str) {
    create_unconfirmed_subscriber(test_app, email).await;
    let links = test_app.last_email_links().await;

    reqwest::get(links.confirmation)
        .await
        .unwrap()
        .error_for_status()
        .unwrap();
}

fn newsletter_body() -> serde_json::Value {
    serde_json::json!({
      "title": "Spring season at the big top",
      "content": {
        "html": "<p>New aerial classes open in April.</p>"
      }
    })
}

#[tokio::test]
async fn admin_routes_reject_missing_or_wrong_credentials() {
    let test_app = TestApp::spawn_app().await;
    let client = reqwest::Client::new();

    let missing = client
        .get(&format!("{}/admin/subscribers", test_app.address))
        .send()
        .await
        .unwrap();
    let wrong = client
        .post(&format!("{}/admin/newsletters", test_app.address))
        .bearer_auth("not-the-key")
        .json(&newsletter_body())
        .send()
        .await
        .unwrap();

    assert_eq!(missing.status(), 401);
    assert_eq!(wrong.status(), 401);
    assert_eq!(
        missing.headers()["WWW-Authenticate"].to_str().unwrap(),
        "Bearer"
    );
}

#[tokio::test]
async fn subscribers_are_listed_and_filtered_by_status() {
    let test_app = TestApp::spawn_app().await;

    create_confirmed_subscriber(&test_app, "confirmed@example.com").await;
    create_unconfirmed_subscriber(&test_app, "pending@example.com").await;

    let all: serde_json::Value = test_app.get_subscribers(None).await.json().await.unwrap();
    let confirmed: serde_json::Value = test_app
        .get_subscribers(Some("confirmed"))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(all.as_array().unwrap().len(), 2);
    let confirmed = confirmed.as_array().unwrap();
    assert_eq!(confirmed.len(), 1);
    assert_eq!(confirmed[0]["email"], "confirmed@example.com");
    assert_eq!(confirmed[0]["status"], "confirmed");
    assert!(confirmed[0].get("unsubscribe_token").is_none());
}

#[tokio::test]
async fn listing_with_an_unknown_status_returns_400() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get_subscribers(Some("archived")).await;

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn newsletters_are_not_delivered_to_unconfirmed_subscribers() {
    let test_app = TestApp::spawn_app().await;

    create_unconfirmed_subscriber(&test_app, "pending@example.com").await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.post_newsletter(newsletter_body()).await;

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn newsletters_are_delivered_to_confirmed_subscribers_with_an_unsubscribe_link() {
    let test_app = TestApp::spawn_app().await;

    create_confirmed_subscriber(&test_app, "confirmed@example.com").await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.post_newsletter(newsletter_body()).await;
    let report: serde_json::Value = response.json().await.unwrap();

    assert_eq!(report["delivered"], 1);
    assert_eq!(report["failed"], 0);

    let received_requests = test_app.email_server.received_requests().await.unwrap();
    let body: serde_json::Value =
        serde_json::from_slice(&received_requests.last().unwrap().body).unwrap();
    let html = body["content"][0]["value"].as_str().unwrap();
    assert!(html.contains("/subscriptions/unsubscribe?token="));
}

#[tokio::test]
async fn newsletters_are_not_delivered_to_unsubscribed_subscribers() {
    let test_app = TestApp::spawn_app().await;

    create_confirmed_subscriber(&test_app, "leaver@example.com").await;
    let unsubscribe = test_app.last_email_links().await.unsubscribe;
    reqwest::get(unsubscribe)
        .await
        .unwrap()
        .error_for_status()
        .unwrap();

    Mock::given(any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&test_app.email_server)
        .await;

    let response = test_app.post_newsletter(newsletter_body()).await;

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn newsletters_returns_400_when_body_is_invalid() {
    let test_app = TestApp::spawn_app().await;
    let test_cases = vec![
        (
            serde_json::json!({
              "content": {
                "html": "<p>Newsletter content</p>"
              }
            }),
            "missing title",
        ),
        (
            serde_json::json!({
                "title": "Newsletter title",
            }),
            "missing content",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app.post_newsletter(invalid_body).await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
    }
}
