use chrono::Utc;

use crate::helpers::{token_of, TestApp};

#[tokio::test]
async fn confirmations_without_token_are_rejected_with_400() {
    let app = TestApp::spawn_app().await;
    let client = reqwest::Client::new();

    let response = client
        .get(&format!("{}/subscriptions/confirm", &app.address))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn subscriptions_coming_from_link_are_confirmed() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_email_api().await;

    test_app.subscribe("frank@example.com").await;
    let links = test_app.last_email_links().await;

    let response = reqwest::get(links.confirmation).await.unwrap();
    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body["email"], "frank@example.com");

    let subscriber = test_app.fetch_subscriber("frank@example.com").await;
    assert_eq!(subscriber.status, "confirmed");
    assert!(subscriber.confirmed_at.is_some());
    assert!(subscriber.confirmation_token_hash.is_none());
}

#[tokio::test]
async fn confirmation_link_works_only_once() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_email_api().await;

    test_app.subscribe("stiltwalker@example.com").await;
    let links = test_app.last_email_links().await;

    let first = reqwest::get(links.confirmation.clone()).await.unwrap();
    let second = reqwest::get(links.confirmation).await.unwrap();

    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 400);
}

#[tokio::test]
async fn unknown_expired_and_spent_tokens_get_the_same_answer() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_email_api().await;

    test_app.subscribe("spent@example.com").await;
    let spent = token_of(&test_app.last_email_links().await.confirmation);
    test_app.get_confirmation(&spent).await;

    test_app.subscribe("expired@example.com").await;
    let expired = token_of(&test_app.last_email_links().await.confirmation);
    sqlx::query("UPDATE subscriptions SET confirmation_token_expires_at = $1 WHERE email = $2")
        .bind(Utc::now() - chrono::Duration::minutes(1))
        .bind("expired@example.com")
        .execute(&test_app.db_pool)
        .await
        .unwrap();

    let unknown = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

    let mut bodies = Vec::new();
    for token in [spent.as_str(), expired.as_str(), unknown] {
        let response = test_app.get_confirmation(token).await;
        assert_eq!(response.status(), 400);
        bodies.push(response.text().await.unwrap());
    }

    assert!(bodies.iter().all(|body| body == &bodies[0]));
    assert_eq!(
        test_app.fetch_subscriber("expired@example.com").await.status,
        "pending"
    );
}

#[tokio::test]
async fn concurrent_confirmations_succeed_exactly_once() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_email_api().await;

    test_app.subscribe("contortionist@example.com").await;
    let link = test_app.last_email_links().await.confirmation;

    let requests = (0..10).map(|_| reqwest::get(link.clone()));
    let responses = futures_join_all(requests).await;

    let successes = responses
        .iter()
        .filter(|response| response.status() == 200)
        .count();
    let rejections = responses
        .iter()
        .filter(|response| response.status() == 400)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(rejections, 9);
}

async fn futures_join_all<F>(requests: impl Iterator<Item = F>) -> Vec<reqwest::Response>
where
    F: std::future::Future<Output = Result<reqwest::Response, reqwest::Error>> + Send + 'static,
{
    let handles: Vec<_> = requests.map(tokio::spawn).collect();
    let mut responses = Vec::new();
    for handle in handles {
        responses.push(handle.await.unwrap().unwrap());
    }
    responses
}
