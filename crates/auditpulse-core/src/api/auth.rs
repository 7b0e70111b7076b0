//! `/auth/*` endpoints.

use auditpulse_types::{LoginData, ProfileUpdate, RegisterData, TokenResponse, UserProfile};
use reqwest::Method;

use super::{ApiClient, ApiResult, Body};

impl ApiClient {
    /// # Errors
    /// Returns the backend's message when registration is rejected.
    pub async fn register(&self, data: &RegisterData) -> ApiResult<TokenResponse> {
        self.request(Method::POST, "/auth/register", Body::json(data)?)
            .await
    }

    /// Password-grant login. The body is form-url-encoded with `username` and `password`.
    ///
    /// # Errors
    /// Returns the backend's message when the credentials are rejected.
    pub async fn login(&self, data: &LoginData) -> ApiResult<TokenResponse> {
        let form = vec![
            ("username", data.username.clone()),
            ("password", data.password.clone()),
        ];
        self.request(Method::POST, "/auth/login", Body::Form(form))
            .await
    }

    /// # Errors
    /// Fails when the token is missing, expired, or invalid.
    pub async fn me(&self) -> ApiResult<UserProfile> {
        self.request(Method::GET, "/auth/me", Body::Empty).await
    }

    /// # Errors
    /// Returns the backend's message when the update is rejected.
    pub async fn update_me(&self, update: &ProfileUpdate) -> ApiResult<UserProfile> {
        self.request(Method::PATCH, "/auth/me", Body::json(update)?)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wiremock::matchers::{body_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::storage::{MemoryStorage, TOKEN_KEY};

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    fn user_json() -> serde_json::Value {
        serde_json::json!({
            "id": "u1",
            "email": "ana@example.com",
            "preferred_language": "en",
            "is_active": true,
            "is_verified": true,
            "created_at": "2025-01-01T00:00:00"
        })
    }

    #[tokio::test]
    async fn test_login_is_form_encoded() {
        if !can_bind_localhost() {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/login"))
            .and(header("content-type", "application/x-www-form-urlencoded"))
            .and(body_string_contains("username=ana%40example.com"))
            .and(body_string_contains("password=s3cret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "token_type": "bearer",
                "user": user_json()
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Arc::new(MemoryStorage::new()));
        let resp = client
            .login(&LoginData {
                username: "ana@example.com".to_string(),
                password: "s3cret".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(resp.access_token, "tok-1");
        assert_eq!(resp.user.email, "ana@example.com");
    }

    #[tokio::test]
    async fn test_update_me_sends_partial_json_with_bearer() {
        if !can_bind_localhost() {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/auth/me"))
            .and(header("authorization", "Bearer tok-9"))
            .and(body_json(serde_json::json!({"preferred_language": "it"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(
            server.uri(),
            Arc::new(MemoryStorage::with_entry(TOKEN_KEY, "tok-9")),
        );
        let update = ProfileUpdate {
            preferred_language: Some("it".to_string()),
            ..ProfileUpdate::default()
        };
        client.update_me(&update).await.unwrap();
    }
}
