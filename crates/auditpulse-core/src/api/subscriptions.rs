//! `/subscriptions/*` endpoints: billing, referrals, and output languages.

use auditpulse_types::{
    CheckoutRequest, CheckoutSession, LanguageOption, Plan, Referral, ReferralRequest,
    Subscription,
};
use reqwest::Method;

use super::{ApiClient, ApiResult, Body};

impl ApiClient {
    /// # Errors
    /// Fails on transport errors or when the user has no subscription.
    pub async fn subscription(&self) -> ApiResult<Subscription> {
        self.request(Method::GET, "/subscriptions/me", Body::Empty)
            .await
    }

    /// # Errors
    /// Returns the backend's message when the plan cannot be purchased.
    pub async fn create_checkout(
        &self,
        plan: Plan,
        success_url: &str,
        cancel_url: &str,
    ) -> ApiResult<CheckoutSession> {
        let body = CheckoutRequest {
            plan,
            success_url: success_url.to_string(),
            cancel_url: cancel_url.to_string(),
        };
        self.request(Method::POST, "/subscriptions/checkout", Body::json(&body)?)
            .await
    }

    /// # Errors
    /// Returns the backend's message when cancellation is refused.
    pub async fn cancel_subscription(&self) -> ApiResult<()> {
        self.request_empty(Method::POST, "/subscriptions/cancel", Body::Empty)
            .await
    }

    /// # Errors
    /// Returns the backend's message, e.g. for a duplicate referral.
    pub async fn create_referral(&self, email: &str) -> ApiResult<Referral> {
        let body = ReferralRequest {
            referred_email: email.trim().to_string(),
        };
        self.request(Method::POST, "/subscriptions/referrals", Body::json(&body)?)
            .await
    }

    /// # Errors
    /// Fails on transport or authentication errors.
    pub async fn referrals(&self) -> ApiResult<Vec<Referral>> {
        self.request(Method::GET, "/subscriptions/referrals", Body::Empty)
            .await
    }

    /// Report output languages the backend can generate.
    ///
    /// # Errors
    /// Fails on transport or authentication errors.
    pub async fn languages(&self) -> ApiResult<Vec<LanguageOption>> {
        self.request(Method::GET, "/subscriptions/languages", Body::Empty)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::storage::MemoryStorage;

    fn can_bind_localhost() -> bool {
        std::net::TcpListener::bind("127.0.0.1:0").is_ok()
    }

    #[tokio::test]
    async fn test_cancel_tolerates_empty_body() {
        if !can_bind_localhost() {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subscriptions/cancel"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Arc::new(MemoryStorage::new()));
        client.cancel_subscription().await.unwrap();
    }

    #[tokio::test]
    async fn test_checkout_body_shape() {
        if !can_bind_localhost() {
            eprintln!("Skipping: cannot bind localhost TCP port in this environment.");
            return;
        }
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/subscriptions/checkout"))
            .and(body_json(serde_json::json!({
                "plan": "agency",
                "success_url": "http://app/ok",
                "cancel_url": "http://app/cancel"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"checkout_url": "https://pay/cs_1"})),
            )
            .mount(&server)
            .await;

        let client = ApiClient::new(server.uri(), Arc::new(MemoryStorage::new()));
        let session = client
            .create_checkout(Plan::Agency, "http://app/ok", "http://app/cancel")
            .await
            .unwrap();
        assert_eq!(session.checkout_url, "https://pay/cs_1");
    }
}
