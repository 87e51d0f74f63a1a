//! Login, profile and billing endpoints.

use anyhow::{Context, Result};
use reqwest::Method;
use serde_json::json;

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::{
    AccessToken, LoginData, LoginRequest, PaymentOrder, RegisterRequest, TopUpResult,
    TranscriptionStats, User, UserUpdate,
};

/// The profile screen's two independent fetches.
pub struct Profile {
    pub user: Result<User>,
    pub stats: Result<TranscriptionStats>,
}

impl ApiClient {
    /// Logs in and stores the returned access token.
    ///
    /// Returns `false` when the service accepted the credentials but issued
    /// no token.
    pub async fn login(&self, username: &str, password: &str) -> Result<bool> {
        let body = LoginRequest {
            username: username.to_string(),
            password: password.to_string(),
        };
        let request = self.request(Method::POST, "/user/login").json(&body);
        let envelope = self
            .envelope::<LoginData>(request)
            .await
            .context("Login failed")?;

        if !envelope.success {
            return Err(ApiError::rejected(envelope.message, envelope.code)).context("Login failed");
        }

        match envelope.data.and_then(|data| data.access_token) {
            Some(token) if !token.is_empty() => {
                self.remember_token(&token)?;
                log::info!("Logged in as {}", username);
                Ok(true)
            }
            _ => {
                log::warn!("Login for {} returned no access token", username);
                Ok(false)
            }
        }
    }

    pub async fn register(&self, registration: &RegisterRequest) -> Result<String> {
        let request = self.request(Method::POST, "/user/register").json(registration);
        let message = self
            .call_unit(request)
            .await
            .context("Registration failed")?;
        Ok(message)
    }

    /// Ends the server session. The local token is dropped even if the call fails.
    pub async fn logout(&self) -> Result<()> {
        let request = self.request(Method::GET, "/user/logout");
        let outcome = self.call_unit(request).await;
        self.session().clear()?;
        if let Err(e) = outcome {
            log::warn!("Logout request failed: {}", e);
        }
        Ok(())
    }

    pub async fn send_verification_code(&self, email: &str) -> Result<()> {
        let request = self
            .request(Method::GET, "/verification")
            .query(&[("email", email)]);
        self.call_unit(request)
            .await
            .context("Failed to send verification code")?;
        Ok(())
    }

    pub async fn current_user(&self) -> Result<User> {
        let request = self.request(Method::GET, "/user/self");
        let user = self
            .call(request)
            .await
            .context("Failed to get current user")?;
        Ok(user)
    }

    pub async fn update_self(&self, update: &UserUpdate) -> Result<User> {
        let request = self.request(Method::PUT, "/user/self").json(update);
        let user = self
            .call(request)
            .await
            .context("Failed to update profile")?;
        Ok(user)
    }

    /// Fetches the user and their usage stats in parallel.
    pub async fn profile(&self) -> Profile {
        let (user, stats) = tokio::join!(self.current_user(), self.user_stats());
        Profile { user, stats }
    }

    /// Issues a new API access token for the current user.
    pub async fn generate_access_token(&self) -> Result<String> {
        let request = self.request(Method::GET, "/user/token");
        let token: AccessToken = self
            .call(request)
            .await
            .context("Failed to generate access token")?;
        Ok(token.access_token)
    }

    /// Redeems a top-up code for quota.
    pub async fn redeem_code(&self, code: &str) -> Result<TopUpResult> {
        let request = self
            .request(Method::POST, "/user/topup")
            .json(&json!({ "key": code }));
        let result = self.call(request).await.context("Top-up failed")?;
        Ok(result)
    }

    /// Creates an online payment order. The user completes it at the returned URL.
    pub async fn request_payment(&self, amount: i64, payment_method: &str) -> Result<PaymentOrder> {
        let request = self
            .request(Method::POST, "/user/pay")
            .json(&json!({ "amount": amount, "payment_method": payment_method }));
        let order = self
            .call(request)
            .await
            .context("Failed to create payment order")?;
        Ok(order)
    }

    /// Price of topping up `amount` quota, as the server formats it.
    pub async fn payment_amount(&self, amount: i64) -> Result<String> {
        let request = self
            .request(Method::POST, "/user/amount")
            .json(&json!({ "amount": amount }));
        let price = self
            .call(request)
            .await
            .context("Failed to get payment amount")?;
        Ok(price)
    }
}
