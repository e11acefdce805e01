// PayPal Payouts REST client
// Client-credentials token exchange followed by a single-item payout batch.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use super::{GatewayError, PayoutGateway, PayoutReceipt, PayoutRequest};
use crate::config::PayPalConfig;

#[derive(Clone)]
pub struct PayPalCredentials {
    pub client_id: String,
    pub secret: String,
}

impl std::fmt::Debug for PayPalCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayPalCredentials")
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct PayPalClient {
    http: Client,
    base_url: String,
    credentials: Option<PayPalCredentials>,
    email_subject: String,
    email_message: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Serialize)]
struct PayoutBody<'a> {
    sender_batch_header: SenderBatchHeader<'a>,
    items: Vec<PayoutItem<'a>>,
}

#[derive(Serialize)]
struct SenderBatchHeader<'a> {
    sender_batch_id: &'a str,
    email_subject: &'a str,
    email_message: &'a str,
}

#[derive(Serialize)]
struct PayoutItem<'a> {
    recipient_type: &'static str,
    amount: PayoutAmount<'a>,
    receiver: &'a str,
    note: &'a str,
    sender_item_id: &'a str,
}

#[derive(Serialize)]
struct PayoutAmount<'a> {
    value: String,
    currency: &'a str,
}

#[derive(Deserialize)]
struct PayoutResponse {
    batch_header: BatchHeader,
    #[serde(default)]
    items: Vec<PayoutItemResponse>,
}

#[derive(Deserialize)]
struct BatchHeader {
    payout_batch_id: String,
}

#[derive(Deserialize)]
struct PayoutItemResponse {
    payout_item_id: Option<String>,
}

impl PayPalClient {
    pub fn new(http: Client, base_url: impl Into<String>, credentials: Option<PayPalCredentials>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            email_subject: "You have a payout!".to_string(),
            email_message: "You received a payout.".to_string(),
        }
    }

    pub fn with_email(mut self, subject: impl Into<String>, message: impl Into<String>) -> Self {
        self.email_subject = subject.into();
        self.email_message = message.into();
        self
    }

    /// Builds the client from config; credentials come from the environment.
    pub fn from_config(config: &PayPalConfig) -> Result<Self, GatewayError> {
        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(GatewayError::from_reqwest)?;

        let credentials = config
            .get_credentials()
            .map(|(client_id, secret)| PayPalCredentials { client_id, secret });
        if credentials.is_none() {
            warn!("PAYPAL_CLIENT_ID or PAYPAL_SECRET not set. PayPal calls will fail until configured.");
        }

        Ok(Self::new(http, config.api_base(), credentials)
            .with_email(&config.email_subject, &config.email_message))
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    fn payout_body<'a>(&'a self, request: &'a PayoutRequest) -> PayoutBody<'a> {
        PayoutBody {
            sender_batch_header: SenderBatchHeader {
                sender_batch_id: &request.sender_batch_id,
                email_subject: &self.email_subject,
                email_message: &self.email_message,
            },
            items: vec![PayoutItem {
                recipient_type: "EMAIL",
                amount: PayoutAmount {
                    value: format!("{:.2}", request.amount),
                    currency: &request.currency,
                },
                receiver: &request.receiver,
                note: &request.note,
                sender_item_id: &request.sender_item_id,
            }],
        }
    }

    fn map_error(status: StatusCode, body: &str) -> GatewayError {
        let payload = serde_json::from_str::<Value>(body)
            .unwrap_or_else(|_| json!({ "status": status.as_u16(), "body": body }));
        GatewayError::Rejected {
            status: status.as_u16(),
            payload,
        }
    }

    // POST /v1/oauth2/token
    #[instrument(skip(self), fields(method = "POST", path = "/v1/oauth2/token"))]
    pub async fn access_token(&self) -> Result<String, GatewayError> {
        let credentials = self.credentials.as_ref().ok_or(GatewayError::NotConfigured)?;
        let url = format!("{}/v1/oauth2/token", self.base_url);

        let resp = self
            .http
            .post(url)
            .basic_auth(&credentials.client_id, Some(&credentials.secret))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(GatewayError::from_reqwest)?;
        if !status.is_success() {
            return Err(Self::map_error(status, &text));
        }

        serde_json::from_str::<TokenResponse>(&text)
            .map(|t| t.access_token)
            .map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

#[async_trait]
impl PayoutGateway for PayPalClient {
    // POST /v1/payments/payouts
    #[instrument(
        skip(self, request),
        fields(method = "POST", path = "/v1/payments/payouts", sender_batch_id = %request.sender_batch_id)
    )]
    async fn create_payout(&self, request: &PayoutRequest) -> Result<PayoutReceipt, GatewayError> {
        let token = self.access_token().await?;
        let url = format!("{}/v1/payments/payouts", self.base_url);

        info!(
            target: "paypal",
            amount = %request.amount,
            currency = %request.currency,
            sender_item_id = %request.sender_item_id,
            "paypal payout request"
        );

        let resp = self
            .http
            .post(url)
            .bearer_auth(token)
            .header("PayPal-Request-Id", request.idempotency_key())
            .json(&self.payout_body(request))
            .send()
            .await
            .map_err(GatewayError::from_reqwest)?;

        let status = resp.status();
        let text = resp.text().await.map_err(GatewayError::from_reqwest)?;
        if !status.is_success() {
            return Err(Self::map_error(status, &text));
        }

        let raw: Value = serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))?;
        let parsed: PayoutResponse =
            serde_json::from_value(raw.clone()).map_err(|e| GatewayError::Decode(e.to_string()))?;

        Ok(PayoutReceipt {
            payout_batch_id: parsed.batch_header.payout_batch_id,
            payout_item_id: parsed.items.into_iter().next().and_then(|item| item.payout_item_id),
            raw,
        })
    }
}
