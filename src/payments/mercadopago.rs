use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::{
    PaymentError, PaymentGateway, PaymentStatus, Preference, PreferenceRequest, Refund,
    WebhookOutcome,
};

pub const DEFAULT_BASE_URL: &str = "https://api.mercadopago.com";

const CURRENCY: &str = "BRL";
const STATEMENT_DESCRIPTOR: &str = "GATEPASS";

/// Mercado Pago REST client. The base URL is swappable so tests can point
/// at a stub server.
pub struct MercadoPagoClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
    notification_url: String,
}

impl MercadoPagoClient {
    pub fn new(access_token: String, notification_url: String) -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string(), access_token, notification_url)
    }

    pub fn with_base_url(
        base_url: String,
        access_token: String,
        notification_url: String,
    ) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token,
            notification_url,
        }
    }

    async fn gateway_rejection(response: reqwest::Response) -> PaymentError {
        let status = response.status();
        let message = match response.json::<GatewayErrorBody>().await {
            Ok(body) => body.message.unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        PaymentError::Gateway(format!("{status}: {message}"))
    }
}

#[derive(Serialize)]
struct PreferenceBody {
    items: Vec<PreferenceItem>,
    payer: PreferencePayer,
    back_urls: BackUrls,
    auto_return: &'static str,
    external_reference: String,
    notification_url: String,
    statement_descriptor: &'static str,
}

#[derive(Serialize)]
struct PreferenceItem {
    title: String,
    description: String,
    quantity: u32,
    unit_price: Decimal,
    currency_id: &'static str,
}

#[derive(Serialize)]
struct PreferencePayer {
    email: String,
    name: String,
}

#[derive(Serialize)]
struct BackUrls {
    success: String,
    failure: String,
    pending: String,
}

#[derive(Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: String,
    sandbox_init_point: Option<String>,
}

#[derive(Deserialize)]
struct RefundResponse {
    id: i64,
    status: String,
}

#[derive(Serialize)]
struct RefundBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<Decimal>,
}

#[derive(Deserialize)]
struct GatewayErrorBody {
    message: Option<String>,
}

fn preference_body(request: PreferenceRequest, notification_url: &str) -> PreferenceBody {
    PreferenceBody {
        items: vec![PreferenceItem {
            title: format!("Ingresso - {}", request.event_title),
            description: format!("Ingresso para o evento: {}", request.event_title),
            quantity: 1,
            unit_price: request.price,
            currency_id: CURRENCY,
        }],
        payer: PreferencePayer {
            email: request.buyer_email,
            name: request.buyer_name,
        },
        back_urls: BackUrls {
            success: request.success_url,
            failure: request.failure_url,
            pending: request.pending_url,
        },
        auto_return: "approved",
        external_reference: request.external_reference,
        notification_url: notification_url.to_string(),
        statement_descriptor: STATEMENT_DESCRIPTOR,
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    async fn create_preference(
        &self,
        request: PreferenceRequest,
    ) -> Result<Preference, PaymentError> {
        let body = preference_body(request, &self.notification_url);
        let response = self
            .http
            .post(format!("{}/checkout/preferences", self.base_url))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::gateway_rejection(response).await);
        }

        let preference: PreferenceResponse = response.json().await?;
        debug!(preference_id = %preference.id, "payment preference created");
        Ok(Preference {
            preference_id: preference.id,
            init_point: preference.init_point,
            sandbox_init_point: preference.sandbox_init_point,
        })
    }

    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus, PaymentError> {
        let response = self
            .http
            .get(format!("{}/v1/payments/{payment_id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::gateway_rejection(response).await);
        }

        Ok(response.json::<PaymentStatus>().await?)
    }

    async fn process_webhook(&self, payload: &Value) -> Result<WebhookOutcome, PaymentError> {
        if payload.get("type").and_then(Value::as_str) != Some("payment") {
            return Ok(WebhookOutcome::Ignored);
        }

        // Delivery payloads carry the id as either a string or a number.
        let payment_id = match payload.pointer("/data/id") {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Ok(WebhookOutcome::Ignored),
        };

        let status = self.payment_status(&payment_id).await?;
        Ok(WebhookOutcome::Payment {
            payment_id,
            status: status.status,
            transaction_amount: status.transaction_amount,
            external_reference: status.external_reference,
        })
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount: Option<Decimal>,
    ) -> Result<Refund, PaymentError> {
        let response = self
            .http
            .post(format!(
                "{}/v1/payments/{payment_id}/refunds",
                self.base_url
            ))
            .bearer_auth(&self.access_token)
            .json(&RefundBody { amount })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::gateway_rejection(response).await);
        }

        let refund: RefundResponse = response.json().await?;
        Ok(Refund {
            refund_id: refund.id,
            status: refund.status,
        })
    }
}
