use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::apply_security_headers;

pub struct Config {
    pub port: u16,
    pub database_url: String,
    pub media_endpoint_url: Option<String>,
    pub media_region: String,
    pub media_bucket: String,
    pub media_public_base_url: String,
    pub mercadopago_access_token: String,
    /// Public base URL of this API, used to derive the webhook
    /// notification URL handed to the payment gateway.
    pub api_base_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(3001),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/gatepass".to_string()),
            media_endpoint_url: env::var("MEDIA_ENDPOINT_URL").ok(),
            media_region: env::var("MEDIA_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            media_bucket: env::var("MEDIA_BUCKET")
                .unwrap_or_else(|_| "gatepass-images".to_string()),
            media_public_base_url: env::var("MEDIA_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9000".to_string()),
            mercadopago_access_token: env::var("MERCADOPAGO_ACCESS_TOKEN").unwrap_or_default(),
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3001".to_string()),
        }
    }

    pub fn notification_url(&self) -> String {
        format!("{}/payments/webhook", self.api_base_url.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_url_is_derived_from_the_api_base() {
        let mut config = Config::from_env();
        config.api_base_url = "https://api.gatepass.example/".to_string();
        assert_eq!(
            config.notification_url(),
            "https://api.gatepass.example/payments/webhook"
        );
    }
}
