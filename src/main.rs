use std::net::SocketAddr;
use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use gatepass_server::config::Config;
use gatepass_server::handlers::AppState;
use gatepass_server::media::S3MediaStore;
use gatepass_server::payments::MercadoPagoClient;
use gatepass_server::routes::create_routes;
use gatepass_server::store::PgGateway;

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    let gateway = PgGateway::new(pool);
    gateway.migrate().await.expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let media = S3MediaStore::connect(&config)
        .await
        .expect("Failed to initialize media storage");

    if config.mercadopago_access_token.is_empty() {
        tracing::warn!("MERCADOPAGO_ACCESS_TOKEN is not set; payment calls will be rejected");
    }
    let payments = MercadoPagoClient::new(
        config.mercadopago_access_token.clone(),
        config.notification_url(),
    );

    let state = AppState {
        gateway: Arc::new(gateway),
        media: Arc::new(media),
        payments: Arc::new(payments),
    };

    let app = create_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
