use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer};
use crate::handlers::{events, health_check, images, payments, tickets, users, AppState};

pub fn create_routes(state: AppState) -> Router {
    // Uploads carry whole images; everything else stays on the default
    // body limit.
    let image_routes = Router::new()
        .route(
            "/images",
            post(images::upload_image)
                .get(images::list_images)
                .delete(images::delete_image),
        )
        .layer(DefaultBodyLimit::max(images::MAX_UPLOAD_BYTES));

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/users", post(users::create_user))
        .route(
            "/users/:id",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/by-email/:email", get(users::get_user_by_email))
        .route(
            "/events",
            post(events::create_event).get(events::list_events),
        )
        .route("/events/external", get(events::list_external_events))
        .route(
            "/events/external/featured",
            get(events::featured_external_events),
        )
        .route(
            "/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/by-organizer/:id", get(events::events_by_organizer))
        .route("/events/:id/stats", get(events::event_stats))
        .route("/events/:id/report", get(events::event_report))
        .route("/tickets", post(tickets::create_ticket))
        .route(
            "/tickets/:id",
            get(tickets::get_ticket)
                .put(tickets::update_ticket)
                .delete(tickets::delete_ticket),
        )
        .route("/tickets/by-qr/:qr_code", get(tickets::get_ticket_by_qr))
        .route("/tickets/by-user/:id", get(tickets::tickets_by_user))
        .route("/tickets/by-event/:id", get(tickets::tickets_by_event))
        .route("/tickets/:id/document", get(tickets::ticket_document))
        .route("/payments/preference", post(payments::create_preference))
        .route("/payments/webhook", post(payments::payment_webhook))
        .route(
            "/payments/:payment_id/refund",
            post(payments::refund_payment),
        )
        .merge(image_routes);

    apply_security_headers(router)
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
