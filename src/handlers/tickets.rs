use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;

use crate::documents::{render_ticket, TicketDocument};
use crate::models::{NewTicket, Ticket, TicketPatch, TicketPurchase};
use crate::utils::response::{empty_success, pdf_attachment, success};
use crate::utils::AppError;

use super::AppState;

/// Direct purchase. Domain checks run here before the write; the store
/// repeats the capacity check under the event row lock, so a race on the
/// last ticket still cannot oversell.
pub async fn create_ticket(
    State(state): State<AppState>,
    Json(body): Json<NewTicket>,
) -> Result<Response, AppError> {
    let event = state
        .gateway
        .event(body.event_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {} not found", body.event_id)))?;

    if !event.is_active {
        return Err(AppError::ValidationError("Event is not active".to_string()));
    }
    if event.sales_closed(Utc::now()) {
        return Err(AppError::ValidationError(
            "Ticket sales have ended".to_string(),
        ));
    }
    if event.is_sold_out() {
        return Err(AppError::ValidationError("Event is sold out".to_string()));
    }
    if state.gateway.user(body.buyer_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Buyer {} not found",
            body.buyer_id
        )));
    }

    let ticket = state
        .gateway
        .purchase_ticket(TicketPurchase {
            event_id: body.event_id,
            buyer_id: body.buyer_id,
            external_reference: None,
            price_paid: None,
        })
        .await?;
    Ok(success(ticket, "Ticket purchased").into_response())
}

pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let ticket = find_ticket(&state, id).await?;
    Ok(success(ticket, "Ticket found").into_response())
}

pub async fn get_ticket_by_qr(
    State(state): State<AppState>,
    Path(qr_code): Path<String>,
) -> Result<Response, AppError> {
    let ticket = state
        .gateway
        .ticket_by_qr(&qr_code)
        .await?
        .ok_or_else(|| AppError::NotFound("No ticket matches this QR code".to_string()))?;
    Ok(success(ticket, "Ticket found").into_response())
}

pub async fn tickets_by_user(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    let tickets = state.gateway.tickets_by_user(user_id).await?;
    Ok(success(tickets, "Tickets listed").into_response())
}

pub async fn tickets_by_event(
    State(state): State<AppState>,
    Path(event_id): Path<i64>,
) -> Result<Response, AppError> {
    let tickets = state.gateway.tickets_by_event(event_id).await?;
    Ok(success(tickets, "Tickets listed").into_response())
}

pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<TicketPatch>,
) -> Result<Response, AppError> {
    let ticket = state
        .gateway
        .update_ticket(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket {id} not found")))?;
    Ok(success(ticket, "Ticket updated").into_response())
}

pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.gateway.delete_ticket(id).await? {
        return Err(AppError::NotFound(format!("Ticket {id} not found")));
    }
    Ok(empty_success("Ticket deleted").into_response())
}

/// The purchase artifact: the rendered PDF served as a download named
/// after the ticket number.
pub async fn ticket_document(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let ticket = find_ticket(&state, id).await?;
    let event = state
        .gateway
        .event(ticket.event_id)
        .await?
        .ok_or_else(|| {
            AppError::StoreFailure(format!("event {} missing for ticket {id}", ticket.event_id))
        })?;
    let buyer_name = state
        .gateway
        .user(ticket.buyer_id)
        .await?
        .map(|user| user.name)
        .unwrap_or_else(|| "Guest".to_string());

    let filename = format!("ticket_{}.pdf", ticket.ticket_number);
    let document = TicketDocument::new(&ticket, &event, buyer_name);
    let bytes = render_ticket(&document, Utc::now())?;
    Ok(pdf_attachment(&filename, bytes))
}

async fn find_ticket(state: &AppState, id: i64) -> Result<Ticket, AppError> {
    state
        .gateway
        .ticket(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Ticket {id} not found")))
}
