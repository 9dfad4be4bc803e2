use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::documents::{render_event_report, ReportDocument};
use crate::models::{EventPatch, NewEvent};
use crate::utils::response::{empty_success, pdf_attachment, success};
use crate::utils::AppError;

use super::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl Pagination {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

pub async fn create_event(
    State(state): State<AppState>,
    Json(body): Json<NewEvent>,
) -> Result<Response, AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::ValidationError("Title is required".to_string()));
    }
    if body.max_tickets <= 0 {
        return Err(AppError::ValidationError(
            "max_tickets must be positive".to_string(),
        ));
    }
    if body.price < Decimal::ZERO {
        return Err(AppError::ValidationError(
            "price cannot be negative".to_string(),
        ));
    }
    if state.gateway.user(body.organizer_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Organizer {} not found",
            body.organizer_id
        )));
    }

    let event = state.gateway.create_event(body).await?;
    Ok(success(event, "Event created").into_response())
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Response, AppError> {
    let events = state.gateway.events(page.limit(), page.offset()).await?;
    Ok(success(events, "Events listed").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let event = state
        .gateway
        .event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))?;
    Ok(success(event, "Event found").into_response())
}

pub async fn events_by_organizer(
    State(state): State<AppState>,
    Path(organizer_id): Path<i64>,
) -> Result<Response, AppError> {
    let events = state.gateway.events_by_organizer(organizer_id).await?;
    Ok(success(events, "Events listed").into_response())
}

pub async fn update_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<EventPatch>,
) -> Result<Response, AppError> {
    if let Some(max_tickets) = patch.max_tickets {
        if max_tickets <= 0 {
            return Err(AppError::ValidationError(
                "max_tickets must be positive".to_string(),
            ));
        }
    }

    let event = state
        .gateway
        .update_event(id, patch)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))?;
    Ok(success(event, "Event updated").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !state.gateway.delete_event(id).await? {
        return Err(AppError::NotFound(format!("Event {id} not found")));
    }
    Ok(empty_success("Event deleted").into_response())
}

pub async fn event_stats(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let stats = state
        .gateway
        .event_stats(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))?;
    Ok(success(stats, "Event stats computed").into_response())
}

pub async fn event_report(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let event = state
        .gateway
        .event(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))?;
    let stats = state
        .gateway
        .event_stats(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Event {id} not found")))?;

    let filename = format!("report_{}.pdf", event.title.replace(' ', "_"));
    let document = ReportDocument::new(&event, stats);
    let bytes = render_event_report(&document, Utc::now())?;
    Ok(pdf_attachment(&filename, bytes))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExternalEventsQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub city: Option<String>,
}

pub async fn list_external_events(
    State(state): State<AppState>,
    Query(query): Query<ExternalEventsQuery>,
) -> Result<Response, AppError> {
    let page = Pagination {
        limit: query.limit,
        offset: query.offset,
    };
    let events = state
        .gateway
        .external_events(page.limit(), page.offset(), query.city.as_deref())
        .await?;
    Ok(success(events, "External events listed").into_response())
}

pub async fn featured_external_events(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> Result<Response, AppError> {
    let events = state.gateway.featured_external_events(page.limit()).await?;
    Ok(success(events, "Featured events listed").into_response())
}
