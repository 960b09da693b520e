//! `/api/tickets` handlers.

use super::{ApiError, AppState, AtPath, BearerToken};
use crate::config::PagingConfig;
use crate::desk::TicketView;
use crate::error::HelpdeskError;
use crate::lifecycle::TicketPatch;
use crate::query::{Page, Sort, TicketFilter, TicketQuery};
use crate::types::{ParseEnumError, TicketDraft, TicketId};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{StatusCode, Uri},
    Json,
};
use serde::Deserialize;
use std::str::FromStr;

/// Query string of the list endpoint. `ALL` or an empty value means no filter.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    /// Zero-based page
    pub page: Option<usize>,
    /// Page size
    pub size: Option<usize>,
    /// `createdAt`, `updatedAt`, `priority`, `status` or `title`
    pub sort_by: Option<String>,
    /// `asc` or `desc`
    pub sort_dir: Option<String>,
    /// Text filter
    pub query: Option<String>,
    /// Status filter
    pub status: Option<String>,
    /// Priority filter
    pub priority: Option<String>,
}

impl ListParams {
    /// Turn the raw parameters into a query.
    ///
    /// # Errors
    ///
    /// `Validation` naming the first parameter that does not parse.
    pub fn into_query(self, paging: &PagingConfig) -> Result<TicketQuery, HelpdeskError> {
        let status = parse_filter("status", self.status.as_deref())?;
        let priority = parse_filter("priority", self.priority.as_deref())?;

        let mut sort = Sort::default();
        if let Some(key) = self.sort_by.as_deref().filter(|s| !s.trim().is_empty()) {
            sort.key = key.parse()?;
        }
        if let Some(direction) = self.sort_dir.as_deref().filter(|s| !s.trim().is_empty()) {
            sort.direction = direction.parse()?;
        }

        Ok(TicketQuery {
            filter: TicketFilter {
                text: self.query,
                status,
                priority,
            },
            sort,
            page: paging.request(self.page, self.size)?,
        })
    }
}

fn parse_filter<T>(field: &'static str, value: Option<&str>) -> Result<Option<T>, HelpdeskError>
where
    T: FromStr<Err = ParseEnumError>,
{
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("ALL"))
        .map(|v| {
            v.parse()
                .map_err(|e: ParseEnumError| HelpdeskError::invalid(field, e.to_string()))
        })
        .transpose()
}

/// Query string of the search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    /// Text to look for
    pub query: Option<String>,
    /// Zero-based page
    pub page: Option<usize>,
    /// Page size
    pub size: Option<usize>,
}

/// Paged, filtered, ordered listing.
///
/// ```text
/// GET /api/tickets?page=0&size=10&sortBy=createdAt&sortDir=desc&query=vpn&status=OPEN&priority=ALL
/// ```
///
/// # Errors
///
/// 400 on an unparsable parameter, 401 without a session.
pub async fn list_tickets(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<Page<TicketView>>, ApiError> {
    let Query(params) = params.map_err(|r| ApiError::query(&r, &uri))?;
    let query = params.into_query(&state.paging).at(&uri)?;
    state.store.list_tickets(&token, &query).await.at(&uri).map(Json)
}

/// Text search over all tickets, then paginate.
///
/// ```text
/// GET /api/tickets/search?query=printer&page=0&size=10
/// ```
///
/// # Errors
///
/// 400 on an unparsable parameter, 401 without a session.
pub async fn search_tickets(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Page<TicketView>>, ApiError> {
    let Query(params) = params.map_err(|r| ApiError::query(&r, &uri))?;
    let page = state.paging.request(params.page, params.size).at(&uri)?;
    let text = params.query.unwrap_or_default();
    state
        .store
        .search_tickets(&token, &text, page)
        .await
        .at(&uri)
        .map(Json)
}

/// One ticket.
///
/// # Errors
///
/// 401 without a session, 404 for an unknown id.
pub async fn get_ticket(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    id: Result<Path<TicketId>, PathRejection>,
) -> Result<Json<TicketView>, ApiError> {
    let Path(id) = id.map_err(|r| ApiError::path(&r, &uri))?;
    state.store.ticket(&token, id).await.at(&uri).map(Json)
}

/// Open a ticket.
///
/// ```text
/// POST /api/tickets
/// { "title": "VPN down", "description": "...", "priority": "HIGH" }
/// ```
///
/// # Errors
///
/// 400 on invalid fields, 401 without a session.
pub async fn create_ticket(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    body: Result<Json<TicketDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<TicketView>), ApiError> {
    let Json(draft) = body.map_err(|r| ApiError::body(&r, &uri))?;
    let view = state.store.create_ticket(&token, draft).await.at(&uri)?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Partial update. Requires EDIT.
///
/// ```text
/// PUT /api/tickets/:id
/// { "status": "RESOLVED", "assignedToId": "..." }
/// ```
///
/// # Errors
///
/// 400, 401, 403 or 404.
pub async fn update_ticket(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    id: Result<Path<TicketId>, PathRejection>,
    body: Result<Json<TicketPatch>, JsonRejection>,
) -> Result<Json<TicketView>, ApiError> {
    let Path(id) = id.map_err(|r| ApiError::path(&r, &uri))?;
    let Json(patch) = body.map_err(|r| ApiError::body(&r, &uri))?;
    state
        .store
        .update_ticket(&token, id, patch)
        .await
        .at(&uri)
        .map(Json)
}

/// Delete a ticket and its comments. Creator or ADMIN.
///
/// # Errors
///
/// 401, 403 or 404.
pub async fn delete_ticket(
    State(state): State<AppState>,
    uri: Uri,
    BearerToken(token): BearerToken,
    id: Result<Path<TicketId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id.map_err(|r| ApiError::path(&r, &uri))?;
    state.store.delete_ticket(&token, id).await.at(&uri)?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query::{SortDirection, SortKey};
    use crate::types::{TicketPriority, TicketStatus};

    #[test]
    fn empty_params_give_the_default_query() {
        let query = ListParams::default()
            .into_query(&PagingConfig::default())
            .unwrap();
        assert_eq!(query, TicketQuery::default());
    }

    #[test]
    fn all_is_a_wildcard() {
        let params = ListParams {
            status: Some("ALL".into()),
            priority: Some("high".into()),
            sort_by: Some("priority".into()),
            sort_dir: Some("ASC".into()),
            ..ListParams::default()
        };
        let query = params.into_query(&PagingConfig::default()).unwrap();
        assert_eq!(query.filter.status, None);
        assert_eq!(query.filter.priority, Some(TicketPriority::High));
        assert_eq!(query.sort, Sort::new(SortKey::Priority, SortDirection::Asc));
    }

    #[test]
    fn unknown_status_names_the_field() {
        let params = ListParams {
            status: Some("PENDING".into()),
            ..ListParams::default()
        };
        let err = params.into_query(&PagingConfig::default()).unwrap_err();
        assert!(err.validation_errors().unwrap().get("status").is_some());
    }

    #[test]
    fn status_filter_accepts_any_case() {
        let params = ListParams {
            status: Some("in_progress".into()),
            ..ListParams::default()
        };
        let query = params.into_query(&PagingConfig::default()).unwrap();
        assert_eq!(query.filter.status, Some(TicketStatus::InProgress));
    }

    #[test]
    fn zero_size_is_rejected() {
        let params = ListParams {
            size: Some(0),
            ..ListParams::default()
        };
        let err = params.into_query(&PagingConfig::default()).unwrap_err();
        assert!(err.validation_errors().unwrap().get("size").is_some());
    }
}
