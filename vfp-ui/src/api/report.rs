//! Report page and export endpoints
//!
//! Each request fetches the full outcome list from the backend, aggregates
//! it, and returns one page (or one group as plain text). Aggregation is
//! pure, so there is nothing to cache or invalidate here.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use vfp_common::api::Token;
use vfp_common::{CheckCategory, Error};

use crate::report::export::export_group_as_text;
use crate::report::{aggregate, Report, ReportGroup, ReportOptions};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReportQuery {
    /// 0-indexed page of groups
    #[serde(default)]
    pub page: usize,
    /// Keep passed/not-applicable records too
    #[serde(default)]
    pub include_all: bool,
}

#[derive(Debug, Serialize)]
pub struct ReportPageResponse {
    pub token: String,
    pub category: CheckCategory,
    pub page: usize,
    pub total_pages: usize,
    pub total_groups: usize,
    pub groups: Vec<ReportGroup>,
}

/// GET /api/report/:token/:category
pub async fn get_report_page(
    State(state): State<AppState>,
    Path((token, category)): Path<(String, String)>,
    Query(query): Query<ReportQuery>,
) -> Result<Json<ReportPageResponse>, ReportError> {
    let (token, category) = parse_target(&token, &category)?;
    let report = fetch_report(&state, &token, category, query.include_all).await?;

    Ok(Json(ReportPageResponse {
        token: token.to_string(),
        category,
        page: query.page,
        total_pages: report.total_pages(),
        total_groups: report.total_groups(),
        groups: report.page(query.page).to_vec(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    /// Title of the group to export
    pub title: String,
    #[serde(default)]
    pub include_all: bool,
}

/// GET /api/report/:token/:category/export
pub async fn export_group(
    State(state): State<AppState>,
    Path((token, category)): Path<(String, String)>,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ReportError> {
    let (token, category) = parse_target(&token, &category)?;
    let report = fetch_report(&state, &token, category, query.include_all).await?;

    let group = report
        .groups()
        .iter()
        .find(|group| group.title == query.title)
        .ok_or_else(|| ReportError::GroupNotFound(query.title.clone()))?;

    let text = export_group_as_text(group);
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        text,
    )
        .into_response())
}

fn parse_target(token: &str, category: &str) -> Result<(Token, CheckCategory), ReportError> {
    let token = Token::new(token).map_err(|e| ReportError::BadRequest(e.to_string()))?;
    let category = category
        .parse()
        .map_err(|_| ReportError::BadRequest(format!("unknown check category: {}", category)))?;
    Ok((token, category))
}

async fn fetch_report(
    state: &AppState,
    token: &Token,
    category: CheckCategory,
    include_all: bool,
) -> Result<Report, ReportError> {
    let outcomes = state
        .backend
        .outcomes(token, category)
        .await
        .map_err(ReportError::Backend)?;

    let options = ReportOptions {
        include_all,
        dedup: state.config.dedup_outcomes,
    };

    Ok(aggregate(
        &outcomes.results,
        &outcomes.counts,
        &outcomes.instances,
        options,
    ))
}

/// Report API errors
#[derive(Debug)]
pub enum ReportError {
    BadRequest(String),
    GroupNotFound(String),
    Backend(Error),
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ReportError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ReportError::GroupNotFound(title) => {
                (StatusCode::NOT_FOUND, format!("no group titled {:?}", title))
            }
            ReportError::Backend(Error::NotFound(what)) => {
                (StatusCode::NOT_FOUND, format!("not found: {}", what))
            }
            ReportError::Backend(e @ (Error::Backend(_) | Error::Api { .. })) => {
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ReportError::Backend(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };

        let body = Json(json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
