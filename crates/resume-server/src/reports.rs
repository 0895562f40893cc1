//! Report submission, listing and weekly statistics handlers.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use resume_shared::constants::CURRENCY;
use resume_shared::week::week_start;
use resume_shared::{normalize_and_validate, parse_date, Identity};
use resume_store::{Database, DateRange, Report, StoreError, User, WeeklyAggregate};

use crate::api::{AppState, JsonBody};
use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::pdf;

// ─── Query parameters ───

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    start: Option<String>,
    end: Option<String>,
    section_id: Option<i64>,
}

impl RangeQuery {
    fn range(&self) -> Result<DateRange, ServerError> {
        Ok(DateRange {
            start: parse_date_param(self.start.as_deref())?,
            end: parse_date_param(self.end.as_deref())?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WeekQuery {
    date: Option<String>,
    section_id: Option<i64>,
}

impl WeekQuery {
    /// The requested reference date, or today.
    fn reference(&self) -> Result<NaiveDate, ServerError> {
        Ok(parse_date_param(self.date.as_deref())?.unwrap_or_else(today))
    }
}

/// An empty parameter counts as absent.
fn parse_date_param(raw: Option<&str>) -> Result<Option<NaiveDate>, ServerError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => parse_date(s)
            .map(Some)
            .ok_or_else(|| ServerError::BadRequest("Invalid date format, use YYYY-MM-DD".into())),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn require_read_all(identity: &Identity) -> Result<(), ServerError> {
    if identity.can_read_all_sections() {
        return Ok(());
    }
    warn!(user_id = identity.user_id, role = %identity.role, "Cross-section read refused");
    Err(ServerError::Forbidden(
        "Only administrators and viewers can read all sections".into(),
    ))
}

/// The account behind a token; a token can outlive the account it was
/// issued for.
fn caller_account(db: &Database, identity: &Identity) -> Result<User, ServerError> {
    match db.get_user(identity.user_id) {
        Ok(user) => Ok(user),
        Err(StoreError::NotFound) => {
            warn!(user_id = identity.user_id, "Token refers to a deleted account");
            Err(ServerError::Unauthorized("Unknown user".into()))
        }
        Err(e) => Err(e.into()),
    }
}

fn find_report(db: &Database, id: i64) -> Result<Report, ServerError> {
    match db.get_report(id) {
        Ok(report) => Ok(report),
        Err(StoreError::NotFound) => Err(ServerError::NotFound("Report not found".into())),
        Err(e) => Err(e.into()),
    }
}

// ─── Handlers ───

#[derive(Serialize)]
pub struct ReportCreatedResponse {
    msg: &'static str,
    id: i64,
    report: Report,
}

/// Normalize, validate and store a report for the caller's section.
pub async fn create_report(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    JsonBody(body): JsonBody<Value>,
) -> Result<(StatusCode, Json<ReportCreatedResponse>), ServerError> {
    if !identity.can_submit_reports() {
        warn!(user_id = identity.user_id, role = %identity.role, "Report submission refused");
        return Err(ServerError::Forbidden("Viewers cannot submit reports".into()));
    }

    let Value::Object(payload) = body else {
        return Err(ServerError::BadRequest("Expected a JSON object".into()));
    };

    let input = normalize_and_validate(&payload).map_err(|errors| {
        debug!(user_id = identity.user_id, %errors, "Report rejected");
        ServerError::Validation(errors)
    })?;

    let db = state.db();
    let submitter = caller_account(&db, &identity)?;
    let report = db.create_report(&input, submitter.id, Some(&submitter.username))?;

    Ok((
        StatusCode::CREATED,
        Json(ReportCreatedResponse {
            msg: "Report created",
            id: report.id,
            report,
        }),
    ))
}

/// The caller's own reports, newest first.
pub async fn my_reports(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Report>>, ServerError> {
    let range = query.range()?;
    let reports = state
        .db()
        .list_reports_for_section(identity.user_id, range)?;

    debug!(section_id = identity.user_id, count = reports.len(), "Listed own reports");
    Ok(Json(reports))
}

#[derive(Serialize)]
pub struct ReportDeletedResponse {
    msg: String,
    id: i64,
}

pub async fn delete_report(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ReportDeletedResponse>, ServerError> {
    let db = state.db();
    let report = find_report(&db, id)?;

    if !identity.can_manage_report(report.section_id) {
        warn!(
            user_id = identity.user_id,
            report_id = id,
            owner = report.section_id,
            "Report deletion refused"
        );
        return Err(ServerError::Forbidden(
            "You can only delete your own reports".into(),
        ));
    }

    db.delete_report(id)?;

    Ok(Json(ReportDeletedResponse {
        msg: format!("Report {id} deleted"),
        id,
    }))
}

/// Every section's reports, optionally narrowed to one section.
pub async fn summary(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<RangeQuery>,
) -> Result<Json<Vec<Report>>, ServerError> {
    require_read_all(&identity)?;

    let range = query.range()?;
    let reports = state.db().list_reports(query.section_id, range)?;

    info!(
        user_id = identity.user_id,
        section_id = ?query.section_id,
        count = reports.len(),
        "Summary retrieved"
    );
    Ok(Json(reports))
}

/// The caller's aggregate for the week containing `date` (default today),
/// re-derived from the reports before it is returned.
pub async fn weekly_stats(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<WeekQuery>,
) -> Result<Json<WeeklyAggregate>, ServerError> {
    let reference = query.reference()?;
    let db = state.db();
    caller_account(&db, &identity)?;
    let aggregate = db.recompute_weekly_aggregate(identity.user_id, reference)?;
    Ok(Json(aggregate))
}

/// Existing aggregates of every section for one week.
pub async fn admin_weekly_stats(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<WeekQuery>,
) -> Result<Json<Vec<WeeklyAggregate>>, ServerError> {
    require_read_all(&identity)?;

    let reference = query.reference()?;
    let aggregates = state
        .db()
        .list_weekly_aggregates(query.section_id, reference)?;
    Ok(Json(aggregates))
}

#[derive(Serialize)]
pub struct CurrentOfferingResponse {
    section_id: i64,
    week_start: NaiveDate,
    total_offering: f64,
    currency: &'static str,
}

pub async fn current_offering(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<CurrentOfferingResponse>, ServerError> {
    let today = today();
    let week_start = week_start(today)?;
    let total_offering = {
        let db = state.db();
        caller_account(&db, &identity)?;
        db.current_week_offering(identity.user_id, today)?
    };

    Ok(Json(CurrentOfferingResponse {
        section_id: identity.user_id,
        week_start,
        total_offering,
        currency: CURRENCY,
    }))
}

fn pdf_attachment(bytes: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// One report as a PDF, for its section, administrators and viewers.
pub async fn report_pdf(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<Response, ServerError> {
    let report = find_report(&state.db(), id)?;

    if !identity.can_read_report(report.section_id) {
        warn!(
            user_id = identity.user_id,
            report_id = id,
            owner = report.section_id,
            "Report export refused"
        );
        return Err(ServerError::Forbidden(
            "You can only export your own reports".into(),
        ));
    }

    let bytes = pdf::render_report(&report, Local::now().naive_local())?;
    info!(user_id = identity.user_id, report_id = id, size = bytes.len(), "Report exported");
    Ok(pdf_attachment(bytes, &format!("report_{id}.pdf")))
}

/// The `/summary` listing as a paginated PDF table.
pub async fn summary_pdf(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Query(query): Query<RangeQuery>,
) -> Result<Response, ServerError> {
    require_read_all(&identity)?;

    let range = query.range()?;
    let reports = state.db().list_reports(query.section_id, range)?;
    let bytes = pdf::render_summary(&reports, range, Local::now().naive_local())?;

    let filename = match query.section_id {
        Some(section_id) => format!("reports_section_{section_id}.pdf"),
        None => "reports_summary.pdf".to_string(),
    };
    info!(
        user_id = identity.user_id,
        section_id = ?query.section_id,
        count = reports.len(),
        "Summary exported"
    );
    Ok(pdf_attachment(bytes, &filename))
}
