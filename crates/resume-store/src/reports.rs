//! CRUD operations for [`Report`] records.
//!
//! Report mutations are the only writers that touch weekly aggregates: each
//! creation or deletion refreshes the aggregate of the affected week
//! afterwards. A failed refresh is logged and swallowed; the report write
//! stays committed and the aggregate self-corrects on the next refresh of
//! that week.

use chrono::Utc;
use rusqlite::params;

use resume_shared::constants::CURRENCY;
use resume_shared::ReportInput;

use crate::database::{date_column, date_to_sql, timestamp_column, Database};
use crate::error::{Result, StoreError};
use crate::models::{DateRange, Report};

const REPORT_COLUMNS: &str = "id, section_id, date, preacher, total_attendees, men, women, \
     children, youth, offering, currency, notes, submitted_by, submitted_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Persist a validated report for `section_id` and refresh its week.
    pub fn create_report(
        &self,
        input: &ReportInput,
        section_id: i64,
        submitted_by: Option<&str>,
    ) -> Result<Report> {
        self.conn().execute(
            "INSERT INTO reports (section_id, date, preacher, total_attendees, men, women,
                                  children, youth, offering, currency, notes, submitted_by,
                                  submitted_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                section_id,
                date_to_sql(input.date),
                input.preacher,
                input.total_attendees,
                input.men,
                input.women,
                input.children,
                input.youth,
                input.offering,
                CURRENCY,
                input.notes,
                submitted_by,
                Utc::now().to_rfc3339(),
            ],
        )?;

        let report = self.get_report(self.conn().last_insert_rowid())?;

        tracing::info!(
            report_id = report.id,
            section_id,
            date = %report.date,
            "report created"
        );

        self.refresh_weekly_aggregate(section_id, report.date);
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_report(&self, id: i64) -> Result<Report> {
        self.conn()
            .query_row(
                &format!("SELECT {REPORT_COLUMNS} FROM reports WHERE id = ?1"),
                params![id],
                row_to_report,
            )
            .map_err(StoreError::from_query)
    }

    /// Reports of one section, newest service date first.
    pub fn list_reports_for_section(&self, section_id: i64, range: DateRange) -> Result<Vec<Report>> {
        self.list_reports(Some(section_id), range)
    }

    /// Reports of one section or of all sections, newest service date first.
    pub fn list_reports(&self, section_id: Option<i64>, range: DateRange) -> Result<Vec<Report>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {REPORT_COLUMNS}
             FROM reports
             WHERE (?1 IS NULL OR section_id = ?1)
               AND (?2 IS NULL OR date >= ?2)
               AND (?3 IS NULL OR date <= ?3)
             ORDER BY date DESC, id DESC"
        ))?;

        let rows = stmt.query_map(
            params![
                section_id,
                range.start.map(date_to_sql),
                range.end.map(date_to_sql),
            ],
            row_to_report,
        )?;

        let mut reports = Vec::new();
        for row in rows {
            reports.push(row?);
        }
        Ok(reports)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a report, refresh its week, and return the deleted row.
    pub fn delete_report(&self, id: i64) -> Result<Report> {
        let report = self.get_report(id)?;

        self.conn()
            .execute("DELETE FROM reports WHERE id = ?1", params![id])?;

        tracing::info!(report_id = id, section_id = report.section_id, "report deleted");

        self.refresh_weekly_aggregate(report.section_id, report.date);
        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn row_to_report(row: &rusqlite::Row<'_>) -> rusqlite::Result<Report> {
    Ok(Report {
        id: row.get(0)?,
        section_id: row.get(1)?,
        date: date_column(row, 2)?,
        preacher: row.get(3)?,
        total_attendees: row.get(4)?,
        men: row.get(5)?,
        women: row.get(6)?,
        children: row.get(7)?,
        youth: row.get(8)?,
        offering: row.get(9)?,
        currency: row.get(10)?,
        notes: row.get(11)?,
        submitted_by: row.get(12)?,
        submitted_at: timestamp_column(row, 13)?,
    })
}
