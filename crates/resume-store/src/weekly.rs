//! Weekly aggregates: one row per (section, Monday) holding the totals of
//! that section's reports over the week.
//!
//! Aggregates are derived data. [`Database::recompute_weekly_aggregate`]
//! re-sums the week from the `reports` table every time, so a row that
//! drifted (a lost concurrent refresh, a failed refresh) is healed by the
//! next recompute of the same week.

use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension};

use resume_shared::constants::CURRENCY;
use resume_shared::WeekRange;

use crate::database::{date_column, date_to_sql, timestamp_column, Database};
use crate::error::{Result, StoreError};
use crate::models::WeeklyAggregate;

const AGGREGATE_COLUMNS: &str = "id, section_id, week_start, week_end, total_offering, currency, \
     total_attendees, total_services, created_at, updated_at";

impl Database {
    /// Aggregate of the week containing `date`, created with zero totals on
    /// first access. Repeated calls return the same row.
    pub fn get_or_create_weekly_aggregate(
        &self,
        section_id: i64,
        date: NaiveDate,
    ) -> Result<WeeklyAggregate> {
        let week = WeekRange::containing(date)?;

        if let Some(existing) = self.find_weekly_aggregate(section_id, week.start)? {
            return Ok(existing);
        }

        let now = Utc::now().to_rfc3339();
        // OR IGNORE: a concurrent creator may have won the unique index.
        self.conn().execute(
            "INSERT OR IGNORE INTO weekly_stats
                 (section_id, week_start, week_end, total_offering, currency,
                  total_attendees, total_services, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0.0, ?4, 0, 0, ?5, ?5)",
            params![
                section_id,
                date_to_sql(week.start),
                date_to_sql(week.end),
                CURRENCY,
                now,
            ],
        )?;

        tracing::debug!(section_id, week_start = %week.start, "weekly aggregate created");

        self.find_weekly_aggregate(section_id, week.start)?
            .ok_or(StoreError::NotFound)
    }

    /// Re-derive the aggregate of the week containing `date` from the
    /// section's reports in `[week_start, week_end]`.
    pub fn recompute_weekly_aggregate(
        &self,
        section_id: i64,
        date: NaiveDate,
    ) -> Result<WeeklyAggregate> {
        let aggregate = self.get_or_create_weekly_aggregate(section_id, date)?;

        let (total_offering, total_attendees, total_services): (f64, i64, i64) =
            self.conn().query_row(
                "SELECT COALESCE(SUM(COALESCE(offering, 0.0)), 0.0),
                        COALESCE(SUM(COALESCE(total_attendees, 0)), 0),
                        COUNT(*)
                 FROM reports
                 WHERE section_id = ?1 AND date >= ?2 AND date <= ?3",
                params![
                    section_id,
                    date_to_sql(aggregate.week_start),
                    date_to_sql(aggregate.week_end),
                ],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;

        self.conn().execute(
            "UPDATE weekly_stats
             SET total_offering = ?1, total_attendees = ?2, total_services = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                total_offering,
                total_attendees,
                total_services,
                Utc::now().to_rfc3339(),
                aggregate.id,
            ],
        )?;

        tracing::debug!(
            section_id,
            week_start = %aggregate.week_start,
            total_services,
            total_attendees,
            total_offering,
            "weekly aggregate recomputed"
        );

        self.find_weekly_aggregate(section_id, aggregate.week_start)?
            .ok_or(StoreError::NotFound)
    }

    /// Recompute after a report mutation. Failures are logged, never
    /// propagated: the report write has already been committed.
    pub(crate) fn refresh_weekly_aggregate(&self, section_id: i64, date: NaiveDate) {
        if let Err(e) = self.recompute_weekly_aggregate(section_id, date) {
            tracing::error!(
                error = %e,
                section_id,
                date = %date,
                "weekly aggregate refresh failed, keeping report change"
            );
        }
    }

    /// Offering total of the week containing `today` for one section.
    pub fn current_week_offering(&self, section_id: i64, today: NaiveDate) -> Result<f64> {
        Ok(self
            .get_or_create_weekly_aggregate(section_id, today)?
            .total_offering)
    }

    /// Existing aggregates of the week containing `reference`, for one
    /// section or all of them. Missing rows are not created.
    pub fn list_weekly_aggregates(
        &self,
        section_id: Option<i64>,
        reference: NaiveDate,
    ) -> Result<Vec<WeeklyAggregate>> {
        let week = WeekRange::containing(reference)?;

        let mut stmt = self.conn().prepare(&format!(
            "SELECT {AGGREGATE_COLUMNS}
             FROM weekly_stats
             WHERE week_start = ?1 AND (?2 IS NULL OR section_id = ?2)
             ORDER BY section_id ASC"
        ))?;

        let rows = stmt.query_map(
            params![date_to_sql(week.start), section_id],
            row_to_aggregate,
        )?;

        let mut aggregates = Vec::new();
        for row in rows {
            aggregates.push(row?);
        }
        Ok(aggregates)
    }

    fn find_weekly_aggregate(
        &self,
        section_id: i64,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyAggregate>> {
        Ok(self
            .conn()
            .query_row(
                &format!(
                    "SELECT {AGGREGATE_COLUMNS} FROM weekly_stats
                     WHERE section_id = ?1 AND week_start = ?2"
                ),
                params![section_id, date_to_sql(week_start)],
                row_to_aggregate,
            )
            .optional()?)
    }
}

fn row_to_aggregate(row: &rusqlite::Row<'_>) -> rusqlite::Result<WeeklyAggregate> {
    Ok(WeeklyAggregate {
        id: row.get(0)?,
        section_id: row.get(1)?,
        week_start: date_column(row, 2)?,
        week_end: date_column(row, 3)?,
        total_offering: row.get(4)?,
        currency: row.get(5)?,
        total_attendees: row.get(6)?,
        total_services: row.get(7)?,
        created_at: timestamp_column(row, 8)?,
        updated_at: timestamp_column(row, 9)?,
    })
}
