//! CRUD operations for [`User`] records.

use chrono::Utc;
use rusqlite::{params, ErrorCode};

use resume_shared::Role;

use crate::database::{timestamp_column, Database};
use crate::error::{Result, StoreError};
use crate::models::{User, UserUpdate};

const USER_COLUMNS: &str = "id, username, password_hash, role, created_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user. A taken username yields [`StoreError::Conflict`].
    pub fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User> {
        let created_at = Utc::now();
        self.conn()
            .execute(
                "INSERT INTO users (username, password_hash, role, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![username, password_hash, role.as_str(), created_at.to_rfc3339()],
            )
            .map_err(|e| unique_violation(e, username))?;

        self.get_user(self.conn().last_insert_rowid())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, id: i64) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
                params![username],
                row_to_user,
            )
            .map_err(StoreError::from_query)
    }

    /// List all users, ordered by id.
    pub fn list_users(&self) -> Result<Vec<User>> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id ASC"))?;

        let rows = stmt.query_map([], row_to_user)?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    pub fn count_users(&self) -> Result<i64> {
        Ok(self
            .conn()
            .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply a partial update and return the stored user.
    pub fn update_user(&self, id: i64, update: &UserUpdate) -> Result<User> {
        let current = self.get_user(id)?;

        let username = update.username.as_deref().unwrap_or(&current.username);
        let password_hash = update
            .password_hash
            .as_deref()
            .unwrap_or(&current.password_hash);
        let role = update.role.unwrap_or(current.role);

        self.conn()
            .execute(
                "UPDATE users SET username = ?1, password_hash = ?2, role = ?3 WHERE id = ?4",
                params![username, password_hash, role.as_str(), id],
            )
            .map_err(|e| unique_violation(e, username))?;

        self.get_user(id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Delete a user together with its reports and aggregates.
    /// Returns `true` if a row was deleted.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn unique_violation(e: rusqlite::Error, username: &str) -> StoreError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _)
            if err.code == ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(format!("username '{username}' is already taken"))
        }
        other => StoreError::Sqlite(other),
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let role_str: String = row.get(3)?;
    let role = role_str.parse::<Role>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role,
        created_at: timestamp_column(row, 4)?,
    })
}
