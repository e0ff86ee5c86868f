//! Per-day document numbering.
//!
//! Numbers look like `SL202608070001`: a tag, the day, and a 4-digit
//! sequence. The sequence is reserved with a single upsert against a
//! per-prefix counter row, so concurrent creations inside their own
//! transactions can never take the same number.

use chrono::NaiveDate;
use sqlx::SqliteConnection;

use crate::error::AppError;

pub const SALE_TAG: &str = "SL";
pub const INVENTORY_TAG: &str = "IN";

pub async fn next_number(
    conn: &mut SqliteConnection,
    tag: &str,
    date: NaiveDate,
) -> Result<String, AppError> {
    let prefix = format!("{}{}", tag, date.format("%Y%m%d"));

    let value: i64 = sqlx::query_scalar(
        r#"INSERT INTO sequence_counters (prefix, value) VALUES (?1, 1)
           ON CONFLICT (prefix) DO UPDATE SET value = value + 1
           RETURNING value"#,
    )
    .bind(&prefix)
    .fetch_one(&mut *conn)
    .await?;

    Ok(format!("{}{:04}", prefix, value))
}
