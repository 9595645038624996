use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use uuid::Uuid;

use crate::store::{Entity, Values};

/// Append-only: there is no `Patchable` impl on purpose.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgressEvent {
    pub id: Uuid,
    pub timestamp: i64,
    pub headline: String,
}

#[derive(Debug)]
pub struct NewProgressEvent {
    pub timestamp: i64,
    pub headline: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HeadlineAverage {
    pub headline: String,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HeadlineCount {
    pub headline: String,
    pub amount: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct HeadlineStats {
    pub headline: String,
    pub amount: i64,
    pub average: f64,
}

impl Entity for ProgressEvent {
    const TABLE: &'static str = "progress";
    const COLUMNS: &'static str = "id, timestamp, headline";
    const INSERT_COLUMNS: &'static str = "timestamp, headline";
    const ORDER_BY: &'static str = "timestamp";
    const SOFT_DELETE: bool = false;

    type New = NewProgressEvent;

    fn push_values(new: NewProgressEvent, values: &mut Values<'_, '_>) {
        values.push_bind(new.timestamp);
        values.push_bind(new.headline);
    }
}

/// Mean timestamp per headline, latest on average first.
pub async fn averages(conn: &mut SqliteConnection) -> sqlx::Result<Vec<HeadlineAverage>> {
    sqlx::query_as::<_, HeadlineAverage>(
        r#"
        SELECT headline, CAST(AVG(timestamp) AS REAL) AS average
          FROM progress
         GROUP BY headline
         ORDER BY average DESC, headline
        "#,
    )
    .fetch_all(conn)
    .await
}

pub async fn counts(conn: &mut SqliteConnection) -> sqlx::Result<Vec<HeadlineCount>> {
    sqlx::query_as::<_, HeadlineCount>(
        r#"
        SELECT headline, COUNT(*) AS amount
          FROM progress
         GROUP BY headline
         ORDER BY amount DESC, headline
        "#,
    )
    .fetch_all(conn)
    .await
}

pub async fn stats(conn: &mut SqliteConnection) -> sqlx::Result<Vec<HeadlineStats>> {
    sqlx::query_as::<_, HeadlineStats>(
        r#"
        SELECT headline,
               COUNT(*) AS amount,
               CAST(AVG(timestamp) AS REAL) AS average
          FROM progress
         GROUP BY headline
         ORDER BY amount DESC, headline
        "#,
    )
    .fetch_all(conn)
    .await
}
