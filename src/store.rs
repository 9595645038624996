//! Generic row access shared by every table.
//!
//! Each table implements [`Entity`] (and [`Patchable`] when it allows partial
//! updates); [`Repository`] turns that description into the list / get /
//! create / update / delete statements.

use std::marker::PhantomData;

use sqlx::{query_builder::Separated, sqlite::SqliteRow, FromRow, QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

pub type Values<'qb, 'args> = Separated<'qb, 'args, Sqlite, &'static str>;

pub trait Entity: for<'r> FromRow<'r, SqliteRow> + Send + Unpin {
    const TABLE: &'static str;
    /// Selected columns, `id` first.
    const COLUMNS: &'static str;
    /// Columns written by `create`, excluding `id`, in `push_values` order.
    const INSERT_COLUMNS: &'static str;
    const ORDER_BY: &'static str;
    /// Soft-deleted tables carry an `active` flag that reads filter on.
    const SOFT_DELETE: bool;

    type New: Send;

    fn push_values(new: Self::New, values: &mut Values<'_, '_>);
}

pub trait Patchable: Entity {
    type Changes: Send;

    /// Push `column = ?` for every field present in `changes`; returns how many.
    fn push_changes(changes: Self::Changes, set: &mut Values<'_, '_>) -> usize;
}

pub struct Repository<E>(PhantomData<E>);

impl<E: Entity> Repository<E> {
    fn active_only() -> &'static str {
        if E::SOFT_DELETE {
            " AND active = 1"
        } else {
            ""
        }
    }

    pub async fn list(conn: &mut SqliteConnection) -> sqlx::Result<Vec<E>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE 1 = 1{} ORDER BY {}",
            E::COLUMNS,
            E::TABLE,
            Self::active_only(),
            E::ORDER_BY
        );
        sqlx::query_as::<_, E>(&sql).fetch_all(conn).await
    }

    /// Every row, including soft-deleted ones.
    pub async fn list_all(conn: &mut SqliteConnection) -> sqlx::Result<Vec<E>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            E::COLUMNS,
            E::TABLE,
            E::ORDER_BY
        );
        sqlx::query_as::<_, E>(&sql).fetch_all(conn).await
    }

    pub async fn get(conn: &mut SqliteConnection, id: Uuid) -> sqlx::Result<Option<E>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?{}",
            E::COLUMNS,
            E::TABLE,
            Self::active_only()
        );
        sqlx::query_as::<_, E>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await
    }

    pub async fn create(conn: &mut SqliteConnection, new: E::New) -> sqlx::Result<E> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!(
            "INSERT INTO {} (id, {}) VALUES (",
            E::TABLE,
            E::INSERT_COLUMNS
        ));
        qb.push_bind(Uuid::new_v4());
        {
            let mut values = qb.separated(", ");
            values.push_unseparated(", ");
            E::push_values(new, &mut values);
        }
        qb.push(format!(") RETURNING {}", E::COLUMNS));
        qb.build_query_as::<E>().fetch_one(conn).await
    }

    /// Hard delete for plain tables, `active = 0` for soft-deleted ones.
    /// Returns false when no (active) row had that id.
    pub async fn delete(conn: &mut SqliteConnection, id: Uuid) -> sqlx::Result<bool> {
        let sql = if E::SOFT_DELETE {
            format!(
                "UPDATE {} SET active = 0 WHERE id = ? AND active = 1",
                E::TABLE
            )
        } else {
            format!("DELETE FROM {} WHERE id = ?", E::TABLE)
        };
        let done = sqlx::query(&sql).bind(id).execute(conn).await?;
        Ok(done.rows_affected() > 0)
    }

    /// Physically removes every row, soft-deleted or not.
    pub async fn delete_all(conn: &mut SqliteConnection) -> sqlx::Result<u64> {
        let sql = format!("DELETE FROM {}", E::TABLE);
        let done = sqlx::query(&sql).execute(conn).await?;
        Ok(done.rows_affected())
    }
}

impl<E: Patchable> Repository<E> {
    /// Partial update. Fields absent from `changes` keep their stored value;
    /// an empty change set just re-reads the row.
    pub async fn update(
        conn: &mut SqliteConnection,
        id: Uuid,
        changes: E::Changes,
    ) -> sqlx::Result<Option<E>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("UPDATE {} SET ", E::TABLE));
        let pushed = {
            let mut set = qb.separated(", ");
            E::push_changes(changes, &mut set)
        };
        if pushed == 0 {
            return Self::get(conn, id).await;
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(Self::active_only());
        qb.push(format!(" RETURNING {}", E::COLUMNS));
        qb.build_query_as::<E>().fetch_optional(conn).await
    }
}

/// Deserializer for patch fields that distinguish "absent" from `null`:
/// absent stays `None` via `#[serde(default)]`, `null` becomes `Some(None)`.
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}
