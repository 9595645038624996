use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{Entity, Patchable, Values};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Guest {
    pub id: Uuid,
    pub name: String,
    #[sqlx(rename = "guest_group")]
    pub group: String,
    pub response_id: Option<Uuid>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct NewGuest {
    pub name: String,
    pub group: String,
}

#[derive(Debug, Default)]
pub struct GuestChanges {
    pub name: Option<String>,
    pub group: Option<String>,
}

/// Guest joined with its linked response, if any.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct GuestView {
    pub id: Uuid,
    pub name: String,
    #[sqlx(rename = "guest_group")]
    pub group: String,
    pub response_id: Option<Uuid>,
    pub responded: bool,
    pub attending: bool,
    pub dietary_need: Option<String>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub submitted_at: Option<OffsetDateTime>,
}

/// One row of the "who has answered" view.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RespondedGuest {
    pub guest_id: Uuid,
    pub name: String,
    #[sqlx(rename = "guest_group")]
    pub group: String,
    pub dietary_need: Option<String>,
    pub attending: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
}

impl Entity for Guest {
    const TABLE: &'static str = "guests";
    const COLUMNS: &'static str = "id, name, guest_group, response_id, active";
    const INSERT_COLUMNS: &'static str = "name, guest_group";
    const ORDER_BY: &'static str = "guest_group, name";
    const SOFT_DELETE: bool = true;

    type New = NewGuest;

    fn push_values(new: NewGuest, values: &mut Values<'_, '_>) {
        values.push_bind(new.name);
        values.push_bind(new.group);
    }
}

impl Patchable for Guest {
    type Changes = GuestChanges;

    fn push_changes(changes: GuestChanges, set: &mut Values<'_, '_>) -> usize {
        let mut pushed = 0;
        if let Some(name) = changes.name {
            set.push("name = ").push_bind_unseparated(name);
            pushed += 1;
        }
        if let Some(group) = changes.group {
            set.push("guest_group = ").push_bind_unseparated(group);
            pushed += 1;
        }
        pushed
    }
}

const VIEW_SELECT: &str = r#"
    SELECT g.id, g.name, g.guest_group, g.response_id,
           r.id IS NOT NULL            AS responded,
           COALESCE(r.attending, 0)    AS attending,
           r.dietary_need,
           r.submitted_at
      FROM guests g
      LEFT JOIN responses r ON r.id = g.response_id AND r.active = 1
     WHERE g.active = 1
"#;

pub async fn list_views(conn: &mut SqliteConnection) -> sqlx::Result<Vec<GuestView>> {
    let sql = format!("{VIEW_SELECT} ORDER BY g.guest_group, g.name");
    sqlx::query_as::<_, GuestView>(&sql).fetch_all(conn).await
}

pub async fn get_view(conn: &mut SqliteConnection, id: Uuid) -> sqlx::Result<Option<GuestView>> {
    let sql = format!("{VIEW_SELECT} AND g.id = ?");
    sqlx::query_as::<_, GuestView>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
}

/// Active guests with an active linked response; unlinked guests are left out.
pub async fn list_responded(conn: &mut SqliteConnection) -> sqlx::Result<Vec<RespondedGuest>> {
    sqlx::query_as::<_, RespondedGuest>(
        r#"
        SELECT g.id AS guest_id, g.name, g.guest_group,
               r.dietary_need, r.attending, r.submitted_at
          FROM guests g
          JOIN responses r ON r.id = g.response_id
         WHERE g.active = 1 AND r.active = 1
         ORDER BY r.submitted_at, g.name
        "#,
    )
    .fetch_all(conn)
    .await
}

/// Point an active guest at `response_id`. `None` if the guest is unknown.
pub async fn link_response(
    conn: &mut SqliteConnection,
    guest_id: Uuid,
    response_id: Uuid,
) -> sqlx::Result<Option<Guest>> {
    sqlx::query_as::<_, Guest>(
        r#"
        UPDATE guests
           SET response_id = ?
         WHERE id = ? AND active = 1
        RETURNING id, name, guest_group, response_id, active
        "#,
    )
    .bind(response_id)
    .bind(guest_id)
    .fetch_optional(conn)
    .await
}

/// Link every guest whose name is exactly `name`. Returns how many matched.
pub async fn link_by_name(
    conn: &mut SqliteConnection,
    name: &str,
    response_id: Uuid,
) -> sqlx::Result<u64> {
    let done = sqlx::query("UPDATE guests SET response_id = ? WHERE name = ?")
        .bind(response_id)
        .bind(name)
        .execute(conn)
        .await?;
    Ok(done.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responses::repo::{NewResponse, Response};
    use crate::store::Repository;

    fn guest(name: &str, group: &str) -> NewGuest {
        NewGuest { name: name.into(), group: group.into() }
    }

    async fn response(conn: &mut SqliteConnection, name: &str, diet: Option<&str>) -> Response {
        Repository::<Response>::create(
            conn,
            NewResponse {
                name: name.into(),
                dietary_need: diet.map(Into::into),
                attending: true,
            },
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn guest_view_defaults_to_not_yet_responded() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let g = Repository::<Guest>::create(&mut conn, guest("Alice", "family")).await.unwrap();

        let view = get_view(&mut conn, g.id).await.unwrap().unwrap();
        assert_eq!(view.group, "family");
        assert!(!view.responded);
        assert!(!view.attending);
        assert!(view.dietary_need.is_none());
        assert!(view.submitted_at.is_none());
    }

    #[tokio::test]
    async fn guest_view_includes_linked_response() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let g = Repository::<Guest>::create(&mut conn, guest("Alice", "family")).await.unwrap();
        let r = response(&mut conn, "Alice", Some("vegan")).await;
        link_response(&mut conn, g.id, r.id).await.unwrap().unwrap();

        let views = list_views(&mut conn).await.unwrap();
        assert_eq!(views.len(), 1);
        assert!(views[0].responded);
        assert!(views[0].attending);
        assert_eq!(views[0].dietary_need.as_deref(), Some("vegan"));
        assert_eq!(views[0].submitted_at, Some(r.submitted_at));
    }

    #[tokio::test]
    async fn responded_view_excludes_unlinked_and_inactive_guests() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let alice = Repository::<Guest>::create(&mut conn, guest("Alice", "family")).await.unwrap();
        let bob = Repository::<Guest>::create(&mut conn, guest("Bob", "friends")).await.unwrap();
        Repository::<Guest>::create(&mut conn, guest("Carol", "friends")).await.unwrap();

        let ra = response(&mut conn, "Alice", None).await;
        let rb = response(&mut conn, "Bob", None).await;
        link_response(&mut conn, alice.id, ra.id).await.unwrap();
        link_response(&mut conn, bob.id, rb.id).await.unwrap();
        Repository::<Guest>::delete(&mut conn, bob.id).await.unwrap();

        let rows = list_responded(&mut conn).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].guest_id, alice.id);
        assert_eq!(rows[0].name, "Alice");
    }

    #[tokio::test]
    async fn link_unknown_guest_is_none() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let r = response(&mut conn, "Alice", None).await;
        assert!(link_response(&mut conn, Uuid::new_v4(), r.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn link_to_missing_response_violates_foreign_key() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let g = Repository::<Guest>::create(&mut conn, guest("Alice", "family")).await.unwrap();

        let err = link_response(&mut conn, g.id, Uuid::new_v4()).await.unwrap_err();
        match err {
            sqlx::Error::Database(db) => assert!(db.is_foreign_key_violation()),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn soft_deleted_guest_is_hidden_but_kept() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let g = Repository::<Guest>::create(&mut conn, guest("Alice", "family")).await.unwrap();
        assert!(Repository::<Guest>::delete(&mut conn, g.id).await.unwrap());

        assert!(get_view(&mut conn, g.id).await.unwrap().is_none());
        assert!(list_views(&mut conn).await.unwrap().is_empty());
        let all = Repository::<Guest>::list_all(&mut conn).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(!all[0].active);
    }

    #[tokio::test]
    async fn patch_guest_group_only() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let g = Repository::<Guest>::create(&mut conn, guest("Alice", "family")).await.unwrap();

        let patched = Repository::<Guest>::update(
            &mut conn,
            g.id,
            GuestChanges { group: Some("friends".into()), ..Default::default() },
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(patched.name, "Alice");
        assert_eq!(patched.group, "friends");
    }

    #[tokio::test]
    async fn purging_responses_unlinks_guests() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let g = Repository::<Guest>::create(&mut conn, guest("Alice", "family")).await.unwrap();
        let r = response(&mut conn, "Alice", None).await;
        link_response(&mut conn, g.id, r.id).await.unwrap();

        assert_eq!(Repository::<Response>::delete_all(&mut conn).await.unwrap(), 1);
        let g = Repository::<Guest>::get(&mut conn, g.id).await.unwrap().unwrap();
        assert_eq!(g.response_id, None);
    }
}
