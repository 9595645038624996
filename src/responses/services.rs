use sqlx::SqliteConnection;
use tracing::info;

use crate::guests::repo::link_by_name;
use crate::responses::repo::{NewResponse, Response};
use crate::store::Repository;

/// Store an RSVP and link every guest with exactly the same name to it.
///
/// Matching is case-sensitive and not unique: all same-named guests are
/// linked, and a response with no matching guest is simply left unlinked.
pub async fn create_response(
    conn: &mut SqliteConnection,
    new: NewResponse,
) -> sqlx::Result<Response> {
    let response = Repository::<Response>::create(&mut *conn, new).await?;
    let linked = link_by_name(conn, &response.name, response.id).await?;

    if linked == 0 {
        info!(response_id = %response.id, "response stored, no guest matched by name");
    } else {
        info!(response_id = %response.id, linked, "response stored and linked to guests");
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guests::repo::{Guest, NewGuest};

    fn rsvp(name: &str) -> NewResponse {
        NewResponse { name: name.into(), dietary_need: None, attending: true }
    }

    async fn add_guest(conn: &mut SqliteConnection, name: &str) -> Guest {
        Repository::<Guest>::create(conn, NewGuest { name: name.into(), group: "family".into() })
            .await
            .unwrap()
    }

    async fn response_id_of(conn: &mut SqliteConnection, id: uuid::Uuid) -> Option<uuid::Uuid> {
        Repository::<Guest>::get(conn, id).await.unwrap().unwrap().response_id
    }

    #[tokio::test]
    async fn matching_guest_is_linked() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let alice = add_guest(&mut conn, "Alice").await;

        let response = create_response(&mut conn, rsvp("Alice")).await.unwrap();
        assert_eq!(response_id_of(&mut conn, alice.id).await, Some(response.id));
    }

    #[tokio::test]
    async fn unmatched_response_links_nobody() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        add_guest(&mut conn, "Alice").await;
        add_guest(&mut conn, "Carol").await;

        let response = create_response(&mut conn, rsvp("Bob")).await.unwrap();
        assert_eq!(response.name, "Bob");

        let guests = Repository::<Guest>::list(&mut conn).await.unwrap();
        assert!(guests.iter().all(|g| g.response_id.is_none()));
    }

    #[tokio::test]
    async fn all_same_named_guests_are_linked() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let first = add_guest(&mut conn, "Sam").await;
        let second = add_guest(&mut conn, "Sam").await;

        let response = create_response(&mut conn, rsvp("Sam")).await.unwrap();
        assert_eq!(response_id_of(&mut conn, first.id).await, Some(response.id));
        assert_eq!(response_id_of(&mut conn, second.id).await, Some(response.id));
    }

    #[tokio::test]
    async fn name_match_is_case_sensitive() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let alice = add_guest(&mut conn, "Alice").await;

        create_response(&mut conn, rsvp("alice")).await.unwrap();
        assert_eq!(response_id_of(&mut conn, alice.id).await, None);
    }

    #[tokio::test]
    async fn later_response_relinks_guest() {
        let db = crate::db::memory_pool().await;
        let mut conn = db.acquire().await.unwrap();
        let alice = add_guest(&mut conn, "Alice").await;

        create_response(&mut conn, rsvp("Alice")).await.unwrap();
        let second = create_response(&mut conn, rsvp("Alice")).await.unwrap();
        assert_eq!(response_id_of(&mut conn, alice.id).await, Some(second.id));
    }
}
