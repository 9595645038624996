use sqlx::SqliteConnection;
use time::OffsetDateTime;

use crate::auth::repo_types::{NewUser, User, UserChanges};
use crate::store::{Entity, Patchable, Values};

impl Entity for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = "id, username, password_hash, disabled, created_at";
    const INSERT_COLUMNS: &'static str = "username, password_hash, disabled, created_at";
    const ORDER_BY: &'static str = "username";
    const SOFT_DELETE: bool = false;

    type New = NewUser;

    fn push_values(new: NewUser, values: &mut Values<'_, '_>) {
        values.push_bind(new.username);
        values.push_bind(new.password_hash);
        values.push_bind(false);
        values.push_bind(OffsetDateTime::now_utc());
    }
}

impl Patchable for User {
    type Changes = UserChanges;

    fn push_changes(changes: UserChanges, set: &mut Values<'_, '_>) -> usize {
        let mut pushed = 0;
        if let Some(username) = changes.username {
            set.push("username = ").push_bind_unseparated(username);
            pushed += 1;
        }
        if let Some(hash) = changes.password_hash {
            set.push("password_hash = ").push_bind_unseparated(hash);
            pushed += 1;
        }
        if let Some(disabled) = changes.disabled {
            set.push("disabled = ").push_bind_unseparated(disabled);
            pushed += 1;
        }
        pushed
    }
}

impl User {
    /// Find a user by username (exact match).
    pub async fn find_by_username(
        conn: &mut SqliteConnection,
        username: &str,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, disabled, created_at
            FROM users
            WHERE username = ?
            "#,
        )
        .bind(username)
        .fetch_optional(conn)
        .await
    }
}
