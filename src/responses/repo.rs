use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::store::{Entity, Patchable, Values};

/// An RSVP as submitted through the public form.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Response {
    pub id: Uuid,
    pub name: String,
    pub dietary_need: Option<String>,
    pub attending: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub submitted_at: OffsetDateTime,
    pub active: bool,
}

#[derive(Debug)]
pub struct NewResponse {
    pub name: String,
    pub dietary_need: Option<String>,
    pub attending: bool,
}

/// `submitted_at` is deliberately absent: it is written once, on insert.
#[derive(Debug, Default)]
pub struct ResponseChanges {
    pub name: Option<String>,
    pub dietary_need: Option<Option<String>>,
    pub attending: Option<bool>,
}

impl Entity for Response {
    const TABLE: &'static str = "responses";
    const COLUMNS: &'static str = "id, name, dietary_need, attending, submitted_at, active";
    const INSERT_COLUMNS: &'static str = "name, dietary_need, attending, submitted_at";
    const ORDER_BY: &'static str = "submitted_at";
    const SOFT_DELETE: bool = true;

    type New = NewResponse;

    fn push_values(new: NewResponse, values: &mut Values<'_, '_>) {
        values.push_bind(new.name);
        values.push_bind(new.dietary_need);
        values.push_bind(new.attending);
        values.push_bind(OffsetDateTime::now_utc());
    }
}

impl Patchable for Response {
    type Changes = ResponseChanges;

    fn push_changes(changes: ResponseChanges, set: &mut Values<'_, '_>) -> usize {
        let mut pushed = 0;
        if let Some(name) = changes.name {
            set.push("name = ").push_bind_unseparated(name);
            pushed += 1;
        }
        if let Some(dietary_need) = changes.dietary_need {
            set.push("dietary_need = ").push_bind_unseparated(dietary_need);
            pushed += 1;
        }
        if let Some(attending) = changes.attending {
            set.push("attending = ").push_bind_unseparated(attending);
            pushed += 1;
        }
        pushed
    }
}
