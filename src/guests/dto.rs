use serde::Deserialize;
use uuid::Uuid;

use super::repo::{GuestChanges, NewGuest};
use crate::error::AppError;
use crate::responses::dto::clean_name;

#[derive(Debug, Deserialize)]
pub struct CreateGuestRequest {
    pub name: String,
    pub group: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateGuestRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LinkGuestRequest {
    pub response_id: Uuid,
}

fn clean_group(group: &str) -> Result<String, AppError> {
    let group = group.trim();
    if group.is_empty() {
        return Err(AppError::Validation("group must not be empty".into()));
    }
    Ok(group.to_owned())
}

impl TryFrom<CreateGuestRequest> for NewGuest {
    type Error = AppError;

    fn try_from(req: CreateGuestRequest) -> Result<Self, Self::Error> {
        Ok(NewGuest {
            name: clean_name(&req.name)?,
            group: clean_group(&req.group)?,
        })
    }
}

impl TryFrom<UpdateGuestRequest> for GuestChanges {
    type Error = AppError;

    fn try_from(req: UpdateGuestRequest) -> Result<Self, Self::Error> {
        Ok(GuestChanges {
            name: req.name.as_deref().map(clean_name).transpose()?,
            group: req.group.as_deref().map(clean_group).transpose()?,
        })
    }
}
