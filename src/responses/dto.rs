use serde::Deserialize;

use crate::error::AppError;
use crate::responses::repo::{NewResponse, ResponseChanges};
use crate::store::double_option;

#[derive(Debug, Deserialize)]
pub struct CreateResponseRequest {
    pub name: String,
    #[serde(default)]
    pub dietary_need: Option<String>,
    #[serde(default = "default_attending")]
    pub attending: bool,
}
fn default_attending() -> bool {
    true
}

#[derive(Debug, Deserialize, Default)]
pub struct UpdateResponseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub dietary_need: Option<Option<String>>,
    #[serde(default)]
    pub attending: Option<bool>,
}

pub(crate) fn clean_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    Ok(name.to_owned())
}

fn clean_diet(diet: Option<String>) -> Option<String> {
    diet.map(|d| d.trim().to_owned()).filter(|d| !d.is_empty())
}

impl TryFrom<CreateResponseRequest> for NewResponse {
    type Error = AppError;

    fn try_from(req: CreateResponseRequest) -> Result<Self, Self::Error> {
        Ok(NewResponse {
            name: clean_name(&req.name)?,
            dietary_need: clean_diet(req.dietary_need),
            attending: req.attending,
        })
    }
}

impl TryFrom<UpdateResponseRequest> for ResponseChanges {
    type Error = AppError;

    fn try_from(req: UpdateResponseRequest) -> Result<Self, Self::Error> {
        Ok(ResponseChanges {
            name: req.name.as_deref().map(clean_name).transpose()?,
            dietary_need: req.dietary_need.map(clean_diet),
            attending: req.attending,
        })
    }
}
