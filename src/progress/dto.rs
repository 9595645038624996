use serde::Deserialize;

use super::repo::NewProgressEvent;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct CreateProgressRequest {
    pub timestamp: i64,
    pub headline: String,
}

impl TryFrom<CreateProgressRequest> for NewProgressEvent {
    type Error = AppError;

    fn try_from(req: CreateProgressRequest) -> Result<Self, Self::Error> {
        let headline = req.headline.trim();
        if headline.is_empty() {
            return Err(AppError::Validation("headline must not be empty".into()));
        }
        Ok(NewProgressEvent {
            timestamp: req.timestamp,
            headline: headline.to_owned(),
        })
    }
}
