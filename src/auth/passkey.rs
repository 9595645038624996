use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{config::AppConfig, error::AppError};

/// `?passkey=` on bulk-delete routes.
#[derive(Debug, Deserialize)]
pub struct PasskeyQuery {
    pub passkey: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkDeleted {
    pub deleted: u64,
}

/// Exact match against the configured passkey; anything else is `Forbidden`.
pub fn require_passkey(config: &AppConfig, query: &PasskeyQuery) -> Result<(), AppError> {
    match query.passkey.as_deref() {
        Some(given) if given == config.bulk_delete_passkey => Ok(()),
        _ => {
            warn!("bulk delete refused: passkey mismatch");
            Err(AppError::Forbidden)
        }
    }
}
