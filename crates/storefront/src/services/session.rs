//! Guest session service.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use serde_json::Value;
use tracing::instrument;

use basket_core::SessionId;

use super::{ServiceError, keys};
use crate::kv::KvStore;
use crate::models::SessionData;
use crate::models::session::{self as record, new_session_data};

/// Random bytes in a session id (128 bits).
const SESSION_ENTROPY_BYTES: usize = 16;

/// Generate a new guest session id: `guest_<random>_<epoch millis>`.
///
/// The random part is 128 bits from the thread RNG, base64url without
/// padding. Collisions are not checked for.
#[must_use]
pub fn generate_session_id() -> SessionId {
    let random: [u8; SESSION_ENTROPY_BYTES] = rand::random();
    SessionId::from_trusted(format!(
        "guest_{}_{}",
        URL_SAFE_NO_PAD.encode(random),
        Utc::now().timestamp_millis()
    ))
}

/// Session records in the key-value store.
pub struct SessionService<'a, K> {
    kv: &'a K,
}

impl<'a, K: KvStore> SessionService<'a, K> {
    /// Create a new session service.
    #[must_use]
    pub const fn new(kv: &'a K) -> Self {
        Self { kv }
    }

    /// Generate an id and store a fresh record for it.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the record cannot be written.
    pub async fn start_session(&self) -> Result<SessionId, ServiceError> {
        let session_id = generate_session_id();
        self.set_session(&session_id, &new_session_data(Utc::now()))
            .await?;
        tracing::info!(session_id = %session_id, "Guest session started");
        Ok(session_id)
    }

    /// Store `data` under the session, replacing any previous record and
    /// resetting its lifetime to seven days.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the write fails.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn set_session(
        &self,
        session_id: &SessionId,
        data: &SessionData,
    ) -> Result<(), ServiceError> {
        let body = serde_json::to_string(data)?;
        self.kv
            .setex(&keys::session(session_id), &body, keys::SESSION_TTL)
            .await?;
        Ok(())
    }

    /// Read a session record. `None` if it does not exist or has expired.
    ///
    /// A record that is not a JSON object is treated as missing.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the read fails.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn get_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<SessionData>, ServiceError> {
        let Some(body) = self.kv.get(&keys::session(session_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<SessionData>(&body) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring malformed session record");
                Ok(None)
            }
        }
    }

    /// Delete a session record. Deleting a missing record is not an error.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the delete fails.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn delete_session(&self, session_id: &SessionId) -> Result<(), ServiceError> {
        self.kv.del(&[&keys::session(session_id)]).await?;
        Ok(())
    }

    /// Stamp `lastActivity` and extend the record for another seven days.
    ///
    /// Returns `false` without writing anything if there is no record.
    ///
    /// # Errors
    ///
    /// Returns `ServiceError::Store` if the read or write fails.
    #[instrument(skip_all, fields(session_id = %session_id))]
    pub async fn update_session_activity(
        &self,
        session_id: &SessionId,
    ) -> Result<bool, ServiceError> {
        let Some(mut data) = self.get_session(session_id).await? else {
            return Ok(false);
        };
        data.insert(
            record::keys::LAST_ACTIVITY.to_owned(),
            Value::String(Utc::now().to_rfc3339()),
        );
        self.set_session(session_id, &data).await?;
        Ok(true)
    }
}
