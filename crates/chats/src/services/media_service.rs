//! Upload URL issuance for media attachments.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Duration, Utc};
use courier_config::MediaConfig;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::types::ChatResult;
use crate::utils::Validator;

const MAX_TTL_SECONDS: u64 = 7 * 24 * 3_600;

/// Where to upload an object and where it will be served from
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UploadTicket {
    pub upload_url: String,
    pub public_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues time-limited upload URLs against the media bucket
#[derive(Debug, Clone)]
pub struct MediaService {
    upload_base_url: String,
    public_base_url: String,
    ttl: Duration,
}

impl MediaService {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            ttl: Duration::seconds(config.upload_url_ttl_seconds.min(MAX_TTL_SECONDS) as i64),
        }
    }

    pub fn upload_url(&self, file_name: &str, content_type: &str) -> ChatResult<UploadTicket> {
        Validator::file_name(file_name)?;
        Validator::content_type(content_type)?;

        let object = format!("{}-{}", Uuid::new_v4(), Validator::sanitize_file_name(file_name));
        let expires_at = Utc::now()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut token = [0u8; 24];
        rand::thread_rng().fill_bytes(&mut token);

        Ok(UploadTicket {
            upload_url: format!(
                "{}/{}?expires={}&token={}",
                self.upload_base_url,
                object,
                expires_at.timestamp(),
                URL_SAFE_NO_PAD.encode(token)
            ),
            public_url: format!("{}/{}", self.public_base_url, object),
            expires_at,
        })
    }
}
