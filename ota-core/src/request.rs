use std::fmt;

use log::{info, warn};
use serde::Deserialize;
use serde_json::Value;

/// Longest url or job id accepted from the cloud.
pub const MAX_FIELD_LEN: usize = 255;

/// A firmware update command received from the cloud.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateRequest {
    pub url: String,
    pub job_id: Option<String>,
    pub crc32: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestError {
    Json,
    MissingUrl,
    TooLong,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Json => write!(f, "update command is not valid JSON"),
            RequestError::MissingUrl => write!(f, "update command has no url"),
            RequestError::TooLong => write!(f, "update command field exceeds {MAX_FIELD_LEN} bytes"),
        }
    }
}

impl std::error::Error for RequestError {}

/// Wire shape of the command. Fields stay loosely typed so a bad `crc` only
/// disables the check instead of rejecting the whole command.
#[derive(Deserialize)]
struct Command {
    url: Option<Value>,
    crc: Option<Value>,
    #[serde(rename = "jobId")]
    job_id: Option<Value>,
}

impl UpdateRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            job_id: None,
            crc32: None,
        }
    }

    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn with_crc32(mut self, crc: u32) -> Self {
        self.crc32 = Some(crc);
        self
    }

    /// Parse `{"url": "...", "crc": "hex", "jobId": "..."}`.
    pub fn from_json(data: &[u8]) -> Result<Self, RequestError> {
        let cmd = serde_json::from_slice::<Command>(data).map_err(|_| RequestError::Json)?;

        let crc32 = match &cmd.crc {
            Some(Value::String(s)) => {
                let parsed = parse_hex(s);
                if parsed.is_none() {
                    warn!("Ignoring malformed crc {s:?}");
                }
                parsed
            }
            Some(Value::Null) | None => None,
            Some(other) => {
                warn!("Ignoring non-string crc {other}");
                None
            }
        };

        let job_id = match cmd.job_id.as_ref().and_then(Value::as_str) {
            Some(id) if id.len() > MAX_FIELD_LEN => return Err(RequestError::TooLong),
            Some(id) if !id.is_empty() => Some(id.to_owned()),
            _ => None,
        };

        let url = match cmd.url.as_ref().and_then(Value::as_str) {
            Some(url) if url.len() > MAX_FIELD_LEN => return Err(RequestError::TooLong),
            Some(url) if !url.is_empty() => url.to_owned(),
            _ => return Err(RequestError::MissingUrl),
        };

        info!("Update request url={url} job_id={job_id:?} crc={crc32:?}");
        Ok(Self { url, job_id, crc32 })
    }

    /// A crc of 0 disables the check.
    pub fn checks_crc(&self) -> bool {
        matches!(self.crc32, Some(crc) if crc != 0)
    }
}

/// Leading hex digits of `s`, with an optional `0x` prefix.
fn parse_hex(s: &str) -> Option<u32> {
    let s = s.trim();
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    let end = s
        .find(|c: char| !c.is_ascii_hexdigit())
        .unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    u32::from_str_radix(&s[..end], 16).ok()
}
