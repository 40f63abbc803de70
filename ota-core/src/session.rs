use log::{info, warn};

use crate::crc::Crc32;
use crate::error::OtaError;
use crate::request::UpdateRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtaStatus {
    Idle,
    Downloading { progress: u8 },
    Verifying,
    Ready,
    Failed,
}

/// Events raised by the HTTP client while the image streams in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpEvent<'a> {
    Error,
    Connected,
    HeaderSent,
    Header { key: &'a str, value: &'a str },
    Data(&'a [u8]),
    Finish,
    Disconnected,
}

/// Progress and integrity record of the update in flight.
#[derive(Debug, Clone)]
pub struct OtaSession {
    request: UpdateRequest,
    crc: Crc32,
    bytes_received: usize,
    content_length: Option<usize>,
    finished: bool,
    status: OtaStatus,
}

impl OtaSession {
    pub fn new(request: UpdateRequest) -> Self {
        Self {
            request,
            crc: Crc32::new(),
            bytes_received: 0,
            content_length: None,
            finished: false,
            status: OtaStatus::Idle,
        }
    }

    pub fn request(&self) -> &UpdateRequest {
        &self.request
    }

    pub fn handle_http_event(&mut self, event: HttpEvent<'_>) {
        match event {
            HttpEvent::Error => warn!("HTTP_EVENT_ERROR"),
            HttpEvent::Connected => {
                info!("HTTP_EVENT_ON_CONNECTED");
                self.status = OtaStatus::Downloading { progress: 0 };
            }
            HttpEvent::HeaderSent => info!("HTTP_EVENT_HEADER_SENT"),
            HttpEvent::Header { key, value } => {
                info!("HTTP_EVENT_ON_HEADER, key={key}, value={value}");
                if key.eq_ignore_ascii_case("content-length") {
                    self.content_length = value.trim().parse().ok();
                }
            }
            HttpEvent::Data(chunk) => {
                self.crc.update(chunk);
                let before = self.progress();
                self.bytes_received += chunk.len();
                let progress = self.progress();
                self.status = OtaStatus::Downloading { progress };
                if progress / 10 != before / 10 {
                    info!(
                        "OTA progress {progress}% ({}/{})",
                        self.bytes_received,
                        self.content_length.unwrap_or(0)
                    );
                }
            }
            HttpEvent::Finish => {
                info!("HTTP_EVENT_ON_FINISH");
                self.finished = true;
            }
            HttpEvent::Disconnected => info!("HTTP_EVENT_DISCONNECTED"),
        }
    }

    pub fn content_length(&self) -> Option<usize> {
        self.content_length
    }

    pub fn bytes_received(&self) -> usize {
        self.bytes_received
    }

    pub fn actual_crc32(&self) -> u32 {
        self.crc.value()
    }

    pub fn status(&self) -> OtaStatus {
        self.status
    }

    pub fn set_status(&mut self, status: OtaStatus) {
        self.status = status;
    }

    /// 0..=100; stays 0 while the length is unknown.
    pub fn progress(&self) -> u8 {
        match self.status {
            OtaStatus::Ready => return 100,
            OtaStatus::Idle => return 0,
            _ => {}
        }
        match self.content_length {
            Some(0) | None => 0,
            Some(len) => ((self.bytes_received.min(len) * 100) / len) as u8,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.finished
            && self.bytes_received > 0
            && self
                .content_length
                .map_or(true, |len| len == self.bytes_received)
    }

    /// Check completeness and the expected crc of the received image.
    pub fn verify(&mut self) -> Result<(), OtaError> {
        if !self.is_complete() {
            warn!(
                "Complete data was not received ({}/{:?})",
                self.bytes_received, self.content_length
            );
            self.status = OtaStatus::Failed;
            return Err(OtaError::Incomplete);
        }

        self.status = OtaStatus::Verifying;
        if self.request.checks_crc() {
            let expected = self.request.crc32.unwrap_or_default();
            let actual = self.crc.value();
            info!("Firmware crc expected {expected:08x} actual {actual:08x}");
            if expected != actual {
                self.status = OtaStatus::Failed;
                return Err(OtaError::ValidateFailed);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crc::crc32;

    fn feed(session: &mut OtaSession, image: &[u8], chunk: usize) {
        session.handle_http_event(HttpEvent::Connected);
        let len = image.len().to_string();
        session.handle_http_event(HttpEvent::Header {
            key: "Content-Length",
            value: &len,
        });
        for c in image.chunks(chunk) {
            session.handle_http_event(HttpEvent::Data(c));
        }
    }

    #[test]
    fn tracks_bytes_and_crc() {
        let image = vec![0xA5u8; 3000];
        let mut s = OtaSession::new(UpdateRequest::new("u"));
        feed(&mut s, &image, 1024);
        assert_eq!(s.bytes_received(), 3000);
        assert_eq!(s.content_length(), Some(3000));
        assert_eq!(s.actual_crc32(), crc32(&image));
        assert_eq!(s.progress(), 100);
    }

    #[test]
    fn not_complete_until_finish() {
        let image = [1u8, 2, 3];
        let mut s = OtaSession::new(UpdateRequest::new("u"));
        feed(&mut s, &image, 2);
        assert!(!s.is_complete());
        assert_eq!(s.verify(), Err(OtaError::Incomplete));
        assert_eq!(s.status(), OtaStatus::Failed);
    }

    #[test]
    fn short_body_is_incomplete() {
        let mut s = OtaSession::new(UpdateRequest::new("u"));
        s.handle_http_event(HttpEvent::Header {
            key: "content-length",
            value: "10",
        });
        s.handle_http_event(HttpEvent::Data(&[0; 4]));
        s.handle_http_event(HttpEvent::Finish);
        assert_eq!(s.verify(), Err(OtaError::Incomplete));
    }

    #[test]
    fn unknown_length_completes_on_finish() {
        let mut s = OtaSession::new(UpdateRequest::new("u"));
        s.handle_http_event(HttpEvent::Connected);
        s.handle_http_event(HttpEvent::Data(&[0; 4]));
        assert_eq!(s.progress(), 0);
        s.handle_http_event(HttpEvent::Finish);
        assert!(s.is_complete());
        assert_eq!(s.verify(), Ok(()));
        assert_eq!(s.status(), OtaStatus::Verifying);
    }

    #[test]
    fn crc_mismatch_fails_validation() {
        let image = b"firmware";
        let req = UpdateRequest::new("u").with_crc32(crc32(image) ^ 1);
        let mut s = OtaSession::new(req);
        feed(&mut s, image, 3);
        s.handle_http_event(HttpEvent::Finish);
        assert_eq!(s.verify(), Err(OtaError::ValidateFailed));
    }

    #[test]
    fn crc_match_passes() {
        let image = b"firmware";
        let req = UpdateRequest::new("u").with_crc32(crc32(image));
        let mut s = OtaSession::new(req);
        feed(&mut s, image, 3);
        s.handle_http_event(HttpEvent::Finish);
        assert_eq!(s.verify(), Ok(()));
    }

    #[test]
    fn zero_crc_skips_check() {
        let req = UpdateRequest::new("u").with_crc32(0);
        let mut s = OtaSession::new(req);
        feed(&mut s, b"abc", 1);
        s.handle_http_event(HttpEvent::Finish);
        assert_eq!(s.verify(), Ok(()));
    }
}
