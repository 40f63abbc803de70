use log::{error, info};

use crate::error::OtaError;
use crate::session::{HttpEvent, OtaSession, OtaStatus};

/// Where the firmware image comes from.
pub trait FirmwareSource {
    /// Connect and send the request. Returns the advertised content length.
    fn open(&mut self, url: &str) -> Result<Option<usize>, OtaError>;

    /// Read the next chunk of the body, 0 at end of stream.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, OtaError>;
}

/// The inactive app partition the image is written to.
pub trait FirmwareSink {
    type Writer<'a>: FirmwareWriter
    where
        Self: 'a;

    fn begin(&mut self) -> Result<Self::Writer<'_>, OtaError>;
}

pub trait FirmwareWriter {
    fn write(&mut self, chunk: &[u8]) -> Result<(), OtaError>;

    /// Finalize the image and make it the next boot partition.
    fn complete(self) -> Result<(), OtaError>;

    fn abort(self) -> Result<(), OtaError>;
}

/// Bounds an advertised image size must fall into before flash is touched.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SizeLimits {
    pub min: usize,
    pub max: usize,
}

impl SizeLimits {
    fn check(&self, len: usize) -> Result<(), OtaError> {
        if len > self.max {
            error!("Image of {len} bytes does not fit the {} byte partition", self.max);
            return Err(OtaError::Partition);
        }
        if len < self.min {
            error!("Image of {len} bytes is below the minimum of {}", self.min);
            return Err(OtaError::ValidateFailed);
        }
        Ok(())
    }
}

/// Download the image into the update partition and switch boot to it.
///
/// The writer is aborted on every failure, so the partition is never left
/// half open.
pub fn run_update<S, K>(
    session: &mut OtaSession,
    source: &mut S,
    sink: &mut K,
    limits: SizeLimits,
    buf: &mut [u8],
) -> Result<(), OtaError>
where
    S: FirmwareSource,
    K: FirmwareSink,
{
    info!("Starting OTA {}", session.request().url);

    let url = session.request().url.clone();
    let content_length = match source.open(&url) {
        Ok(len) => len,
        Err(e) => {
            session.handle_http_event(HttpEvent::Error);
            session.set_status(OtaStatus::Failed);
            return Err(e);
        }
    };
    session.handle_http_event(HttpEvent::Connected);
    session.handle_http_event(HttpEvent::HeaderSent);
    if let Some(len) = content_length {
        let value = len.to_string();
        session.handle_http_event(HttpEvent::Header {
            key: "Content-Length",
            value: &value,
        });
        if let Err(e) = limits.check(len) {
            session.set_status(OtaStatus::Failed);
            return Err(e);
        }
    }

    let mut writer = match sink.begin() {
        Ok(w) => w,
        Err(e) => {
            session.set_status(OtaStatus::Failed);
            return Err(e);
        }
    };

    loop {
        let n = match source.read(buf) {
            Ok(n) => n,
            Err(e) => {
                error!("Firmware read failed: {e}");
                session.handle_http_event(HttpEvent::Error);
                return fail(session, writer, OtaError::Incomplete);
            }
        };
        if n == 0 {
            break;
        }

        session.handle_http_event(HttpEvent::Data(&buf[..n]));
        if session.bytes_received() > limits.max {
            return fail(session, writer, OtaError::Partition);
        }
        if let Some(len) = session.content_length() {
            if session.bytes_received() > len {
                error!("Body exceeds advertised length of {len} bytes");
                return fail(session, writer, OtaError::Incomplete);
            }
        }
        if let Err(e) = writer.write(&buf[..n]) {
            error!("Partition write failed: {e}");
            return fail(session, writer, e);
        }
    }
    session.handle_http_event(HttpEvent::Finish);
    session.handle_http_event(HttpEvent::Disconnected);

    if let Err(e) = session.verify() {
        return fail(session, writer, e);
    }
    if session.bytes_received() < limits.min {
        return fail(session, writer, OtaError::ValidateFailed);
    }

    match writer.complete() {
        Ok(()) => {
            info!("OTA image written, {} bytes", session.bytes_received());
            session.set_status(OtaStatus::Ready);
            Ok(())
        }
        Err(e) => {
            error!("Completing update failed: {e}");
            session.set_status(OtaStatus::Failed);
            Err(e)
        }
    }
}

fn fail<W: FirmwareWriter>(session: &mut OtaSession, writer: W, err: OtaError) -> Result<(), OtaError> {
    session.set_status(OtaStatus::Failed);
    if let Err(e) = writer.abort() {
        error!("Aborting update failed: {e}");
    }
    Err(err)
}
