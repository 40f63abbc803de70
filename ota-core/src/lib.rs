//! Hardware-independent pieces of the OTA updater.
//!
//! Everything here builds on the host so the update flow can be tested
//! without a board. The firmware crate plugs the ESP-IDF HTTP client and
//! OTA partition API into the [`worker`] traits.

pub mod controller;
pub mod crc;
pub mod error;
pub mod event;
pub mod request;
pub mod session;
pub mod worker;

pub use controller::{OtaAction, OtaController, OtaMessage, SubmitError, UpdateFlag};
pub use error::{result_code, OtaError};
pub use event::{event_data, UpdateStatus};
pub use request::{RequestError, UpdateRequest};
pub use session::{HttpEvent, OtaSession, OtaStatus};
pub use worker::{run_update, FirmwareSink, FirmwareSource, FirmwareWriter, SizeLimits};
