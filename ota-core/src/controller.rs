use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{info, warn};

use crate::error::OtaError;
use crate::event::{event_data, UpdateStatus};
use crate::request::{RequestError, UpdateRequest};

/// Messages accepted by the OTA task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtaMessage {
    Update(UpdateRequest),
    Done(Result<(), OtaError>),
}

/// Why an update command never reached the OTA task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitError {
    Invalid(RequestError),
    QueueFull,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Invalid(e) => write!(f, "invalid OTA request: {e}"),
            SubmitError::QueueFull => write!(f, "OTA queue full, request dropped"),
        }
    }
}

impl std::error::Error for SubmitError {}

impl From<RequestError> for SubmitError {
    fn from(e: RequestError) -> Self {
        SubmitError::Invalid(e)
    }
}

/// Side effects the OTA task has to carry out for a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtaAction {
    Publish(String),
    StartWorker(UpdateRequest),
    Restart,
}

/// Device wide "update in progress" flag.
#[derive(Debug, Default)]
pub struct UpdateFlag(AtomicBool);

impl UpdateFlag {
    pub const fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

/// State machine behind the OTA task. Only one update runs at a time.
pub struct OtaController<'a> {
    flag: &'a UpdateFlag,
    current: Option<UpdateRequest>,
}

impl<'a> OtaController<'a> {
    pub fn new(flag: &'a UpdateFlag) -> Self {
        Self {
            flag,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&UpdateRequest> {
        self.current.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.current.is_some()
    }

    pub fn handle(&mut self, msg: OtaMessage) -> Vec<OtaAction> {
        match msg {
            OtaMessage::Update(req) => {
                if let Some(running) = &self.current {
                    warn!("OTA already running for {}, rejecting {}", running.url, req.url);
                    let status = UpdateStatus::Failed(OtaError::AlreadyRunning);
                    return vec![OtaAction::Publish(event_data(status, req.job_id.as_deref()))];
                }

                self.flag.set();
                let started = event_data(UpdateStatus::Started, req.job_id.as_deref());
                self.current = Some(req.clone());
                vec![OtaAction::Publish(started), OtaAction::StartWorker(req)]
            }

            OtaMessage::Done(res) => {
                let Some(req) = self.current.take() else {
                    warn!("OTA done message without a running update: {res:?}");
                    return Vec::new();
                };
                match res {
                    Ok(()) => {
                        info!("OTA completed, restarting");
                        // Stays flagged until the restart.
                        self.current = Some(req.clone());
                        vec![
                            OtaAction::Publish(event_data(UpdateStatus::Success, req.job_id.as_deref())),
                            OtaAction::Restart,
                        ]
                    }
                    Err(e) => {
                        warn!("OTA upgrade failed: {e}");
                        self.flag.clear();
                        vec![OtaAction::Publish(event_data(
                            UpdateStatus::Failed(e),
                            req.job_id.as_deref(),
                        ))]
                    }
                }
            }
        }
    }
}
