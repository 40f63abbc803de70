use crate::error::OtaError;

/// Topic suffix the status events are published under.
pub const UPDATE_STATUS_TOPIC: &str = "update/status";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpdateStatus {
    Started,
    Success,
    Failed(OtaError),
}

impl UpdateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Started => "started",
            UpdateStatus::Success => "success",
            UpdateStatus::Failed(_) => "failed",
        }
    }
}

/// Payload of an update status event.
///
/// The job id and error code are only appended when the cloud sent a job id.
pub fn event_data(status: UpdateStatus, job_id: Option<&str>) -> String {
    let mut data = String::from(status.as_str());
    if let Some(job_id) = job_id.filter(|id| !id.is_empty()) {
        data.push(',');
        data.push_str(job_id);
        if let UpdateStatus::Failed(err) = status {
            data.push(',');
            data.push_str(&err.code().to_string());
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_status_without_job() {
        assert_eq!(event_data(UpdateStatus::Started, None), "started");
        assert_eq!(
            event_data(UpdateStatus::Failed(OtaError::Incomplete), None),
            "failed"
        );
    }

    #[test]
    fn job_id_appended() {
        assert_eq!(event_data(UpdateStatus::Success, Some("j1")), "success,j1");
    }

    #[test]
    fn failure_code_appended_after_job() {
        assert_eq!(
            event_data(UpdateStatus::Failed(OtaError::ValidateFailed), Some("j1")),
            "failed,j1,4"
        );
    }

    #[test]
    fn empty_job_id_treated_as_missing() {
        assert_eq!(event_data(UpdateStatus::Success, Some("")), "success");
    }
}
