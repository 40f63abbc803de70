use std::fmt;

/// Reasons an update can terminate early.
///
/// The discriminants are the wire codes published in `failed` events, `0`
/// being reserved for success.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OtaError {
    AlreadyRunning = 1,
    Partition,
    Memory,
    ValidateFailed,
    Incomplete,
    Completing,
    Generic,
}

pub const OTA_OK: i32 = 0;

impl OtaError {
    pub fn code(&self) -> i32 {
        *self as i32
    }

    pub fn from_code(code: i32) -> Option<Result<(), OtaError>> {
        let res = match code {
            OTA_OK => Ok(()),
            1 => Err(OtaError::AlreadyRunning),
            2 => Err(OtaError::Partition),
            3 => Err(OtaError::Memory),
            4 => Err(OtaError::ValidateFailed),
            5 => Err(OtaError::Incomplete),
            6 => Err(OtaError::Completing),
            7 => Err(OtaError::Generic),
            _ => return None,
        };
        Some(res)
    }
}

/// Wire code for a finished update.
pub fn result_code(res: &Result<(), OtaError>) -> i32 {
    match res {
        Ok(()) => OTA_OK,
        Err(e) => e.code(),
    }
}

impl fmt::Display for OtaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            OtaError::AlreadyRunning => "update already in progress",
            OtaError::Partition => "update partition unavailable",
            OtaError::Memory => "out of memory",
            OtaError::ValidateFailed => "firmware image validation failed",
            OtaError::Incomplete => "firmware transfer incomplete",
            OtaError::Completing => "failed to finalize update",
            OtaError::Generic => "update failed",
        };
        write!(f, "{msg} ({})", self.code())
    }
}

impl std::error::Error for OtaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_declaration_order() {
        assert_eq!(OtaError::AlreadyRunning.code(), 1);
        assert_eq!(OtaError::ValidateFailed.code(), 4);
        assert_eq!(OtaError::Generic.code(), 7);
    }

    #[test]
    fn from_code_maps_back() {
        assert_eq!(OtaError::from_code(0), Some(Ok(())));
        assert_eq!(OtaError::from_code(5), Some(Err(OtaError::Incomplete)));
        assert_eq!(OtaError::from_code(8), None);
        assert_eq!(OtaError::from_code(-1), None);
    }

    #[test]
    fn result_code_of_success_is_zero() {
        assert_eq!(result_code(&Ok(())), 0);
        assert_eq!(result_code(&Err(OtaError::Completing)), 6);
    }

    #[test]
    fn display_includes_code() {
        assert_eq!(OtaError::Memory.to_string(), "out of memory (3)");
    }
}
