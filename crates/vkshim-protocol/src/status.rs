use serde::{Deserialize, Serialize};

/// Status codes of the intercepted interface. The layer forwards these
/// unchanged and never invents its own; every failure it detects itself is
/// reported through one of the codes the interface already defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Success,
    /// A query wrote fewer elements than were available. Not an error.
    Incomplete,
    NotReady,
    /// The call was handed to a deferred operation; results arrive later.
    OperationDeferred,
    OperationNotDeferred,
    ErrorOutOfHostMemory,
    ErrorOutOfDeviceMemory,
    ErrorInvalidUsage,
    ErrorDeviceLost,
    ErrorUnknown,
}

impl Status {
    pub fn is_error(self) -> bool {
        matches!(
            self,
            Status::ErrorOutOfHostMemory
                | Status::ErrorOutOfDeviceMemory
                | Status::ErrorInvalidUsage
                | Status::ErrorDeviceLost
                | Status::ErrorUnknown
        )
    }

    /// Success including the partial-enumeration case.
    pub fn wrote_output(self) -> bool {
        matches!(self, Status::Success | Status::Incomplete)
    }
}
