use crate::handle::Handle;
use crate::types::{
    AdapterProperties, CompilationMessage, DeviceLostReason, ErrorType, FeatureName,
    LoggingLevel, RequestStatus, SupportedLimits,
};

/// Why a pending request finished without a reply from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The channel was torn down.
    ConnectionLost,
    /// The object the request was made on was released first.
    ObjectReleased,
    /// The request could not be encoded.
    SendFailed,
}

/// Server reply to an asynchronous request.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    MapAsync {
        status: RequestStatus,
        data: Vec<u8>,
    },
    WorkDone {
        status: RequestStatus,
    },
    /// `pipeline` is the usable handle on success, unless the pipeline was
    /// released before the reply arrived.
    CreatePipeline {
        status: RequestStatus,
        pipeline: Option<Handle>,
        message: String,
    },
    PopErrorScope {
        status: RequestStatus,
        error_type: ErrorType,
        message: String,
    },
    CompilationInfo {
        status: RequestStatus,
        messages: Vec<CompilationMessage>,
    },
    RequestAdapter {
        status: RequestStatus,
        adapter: Option<Handle>,
        message: String,
        properties: Option<AdapterProperties>,
        limits: Option<SupportedLimits>,
        features: Vec<FeatureName>,
    },
    RequestDevice {
        status: RequestStatus,
        device: Option<Handle>,
        message: String,
        limits: Option<SupportedLimits>,
        features: Vec<FeatureName>,
    },
}

/// What a request continuation receives. Every continuation is called with
/// exactly one `Outcome`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Reply),
    Cancelled(CancelReason),
}

impl Outcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Outcome::Cancelled(_))
    }

    pub fn reply(&self) -> Option<&Reply> {
        match self {
            Outcome::Completed(reply) => Some(reply),
            Outcome::Cancelled(_) => None,
        }
    }
}

/// Unsolicited device notifications, drained with
/// [`Client::drain_events`](super::Client::drain_events).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Lost {
        reason: DeviceLostReason,
        message: String,
    },
    UncapturedError {
        error_type: ErrorType,
        message: String,
    },
    Log {
        level: LoggingLevel,
        message: String,
    },
}
