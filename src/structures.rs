use crate::grpc::{PingRequest, PingResponse};
use std::time::Duration;
use tonic::Code;

impl PingRequest {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl PingResponse {
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for PingRequest {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for PingRequest {
    fn from(message: &str) -> Self {
        Self::from(message.to_string())
    }
}

impl From<PingRequest> for PingResponse {
    fn from(req: PingRequest) -> Self {
        Self {
            message: req.message,
        }
    }
}

/// Outcome of one ping sent by the probe.
#[derive(Debug)]
pub struct PingReport {
    pub seq: u32,
    pub rtt: Option<Duration>,
    pub echoed: bool,
    pub code: Option<Code>,
}

impl PingReport {
    pub fn success(seq: u32, rtt: Duration, echoed: bool) -> Self {
        Self {
            seq,
            rtt: Some(rtt),
            echoed,
            code: None,
        }
    }

    pub fn failure(seq: u32, code: Code) -> Self {
        Self {
            seq,
            rtt: None,
            echoed: false,
            code: Some(code),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_none() && self.echoed
    }

    pub fn is_timeout(&self) -> bool {
        self.code == Some(Code::DeadlineExceeded)
    }
}
