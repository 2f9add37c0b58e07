use crate::conf;
use crate::context::CallContext;
use crate::grpc::{ApplianceAgentClient, PingRequest, PingResponse};
use futures::future;
use std::str::FromStr;
use std::time::Duration;
use tokio::time;
use tonic::codegen::http::uri::InvalidUri;
use tonic::transport::{Channel, Uri};
use tonic::{Code, Request, Status};
use tracing::debug;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(10);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

type Client = ApplianceAgentClient<Channel>;

#[derive(Debug, Clone)]
pub struct CallerSettings {
    pub keep_alive: Duration,
    pub connect_timeout: Duration,
    pub max_message_bytes: usize,
}

impl Default for CallerSettings {
    fn default() -> Self {
        Self {
            keep_alive: KEEP_ALIVE_INTERVAL,
            connect_timeout: CONNECT_TIMEOUT,
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

impl From<&conf::Client> for CallerSettings {
    fn from(c: &conf::Client) -> Self {
        Self {
            keep_alive: c.keep_alive(),
            connect_timeout: c.connect_timeout(),
            max_message_bytes: c.max_message_bytes,
        }
    }
}

/// Client side of the agent service.
///
/// Clones share one lazily connected channel, so a single caller can be
/// handed to any number of concurrent tasks.
#[derive(Debug, Clone)]
pub struct AgentCaller {
    client: Client,
}

impl AgentCaller {
    pub fn new(agent_addr: &str, settings: &CallerSettings) -> Result<Self, InvalidUri> {
        let uri = Uri::from_str(agent_addr)?;
        let endpoint = Channel::builder(uri);
        let channel = endpoint
            .http2_keep_alive_interval(settings.keep_alive)
            .connect_timeout(settings.connect_timeout)
            .connect_lazy();
        let client = Client::new(channel)
            .max_decoding_message_size(settings.max_message_bytes)
            .max_encoding_message_size(settings.max_message_bytes);

        Ok(Self { client })
    }

    /// Sends one `Ping`.
    ///
    /// Fails with `Cancelled` once `ctx` is cancelled and with
    /// `DeadlineExceeded` once its deadline passes, whichever comes first;
    /// any other failure is the transport's status, unchanged. Nothing is
    /// retried.
    pub async fn ping(
        &self,
        ctx: &CallContext,
        message: impl Into<String>,
    ) -> Result<PingResponse, Status> {
        if ctx.is_cancelled() {
            return Err(cancelled());
        }
        if ctx.is_expired() {
            return Err(deadline_exceeded());
        }

        let message: String = message.into();
        let mut request = Request::new(PingRequest::from(message));
        if let Some(remaining) = ctx.remaining() {
            request.set_timeout(remaining);
        }

        let deadline = async {
            match ctx.deadline() {
                Some(d) => time::sleep_until(d).await,
                None => future::pending::<()>().await,
            }
        };

        let mut client = self.client.clone();
        let result = tokio::select! {
            biased;

            _ = ctx.cancelled() => Err(cancelled()),
            _ = deadline => Err(deadline_exceeded()),
            resp = client.ping(request) => resp.map(|r| r.into_inner()),
        };

        match result {
            // the server gave up on the propagated timeout before our own timer fired
            Err(s) if s.code() == Code::Cancelled && ctx.is_expired() && !ctx.is_cancelled() => {
                Err(deadline_exceeded())
            }
            Err(s) => {
                debug!("Ping fail, code:{:?} err:{}", s.code(), s.message());
                Err(s)
            }
            Ok(resp) => Ok(resp),
        }
    }
}

fn cancelled() -> Status {
    Status::cancelled("call cancelled by caller")
}

fn deadline_exceeded() -> Status {
    Status::deadline_exceeded("call deadline exceeded")
}
