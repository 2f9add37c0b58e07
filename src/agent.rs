use crate::conf;
use crate::grpc::{ApplianceAgent, ApplianceAgentServer, PingRequest, PingResponse};
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, info, info_span};
use tracing_attributes::instrument;
use tracing_futures::Instrument;

const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Replies to every ping with the message it carried.
#[derive(Debug, Default, Clone)]
pub struct EchoAgent;

#[tonic::async_trait]
impl ApplianceAgent for EchoAgent {
    #[instrument(skip_all, name = "echo_ping")]
    async fn ping(&self, request: Request<PingRequest>) -> Result<Response<PingResponse>, Status> {
        let req = request.into_inner();
        debug!("Recv ping message len:{}", req.message().len());
        Ok(Response::new(PingResponse::from(req)))
    }
}

/// Placeholder handler: every method fails with `Unimplemented`.
#[derive(Debug, Default, Clone)]
pub struct UnimplementedApplianceAgent;

#[tonic::async_trait]
impl ApplianceAgent for UnimplementedApplianceAgent {
    async fn ping(&self, _request: Request<PingRequest>) -> Result<Response<PingResponse>, Status> {
        Err(Status::unimplemented("method Ping not implemented"))
    }
}

#[derive(Debug, Clone)]
pub struct ServeSettings {
    pub max_message_bytes: usize,
}

impl Default for ServeSettings {
    fn default() -> Self {
        Self {
            max_message_bytes: MAX_MESSAGE_BYTES,
        }
    }
}

impl From<&conf::Agent> for ServeSettings {
    fn from(a: &conf::Agent) -> Self {
        Self {
            max_message_bytes: a.max_message_bytes,
        }
    }
}

pub fn agent_service<T: ApplianceAgent>(
    handler: T,
    settings: ServeSettings,
) -> ApplianceAgentServer<T> {
    ApplianceAgentServer::new(handler)
        .max_decoding_message_size(settings.max_message_bytes)
        .max_encoding_message_size(settings.max_message_bytes)
}

/// Binds `addr` and serves `handler` until `shutdown` resolves.
pub async fn serve<T, F>(
    addr: SocketAddr,
    handler: T,
    settings: ServeSettings,
    shutdown: F,
) -> Result<()>
where
    T: ApplianceAgent,
    F: Future<Output = ()>,
{
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("bind {}", addr))?;
    serve_on(listener, handler, settings, shutdown).await
}

/// Serves `handler` on an already bound listener until `shutdown` resolves.
pub async fn serve_on<T, F>(
    listener: TcpListener,
    handler: T,
    settings: ServeSettings,
    shutdown: F,
) -> Result<()>
where
    T: ApplianceAgent,
    F: Future<Output = ()>,
{
    let local_addr = listener.local_addr()?;
    info!("Agent listen on {}", local_addr);

    Server::builder()
        .add_service(agent_service(handler, settings))
        .serve_with_incoming_shutdown(TcpListenerStream::new(listener), shutdown)
        .instrument(info_span!("agent", addr = %local_addr))
        .await
        .context("agent server stop")?;

    info!("Agent on {} stopped", local_addr);
    Ok(())
}
