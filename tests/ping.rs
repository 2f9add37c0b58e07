use appliance_agent::agent::{self, EchoAgent, ServeSettings, UnimplementedApplianceAgent};
use appliance_agent::caller::{AgentCaller, CallerSettings};
use appliance_agent::context::CallContext;
use appliance_agent::grpc::codec::decode_message;
use appliance_agent::grpc::{ApplianceAgent, PingRequest, PingResponse, PING_PATH};
use appliance_agent::probe::Probe;
use bytes::BufMut;
use futures::future;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::time;
use tonic::codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder};
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Request, Response, Status};

const CALL_TIMEOUT: Duration = Duration::from_secs(5);

struct RunningAgent {
    url: String,
    _stop: oneshot::Sender<()>,
}

async fn start_agent<T: ApplianceAgent>(handler: T) -> RunningAgent {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(agent::serve_on(
        listener,
        handler,
        ServeSettings::default(),
        async {
            stopped.await.ok();
        },
    ));

    RunningAgent {
        url: format!("http://{}", addr),
        _stop: stop,
    }
}

fn caller(agent: &RunningAgent) -> AgentCaller {
    AgentCaller::new(&agent.url, &CallerSettings::default()).unwrap()
}

/// Answers only after a fixed delay.
struct SlowAgent(Duration);

#[tonic::async_trait]
impl ApplianceAgent for SlowAgent {
    async fn ping(&self, request: Request<PingRequest>) -> Result<Response<PingResponse>, Status> {
        time::sleep(self.0).await;
        Ok(Response::new(request.into_inner().into()))
    }
}

#[tokio::test]
async fn echo_agent_returns_the_message() {
    let agent = start_agent(EchoAgent).await;
    let caller = caller(&agent);

    for message in ["", "hello", "héllo wörld ✓"] {
        let ctx = CallContext::with_timeout(CALL_TIMEOUT);
        let resp = caller.ping(&ctx, message).await.unwrap();
        assert_eq!(resp.message, message);
    }
}

#[tokio::test]
async fn long_message_is_not_truncated() {
    let agent = start_agent(EchoAgent).await;
    let message = "abcdefgh".repeat(16 * 1024);
    assert!(message.len() > 64 * 1024);

    let ctx = CallContext::with_timeout(CALL_TIMEOUT);
    let resp = caller(&agent).ping(&ctx, message.clone()).await.unwrap();
    assert_eq!(resp.message.len(), message.len());
    assert_eq!(resp.message, message);
}

#[tokio::test]
async fn placeholder_agent_is_unimplemented() {
    let agent = start_agent(UnimplementedApplianceAgent).await;

    let ctx = CallContext::with_timeout(CALL_TIMEOUT);
    let status = caller(&agent).ping(&ctx, "hello").await.unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);
}

#[tokio::test]
async fn cancel_before_reply_fails_with_cancelled() {
    let agent = start_agent(SlowAgent(Duration::from_secs(30))).await;
    let caller = caller(&agent);

    let ctx = CallContext::background();
    let cancel = ctx.clone();
    tokio::spawn(async move {
        time::sleep(Duration::from_millis(100)).await;
        cancel.cancel();
    });

    let status = time::timeout(CALL_TIMEOUT, caller.ping(&ctx, "hello"))
        .await
        .expect("cancelled call must not hang")
        .unwrap_err();
    assert_eq!(status.code(), Code::Cancelled);
}

#[tokio::test]
async fn deadline_before_reply_fails_with_deadline_exceeded() {
    let agent = start_agent(SlowAgent(Duration::from_secs(30))).await;

    let ctx = CallContext::with_timeout(Duration::from_millis(200));
    let status = time::timeout(CALL_TIMEOUT, caller(&agent).ping(&ctx, "hello"))
        .await
        .expect("expired call must not hang")
        .unwrap_err();
    assert_eq!(status.code(), Code::DeadlineExceeded);
}

#[tokio::test]
async fn concurrent_callers_share_one_channel() {
    let agent = start_agent(EchoAgent).await;
    let caller = caller(&agent);

    let calls = (0..16).map(|i| {
        let caller = caller.clone();
        async move {
            let ctx = CallContext::with_timeout(CALL_TIMEOUT);
            let message = format!("ping-{}", i);
            let resp = caller.ping(&ctx, message.clone()).await.unwrap();
            assert_eq!(resp.message, message);
        }
    });
    future::join_all(calls).await;
}

/// Sends raw bytes as the request body so the server sees exactly what we wrote.
#[derive(Default)]
struct RawCodec;

struct RawEncoder;

struct RawDecoder;

impl Codec for RawCodec {
    type Encode = Vec<u8>;
    type Decode = PingResponse;
    type Encoder = RawEncoder;
    type Decoder = RawDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        RawEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        RawDecoder
    }
}

impl Encoder for RawEncoder {
    type Item = Vec<u8>;
    type Error = Status;

    fn encode(&mut self, item: Vec<u8>, dst: &mut EncodeBuf<'_>) -> Result<(), Status> {
        dst.put_slice(&item);
        Ok(())
    }
}

impl Decoder for RawDecoder {
    type Item = PingResponse;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<PingResponse>, Status> {
        decode_message(src).map(Some)
    }
}

async fn raw_call(agent: &RunningAgent, path: &'static str, body: Vec<u8>) -> Result<PingResponse, Status> {
    let channel: Channel = Endpoint::from_shared(agent.url.clone())
        .unwrap()
        .connect()
        .await
        .unwrap();
    let mut grpc = tonic::client::Grpc::new(channel);
    grpc.ready().await.unwrap();
    grpc.unary(Request::new(body), PathAndQuery::from_static(path), RawCodec)
        .await
        .map(|r| r.into_inner())
}

#[tokio::test]
async fn malformed_request_is_invalid_argument() {
    let agent = start_agent(EchoAgent).await;

    // length prefix promises five bytes, one follows
    let status = raw_call(&agent, PING_PATH, vec![0x0a, 0x05, b'h']).await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);

    let status = raw_call(&agent, PING_PATH, vec![0x0a, 0x02, 0xff, 0xfe]).await.unwrap_err();
    assert_eq!(status.code(), Code::InvalidArgument);
}

#[tokio::test]
async fn well_formed_raw_request_is_echoed() {
    let agent = start_agent(EchoAgent).await;

    let resp = raw_call(&agent, PING_PATH, vec![0x0a, 0x02, b'h', b'i']).await.unwrap();
    assert_eq!(resp.message, "hi");
}

#[tokio::test]
async fn unknown_method_is_unimplemented() {
    let agent = start_agent(EchoAgent).await;

    let status = raw_call(&agent, "/virtualappliance.ApplianceAgent/Reboot", vec![])
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unimplemented);
}

#[tokio::test]
async fn probe_reports_every_ping() {
    let agent = start_agent(EchoAgent).await;
    let probe = Probe::new(caller(&agent), CALL_TIMEOUT);

    let reports = probe.run(&CallContext::background(), "hello", 4).await;
    assert_eq!(reports.len(), 4);
    assert!(reports.iter().all(|r| r.is_ok() && r.rtt.is_some()));
    let mut seqs: Vec<u32> = reports.iter().map(|r| r.seq).collect();
    seqs.sort_unstable();
    assert_eq!(seqs, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn probe_reports_failures_with_their_code() {
    let agent = start_agent(SlowAgent(Duration::from_secs(30))).await;
    let probe = Probe::new(caller(&agent), Duration::from_millis(100));

    let reports = probe.run(&CallContext::background(), "hello", 2).await;
    assert!(reports.iter().all(|r| r.is_timeout() && !r.is_ok()));

    let agent = start_agent(UnimplementedApplianceAgent).await;
    let probe = Probe::new(caller(&agent), CALL_TIMEOUT);

    let reports = probe.run(&CallContext::background(), "hello", 1).await;
    assert_eq!(reports[0].code, Some(Code::Unimplemented));
}
