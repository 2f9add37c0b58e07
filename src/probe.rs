use crate::caller::AgentCaller;
use crate::context::CallContext;
use crate::structures::PingReport;
use futures::future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// Sends a batch of concurrent pings through one caller and reports each.
pub struct Probe {
    caller: AgentCaller,
    timeout: Duration,
}

impl Probe {
    pub fn new(caller: AgentCaller, timeout: Duration) -> Self {
        Self { caller, timeout }
    }

    pub async fn run(&self, ctx: &CallContext, message: &str, count: u32) -> Vec<PingReport> {
        let pings = (0..count).map(|seq| self.ping_once(ctx, seq, message));
        future::join_all(pings).await
    }

    async fn ping_once(&self, ctx: &CallContext, seq: u32, message: &str) -> PingReport {
        let ctx = ctx.child(Some(self.timeout));
        let send_at = Instant::now();
        match self.caller.ping(&ctx, message).await {
            Ok(resp) => {
                let rtt = send_at.elapsed();
                let echoed = resp.message() == message;
                if echoed {
                    info!("Ping seq:{} rtt:{:?}", seq, rtt);
                } else {
                    warn!("Ping seq:{} echo mismatch len:{}", seq, resp.message().len());
                }
                PingReport::success(seq, rtt, echoed)
            }
            Err(e) => {
                warn!("Ping seq:{} fail, code:{:?} err:{}", seq, e.code(), e.message());
                PingReport::failure(seq, e.code())
            }
        }
    }
}
