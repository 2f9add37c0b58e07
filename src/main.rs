use appliance_agent::agent::{self, EchoAgent, ServeSettings};
use appliance_agent::caller::{AgentCaller, CallerSettings};
use appliance_agent::conf::{read_conf, Args, Command, Conf};
use appliance_agent::context::CallContext;
use appliance_agent::probe::Probe;
use appliance_agent::structures::PingReport;
use clap::Parser;
use futures::future;
use std::process;
use tokio::signal;
use tonic::Code;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let conf = match read_conf(&args.conf).await {
        Ok(conf) => conf,
        Err(e) => {
            eprintln!("Invalid conf: {:#}", e);
            process::exit(exitcode::CONFIG);
        }
    };
    // read_conf already validated the level
    let level = conf.log.level().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
    info!("read conf from {}", &args.conf);

    let code = match args.command {
        Command::Serve => run_serve(conf).await,
        Command::Ping { message, count } => run_ping(conf, &message, count).await,
    };
    process::exit(code);
}

async fn run_serve(conf: Conf) -> exitcode::ExitCode {
    let settings = ServeSettings::from(&conf.agent);
    let result = agent::serve(conf.agent.listen, EchoAgent, settings, shutdown_signal()).await;
    match result {
        Ok(()) => exitcode::OK,
        Err(e) => {
            error!("Agent serve fail, err:{:#}", e);
            exitcode::UNAVAILABLE
        }
    }
}

async fn run_ping(conf: Conf, message: &str, count: u32) -> exitcode::ExitCode {
    let caller = match AgentCaller::new(&conf.client.url, &CallerSettings::from(&conf.client)) {
        Ok(caller) => caller,
        Err(e) => {
            error!("Invalid agent url {}, err:{}", conf.client.url, e);
            return exitcode::CONFIG;
        }
    };

    let ctx = CallContext::background();
    let cancel = ctx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        cancel.cancel();
    });

    let probe = Probe::new(caller, conf.client.timeout());
    let reports = probe.run(&ctx, message, count).await;
    summarize(&reports)
}

fn summarize(reports: &[PingReport]) -> exitcode::ExitCode {
    let ok = reports.iter().filter(|r| r.is_ok()).count();
    let timeout = reports.iter().filter(|r| r.is_timeout()).count();
    info!(
        "Ping done, total:{} ok:{} timeout:{}",
        reports.len(),
        ok,
        timeout
    );

    if ok == reports.len() {
        exitcode::OK
    } else if reports
        .iter()
        .any(|r| matches!(r.code, Some(Code::Unavailable) | Some(Code::DeadlineExceeded)))
    {
        exitcode::UNAVAILABLE
    } else {
        exitcode::SOFTWARE
    }
}

async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        error!("Listen ctrl-c fail, err:{}", e);
        future::pending::<()>().await;
    }
    warn!("Recv ctrl-c, shutting down");
}
