//! imgpack Lambda entry point.
//!
//! # Startup
//!
//! Runs once per process, before any invocation:
//!
//! ```text
//! main() -> init_tracing() -> BundlerConfig::load() -> Bundler::new()
//!                                                          |
//!                                 +------------------------+------------------+
//!                                 v                                           v
//!                     lambda_runtime::run(handler)              invoke <event.json|->
//! ```
//!
//! # Commands
//!
//! - *(none)*: serve invocations from the Lambda runtime API.
//! - `invoke <path>`: run the handler once against a local event file (`-` for
//!   stdin) and print the response JSON.

mod monitor;

use anyhow::{Context, Result, anyhow, bail};
use std::env;
use std::fs;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use imgpack_bundler::{Bundler, InvocationResponse};
use imgpack_config::BundlerConfig;
use lambda_runtime::{LambdaEvent, service_fn};
use serde_json::Value;
use tracing::{Instrument, info, info_span};

use monitor::DeadlineWatchdog;

#[tokio::main]
async fn main() -> Result<()> {
    monitor::init_tracing();

    let config = BundlerConfig::load().context("failed to load configuration")?;
    let warning_margin = config.timeout_warning();
    let bundler = Bundler::new(&config).context("failed to initialize bundler")?;
    info!(
        work_dir = %bundler.work_dir().display(),
        user_agent = %config.user_agent(),
        "imgpack initialized"
    );

    let mut args = env::args().skip(1);
    match args.next().as_deref() {
        None => serve(Arc::new(bundler), warning_margin).await,
        Some("invoke") => invoke_local(&bundler, args.next().as_deref()).await,
        Some(other) => {
            bail!("unknown command {other:?}; expected no arguments or `invoke <event.json|->`")
        }
    }
}

async fn serve(bundler: Arc<Bundler>, warning_margin: Option<Duration>) -> Result<()> {
    let handler = service_fn(move |event: LambdaEvent<Value>| {
        let bundler = Arc::clone(&bundler);
        async move { handle_invocation(&bundler, event, warning_margin).await }
    });

    lambda_runtime::run(handler)
        .await
        .map_err(|e| anyhow!("lambda runtime exited: {e}"))
}

async fn handle_invocation(
    bundler: &Bundler,
    event: LambdaEvent<Value>,
    warning_margin: Option<Duration>,
) -> Result<InvocationResponse, lambda_runtime::Error> {
    let (payload, context) = event.into_parts();
    let span = info_span!("invocation", request_id = %context.request_id);

    async move {
        let _watchdog =
            warning_margin.and_then(|margin| DeadlineWatchdog::arm(context.deadline, margin));
        bundler
            .handle(&payload)
            .await
            .map_err(lambda_runtime::Error::from)
    }
    .instrument(span)
    .await
}

async fn invoke_local(bundler: &Bundler, source: Option<&str>) -> Result<()> {
    let raw = match source {
        None | Some("-") => {
            io::read_to_string(io::stdin()).context("failed to read event from stdin")?
        }
        Some(path) => {
            fs::read_to_string(path).with_context(|| format!("failed to read event file {path}"))?
        }
    };
    let event: Value = serde_json::from_str(&raw).context("event is not valid JSON")?;

    let response = bundler
        .handle(&event)
        .instrument(info_span!("invocation", request_id = "local"))
        .await?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
