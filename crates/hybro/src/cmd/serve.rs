use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use hybro_bridge::{Bridge, BridgeConfig};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;

use crate::cmd::ServeArgs;
use crate::demo;
use crate::exit::{io_error, parse_duration, CliError, CliResult, INTERNAL, SUCCESS};
use crate::stdio::LineChannel;

/// Resolved `serve` settings.
#[derive(Debug, Clone)]
pub struct ServeOptions {
    pub config: BridgeConfig,
    pub tick_interval: Duration,
    pub drain_timeout: Duration,
}

impl ServeOptions {
    pub fn from_args(args: &ServeArgs) -> CliResult<Self> {
        let mut config = BridgeConfig::default();
        if let Some(chunk_size) = args.chunk_size {
            config.chunk_size = chunk_size;
        }
        config.invoke_timeout = args
            .invoke_timeout
            .as_deref()
            .map(parse_duration)
            .transpose()?;

        Ok(Self {
            config,
            tick_interval: parse_duration(&args.tick_interval)?,
            drain_timeout: parse_duration(&args.drain_timeout)?,
        })
    }
}

enum Stop {
    InputClosed(io::Result<u64>),
    Interrupted,
}

pub fn run(args: ServeArgs) -> CliResult<i32> {
    let options = ServeOptions::from_args(&args)?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime startup failed", err))?;

    runtime.block_on(serve(
        options,
        tokio::io::stdin(),
        tokio::io::stdout(),
        interrupted(),
    ))
}

async fn interrupted() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable");
        std::future::pending::<()>().await;
    }
}

/// Bridge `input` and `output` until input closes or `shutdown` resolves.
pub async fn serve<R, W, S>(
    options: ServeOptions,
    input: R,
    output: W,
    shutdown: S,
) -> CliResult<i32>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
    S: Future<Output = ()>,
{
    let demo = demo::demo();
    let bridge = Bridge::new(demo.packages, options.config);
    let (channel, writer) = LineChannel::spawn(bridge.config().message_category.clone(), output);
    bridge.attach(Arc::new(channel.clone()));

    let stop_ticker = CancellationToken::new();
    let ticker = demo::spawn_ticker(demo.ticker, options.tick_interval, stop_ticker.clone());

    tracing::info!(
        chunk_size = bridge.config().chunk_size,
        tick_interval_ms = u64::try_from(options.tick_interval.as_millis()).unwrap_or(u64::MAX),
        "serving on stdio"
    );

    let stop = tokio::select! {
        pumped = channel.pump(input) => Stop::InputClosed(pumped),
        () = shutdown => Stop::Interrupted,
    };

    match &stop {
        Stop::InputClosed(Ok(_)) => {
            let drained = tokio::time::timeout(options.drain_timeout, bridge.wait_idle()).await;
            if drained.is_err() {
                tracing::warn!(
                    pending = bridge.in_flight(),
                    "drain timeout elapsed, dropping in-flight results"
                );
            }
        }
        Stop::InputClosed(Err(_)) => {}
        Stop::Interrupted => tracing::info!("interrupted"),
    }

    stop_ticker.cancel();
    if let Err(err) = ticker.await {
        tracing::warn!(error = %err, "ticker task failed");
    }

    bridge.detach();
    channel.close();

    writer
        .await
        .map_err(|err| CliError::new(INTERNAL, format!("output task failed: {err}")))?
        .map_err(|err| io_error("writing output failed", err))?;

    match stop {
        Stop::InputClosed(Err(err)) => Err(io_error("reading input failed", err)),
        Stop::InputClosed(Ok(_)) | Stop::Interrupted => Ok(SUCCESS),
    }
}
