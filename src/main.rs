// Sysgauge - systemd unit state gauges
// Main entry point

use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use sysgauge::config::Config;
use sysgauge::metrics::{default_hostname, LogSink, MetricSink, PutvalSink};
use sysgauge::poller::{self, Poller};
use sysgauge::systemd::DbusConnection;
use sysgauge::version::build_info;

#[derive(Parser, Debug)]
#[command(name = "sysgauge")]
#[command(author, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Config file path
    #[arg(short, long)]
    config: Option<String>,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Where samples are written
    #[arg(long, value_enum, default_value_t = Output::Putval)]
    output: Output,

    /// Show version information
    #[arg(short = 'V', long)]
    version: bool,

    /// Show detailed build information
    #[arg(long)]
    build_info: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Output {
    /// collectd exec-plugin PUTVAL lines on stdout
    Putval,
    /// Structured log events on stderr
    Log,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("{}", build_info().format_display());
        return Ok(());
    }

    if cli.build_info {
        println!("{}", build_info().format_display());
        println!("\n{}", build_info().format_build_info());
        return Ok(());
    }

    // stdout carries samples, so logs go to stderr
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if cli.debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::load(cli.config.map(PathBuf::from))?;

    match cli.output {
        Output::Putval => {
            let sink = PutvalSink::new(std::io::stdout(), default_hostname(), config.interval);
            run_poller(config, sink, cli.once).await
        }
        Output::Log => run_poller(config, LogSink, cli.once).await,
    }
}

async fn run_poller<S>(config: Config, sink: S, once: bool) -> Result<()>
where
    S: MetricSink + Send,
{
    let bus = DbusConnection::new(config.timeout);
    let Some(mut service_poller) = poller::register(&config, bus, sink).await else {
        return Ok(());
    };

    if once {
        service_poller.tick().await;
        return Ok(());
    }

    tracing::info!(
        "Polling {} service(s) every {:?}",
        service_poller.services().len(),
        service_poller.interval()
    );
    poller::run(&mut service_poller, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await;

    Ok(())
}
