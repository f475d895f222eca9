use std::time::Duration;

use clap::Parser;
use first_nonerr::{
    probe::{self, SubnetProbe},
    Race,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Find the first host on a /24 subnet that answers `200 OK` on a port.
#[derive(Parser)]
struct Cli {
    /// port to check on every host
    #[arg(long, default_value_t = 3000)]
    port: u16,
    /// first three octets of the subnet, e.g. 192.168.1
    #[arg(long, default_value = "192.168.1")]
    subnet: String,
    /// number of hosts probed at once, 0 probes every host at once
    #[arg(long, default_value_t = 0)]
    concurrent: usize,
    /// timeout of a single request in seconds
    #[arg(long, default_value_t = 5)]
    request_timeout: u64,
    /// give up on the whole scan after this many seconds
    #[arg(long)]
    deadline: Option<u64>,
    /// report a generic error instead of one of the probe errors when no host answers
    #[arg(long)]
    discard_errors: bool,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

impl Cli {
    fn race(&self) -> Race {
        let mut race = Race::new().concurrency(self.concurrent);
        if let Some(deadline) = self.deadline {
            race = race.timeout(Duration::from_secs(deadline));
        }
        if self.discard_errors {
            race = race.discard_errors();
        }
        race
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let client = probe::make_robust_client(Duration::from_secs(cli.request_timeout))?;
        let subnet_probe = SubnetProbe::new(client, &cli.subnet, cli.port)?;
        let cancel = CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            }
        });
        let url = subnet_probe.find(cli.race(), &cancel, probe::HOSTS).await?;
        println!("{}", url);
        Ok(())
    })
}
