use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Result;

const DIAL_TIMEOUT: Duration = Duration::from_secs(5);

/// `mproxy check`: report the effective configuration and, when a next
/// hop is configured, whether it answers a TCP dial.
pub async fn run_config_check(config: Config) -> Result<()> {
    info!("Running configuration check...");
    info!("Listen address: {}", config.listen_addr());
    info!("{}", config.work_mode());

    match &config.next_hop {
        Some(next_hop) => match timeout(DIAL_TIMEOUT, TcpStream::connect(next_hop)).await {
            Ok(Ok(_)) => info!("Next hop {next_hop} is reachable"),
            Ok(Err(e)) => warn!("Next hop {next_hop} is not reachable: {e}"),
            Err(_) => warn!(
                "Next hop {next_hop} did not answer within {} seconds",
                DIAL_TIMEOUT.as_secs()
            ),
        },
        None => info!("No next hop configured; destinations come from request headers"),
    }

    Ok(())
}
