//! Router-interface agent entry point.

use clap::Parser;
use nos_hal::{HalGateway, MockSwitchDriver, VrfHandle};
use nos_types::MacAddress;
use parking_lot::RwLock;
use rifagent::daemon::{Daemon, DaemonConfig};
use rifagent::intfs::{IntfsOrch, IntfsOrchConfig};
use rifagent::ports::PortDirectory;
use rifagent::vrf::VrfDirectory;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Router-interface control-plane agent
#[derive(Parser, Debug)]
#[command(name = "rifagent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Router source MAC address
    #[arg(short = 'm', long, default_value = "00:00:00:00:00:00")]
    mac_address: String,

    /// Default virtual-router handle (raw)
    #[arg(long, default_value = "1")]
    default_vrf: u64,

    /// Drain interval in milliseconds
    #[arg(long, default_value = "100")]
    drain_interval: u64,

    /// Log filter (e.g. info, rifagent=debug)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&args.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("====================================================================");
    info!("Starting rifagent");
    info!("====================================================================");

    let router_mac: MacAddress = match args.mac_address.parse() {
        Ok(mac) => mac,
        Err(e) => {
            error!(mac = %args.mac_address, error = %e, "invalid router MAC");
            return ExitCode::FAILURE;
        }
    };
    let Some(default_vrf) = VrfHandle::from_raw(args.default_vrf) else {
        error!("default VRF handle must be non-zero");
        return ExitCode::FAILURE;
    };

    info!(%router_mac, %default_vrf, drain_interval_ms = args.drain_interval, "configuration");

    // The vendor driver is linked in deployment images; standalone runs use
    // the in-memory driver.
    let driver = Arc::new(MockSwitchDriver::new());
    let hal = Arc::new(HalGateway::new(driver));
    let ports = Arc::new(RwLock::new(PortDirectory::new()));
    let vrfs = Arc::new(RwLock::new(VrfDirectory::new(default_vrf)));

    let orch = IntfsOrch::new(IntfsOrchConfig::new(router_mac), ports, vrfs, hal);

    let mut daemon = Daemon::new(DaemonConfig {
        drain_interval_ms: args.drain_interval,
    });
    daemon.register(Box::new(orch));

    let stop = daemon.stop_handle();
    let shutdown = tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("received SIGINT, shutting down");
                stop.store(false, Ordering::SeqCst);
            }
            Err(e) => error!(error = %e, "failed to listen for ctrl-c"),
        }
    });

    daemon.run().await;
    shutdown.abort();

    info!("rifagent shutdown complete");
    ExitCode::SUCCESS
}
