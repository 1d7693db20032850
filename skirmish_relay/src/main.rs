// CLI entry point for the Skirmish relay.
//
// Starts a standalone relay that match clients connect to. The relay routes
// tagged events and tracks membership/authority; it never runs match logic.
// See `server.rs` for the networking architecture and `session.rs` for the
// session state.
//
// Usage:
//   relay [OPTIONS]
//     --bind <ADDR>           Listen address (default: 127.0.0.1)
//     --port <PORT>           Listen port (default: 7878)
//     --name <NAME>           Session name (default: skirmish-arena)
//     --password <PASS>       Session password (optional)
//     --max-players <N>       Room size cap (default: 8)
//
// Log verbosity follows `RUST_LOG` (default `info`). The relay runs until
// SIGINT or SIGTERM; stdin is never read.

use std::net::IpAddr;
use std::sync::mpsc::{self, Receiver, Sender};

use skirmish_relay::server::{RelayConfig, start_relay};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = match parse_args(std::env::args().skip(1)) {
        Ok(Some(config)) => config,
        Ok(None) => {
            print_usage();
            return;
        }
        Err(msg) => {
            eprintln!("{msg}");
            print_usage();
            std::process::exit(2);
        }
    };

    let (handle, addr) = match start_relay(config) {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "failed to start relay");
            std::process::exit(1);
        }
    };

    let stop = StopSignal::new();
    if let Err(e) = ctrlc::set_handler(stop.trigger()) {
        warn!(error = %e, "could not install signal handler; relay will run until killed");
    }
    info!(%addr, "relay ready; press Ctrl+C to stop");
    stop.wait();

    info!("shutting down");
    handle.stop();
}

/// Parks the main thread until the signal handler fires. The sender half
/// stays alive here, so nothing but a trigger can wake `wait`.
struct StopSignal {
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl StopSignal {
    fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    fn trigger(&self) -> impl Fn() + Send + 'static {
        let tx = self.tx.clone();
        move || {
            let _ = tx.send(());
        }
    }

    fn wait(&self) {
        let _ = self.rx.recv();
    }
}

/// Turn `--flag value` pairs into a `RelayConfig`. `Ok(None)` means help was
/// requested.
fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<RelayConfig>, String> {
    let mut config = RelayConfig::default();
    let mut args = args.into_iter();

    while let Some(flag) = args.next() {
        if flag == "--help" || flag == "-h" {
            return Ok(None);
        }
        let value = args
            .next()
            .ok_or_else(|| format!("{flag} requires a value"))?;
        match flag.as_str() {
            "--bind" => {
                config.bind_addr = value
                    .parse::<IpAddr>()
                    .map_err(|_| format!("invalid bind address: {value}"))?;
            }
            "--port" => {
                config.port = value
                    .parse::<u16>()
                    .map_err(|_| format!("invalid port: {value}"))?;
            }
            "--name" => config.session_name = value,
            "--password" => config.password = Some(value),
            "--max-players" => {
                config.max_players = value
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or_else(|| format!("--max-players must be a positive number, got {value}"))?;
            }
            _ => return Err(format!("unknown argument: {flag}")),
        }
    }
    Ok(Some(config))
}

fn print_usage() {
    println!("Usage: relay [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --bind <ADDR>           Listen address (default: 127.0.0.1)");
    println!("  --port <PORT>           Listen port (default: 7878)");
    println!("  --name <NAME>           Session name (default: skirmish-arena)");
    println!("  --password <PASS>       Session password (optional)");
    println!("  --max-players <N>       Room size cap (default: 8)");
    println!("  --help, -h              Show this help");
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::RecvTimeoutError;
    use std::time::Duration;

    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn defaults_without_flags() {
        let config = parse_args(args(&[])).unwrap().unwrap();
        assert!(config.bind_addr.is_loopback());
        assert_eq!(config.port, 7878);
        assert_eq!(config.max_players, 8);
        assert!(config.password.is_none());
    }

    #[test]
    fn all_flags() {
        let config = parse_args(args(&[
            "--bind",
            "0.0.0.0",
            "--port",
            "9000",
            "--name",
            "dunes",
            "--password",
            "pw",
            "--max-players",
            "4",
        ]))
        .unwrap()
        .unwrap();
        assert!(config.bind_addr.is_unspecified());
        assert_eq!(config.port, 9000);
        assert_eq!(config.session_name, "dunes");
        assert_eq!(config.password.as_deref(), Some("pw"));
        assert_eq!(config.max_players, 4);
    }

    #[test]
    fn help_short_circuits() {
        assert!(parse_args(args(&["--port", "1", "-h"])).unwrap().is_none());
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(parse_args(args(&["--port", "http"])).is_err());
        assert!(parse_args(args(&["--bind", "localhost:80"])).is_err());
        assert!(parse_args(args(&["--max-players", "0"])).is_err());
        assert!(parse_args(args(&["--name"])).is_err());
        assert!(parse_args(args(&["--turbo", "1"])).is_err());
    }

    #[test]
    fn stop_signal_waits_for_trigger() {
        let stop = StopSignal::new();
        assert_eq!(
            stop.rx.recv_timeout(Duration::from_millis(50)),
            Err(RecvTimeoutError::Timeout)
        );

        let fire = stop.trigger();
        std::thread::spawn(fire);
        stop.wait();
    }
}
