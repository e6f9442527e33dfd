//! `fh2`: FH-2 remote keypad emulator for the terminal.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use clap::{ArgAction, Parser};
use crossbeam_channel::{select, RecvTimeoutError};
use fh2_bridge::{Bridge, PanelConfig};
use fh2_runner::{
    load_config, save_config, spawn_event_printer, Flow, LoopbackRadio, Panel, PanelCommand,
    RadioState, RunnerError, DEFAULT_CONFIG_FILE,
};
use fh2_transport::{available_ports, MockTransport};
use parking_lot::Mutex;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fh2", version, about = "FH-2 remote keypad emulator")]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Serial port, overriding the configuration
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate, overriding the configuration
    #[arg(short, long)]
    baud: Option<u32>,

    /// List serial ports and exit
    #[arg(long)]
    list_ports: bool,

    /// Talk to a simulated radio instead of a serial port
    #[arg(long)]
    loopback: bool,

    /// Skip the startup state queries
    #[arg(long)]
    no_query: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn list_ports() -> Result<(), RunnerError> {
    let ports = available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found.");
    }
    for port in ports {
        match port.product {
            Some(product) => println!("{}\t{}\t{}", port.name, port.port_type, product),
            None => println!("{}\t{}", port.name, port.port_type),
        }
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), RunnerError> {
    if cli.list_ports {
        return list_ports();
    }

    let mut config = load_config(&cli.config);
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    fh2_metrics::describe_metrics();

    let (bridge, mut radio) = if cli.loopback {
        let (transport, handle) = MockTransport::new("loopback");
        let radio = LoopbackRadio::spawn(
            handle,
            RadioState::from_config(&config),
            config.poll_interval(),
        )?;
        info!("running against simulated radio");
        (Bridge::new(&config, Some(Arc::new(transport))), Some(radio))
    } else {
        (Bridge::connect(&config), None)
    };
    let bridge = Arc::new(bridge);
    let query_delay = config.startup_query_delay();
    let config = Arc::new(Mutex::new(config));

    let printer = spawn_event_printer(bridge.subscribe())?;
    let panel = Panel::new(Arc::clone(&bridge), Arc::clone(&config));
    bridge.start()?;

    let (interrupt_tx, interrupt_rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.try_send(());
    })?;

    // Dropped on shutdown to wake the startup query.
    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(0);
    let query = (!cli.no_query).then(|| {
        let bridge = Arc::clone(&bridge);
        thread::spawn(move || {
            if shutdown_rx.recv_timeout(query_delay) == Err(RecvTimeoutError::Timeout) {
                if let Err(e) = bridge.query_initial_values() {
                    warn!(error = %e, "initial state query incomplete");
                }
            }
        })
    });

    let (line_tx, line_rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        for line in io::stdin().lock().lines().map_while(Result::ok) {
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    println!("Type 'help' for commands.");
    loop {
        select! {
            recv(line_rx) -> line => {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<PanelCommand>() {
                    Ok(command) => {
                        let mut stdout = io::stdout();
                        match panel.execute(command, &mut stdout) {
                            Ok(Flow::Continue) => {}
                            Ok(Flow::Quit) => break,
                            Err(e) => warn!(error = %e, "failed to write output"),
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
            recv(interrupt_rx) -> _ => {
                info!("interrupted");
                break;
            }
        }
    }

    drop(shutdown_tx);
    if let Some(query) = query {
        let _ = query.join();
    }
    bridge.stop();
    if let Some(radio) = radio.as_mut() {
        radio.stop();
    }

    let mut saved: PanelConfig = config.lock().clone();
    bridge.state().write_into(&mut saved);
    drop(panel);
    drop(bridge);
    let _ = printer.join();

    save_config(&cli.config, &saved)?;
    info!(path = %cli.config.display(), "configuration saved");
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
