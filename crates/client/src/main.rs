mod config;
mod session;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use config::SessionConfig;
use sausages::{ClientConfig, NetEvent, PacketLossSimulation};
use session::{LineAction, Session, describe_event};

#[derive(Parser)]
#[command(name = "sausages-client")]
#[command(about = "Line client for the sausages relay server")]
struct Args {
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    #[arg(short, long, default_value_t = sausages::net::DEFAULT_PORT)]
    port: u16,

    #[arg(long, default_value_t = 1000, help = "Connect retry interval in ms")]
    retry_ms: u64,

    #[arg(long, help = "Game data archive holding client.lua")]
    data: Option<PathBuf>,

    #[arg(long, help = "Enable outbound packet loss simulation")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = SessionConfig {
        net: ClientConfig {
            retry_interval: Duration::from_millis(args.retry_ms),
            ..Default::default()
        },
        game_data: args.data,
        packet_loss: args
            .simulate_packet_loss
            .then(|| PacketLossSimulation::new(args.loss_percent)),
        ..Default::default()
    };

    let mut session = Session::new(&args.host, args.port, config)
        .with_context(|| format!("Failed to reach {}:{}", args.host, args.port))?;

    if let Some(script) = session.load_entry_script() {
        match script {
            Ok(bytes) => log::info!("Loaded client script ({} bytes)", bytes.len()),
            Err(e) => log::warn!("No client script: {}", e),
        }
    }

    log::info!("Connecting to {}", session.server_addr());
    run(&mut session, spawn_stdin_reader());
    session.disconnect();

    Ok(())
}

fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else {
                break;
            };
            if tx.send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn run(session: &mut Session, lines: Receiver<String>) {
    let tick = session.config().tick_duration();

    loop {
        for event in session.drain_events() {
            let text = describe_event(&event);
            match event {
                NetEvent::Data { .. } => println!("{}", text),
                NetEvent::Connect { .. } => log::info!("{}", text),
                NetEvent::Disconnect { .. } => {
                    log::warn!("{}", text);
                    return;
                }
            }
        }

        match lines.try_recv() {
            Ok(line) => match session.handle_line(&line) {
                LineAction::Quit => return,
                LineAction::NotConnected => log::warn!("Not connected yet, line dropped"),
                LineAction::Stats => {
                    let stats = session.stats();
                    println!(
                        "state {:?}: {} sent / {} recv, {} dropped",
                        session.state(),
                        stats.packets_sent,
                        stats.packets_received,
                        stats.packets_dropped
                    );
                }
                LineAction::Sent(bytes) => log::debug!("Sent {} bytes", bytes),
                LineAction::Ignored => {}
            },
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return,
        }

        thread::sleep(tick);
    }
}
