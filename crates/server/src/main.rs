mod config;
mod events;
mod server;
mod tui;

use std::io;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use config::{RelayConfig, RelayMode};
use events::{DisconnectReason, ServerEvent};
use sausages::{PacketLossSimulation, ServerConfig};
use server::RelayServer;
use tui::TuiState;

#[derive(Parser)]
#[command(name = "sausages-server")]
#[command(about = "Sausages relay server")]
struct Args {
    #[arg(short, long, default_value_t = sausages::net::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = 60)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = sausages::net::DEFAULT_MAX_CLIENTS)]
    max_clients: u32,

    #[arg(long, default_value_t = 10, help = "Seconds of silence before a peer is dropped")]
    timeout: u64,

    #[arg(long, value_enum, default_value_t = RelayMode::Broadcast)]
    relay: RelayMode,

    #[arg(long, help = "Game data archive to watch for server.lua")]
    data: Option<PathBuf>,

    #[arg(long)]
    headless: bool,

    #[arg(long, help = "Enable outbound packet loss simulation")]
    simulate_packet_loss: bool,

    #[arg(long, default_value_t = 0.0, help = "Packet loss percentage (0-100)")]
    loss_percent: f32,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let packet_loss = args
        .simulate_packet_loss
        .then(|| PacketLossSimulation::new(args.loss_percent));

    let config = RelayConfig {
        tick_rate: args.tick_rate,
        net: ServerConfig {
            max_clients: args.max_clients,
            timeout: Duration::from_secs(args.timeout),
            ..Default::default()
        },
        relay_mode: args.relay,
        game_data: args.data,
        packet_loss,
    };

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let mut server = RelayServer::new(args.port, config)
        .with_context(|| format!("Failed to start server on port {}", args.port))?;

    if args.headless {
        log::info!("Server started on {}", server.local_addr());
        server.run();
        log::info!("Server shutting down");
    } else {
        run_with_tui(&mut server)?;
    }

    Ok(())
}

fn run_with_tui(server: &mut RelayServer) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = server.running();
    let mut tui_state = TuiState::new();

    tui_state.log_info(format!("Server started on {}", server.local_addr()));

    while running.load(Ordering::SeqCst) {
        server.tick_once();

        for event in server.drain_events() {
            match &event {
                ServerEvent::DataRelayed { .. } => {}
                ServerEvent::Error { .. } => tui_state.log_error(event.describe()),
                ServerEvent::PeerDisconnected {
                    reason: DisconnectReason::Kicked,
                    ..
                } => tui_state.log_warn(event.describe()),
                _ => tui_state.log_info(event.describe()),
            }
        }

        if let Some(client_id) = tui_state.take_pending_kick() {
            server.kick_client(client_id);
        }

        let peers = server.peer_infos();
        tui_state.clamp_selection(peers.len());

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            running.store(false, Ordering::SeqCst);
                        }
                        KeyCode::Up => tui_state.select_prev(peers.len()),
                        KeyCode::Down => tui_state.select_next(peers.len()),
                        KeyCode::Char('k') | KeyCode::Char('K') => {
                            tui_state.request_kick(&peers);
                        }
                        _ => {}
                    }
                }
            }
        }

        let stats = server.stats();
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &stats, &peers);
        })?;
    }

    tui_state.log_info("Shutting down...");
    server.shutdown_connections();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
