use std::collections::VecDeque;

use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};

use crate::config::RelayMode;
use crate::server::{PeerRow, ServerStats};

const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct TuiState {
    log: VecDeque<LogLine>,
    selected: usize,
    pending_kick: Option<u32>,
}

impl TuiState {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, level: LogLevel, message: impl Into<String>) {
        if self.log.len() == MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(LogLine {
            level,
            message: message.into(),
        });
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message);
    }

    pub fn log_lines(&self) -> impl DoubleEndedIterator<Item = &LogLine> {
        self.log.iter()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self, peer_count: usize) {
        if peer_count > 0 {
            self.selected = (self.selected + 1) % peer_count;
        }
    }

    pub fn select_prev(&mut self, peer_count: usize) {
        if peer_count > 0 {
            self.selected = (self.selected + peer_count - 1) % peer_count;
        }
    }

    pub fn request_kick(&mut self, peers: &[PeerRow]) {
        if let Some(peer) = peers.get(self.selected) {
            self.pending_kick = Some(peer.client_id);
        }
    }

    pub fn take_pending_kick(&mut self) -> Option<u32> {
        self.pending_kick.take()
    }

    /// Keeps the selection inside the peer list after peers leave.
    pub fn clamp_selection(&mut self, peer_count: usize) {
        if self.selected >= peer_count {
            self.selected = peer_count.saturating_sub(1);
        }
    }
}

pub fn render(frame: &mut Frame, state: &TuiState, stats: &ServerStats, peers: &[PeerRow]) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(6),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[3]);

    render_header(frame, chunks[0], stats);
    render_status(frame, chunks[1], stats);
    render_network(frame, chunks[2], stats);
    render_peers(frame, middle[0], state, peers);
    render_log(frame, middle[1], state);
    render_help(frame, chunks[4]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let uptime = format_duration(stats.uptime_secs);
    let title = format!(" Sausages Server - Uptime: {} ", uptime);

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let mode = match stats.relay_mode {
        RelayMode::Broadcast => "broadcast",
        RelayMode::Echo => "echo",
    };
    let text = format!(
        "Mode: {}  |  Clients: {}  |  Relayed: {}  |  Timeout: {}s",
        mode,
        stats.peer_count,
        stats.packets_relayed,
        stats.peer_timeout.as_secs()
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_status(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Peers ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let ratio = stats.peer_count as f64 / stats.max_clients.max(1) as f64;
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.min(1.0))
        .label(format!("{}/{} clients", stats.peer_count, stats.max_clients));

    frame.render_widget(gauge, area);
}

fn render_network(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Network ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let net = &stats.network_stats;
    let lines = vec![
        Line::from(vec![
            Span::styled("Packets: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!("{} sent / {} recv", net.packets_sent, net.packets_received),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Bytes: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} sent / {} recv",
                    format_bytes(net.bytes_sent),
                    format_bytes(net.bytes_received)
                ),
                Style::default().fg(Color::White),
            ),
        ]),
        Line::from(vec![
            Span::styled("Dropped: ", Style::default().fg(Color::Gray)),
            Span::styled(
                format!(
                    "{} simulated / {} rejected",
                    net.packets_dropped, net.packets_rejected
                ),
                Style::default().fg(if net.packets_rejected > 0 {
                    Color::Red
                } else {
                    Color::White
                }),
            ),
        ]),
    ];

    let paragraph = Paragraph::new(lines).block(block);
    frame.render_widget(paragraph, area);
}

fn render_peers(frame: &mut Frame, area: Rect, state: &TuiState, peers: &[PeerRow]) {
    let block = Block::default()
        .title(" Connections ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    let lines: Vec<Line> = peers
        .iter()
        .enumerate()
        .map(|(i, peer)| {
            let style = if i == state.selected() {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Magenta)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            Line::styled(
                format!(
                    "#{:<4} {:<21} idle {:.1}s",
                    peer.client_id, peer.addr, peer.idle_secs
                ),
                style,
            )
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let block = Block::default()
        .title(" Log ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));

    let visible = area.height.saturating_sub(2) as usize;
    let mut lines: Vec<Line> = state
        .log_lines()
        .rev()
        .take(visible)
        .map(|line| {
            let color = match line.level {
                LogLevel::Info => Color::White,
                LogLevel::Warn => Color::Yellow,
                LogLevel::Error => Color::Red,
            };
            Line::styled(line.message.clone(), Style::default().fg(color))
        })
        .collect();
    lines.reverse();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("Up/Down select  |  k kick  |  q or ESC quit")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.1}GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
