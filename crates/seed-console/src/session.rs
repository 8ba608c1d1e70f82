use crate::bounded_log::LogFilter;
use crate::config::Config;
use crate::panel::PanelResizeController;
use crate::roster::format_number;
use crate::router::ConsoleState;
use crate::service::{ServiceAction, ServiceEvent};
use crate::transport::{SendError, TransportClient, TransportEvent, TransportHandle};
use seed_core::console_ipc::{
    encode_outbound, CommandPayload, ControlAction, EnemyChatPayload, OutboundMsg,
    DEFAULT_MAX_FRAME_BYTES,
};
use seed_core::{ChatRole, LogLevel};
use std::ops::RangeInclusive;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub const ENEMY_INTERVAL_RANGE: RangeInclusive<f64> = 10.0..=300.0;
pub const STRATEGY_STATUS_FOLLOW_UP: Duration = Duration::from_millis(120);
const TRANSPORT_EVENT_CAPACITY: usize = 256;
const TIMER_CAPACITY: usize = 16;

/// Delayed session work. Fired back into the console loop so it runs under
/// the same connection checks as a user action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTimer {
    StrategyStatusFollowUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("input is empty")]
    EmptyInput,
    #[error("interval must be a number between 10 and 300 seconds, got '{0}'")]
    InvalidInterval(String),
    #[error(transparent)]
    Send(#[from] SendError),
}

/// Owns the connection, every state slice and the panel controller.
pub struct ConsoleSession {
    pub state: ConsoleState,
    pub panel: PanelResizeController,
    ws_url: String,
    reconnect_delay: Duration,
    connected: bool,
    outbound: Option<mpsc::Sender<OutboundMsg>>,
    transport: Option<TransportHandle>,
    timer_tx: mpsc::Sender<SessionTimer>,
    timer_rx: Option<mpsc::Receiver<SessionTimer>>,
}

impl ConsoleSession {
    pub fn new(config: &Config, panel: PanelResizeController) -> Self {
        let (timer_tx, timer_rx) = mpsc::channel(TIMER_CAPACITY);
        let mut session = Self {
            state: ConsoleState::default(),
            panel,
            ws_url: config.ws_url.clone(),
            reconnect_delay: config.reconnect_delay,
            connected: false,
            outbound: None,
            transport: None,
            timer_tx,
            timer_rx: Some(timer_rx),
        };
        session.state.log(LogLevel::Info, "Console started");
        session
            .state
            .log(LogLevel::Info, format!("VNC: {}", config.vnc_url));
        session
    }

    pub fn start(&mut self) -> mpsc::Receiver<TransportEvent> {
        let (events_tx, events_rx) = mpsc::channel(TRANSPORT_EVENT_CAPACITY);
        let handle = TransportClient::new(self.ws_url.clone())
            .with_reconnect_delay(self.reconnect_delay)
            .spawn(events_tx);
        self.outbound = Some(handle.sender());
        self.transport = Some(handle);
        events_rx
    }

    pub async fn stop(&mut self) {
        self.connected = false;
        self.state.links.socket = false;
        self.outbound = None;
        if let Some(handle) = self.transport.take() {
            handle.stop().await;
        }
        info!(event = "console_session_stopped");
    }

    /// Receiver for delayed work; hand each item to `apply_timer`. Only the
    /// first call returns it.
    pub fn take_timers(&mut self) -> Option<mpsc::Receiver<SessionTimer>> {
        self.timer_rx.take()
    }

    pub fn apply_timer(&mut self, timer: SessionTimer) {
        match timer {
            SessionTimer::StrategyStatusFollowUp => {
                if let Err(err) = self.strategy_control(ControlAction::StrategyStatus) {
                    debug!(event = "strategy_follow_up_skipped", error = %err);
                }
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    pub fn apply_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connecting { url } => {
                self.state
                    .log(LogLevel::Info, format!("Connecting WebSocket: {url}"));
            }
            TransportEvent::Connected => {
                self.connected = true;
                self.state.links.socket = true;
                self.state.log(LogLevel::Success, "Console connected");
            }
            TransportEvent::Disconnected { reason } => {
                self.connected = false;
                self.state.links.socket = false;
                self.state
                    .log(LogLevel::Error, format!("Console disconnected: {reason}"));
            }
            TransportEvent::ReconnectScheduled { delay } => {
                self.state.log(
                    LogLevel::Info,
                    format!("Reconnecting in {}s", delay.as_secs_f64()),
                );
            }
            TransportEvent::Message(msg) => self.state.apply(msg),
            TransportEvent::DecodeFailed(reason) => {
                debug!(event = "console_frame_skipped", reason = %reason);
            }
        }
    }

    /// Logged before the HTTP request is issued.
    pub fn note_service_action(&mut self, action: ServiceAction) {
        self.state
            .log(LogLevel::Info, format!("Service action: {action}"));
        self.state
            .primary
            .push(ChatRole::System, format!("Running: {action}..."));
    }

    pub fn apply_service_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::Status(status) => {
                self.state.links.game = status.game_running();
                self.state.links.service_game = status.game;
                self.state.links.service_ai = status.ai;
                self.state.links.service_vnc = status.vnc;
            }
            ServiceEvent::ActionDone { action, result } => match result {
                Ok(reply) if reply.success => {
                    self.state
                        .log(LogLevel::Success, format!("{action}: {}", reply.message));
                    self.state.primary.push(ChatRole::Agent, reply.message);
                }
                Ok(reply) => {
                    self.state
                        .log(LogLevel::Error, format!("{action}: {}", reply.message));
                    self.state.primary.push(ChatRole::Error, reply.message);
                }
                Err(err) => {
                    let text = format!("Service call failed: {err}");
                    self.state.log(LogLevel::Error, text.clone());
                    self.state.primary.push(ChatRole::Error, text);
                }
            },
        }
    }

    fn send(&self, msg: OutboundMsg) -> Result<(), SendError> {
        let outbound = match &self.outbound {
            Some(outbound) if self.connected => outbound,
            _ => return Err(SendError::NotConnected),
        };
        encode_outbound(&msg, DEFAULT_MAX_FRAME_BYTES)?;
        let kind = msg.kind();
        outbound.try_send(msg).map_err(|err| {
            warn!(event = "console_send_error", kind, error = %err);
            match err {
                mpsc::error::TrySendError::Full(_) => SendError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => SendError::Closed,
            }
        })
    }

    pub fn send_command(&mut self, text: &str) -> Result<(), ActionError> {
        let command = text.trim();
        if command.is_empty() {
            return Err(ActionError::EmptyInput);
        }
        if !self.connected {
            self.state.log(LogLevel::Error, "Console not connected");
            self.state
                .primary
                .push(ChatRole::Error, "Not connected to the AI");
            return Err(SendError::NotConnected.into());
        }
        self.send(OutboundMsg::Command(CommandPayload {
            command: command.to_string(),
        }))
        .map_err(|err| self.send_failed(err))?;
        self.state.primary.push(ChatRole::User, command);
        self.state.log(LogLevel::Command, format!("> {command}"));
        Ok(())
    }

    pub fn send_enemy_message(&mut self, text: &str) -> Result<(), ActionError> {
        let message = text.trim();
        if message.is_empty() {
            return Err(ActionError::EmptyInput);
        }
        if !self.connected {
            self.state.adversary.push(ChatRole::Error, "Not connected");
            return Err(SendError::NotConnected.into());
        }
        self.send(OutboundMsg::EnemyChat(EnemyChatPayload {
            message: message.to_string(),
        }))
        .map_err(|err| self.send_failed(err))?;
        self.state.adversary.settle();
        self.state.adversary.push(ChatRole::User, message);
        self.state
            .log(LogLevel::Command, format!("[to enemy] > {message}"));
        Ok(())
    }

    /// Adversary agent lifecycle: start, stop and similar argument-free actions.
    pub fn enemy_control(&mut self, action: ControlAction) -> Result<(), ActionError> {
        if !self.connected {
            self.state.log(
                LogLevel::Error,
                "Console not connected, cannot control the enemy",
            );
            return Err(SendError::NotConnected.into());
        }
        let name = action.name();
        self.send(OutboundMsg::EnemyControl(action))
            .map_err(|err| self.send_failed(err))?;
        self.state
            .log(LogLevel::Info, format!("Enemy control: {name}"));
        Ok(())
    }

    pub fn set_enemy_interval(&mut self, raw: &str) -> Result<(), ActionError> {
        let interval = match raw.trim().parse::<f64>() {
            Ok(value) if ENEMY_INTERVAL_RANGE.contains(&value) => value,
            _ => {
                self.state
                    .log(LogLevel::Error, "Invalid interval (10-300 seconds)");
                return Err(ActionError::InvalidInterval(raw.trim().to_string()));
            }
        };
        if !self.connected {
            self.state.log(LogLevel::Error, "Console not connected");
            return Err(SendError::NotConnected.into());
        }
        self.send(OutboundMsg::EnemyControl(ControlAction::SetInterval {
            interval,
        }))
        .map_err(|err| self.send_failed(err))?;
        self.state.log(
            LogLevel::Info,
            format!("Enemy interval set: {}s", format_number(interval)),
        );
        Ok(())
    }

    /// Strategy stack actions report failures in the master log only.
    pub fn strategy_control(&mut self, action: ControlAction) -> Result<(), ActionError> {
        if !self.connected {
            self.state.log(
                LogLevel::Error,
                "Console not connected, cannot control the strategy stack",
            );
            return Err(SendError::NotConnected.into());
        }
        self.send(OutboundMsg::EnemyControl(action))
            .map_err(|err| self.send_failed(err))?;
        Ok(())
    }

    pub fn strategy_command(&mut self, text: &str) -> Result<(), ActionError> {
        let command = text.trim();
        if command.is_empty() {
            return Err(ActionError::EmptyInput);
        }
        if !self.connected {
            self.state.strategy.log(
                LogLevel::Error,
                "Console not connected, cannot send strategy command",
            );
            return Err(SendError::NotConnected.into());
        }
        self.strategy_control(ControlAction::StrategyCmd {
            command: command.to_string(),
        })?;
        self.state
            .strategy
            .log(LogLevel::Info, &format!("Command sent: {command}"));

        let timers = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(STRATEGY_STATUS_FOLLOW_UP).await;
            let _ = timers.send(SessionTimer::StrategyStatusFollowUp).await;
        });
        Ok(())
    }

    /// Starts a new match: local history goes first, then the backend is asked to reset.
    pub fn reset_all(&mut self) -> Result<(), ActionError> {
        self.state.reset_local();
        if !self.connected {
            self.state
                .primary
                .push(ChatRole::Error, "Console not connected");
            return Err(SendError::NotConnected.into());
        }
        self.send(OutboundMsg::EnemyControl(ControlAction::ResetAll))
            .map_err(|err| self.send_failed(err))?;
        self.state.primary.push(
            ChatRole::System,
            "New match: context cleared, enemy AI restarting...",
        );
        self.state.log(
            LogLevel::Info,
            "New match: cleared all context, restarting enemy AI",
        );
        Ok(())
    }

    fn send_failed(&mut self, err: SendError) -> SendError {
        self.state
            .log(LogLevel::Error, format!("Send failed: {err}"));
        err
    }

    pub fn set_master_filter(&mut self, filter: LogFilter) {
        self.state.master_log.set_filter(filter);
    }

    pub fn cycle_master_filter(&mut self) -> LogFilter {
        let next = self.state.master_log.filter().next();
        self.state.master_log.set_filter(next);
        next
    }

    pub fn cycle_enemy_filter(&mut self) -> LogFilter {
        let next = self.state.enemy_debug.filter().next();
        self.state.enemy_debug.set_filter(next);
        next
    }

    pub fn clear_master_log(&mut self) {
        self.state.master_log.clear();
    }

    pub fn clear_enemy_debug(&mut self) {
        self.state.enemy_debug.clear();
    }

    pub fn clear_strategy_log(&mut self) {
        self.state.strategy.clear_log();
    }
}

#[cfg(test)]
impl ConsoleSession {
    pub(crate) fn with_outbound(outbound: mpsc::Sender<OutboundMsg>) -> Self {
        use crate::panel::PreferenceFile;
        let (timer_tx, timer_rx) = mpsc::channel(TIMER_CAPACITY);
        Self {
            state: ConsoleState::default(),
            panel: PanelResizeController::restore(PreferenceFile::in_memory(), 40),
            ws_url: "ws://127.0.0.1:8090".to_string(),
            reconnect_delay: Duration::from_secs(5),
            connected: false,
            outbound: Some(outbound),
            transport: None,
            timer_tx,
            timer_rx: Some(timer_rx),
        }
    }
}
