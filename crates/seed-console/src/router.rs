use crate::bounded_log::{
    BoundedLog, LogEntry, LogRecord, CHAT_TRANSCRIPT_CAP, ENEMY_DEBUG_CAP, MASTER_LOG_CAP,
};
use crate::roster::StrategyPanel;
use crate::status_slot::ConversationStream;
use chrono::{DateTime, Local, Utc};
use seed_core::console_ipc::{
    AgentStatePayload, FsmStatePayload, InboundMsg, ResultPayload, StagePayload,
    StrategyTracePayload, TickDetailPayload, TraceEventPayload,
};
use seed_core::{ChatRole, LogLevel};
use serde_json::Value;
use tracing::debug;

const RESULT_SUCCEEDED: &str = "Execution succeeded";
const RESULT_FAILED: &str = "Execution failed";
const RESET_DONE_DEFAULT: &str = "Context cleared, enemy restarted";

pub fn primary_stage_label(stage: &str) -> &str {
    match stage {
        "received" => "Command received",
        "observing" => "Observing game state",
        "thinking" => "AI thinking...",
        "executing" => "Executing code...",
        "error" => "Error",
        other => other,
    }
}

pub fn enemy_stage_label(stage: &str) -> &str {
    match stage {
        "online" => "Online",
        "offline" => "Offline",
        "observing" => "Scouting",
        "thinking" => "Strategy analysis",
        "executing" => "Executing",
        "error" => "Error",
        other => other,
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsmView {
    pub state_label: String,
    pub step_index: Option<i64>,
    pub plan_length: Option<i64>,
    pub current_goal: Option<String>,
}

impl Default for FsmView {
    fn default() -> Self {
        Self {
            state_label: "IDLE".to_string(),
            step_index: None,
            plan_length: None,
            current_goal: None,
        }
    }
}

impl FsmView {
    fn from_payload(payload: &FsmStatePayload) -> Self {
        Self {
            state_label: payload
                .fsm_state
                .as_deref()
                .filter(|state| !state.is_empty())
                .unwrap_or("IDLE")
                .to_string(),
            step_index: payload.step_index,
            plan_length: payload.plan_length,
            current_goal: payload.current_goal.clone(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkIndicators {
    pub socket: bool,
    pub game: bool,
    pub service_game: Option<String>,
    pub service_ai: Option<String>,
    pub service_vnc: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentRunState {
    pub running: bool,
    pub tick_count: i64,
    pub interval_seconds: Option<f64>,
}

impl AgentRunState {
    fn from_payload(payload: &AgentStatePayload) -> Self {
        Self {
            running: payload.running.unwrap_or(false),
            tick_count: payload.tick_count.unwrap_or(0),
            interval_seconds: payload.interval.filter(|interval| *interval > 0.0),
        }
    }
}

/// One adversary decision cycle as reported by the backend.
#[derive(Clone, Debug, PartialEq)]
pub struct TickRecord {
    pub tick: Option<i64>,
    pub time: DateTime<Local>,
    pub success: bool,
    pub command: Option<String>,
    pub game_state: Option<String>,
    pub code: Option<String>,
    pub message: Option<String>,
    pub taunt: Option<String>,
}

impl TickRecord {
    fn from_payload(payload: &TickDetailPayload) -> Self {
        let time = payload
            .timestamp
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|utc| utc.with_timezone(&Local))
            .unwrap_or_else(Local::now);
        Self {
            tick: payload.tick,
            time,
            success: payload.success.unwrap_or(false),
            command: payload.command.clone(),
            game_state: payload.game_state.clone(),
            code: payload.code.clone(),
            message: payload.message.clone(),
            taunt: payload.taunt.clone(),
        }
    }

    pub fn header_line(&self) -> String {
        let tick = self
            .tick
            .map(|tick| tick.to_string())
            .unwrap_or_else(|| "?".to_string());
        let mark = if self.success { "ok" } else { "x" };
        format!(
            "[Tick #{tick} | {}] {mark} {}",
            self.time.format("%H:%M:%S"),
            self.command.as_deref().unwrap_or("?")
        )
    }

    pub fn detail_lines(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(observed) = self.game_state.as_deref().filter(|text| !text.is_empty()) {
            lines.push("Observed:".to_string());
            lines.extend(observed.lines().map(str::to_string));
        }
        if let Some(command) = self.command.as_deref().filter(|text| !text.is_empty()) {
            lines.push(format!("Command: {command}"));
        }
        if let Some(code) = self.code.as_deref().filter(|text| !text.is_empty()) {
            lines.push("Code:".to_string());
            lines.extend(code.lines().map(str::to_string));
        }
        lines.push(format!(
            "Result: {} - {}",
            if self.success { "succeeded" } else { "failed" },
            self.message.as_deref().unwrap_or("")
        ));
        if let Some(taunt) = self.taunt.as_deref().filter(|text| !text.is_empty()) {
            lines.push(format!("Taunt: {taunt}"));
        }
        lines
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EnemyDebugRecord {
    Status(LogEntry),
    Tick(TickRecord),
}

impl LogRecord for EnemyDebugRecord {
    fn level(&self) -> LogLevel {
        match self {
            EnemyDebugRecord::Status(entry) => entry.level,
            EnemyDebugRecord::Tick(tick) if tick.success => LogLevel::Success,
            EnemyDebugRecord::Tick(_) => LogLevel::Error,
        }
    }
}

/// Every state slice the console renders. Server pushes only reach it
/// through [`ConsoleState::apply`].
#[derive(Clone, Debug)]
pub struct ConsoleState {
    pub primary: ConversationStream,
    pub adversary: ConversationStream,
    pub master_log: BoundedLog<LogEntry>,
    pub enemy_debug: BoundedLog<EnemyDebugRecord>,
    pub strategy: StrategyPanel,
    pub enemy_agent: Option<AgentRunState>,
    pub fsm: FsmView,
    pub links: LinkIndicators,
    last_player_message: Option<String>,
}

impl Default for ConsoleState {
    fn default() -> Self {
        Self {
            primary: ConversationStream::new(CHAT_TRANSCRIPT_CAP),
            adversary: ConversationStream::new(CHAT_TRANSCRIPT_CAP),
            master_log: BoundedLog::new(MASTER_LOG_CAP),
            enemy_debug: BoundedLog::new(ENEMY_DEBUG_CAP),
            strategy: StrategyPanel::default(),
            enemy_agent: None,
            fsm: FsmView::default(),
            links: LinkIndicators::default(),
            last_player_message: None,
        }
    }
}

impl ConsoleState {
    pub fn log(&mut self, level: LogLevel, text: impl Into<String>) {
        self.master_log.log(level, text);
    }

    /// Local side of "new match": both conversations, the master log and the
    /// adversary debug log are emptied.
    pub fn reset_local(&mut self) {
        self.primary.clear();
        self.adversary.clear();
        self.master_log.clear();
        self.enemy_debug.clear();
        self.last_player_message = None;
    }

    pub fn apply(&mut self, msg: InboundMsg) {
        match msg {
            InboundMsg::Init(payload) | InboundMsg::Update(payload) => {
                if let Some(payload) = payload {
                    self.apply_fsm_state(&payload);
                }
            }
            InboundMsg::Status(payload) => {
                if let Some(payload) = payload {
                    self.apply_primary_stage(&payload);
                }
            }
            InboundMsg::Result(payload) => self.apply_primary_result(payload.as_ref()),
            InboundMsg::Log(payload) => {
                if let Some(payload) = payload {
                    if let Some(message) = payload.message {
                        let level = LogLevel::parse_lenient(payload.level.as_deref());
                        self.log(level, message);
                    }
                }
            }
            InboundMsg::TraceEvent(payload) => {
                if let Some(payload) = payload {
                    self.apply_trace_event(&payload);
                }
            }
            InboundMsg::EnemyChat(payload) => {
                let message = payload
                    .and_then(|payload| payload.message)
                    .filter(|message| !message.is_empty());
                if let Some(message) = message {
                    self.adversary.push(ChatRole::Agent, message.clone());
                    self.log(LogLevel::Info, format!("[enemy] {message}"));
                }
            }
            InboundMsg::EnemyStatus(payload) => {
                if let Some(payload) = payload {
                    self.apply_enemy_stage(&payload);
                }
            }
            InboundMsg::EnemyResult(payload) => self.apply_enemy_result(payload.as_ref()),
            InboundMsg::EnemyTickDetail(payload) => {
                if let Some(payload) = payload {
                    self.enemy_debug
                        .append(EnemyDebugRecord::Tick(TickRecord::from_payload(&payload)));
                }
            }
            InboundMsg::EnemyAgentState(payload) => {
                if let Some(payload) = payload {
                    self.enemy_agent = Some(AgentRunState::from_payload(&payload));
                }
            }
            InboundMsg::ResetDone(payload) => {
                let message = payload
                    .and_then(|payload| payload.message)
                    .filter(|message| !message.is_empty())
                    .unwrap_or_else(|| RESET_DONE_DEFAULT.to_string());
                self.primary.push(ChatRole::Agent, message);
                self.log(LogLevel::Success, "New match ready");
            }
            InboundMsg::StrategyState(payload) => {
                if let Some(payload) = payload {
                    self.strategy.apply_state(&payload);
                }
            }
            InboundMsg::StrategyLog(payload) => {
                if let Some(payload) = payload {
                    let level = LogLevel::parse_lenient(payload.level.as_deref());
                    self.strategy
                        .log(level, payload.message.as_deref().unwrap_or(""));
                }
            }
            InboundMsg::StrategyTrace(payload) => {
                if let Some(payload) = payload {
                    self.log(LogLevel::Strategy, format_strategy_trace(&payload));
                }
            }
            InboundMsg::Unknown(kind) => {
                debug!(event = "console_unknown_kind", kind = %kind);
            }
        }
    }

    fn apply_fsm_state(&mut self, payload: &FsmStatePayload) {
        self.fsm = FsmView::from_payload(payload);
        self.links.game = true;

        let Some(message) = payload.player_message() else {
            return;
        };
        if self.last_player_message.as_deref() == Some(message) {
            return;
        }
        self.last_player_message = Some(message.to_string());
        self.primary.push(ChatRole::Agent, message);
    }

    fn apply_primary_stage(&mut self, payload: &StagePayload) {
        let detail = payload.detail.clone().unwrap_or_default();
        let label = primary_stage_label(&payload.stage).to_string();
        self.primary.progress(label, detail.clone());
        self.log(LogLevel::Info, format!("[{}] {detail}", payload.stage));
    }

    fn apply_primary_result(&mut self, payload: Option<&ResultPayload>) {
        let Some(payload) = payload else {
            self.primary.settle();
            return;
        };
        let (role, text) = result_outcome(payload);
        self.primary.finish(role, text);
        if let Some(code) = non_empty(payload.code.as_deref()) {
            self.log(LogLevel::Code, format!("Generated code:\n{code}"));
        }
    }

    fn apply_trace_event(&mut self, payload: &TraceEventPayload) {
        if payload.event_type.as_deref() != Some("fsm_transition") {
            return;
        }
        self.log(
            LogLevel::Info,
            format!(
                "State: {} → {}",
                payload.from_state.as_deref().unwrap_or("?"),
                payload.to_state.as_deref().unwrap_or("?")
            ),
        );
    }

    fn apply_enemy_stage(&mut self, payload: &StagePayload) {
        let detail = payload.detail.clone().unwrap_or_default();
        let label = enemy_stage_label(&payload.stage).to_string();
        self.adversary.progress(label.clone(), detail.clone());
        self.log(
            LogLevel::Info,
            format!("[enemy:{}] {detail}", payload.stage),
        );
        self.enemy_debug.append(EnemyDebugRecord::Status(LogEntry::new(
            LogLevel::Info,
            format!("[{label}] {detail}"),
        )));
    }

    fn apply_enemy_result(&mut self, payload: Option<&ResultPayload>) {
        let Some(payload) = payload else {
            self.adversary.settle();
            return;
        };
        let (role, text) = result_outcome(payload);
        let role = match role {
            ChatRole::Agent => ChatRole::System,
            other => other,
        };
        self.adversary.finish(role, format!("[action] {text}"));
        if let Some(code) = non_empty(payload.code.as_deref()) {
            self.log(LogLevel::Code, format!("[enemy code]\n{code}"));
        }
    }
}

fn result_outcome(payload: &ResultPayload) -> (ChatRole, String) {
    let succeeded = payload.succeeded();
    let text = non_empty(payload.message.as_deref())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if succeeded {
                RESULT_SUCCEEDED.to_string()
            } else {
                RESULT_FAILED.to_string()
            }
        });
    let role = if succeeded {
        ChatRole::Agent
    } else {
        ChatRole::Error
    };
    (role, text)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.is_empty())
}

/// Truncates to `limit` characters, appending how many were dropped.
pub fn clip(text: &str, limit: usize) -> String {
    let total = text.chars().count();
    if total <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit).collect();
    format!("{kept}...<truncated:{}>", total - limit)
}

fn value_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

fn count_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(number)) => number.to_string(),
        _ => "0".to_string(),
    }
}

fn array_json(value: Option<&Value>) -> String {
    match value {
        Some(array @ Value::Array(_)) => array.to_string(),
        _ => "[]".to_string(),
    }
}

pub fn format_strategy_trace(trace: &StrategyTracePayload) -> String {
    let event = trace
        .event
        .as_deref()
        .filter(|event| !event.is_empty())
        .unwrap_or("trace");
    let empty = Value::Object(Default::default());
    let payload = if trace.payload.is_null() {
        &empty
    } else {
        &trace.payload
    };

    match event {
        "decision_parsed" => {
            let thoughts = value_text(payload.get("thoughts"));
            let thoughts = clip(thoughts.trim(), 500);
            let thoughts = if thoughts.is_empty() {
                "N/A".to_string()
            } else {
                thoughts
            };
            format!(
                "[Strategy/{event}] thoughts={thoughts}; orders={}",
                clip(&array_json(payload.get("orders")), 1200)
            )
        }
        "order_dispatched" => {
            format!("[Strategy/{event}] {}", clip(&payload.to_string(), 1200))
        }
        "tick_context" => {
            let companies = payload
                .get("squad")
                .and_then(|squad| squad.get("companies"));
            format!(
                "[Strategy/{event}] cmd={}; zones={}; visible={}; companies={}",
                clip(&value_text(payload.get("user_command")), 120),
                count_text(payload.get("zone_count")),
                count_text(payload.get("visible_zones")),
                clip(&array_json(companies), 1200)
            )
        }
        _ => format!("[Strategy/{event}] {}", clip(&payload.to_string(), 1400)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_core::console_ipc::{decode_inbound, DEFAULT_MAX_FRAME_BYTES};
    use serde_json::json;

    fn frame(value: serde_json::Value) -> InboundMsg {
        decode_inbound(&value.to_string(), DEFAULT_MAX_FRAME_BYTES).expect("decode frame")
    }

    fn log_texts(state: &ConsoleState) -> Vec<String> {
        state
            .master_log
            .records()
            .map(|entry| entry.text.clone())
            .collect()
    }

    #[test]
    fn status_updates_then_result_settles_primary_stream() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "status", "payload": {"stage": "thinking", "detail": "A"}})));
        state.apply(frame(json!({"type": "status", "payload": {"stage": "thinking", "detail": "B"}})));

        let status = state.primary.status().expect("status row");
        assert_eq!(status.label, "AI thinking...");
        assert_eq!(status.detail, "B");
        assert!(state.primary.transcript().is_empty());

        state.apply(frame(json!({"type": "result", "payload": {"success": true, "message": "done"}})));
        assert!(state.primary.status().is_none());
        let messages: Vec<(ChatRole, String)> = state
            .primary
            .transcript()
            .records()
            .map(|msg| (msg.role, msg.text.clone()))
            .collect();
        assert_eq!(messages, vec![(ChatRole::Agent, "done".to_string())]);
        assert_eq!(log_texts(&state), vec!["[thinking] A", "[thinking] B"]);
    }

    #[test]
    fn failed_result_uses_default_text_and_logs_code() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "result", "payload": {"success": false, "code": "x = 1"}})));
        let last = state.primary.transcript().last().expect("entry");
        assert_eq!(last.role, ChatRole::Error);
        assert_eq!(last.text, RESULT_FAILED);
        let code = state.master_log.last().expect("code entry");
        assert_eq!(code.level, LogLevel::Code);
        assert_eq!(code.text, "Generated code:\nx = 1");
    }

    #[test]
    fn result_without_payload_only_clears_status() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "status", "payload": {"stage": "executing"}})));
        state.apply(frame(json!({"type": "result"})));
        assert!(state.primary.status().is_none());
        assert!(state.primary.transcript().is_empty());
    }

    #[test]
    fn mistyped_result_fields_still_settle_status() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "status", "payload": {"stage": "thinking", "detail": "A"}})));
        state.apply(frame(json!({"type": "result", "payload": {"success": "true", "message": "done"}})));
        assert!(state.primary.status().is_none());
        let last = state.primary.transcript().last().expect("chat entry");
        assert_eq!(last.role, ChatRole::Agent);
        assert_eq!(last.text, "done");

        state.apply(frame(json!({"type": "status", "payload": {"stage": "executing"}})));
        state.apply(frame(json!({"type": "result", "payload": {"success": true, "message": {"text": "x"}}})));
        assert!(state.primary.status().is_none());
        assert_eq!(state.primary.transcript().len(), 1);

        state.apply(frame(json!({"type": "enemy_status", "payload": {"stage": "thinking"}})));
        state.apply(frame(json!({"type": "enemy_result", "payload": "moved"})));
        assert!(state.adversary.status().is_none());
    }

    #[test]
    fn unknown_stage_is_shown_raw() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "status", "payload": {"stage": "planning"}})));
        assert_eq!(
            state.primary.status().map(|status| status.label.as_str()),
            Some("planning")
        );
    }

    #[test]
    fn log_frames_stay_out_of_chat() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "log", "payload": {"level": "warn", "message": "slow tick"}})));
        state.apply(frame(json!({"type": "log", "payload": {"level": "chatter", "message": "hi"}})));
        let levels: Vec<LogLevel> = state.master_log.records().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Warning, LogLevel::Info]);
        assert!(state.primary.transcript().is_empty());
    }

    #[test]
    fn repeated_update_appends_player_message_once() {
        let mut state = ConsoleState::default();
        let update = json!({
            "type": "update",
            "payload": {
                "fsm_state": "EXECUTE",
                "blackboard": {"action_result": {"player_message": "Building power plant"}}
            }
        });
        state.apply(frame(update.clone()));
        state.apply(frame(update));
        assert_eq!(state.primary.transcript().len(), 1);
        assert_eq!(state.fsm.state_label, "EXECUTE");
        assert!(state.links.game);

        state.apply(frame(json!({"type": "init", "payload": {}})));
        assert_eq!(state.fsm.state_label, "IDLE");
    }

    #[test]
    fn fsm_transition_is_logged_and_other_traces_ignored() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "trace_event", "payload": {
            "event_type": "fsm_transition", "from_state": "PLAN", "to_state": "EXECUTE"
        }})));
        state.apply(frame(json!({"type": "trace_event", "payload": {"event_type": "action_start"}})));
        assert_eq!(log_texts(&state), vec!["State: PLAN → EXECUTE"]);
    }

    #[test]
    fn enemy_stream_is_independent_of_primary() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "status", "payload": {"stage": "thinking", "detail": "A"}})));
        state.apply(frame(json!({"type": "enemy_status", "payload": {"stage": "observing", "detail": "north"}})));
        state.apply(frame(json!({"type": "enemy_result", "payload": {"success": true, "message": "moved"}})));

        assert!(state.primary.status().is_some());
        assert!(state.adversary.status().is_none());
        let last = state.adversary.transcript().last().expect("enemy entry");
        assert_eq!(last.role, ChatRole::System);
        assert_eq!(last.text, "[action] moved");

        let debug_lines: Vec<String> = state
            .enemy_debug
            .records()
            .filter_map(|record| match record {
                EnemyDebugRecord::Status(entry) => Some(entry.text.clone()),
                EnemyDebugRecord::Tick(_) => None,
            })
            .collect();
        assert_eq!(debug_lines, vec!["[Scouting] north"]);
        assert!(log_texts(&state).contains(&"[enemy:observing] north".to_string()));
    }

    #[test]
    fn enemy_chat_and_tick_detail() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "enemy_chat", "payload": {"message": "You will fall"}})));
        state.apply(frame(json!({"type": "enemy_chat", "payload": {}})));
        assert_eq!(state.adversary.transcript().len(), 1);
        assert_eq!(log_texts(&state), vec!["[enemy] You will fall"]);

        state.apply(frame(json!({"type": "enemy_tick_detail", "payload": {
            "tick": 4, "timestamp": 1_700_000_000_000_i64, "success": false,
            "command": "attack", "message": "no units", "taunt": "hmm"
        }})));
        let Some(EnemyDebugRecord::Tick(tick)) = state.enemy_debug.last() else {
            panic!("expected tick record");
        };
        assert_eq!(tick.tick, Some(4));
        assert!(tick.header_line().starts_with("[Tick #4 | "));
        assert!(tick.header_line().ends_with("x attack"));
        assert!(tick
            .detail_lines()
            .contains(&"Result: failed - no units".to_string()));
        assert_eq!(state.enemy_debug.last().map(|record| record.level()), Some(LogLevel::Error));
    }

    #[test]
    fn agent_state_and_reset_done() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "enemy_agent_state", "payload": {
            "running": true, "tick_count": 12, "interval": 45
        }})));
        assert_eq!(
            state.enemy_agent,
            Some(AgentRunState {
                running: true,
                tick_count: 12,
                interval_seconds: Some(45.0),
            })
        );

        state.apply(frame(json!({"type": "reset_done", "payload": null})));
        assert_eq!(
            state.primary.transcript().last().map(|m| m.text.as_str()),
            Some(RESET_DONE_DEFAULT)
        );
        let last = state.master_log.last().expect("log");
        assert_eq!(last.level, LogLevel::Success);
        assert_eq!(last.text, "New match ready");
    }

    #[test]
    fn strategy_frames_reach_strategy_panel() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "strategy_state", "payload": {"available": true, "running": true}})));
        state.apply(frame(json!({"type": "strategy_log", "payload": {"level": "info", "message": "tick"}})));
        state.apply(frame(json!({"type": "strategy_log", "payload": {"message": ""}})));
        assert!(state.strategy.is_running());
        assert_eq!(state.strategy.debug_log().len(), 1);

        state.apply(frame(json!({"type": "strategy_trace", "payload": {
            "event": "order_dispatched", "payload": {"company": 1}
        }})));
        let last = state.master_log.last().expect("trace");
        assert_eq!(last.level, LogLevel::Strategy);
        assert_eq!(last.text, r#"[Strategy/order_dispatched] {"company":1}"#);
    }

    #[test]
    fn unknown_and_empty_payload_frames_change_nothing() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "nlu_status", "payload": {"x": 1}})));
        state.apply(frame(json!({"type": "status"})));
        state.apply(frame(json!({"type": "enemy_agent_state", "payload": null})));
        assert!(state.master_log.is_empty());
        assert!(state.primary.status().is_none());
        assert!(state.enemy_agent.is_none());
    }

    #[test]
    fn reset_local_empties_every_stream() {
        let mut state = ConsoleState::default();
        state.apply(frame(json!({"type": "status", "payload": {"stage": "thinking"}})));
        state.apply(frame(json!({"type": "enemy_chat", "payload": {"message": "hi"}})));
        state.reset_local();
        assert!(state.primary.status().is_none());
        assert!(state.adversary.transcript().is_empty());
        assert!(state.master_log.is_empty());
        assert!(state.enemy_debug.is_empty());
    }

    #[test]
    fn trace_formatting_clips_by_characters() {
        assert_eq!(clip("abcdef", 4), "abcd...<truncated:2>");
        assert_eq!(clip("短文本", 5), "短文本");
        assert_eq!(clip("一二三四", 2), "一二...<truncated:2>");

        let decision = StrategyTracePayload {
            event: Some("decision_parsed".to_string()),
            payload: json!({"thoughts": "  ", "orders": [{"company": 1}]}),
            timestamp: None,
        };
        assert_eq!(
            format_strategy_trace(&decision),
            r#"[Strategy/decision_parsed] thoughts=N/A; orders=[{"company":1}]"#
        );

        let context = StrategyTracePayload {
            event: Some("tick_context".to_string()),
            payload: json!({"user_command": "hold", "zone_count": 7, "squad": {}}),
            timestamp: None,
        };
        assert_eq!(
            format_strategy_trace(&context),
            "[Strategy/tick_context] cmd=hold; zones=7; visible=0; companies=[]"
        );

        let bare = StrategyTracePayload::default();
        assert_eq!(format_strategy_trace(&bare), "[Strategy/trace] {}");
    }
}
