use crate::{deserialize_id, deserialize_lenient_bool, deserialize_lenient_f64, deserialize_lenient_i64};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_MAX_FRAME_BYTES: usize = 1024 * 1024;

/// Raw frame shape: `{"type": "...", "payload": {...} | null}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Every server push the console understands. A `None` payload means the
/// frame carried no (or a `null`) payload.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMsg {
    Init(Option<FsmStatePayload>),
    Update(Option<FsmStatePayload>),
    Status(Option<StagePayload>),
    Result(Option<ResultPayload>),
    Log(Option<LogPayload>),
    TraceEvent(Option<TraceEventPayload>),
    EnemyChat(Option<ChatPayload>),
    EnemyStatus(Option<StagePayload>),
    EnemyResult(Option<ResultPayload>),
    EnemyTickDetail(Option<TickDetailPayload>),
    EnemyAgentState(Option<AgentStatePayload>),
    ResetDone(Option<ResetDonePayload>),
    StrategyState(Option<StrategyStatePayload>),
    StrategyLog(Option<LogPayload>),
    StrategyTrace(Option<StrategyTracePayload>),
    Unknown(String),
}

impl InboundMsg {
    pub fn kind(&self) -> &str {
        match self {
            InboundMsg::Init(_) => "init",
            InboundMsg::Update(_) => "update",
            InboundMsg::Status(_) => "status",
            InboundMsg::Result(_) => "result",
            InboundMsg::Log(_) => "log",
            InboundMsg::TraceEvent(_) => "trace_event",
            InboundMsg::EnemyChat(_) => "enemy_chat",
            InboundMsg::EnemyStatus(_) => "enemy_status",
            InboundMsg::EnemyResult(_) => "enemy_result",
            InboundMsg::EnemyTickDetail(_) => "enemy_tick_detail",
            InboundMsg::EnemyAgentState(_) => "enemy_agent_state",
            InboundMsg::ResetDone(_) => "reset_done",
            InboundMsg::StrategyState(_) => "strategy_state",
            InboundMsg::StrategyLog(_) => "strategy_log",
            InboundMsg::StrategyTrace(_) => "strategy_trace",
            InboundMsg::Unknown(kind) => kind,
        }
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, FrameError> {
        let Envelope { kind, payload: raw } = envelope;
        if kind.trim().is_empty() {
            return Err(FrameError::MissingKind);
        }
        let msg = match kind.as_str() {
            "init" => InboundMsg::Init(payload(raw)),
            "update" => InboundMsg::Update(payload(raw)),
            "status" => InboundMsg::Status(payload(raw)),
            "result" => InboundMsg::Result(payload(raw)),
            "log" => InboundMsg::Log(payload(raw)),
            "trace_event" => InboundMsg::TraceEvent(payload(raw)),
            "enemy_chat" => InboundMsg::EnemyChat(payload(raw)),
            "enemy_status" => InboundMsg::EnemyStatus(payload(raw)),
            "enemy_result" => InboundMsg::EnemyResult(payload(raw)),
            "enemy_tick_detail" => InboundMsg::EnemyTickDetail(payload(raw)),
            "enemy_agent_state" => InboundMsg::EnemyAgentState(payload(raw)),
            "reset_done" => InboundMsg::ResetDone(payload(raw)),
            "strategy_state" => InboundMsg::StrategyState(payload(raw)),
            "strategy_log" => InboundMsg::StrategyLog(payload(raw)),
            "strategy_trace" => InboundMsg::StrategyTrace(payload(raw)),
            _ => InboundMsg::Unknown(kind),
        };
        Ok(msg)
    }
}

/// A payload that does not fit its kind is treated as absent, so the frame
/// still reaches its handler (terminal kinds still clear the status row).
fn payload<T: DeserializeOwned>(raw: Option<Value>) -> Option<T> {
    match raw {
        None | Some(Value::Null) => None,
        Some(value) => serde_json::from_value(value).ok(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct FsmStatePayload {
    #[serde(default)]
    pub fsm_state: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub step_index: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub plan_length: Option<i64>,
    #[serde(default)]
    pub current_goal: Option<String>,
    #[serde(default)]
    pub blackboard: Option<Blackboard>,
}

impl FsmStatePayload {
    pub fn player_message(&self) -> Option<&str> {
        self.blackboard
            .as_ref()?
            .action_result
            .as_ref()?
            .get("player_message")?
            .as_str()
            .map(str::trim)
            .filter(|message| !message.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Blackboard {
    #[serde(default)]
    pub game_basic_state: Option<String>,
    #[serde(default)]
    pub action_result: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StagePayload {
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ResultPayload {
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub observations: Option<String>,
}

impl ResultPayload {
    pub fn succeeded(&self) -> bool {
        self.success.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct LogPayload {
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TraceEventPayload {
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub from_state: Option<String>,
    #[serde(default)]
    pub to_state: Option<String>,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default)]
    pub details: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ChatPayload {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TickDetailPayload {
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub tick: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub timestamp: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub success: Option<bool>,
    #[serde(default)]
    pub command: Option<String>,
    #[serde(default)]
    pub game_state: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub taunt: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgentStatePayload {
    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub running: Option<bool>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub tick_count: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub interval: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ResetDonePayload {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StrategyStatePayload {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub last_error: Option<String>,
    #[serde(default)]
    pub last_command: Option<String>,
    #[serde(default, deserialize_with = "deserialize_companies")]
    pub companies: Vec<CompanyPayload>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub unassigned_count: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub player_count: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CompanyPayload {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub count: Option<i64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub power: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_point")]
    pub center: Option<MapPoint>,
    #[serde(default, deserialize_with = "deserialize_members")]
    pub members: Vec<MemberPayload>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MemberPayload {
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub id: Option<i64>,
    #[serde(rename = "type", default)]
    pub unit_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub hp_percent: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_point")]
    pub position: Option<MapPoint>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct MapPoint {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub x: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub y: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct StrategyTracePayload {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Anything other than an object (null, list, number) means "no position".
fn deserialize_point<'de, D>(deserializer: D) -> Result<Option<MapPoint>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    if !val.is_object() {
        return Ok(None);
    }
    serde_json::from_value(val)
        .map(Some)
        .map_err(serde::de::Error::custom)
}

/// A non-list roster is treated as empty rather than failing the whole frame.
fn deserialize_companies<'de, D>(deserializer: D) -> Result<Vec<CompanyPayload>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    match val {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

fn deserialize_members<'de, D>(deserializer: D) -> Result<Vec<MemberPayload>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    match val {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .map(|item| serde_json::from_value(item).map_err(serde::de::Error::custom))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OutboundMsg {
    Command(CommandPayload),
    EnemyChat(EnemyChatPayload),
    EnemyControl(ControlAction),
}

impl OutboundMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMsg::Command(_) => "command",
            OutboundMsg::EnemyChat(_) => "enemy_chat",
            OutboundMsg::EnemyControl(_) => "enemy_control",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandPayload {
    pub command: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EnemyChatPayload {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ControlAction {
    Start,
    Stop,
    SetInterval {
        interval: f64,
    },
    ResetAll,
    StrategyStart {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        command: Option<String>,
    },
    StrategyStop,
    StrategyCmd {
        command: String,
    },
    StrategyStatus,
}

impl ControlAction {
    pub fn name(&self) -> &'static str {
        match self {
            ControlAction::Start => "start",
            ControlAction::Stop => "stop",
            ControlAction::SetInterval { .. } => "set_interval",
            ControlAction::ResetAll => "reset_all",
            ControlAction::StrategyStart { .. } => "strategy_start",
            ControlAction::StrategyStop => "strategy_stop",
            ControlAction::StrategyCmd { .. } => "strategy_cmd",
            ControlAction::StrategyStatus => "strategy_status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame exceeds max size: {size} > {max}")]
    OversizedFrame { size: usize, max: usize },
    #[error("frame has no message type")]
    MissingKind,
    #[error("frame encode failed: {0}")]
    Encode(String),
    #[error("frame decode failed: {0}")]
    Decode(String),
}

pub fn encode_outbound(msg: &OutboundMsg, max_frame_bytes: usize) -> Result<String, FrameError> {
    let encoded = serde_json::to_string(msg).map_err(|err| FrameError::Encode(err.to_string()))?;
    if encoded.len() > max_frame_bytes {
        return Err(FrameError::OversizedFrame {
            size: encoded.len(),
            max: max_frame_bytes,
        });
    }
    Ok(encoded)
}

pub fn decode_inbound(text: &str, max_frame_bytes: usize) -> Result<InboundMsg, FrameError> {
    if text.len() > max_frame_bytes {
        return Err(FrameError::OversizedFrame {
            size: text.len(),
            max: max_frame_bytes,
        });
    }
    let envelope: Envelope =
        serde_json::from_str(text).map_err(|err| FrameError::Decode(err.to_string()))?;
    InboundMsg::from_envelope(envelope)
}
