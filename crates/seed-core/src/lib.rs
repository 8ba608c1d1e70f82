pub mod console_ipc;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
    Debug,
    Code,
    Command,
    Strategy,
}

impl LogLevel {
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Info,
        LogLevel::Success,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Debug,
        LogLevel::Code,
        LogLevel::Command,
        LogLevel::Strategy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Success => "success",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Debug => "debug",
            LogLevel::Code => "code",
            LogLevel::Command => "command",
            LogLevel::Strategy => "strategy",
        }
    }

    /// Wire level strings are free-form; anything unrecognized is shown as info.
    pub fn parse_lenient(input: Option<&str>) -> Self {
        input
            .and_then(|value| value.parse::<LogLevel>().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "info" => Ok(LogLevel::Info),
            "success" | "ok" => Ok(LogLevel::Success),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" | "err" => Ok(LogLevel::Error),
            "debug" => Ok(LogLevel::Debug),
            "code" => Ok(LogLevel::Code),
            "command" => Ok(LogLevel::Command),
            "strategy" => Ok(LogLevel::Strategy),
            other => Err(format!("Unknown log level: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Agent,
    System,
    Error,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Agent => "agent",
            ChatRole::System => "system",
            ChatRole::Error => "error",
        }
    }

    /// Roles that carry a final answer and therefore supersede a live status row.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatRole::Agent | ChatRole::Error)
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatRole {
    type Err = String;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let normalized = input.trim().to_lowercase();
        match normalized.as_str() {
            "user" => Ok(ChatRole::User),
            "agent" | "ai" | "enemy" => Ok(ChatRole::Agent),
            "system" => Ok(ChatRole::System),
            "error" => Ok(ChatRole::Error),
            other => Err(format!("Unknown chat role: {other}")),
        }
    }
}

/// Deserialize an ID that can be either a string or a number into a String
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    match val {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(serde::de::Error::custom("expected string or number for id")),
    }
}

/// Deserialize an integer that may arrive as a float or a numeric string.
pub(crate) fn deserialize_lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    Ok(match val {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|value| value.round() as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

/// Deserialize a flag sent as a bool, a 0/1 number or a "true"/"false" string.
pub(crate) fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    Ok(match val {
        Value::Bool(flag) => Some(flag),
        Value::Number(n) => n.as_f64().map(|value| value != 0.0),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

/// Deserialize a float that may arrive as a numeric string; anything else is absent.
pub(crate) fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let val: Value = Value::deserialize(deserializer)?;
    Ok(match val {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_parse_is_lenient() {
        assert_eq!(LogLevel::parse_lenient(Some("WARN")), LogLevel::Warning);
        assert_eq!(LogLevel::parse_lenient(Some("success")), LogLevel::Success);
        assert_eq!(LogLevel::parse_lenient(Some("chatter")), LogLevel::Info);
        assert_eq!(LogLevel::parse_lenient(None), LogLevel::Info);
    }

    #[test]
    fn chat_role_marks_terminal_roles() {
        assert!(ChatRole::Agent.is_terminal());
        assert!(ChatRole::Error.is_terminal());
        assert!(!ChatRole::User.is_terminal());
        assert!(!ChatRole::System.is_terminal());
        assert_eq!("ai".parse::<ChatRole>(), Ok(ChatRole::Agent));
    }
}
