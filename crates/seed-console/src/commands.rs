use crate::bounded_log::LogFilter;
use crate::service::ServiceAction;
use crate::ui::{DebugTab, InputTarget};
use seed_core::console_ipc::ControlAction;

/// One submitted input line, resolved against the active input target.
#[derive(Clone, Debug, PartialEq)]
pub enum ConsoleCommand {
    Copilot(String),
    EnemyChat(String),
    StrategyCmd(String),
    Service(ServiceAction),
    RefreshStatus,
    EnemyInterval(String),
    Enemy(ControlAction),
    Strategy(ControlAction),
    NewMatch,
    Filter(LogFilter),
    Clear(DebugTab),
    Help,
    Quit,
}

pub fn parse_input(target: InputTarget, line: &str) -> Result<Option<ConsoleCommand>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let Some(rest) = line.strip_prefix('/') else {
        let text = line.to_string();
        return Ok(Some(match target {
            InputTarget::Copilot => ConsoleCommand::Copilot(text),
            InputTarget::Enemy => ConsoleCommand::EnemyChat(text),
            InputTarget::Strategy => ConsoleCommand::StrategyCmd(text),
        }));
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let command = match name.to_lowercase().as_str() {
        "service" => ConsoleCommand::Service(arg.parse()?),
        "status" => ConsoleCommand::RefreshStatus,
        "interval" => ConsoleCommand::EnemyInterval(arg.to_string()),
        "enemy" => match arg {
            "start" => ConsoleCommand::Enemy(ControlAction::Start),
            "stop" => ConsoleCommand::Enemy(ControlAction::Stop),
            _ => return Err("Usage: /enemy start|stop".to_string()),
        },
        "strategy" => {
            let (verb, tail) = match arg.split_once(char::is_whitespace) {
                Some((verb, tail)) => (verb, tail.trim()),
                None => (arg, ""),
            };
            match verb {
                "start" => ConsoleCommand::Strategy(ControlAction::StrategyStart {
                    command: (!tail.is_empty()).then(|| tail.to_string()),
                }),
                "stop" => ConsoleCommand::Strategy(ControlAction::StrategyStop),
                "status" => ConsoleCommand::Strategy(ControlAction::StrategyStatus),
                _ => return Err("Usage: /strategy start [command]|stop|status".to_string()),
            }
        }
        "reset" | "new" => ConsoleCommand::NewMatch,
        "filter" => ConsoleCommand::Filter(arg.parse()?),
        "clear" => match arg {
            "" | "log" => ConsoleCommand::Clear(DebugTab::Log),
            "enemy" => ConsoleCommand::Clear(DebugTab::Enemy),
            "strategy" => ConsoleCommand::Clear(DebugTab::Strategy),
            _ => return Err("Usage: /clear log|enemy|strategy".to_string()),
        },
        "help" => ConsoleCommand::Help,
        "quit" | "q" => ConsoleCommand::Quit,
        _ => return Err(format!("Unknown command: /{name}")),
    };
    Ok(Some(command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use seed_core::LogLevel;

    #[test]
    fn plain_text_goes_to_active_target() {
        assert_eq!(
            parse_input(InputTarget::Copilot, "  build a barracks "),
            Ok(Some(ConsoleCommand::Copilot("build a barracks".to_string())))
        );
        assert_eq!(
            parse_input(InputTarget::Enemy, "gg"),
            Ok(Some(ConsoleCommand::EnemyChat("gg".to_string())))
        );
        assert_eq!(
            parse_input(InputTarget::Strategy, "attack north"),
            Ok(Some(ConsoleCommand::StrategyCmd("attack north".to_string())))
        );
        assert_eq!(parse_input(InputTarget::Copilot, "   "), Ok(None));
    }

    #[test]
    fn slash_commands_parse_arguments() {
        assert_eq!(
            parse_input(InputTarget::Copilot, "/service start-ai"),
            Ok(Some(ConsoleCommand::Service(ServiceAction::StartAi)))
        );
        assert_eq!(
            parse_input(InputTarget::Copilot, "/interval 45"),
            Ok(Some(ConsoleCommand::EnemyInterval("45".to_string())))
        );
        assert_eq!(
            parse_input(InputTarget::Enemy, "/strategy start hold the bridge"),
            Ok(Some(ConsoleCommand::Strategy(ControlAction::StrategyStart {
                command: Some("hold the bridge".to_string())
            })))
        );
        assert_eq!(
            parse_input(InputTarget::Enemy, "/strategy start"),
            Ok(Some(ConsoleCommand::Strategy(ControlAction::StrategyStart {
                command: None
            })))
        );
        assert_eq!(
            parse_input(InputTarget::Copilot, "/filter error"),
            Ok(Some(ConsoleCommand::Filter(LogFilter::Only(LogLevel::Error))))
        );
        assert_eq!(
            parse_input(InputTarget::Copilot, "/filter"),
            Ok(Some(ConsoleCommand::Filter(LogFilter::All)))
        );
        assert_eq!(
            parse_input(InputTarget::Copilot, "/clear enemy"),
            Ok(Some(ConsoleCommand::Clear(DebugTab::Enemy)))
        );
    }

    #[test]
    fn bad_commands_report_usage() {
        assert!(parse_input(InputTarget::Copilot, "/service launch").is_err());
        assert!(parse_input(InputTarget::Copilot, "/enemy pause").is_err());
        assert!(parse_input(InputTarget::Copilot, "/warp").is_err());
    }
}
