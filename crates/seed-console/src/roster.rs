use crate::bounded_log::{BoundedLog, LogEntry, STRATEGY_DEBUG_CAP};
use seed_core::console_ipc::{CompanyPayload, MapPoint, MemberPayload, StrategyStatePayload};
use seed_core::LogLevel;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrategyRoster {
    pub companies: Vec<Company>,
    pub unassigned_count: i64,
    pub player_controlled_count: i64,
}

impl StrategyRoster {
    pub fn from_payload(payload: &StrategyStatePayload) -> Self {
        Self {
            companies: payload.companies.iter().map(Company::from_payload).collect(),
            unassigned_count: payload.unassigned_count.unwrap_or(0),
            player_controlled_count: payload.player_count.unwrap_or(0),
        }
    }

    /// Counts survive even when the backend reports the stack unavailable.
    fn counts_only(payload: &StrategyStatePayload) -> Self {
        Self {
            companies: Vec::new(),
            unassigned_count: payload.unassigned_count.unwrap_or(0),
            player_controlled_count: payload.player_count.unwrap_or(0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.companies.is_empty()
    }

    pub fn summary_line(&self) -> String {
        format!(
            "Companies: {} | Unassigned: {} | Player controlled: {}",
            self.companies.len(),
            self.unassigned_count,
            self.player_controlled_count
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Company {
    pub id: String,
    pub name: String,
    pub count: i64,
    pub power: f64,
    pub weight: f64,
    pub center: Option<MapPoint>,
    pub members: Vec<CompanyMember>,
}

impl Company {
    fn from_payload(payload: &CompanyPayload) -> Self {
        let name = payload
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Company {}", payload.id));
        Self {
            id: payload.id.clone(),
            name,
            count: payload.count.unwrap_or(0),
            power: payload.power.unwrap_or(0.0),
            weight: payload.weight.unwrap_or(1.0),
            center: payload.center,
            members: payload.members.iter().map(CompanyMember::from_payload).collect(),
        }
    }

    pub fn title_line(&self) -> String {
        format!("{} ({})", self.name, self.id)
    }

    pub fn meta_line(&self) -> String {
        let center = match &self.center {
            Some(point) => format!("({}, {})", coord(point.x), coord(point.y)),
            None => "-".to_string(),
        };
        format!(
            "Members: {} | Power: {} | Weight: {} | Center: {}",
            self.count,
            format_number(self.power),
            format_number(self.weight),
            center
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompanyMember {
    pub id: Option<i64>,
    pub unit_type: String,
    pub hp_percent: f64,
    pub position: Option<MapPoint>,
}

impl CompanyMember {
    fn from_payload(payload: &MemberPayload) -> Self {
        Self {
            id: payload.id,
            unit_type: payload
                .unit_type
                .as_deref()
                .filter(|kind| !kind.is_empty())
                .unwrap_or("?")
                .to_string(),
            hp_percent: payload.hp_percent.unwrap_or(0.0),
            position: payload.position,
        }
    }

    pub fn line(&self) -> String {
        let id = self
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        let position = match &self.position {
            Some(point) => format!("({},{})", coord(point.x), coord(point.y)),
            None => "(-,-)".to_string(),
        };
        format!(
            "#{id} {} HP{}% {position}",
            self.unit_type,
            format_number(self.hp_percent)
        )
    }
}

fn coord(value: Option<f64>) -> String {
    value.map(format_number).unwrap_or_else(|| "-".to_string())
}

/// Integral values print without a trailing `.0`.
pub fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RosterPresentation<'a> {
    Unavailable,
    Placeholder { running: bool },
    Listing(&'a StrategyRoster),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrategyControls {
    pub start_enabled: bool,
    pub stop_enabled: bool,
}

pub const PLACEHOLDER_RUNNING: &str =
    "Strategy stack running, waiting for units to join companies...";
pub const PLACEHOLDER_STOPPED: &str =
    "Strategy stack not started. Start it, or send a command to start it automatically.";

/// Latest strategy stack state plus its debug log. Errors and the current
/// command are only logged when they change between pushes.
#[derive(Clone, Debug)]
pub struct StrategyPanel {
    available: bool,
    running: bool,
    roster: StrategyRoster,
    last_error_seen: String,
    last_command_seen: String,
    debug_log: BoundedLog<LogEntry>,
}

impl Default for StrategyPanel {
    fn default() -> Self {
        Self {
            available: false,
            running: false,
            roster: StrategyRoster::default(),
            last_error_seen: String::new(),
            last_command_seen: String::new(),
            debug_log: BoundedLog::new(STRATEGY_DEBUG_CAP),
        }
    }
}

impl StrategyPanel {
    pub fn apply_state(&mut self, state: &StrategyStatePayload) {
        self.available = state.available;
        self.running = state.available && state.running;

        let last_error = state
            .last_error
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty());

        if !state.available {
            self.roster = StrategyRoster::counts_only(state);
            if let Some(error) = last_error {
                self.note_error(error);
            }
            return;
        }

        self.roster = StrategyRoster::from_payload(state);

        match last_error {
            Some(error) => self.note_error(error),
            None => self.last_error_seen.clear(),
        }

        if let Some(command) = state
            .last_command
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
        {
            if command != self.last_command_seen {
                self.debug_log
                    .log(LogLevel::Info, format!("Current command: {command}"));
                self.last_command_seen = command.to_string();
            }
        }
    }

    fn note_error(&mut self, error: &str) {
        if error != self.last_error_seen {
            self.debug_log.log(LogLevel::Error, error);
            self.last_error_seen = error.to_string();
        }
    }

    pub fn presentation(&self) -> RosterPresentation<'_> {
        if !self.available {
            RosterPresentation::Unavailable
        } else if self.roster.is_empty() {
            RosterPresentation::Placeholder {
                running: self.running,
            }
        } else {
            RosterPresentation::Listing(&self.roster)
        }
    }

    pub fn controls(&self) -> StrategyControls {
        StrategyControls {
            start_enabled: self.available && !self.running,
            stop_enabled: self.available && self.running,
        }
    }

    pub fn state_label(&self) -> &'static str {
        match (self.available, self.running) {
            (false, _) => "unavailable",
            (true, true) => "running",
            (true, false) => "stopped",
        }
    }

    /// Empty lines are dropped.
    pub fn log(&mut self, level: LogLevel, text: &str) {
        if text.is_empty() {
            return;
        }
        self.debug_log.log(level, text);
    }

    pub fn clear_log(&mut self) {
        self.debug_log.clear();
    }

    pub fn debug_log(&self) -> &BoundedLog<LogEntry> {
        &self.debug_log
    }

    pub fn roster(&self) -> &StrategyRoster {
        &self.roster
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: serde_json::Value) -> StrategyStatePayload {
        serde_json::from_value(value).expect("strategy state")
    }

    fn log_texts(panel: &StrategyPanel) -> Vec<String> {
        panel
            .debug_log()
            .records()
            .map(|entry| entry.text.clone())
            .collect()
    }

    #[test]
    fn repeated_identical_state_logs_once() {
        let mut panel = StrategyPanel::default();
        let payload = state(json!({
            "available": true,
            "running": true,
            "last_error": "E1",
            "last_command": "attack",
            "companies": []
        }));
        panel.apply_state(&payload);
        panel.apply_state(&payload);

        assert_eq!(log_texts(&panel), vec!["E1", "Current command: attack"]);
        let levels: Vec<LogLevel> = panel.debug_log().records().map(|e| e.level).collect();
        assert_eq!(levels, vec![LogLevel::Error, LogLevel::Info]);
    }

    #[test]
    fn cleared_error_is_logged_again_when_it_returns() {
        let mut panel = StrategyPanel::default();
        panel.apply_state(&state(json!({"available": true, "last_error": "E1"})));
        panel.apply_state(&state(json!({"available": true})));
        panel.apply_state(&state(json!({"available": true, "last_error": "E1"})));
        assert_eq!(log_texts(&panel), vec!["E1", "E1"]);
    }

    #[test]
    fn unavailable_state_dedupes_but_never_resets_error() {
        let mut panel = StrategyPanel::default();
        panel.apply_state(&state(json!({"available": false, "last_error": "down"})));
        panel.apply_state(&state(json!({"available": false})));
        panel.apply_state(&state(json!({"available": false, "last_error": "down"})));
        assert_eq!(log_texts(&panel), vec!["down"]);
        assert_eq!(panel.presentation(), RosterPresentation::Unavailable);
        assert_eq!(
            panel.controls(),
            StrategyControls {
                start_enabled: false,
                stop_enabled: false,
            }
        );
    }

    #[test]
    fn controls_follow_running_flag() {
        let mut panel = StrategyPanel::default();
        panel.apply_state(&state(json!({"available": true, "running": true})));
        assert_eq!(
            panel.controls(),
            StrategyControls {
                start_enabled: false,
                stop_enabled: true,
            }
        );
        assert_eq!(
            panel.presentation(),
            RosterPresentation::Placeholder { running: true }
        );

        panel.apply_state(&state(json!({"available": true, "running": false})));
        assert_eq!(
            panel.controls(),
            StrategyControls {
                start_enabled: true,
                stop_enabled: false,
            }
        );
        assert_eq!(panel.state_label(), "stopped");
    }

    #[test]
    fn roster_applies_defaults_and_preserves_order() {
        let mut panel = StrategyPanel::default();
        panel.apply_state(&state(json!({
            "available": true,
            "running": true,
            "unassigned_count": 3,
            "player_count": 1,
            "companies": [
                {"id": 5, "name": "Bravo", "count": 2, "power": 12.5, "weight": 2,
                 "center": {"x": 10, "y": 4},
                 "members": [{"id": 9, "type": "3tnk", "hp_percent": 75, "position": {"x": 11, "y": 4}},
                             {"id": 10}]},
                {"id": 1}
            ]
        })));

        let RosterPresentation::Listing(roster) = panel.presentation() else {
            panic!("expected a listing");
        };
        assert_eq!(
            roster.summary_line(),
            "Companies: 2 | Unassigned: 3 | Player controlled: 1"
        );
        let bravo = &roster.companies[0];
        assert_eq!(bravo.title_line(), "Bravo (5)");
        assert_eq!(
            bravo.meta_line(),
            "Members: 2 | Power: 12.5 | Weight: 2 | Center: (10, 4)"
        );
        assert_eq!(bravo.members[0].line(), "#9 3tnk HP75% (11,4)");
        assert_eq!(bravo.members[1].line(), "#10 ? HP0% (-,-)");

        let fallback = &roster.companies[1];
        assert_eq!(fallback.title_line(), "Company 1 (1)");
        assert_eq!(
            fallback.meta_line(),
            "Members: 0 | Power: 0 | Weight: 1 | Center: -"
        );
    }

    #[test]
    fn roster_is_replaced_wholesale() {
        let mut panel = StrategyPanel::default();
        panel.apply_state(&state(json!({
            "available": true,
            "companies": [{"id": 1}, {"id": 2}]
        })));
        panel.apply_state(&state(json!({
            "available": true,
            "companies": [{"id": 3}]
        })));
        let ids: Vec<&str> = panel
            .roster()
            .companies
            .iter()
            .map(|company| company.id.as_str())
            .collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[test]
    fn empty_debug_lines_are_ignored() {
        let mut panel = StrategyPanel::default();
        panel.log(LogLevel::Info, "");
        panel.log(LogLevel::Info, "sent: attack");
        assert_eq!(log_texts(&panel), vec!["sent: attack"]);
        panel.clear_log();
        assert!(panel.debug_log().is_empty());
    }
}
