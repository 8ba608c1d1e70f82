use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEBUG_MIN_ROWS: u16 = 6;
pub const DEBUG_DEFAULT_ROWS: u16 = 12;
pub const DEBUG_MAX_FRACTION: f64 = 0.75;
pub const DEBUG_HEIGHT_KEY: &str = "seed.debug.height";

/// Flat JSON object of user preferences. Without a path nothing is read or written.
#[derive(Debug, Clone, Default)]
pub struct PreferenceFile {
    path: Option<PathBuf>,
}

impl PreferenceFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn load_number(&self, key: &str) -> Option<f64> {
        let map = self.load_map()?;
        match map.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn store_number(&self, key: &str, value: f64) -> Result<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        let mut map = self.load_map().unwrap_or_default();
        let number = serde_json::Number::from_f64(value)
            .with_context(|| format!("preference {key} is not a finite number"))?;
        map.insert(key.to_string(), Value::Number(number));
        let payload = serde_json::to_string_pretty(&Value::Object(map))?;
        write_atomic(path, &payload)
    }

    fn load_map(&self) -> Option<Map<String, Value>> {
        let path = self.path.as_deref()?;
        let content = std::fs::read_to_string(path).ok()?;
        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Some(map),
            _ => None,
        }
    }
}

fn write_atomic(path: &Path, payload: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create parent directory {}", parent.display()))?;
    }

    let temp_path = match path.file_name() {
        Some(name) => path.with_file_name(format!("{}.tmp", name.to_string_lossy())),
        None => path.with_extension("tmp"),
    };

    std::fs::write(&temp_path, payload)
        .with_context(|| format!("Failed to write temp file {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DragStart {
    row: u16,
    height: u16,
}

/// Height of the debug pane in terminal rows. Dragging applies live and only
/// the release is persisted.
#[derive(Debug, Clone)]
pub struct PanelResizeController {
    store: PreferenceFile,
    viewport_rows: u16,
    reserved_rows: u16,
    height: u16,
    drag: Option<DragStart>,
}

impl PanelResizeController {
    pub fn restore(store: PreferenceFile, viewport_rows: u16) -> Self {
        let mut controller = Self {
            store,
            viewport_rows,
            reserved_rows: 0,
            height: DEBUG_DEFAULT_ROWS,
            drag: None,
        };
        controller.height = controller.stored_height();
        controller
    }

    /// Rows the surrounding layout always keeps for itself; the pane never
    /// grows into them.
    pub fn with_reserved_rows(mut self, rows: u16) -> Self {
        self.reserved_rows = rows;
        self.height = self.stored_height();
        self
    }

    pub fn max_height(&self) -> u16 {
        let scaled = (f64::from(self.viewport_rows) * DEBUG_MAX_FRACTION).floor() as u16;
        let free = self.viewport_rows.saturating_sub(self.reserved_rows);
        scaled.min(free).max(DEBUG_MIN_ROWS)
    }

    pub fn clamp(&self, raw: f64) -> u16 {
        let value = if raw.is_finite() && raw != 0.0 {
            raw.round()
        } else {
            f64::from(DEBUG_DEFAULT_ROWS)
        };
        let max = f64::from(self.max_height());
        value.clamp(f64::from(DEBUG_MIN_ROWS), max) as u16
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn pointer_down(&mut self, row: u16) {
        self.drag = Some(DragStart {
            row,
            height: self.height,
        });
    }

    /// Live height while dragging; never persisted.
    pub fn pointer_move(&mut self, row: u16) -> Option<u16> {
        let start = self.drag?;
        let raw = f64::from(start.height) + f64::from(start.row) - f64::from(row);
        self.height = self.clamp(raw);
        Some(self.height)
    }

    /// Ends the drag and persists the clamped height.
    pub fn pointer_up(&mut self) -> Option<u16> {
        self.drag.take()?;
        self.height = self.clamp(f64::from(self.height));
        if let Err(err) = self
            .store
            .store_number(DEBUG_HEIGHT_KEY, f64::from(self.height))
        {
            warn!(event = "console_preference_write_error", error = %err);
        }
        Some(self.height)
    }

    /// Re-clamps the stored preference for the new viewport without writing it back.
    pub fn viewport_resized(&mut self, rows: u16) -> u16 {
        self.viewport_rows = rows;
        if self.drag.is_none() {
            self.height = self.stored_height();
        } else {
            self.height = self.clamp(f64::from(self.height));
        }
        self.height
    }

    fn stored_height(&self) -> u16 {
        let raw = self
            .store
            .load_number(DEBUG_HEIGHT_KEY)
            .unwrap_or(f64::from(DEBUG_DEFAULT_ROWS));
        self.clamp(raw)
    }
}
