//! Shared data types for Perch
//!
//! This crate contains the serializable types that are shared between the
//! instance bookkeeping in perch-core, the surface layer in perch-overlay and
//! the coordinator in perch-app.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

// ─────────────────────────────────────────────────────────────────────────────
// Tool Kinds
// ─────────────────────────────────────────────────────────────────────────────

/// The overlay tools that can be launched as floating instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Clock,
    Spotlight,
    TrafficLight,
    ScreenShade,
    Dice,
    Coin,
    Randomizer,
}

impl ToolKind {
    /// All tool kinds
    pub fn all() -> &'static [ToolKind] {
        &[
            ToolKind::Clock,
            ToolKind::Spotlight,
            ToolKind::TrafficLight,
            ToolKind::ScreenShade,
            ToolKind::Dice,
            ToolKind::Coin,
            ToolKind::Randomizer,
        ]
    }

    /// Key used for persisted records and settings tables
    pub fn config_key(&self) -> &'static str {
        match self {
            ToolKind::Clock => "clock",
            ToolKind::Spotlight => "spotlight",
            ToolKind::TrafficLight => "traffic_light",
            ToolKind::ScreenShade => "screen_shade",
            ToolKind::Dice => "dice",
            ToolKind::Coin => "coin",
            ToolKind::Randomizer => "randomizer",
        }
    }

    /// Display title
    pub fn title(&self) -> &'static str {
        match self {
            ToolKind::Clock => "Clock",
            ToolKind::Spotlight => "Spotlight",
            ToolKind::TrafficLight => "Traffic Light",
            ToolKind::ScreenShade => "Screen Shade",
            ToolKind::Dice => "Dice",
            ToolKind::Coin => "Coin Flip",
            ToolKind::Randomizer => "Randomizer",
        }
    }

    /// Window namespace for platform identification
    pub fn namespace(&self) -> &'static str {
        match self {
            ToolKind::Clock => "perch-clock",
            ToolKind::Spotlight => "perch-spotlight",
            ToolKind::TrafficLight => "perch-traffic-light",
            ToolKind::ScreenShade => "perch-screen-shade",
            ToolKind::Dice => "perch-dice",
            ToolKind::Coin => "perch-coin",
            ToolKind::Randomizer => "perch-randomizer",
        }
    }

    /// Maximum number of concurrent instances when settings don't override it
    pub fn default_max_instances(&self) -> usize {
        match self {
            ToolKind::Spotlight => 7,
            _ => 4,
        }
    }

    /// Default screen position for a freshly seeded instance
    pub fn default_position(&self) -> (i32, i32) {
        match self {
            ToolKind::Clock => (40, 40),
            ToolKind::Spotlight => (120, 120),
            ToolKind::TrafficLight => (40, 200),
            ToolKind::ScreenShade => (0, 0),
            ToolKind::Dice => (260, 40),
            ToolKind::Coin => (260, 200),
            ToolKind::Randomizer => (420, 40),
        }
    }

    /// Default window size for a freshly seeded instance
    pub fn default_size(&self) -> (Dimension, Dimension) {
        match self {
            ToolKind::ScreenShade => (Dimension::Pixels(480), Dimension::Pixels(320)),
            ToolKind::Spotlight => (Dimension::Pixels(320), Dimension::Pixels(320)),
            ToolKind::Randomizer => (Dimension::Pixels(280), Dimension::Pixels(280)),
            _ => (Dimension::Natural, Dimension::Natural),
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_key())
    }
}

/// Error returned when parsing an unknown tool key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownToolKind(pub String);

impl fmt::Display for UnknownToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown tool kind '{}'", self.0)
    }
}

impl std::error::Error for UnknownToolKind {}

impl FromStr for ToolKind {
    type Err = UnknownToolKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        ToolKind::all()
            .iter()
            .copied()
            .find(|k| k.config_key() == normalized)
            .ok_or_else(|| UnknownToolKind(s.to_string()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Instance Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Identity of a live instance within one tool kind. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct InstanceId(u32);

impl InstanceId {
    /// Returns `None` for 0, which means "unallocated"
    pub fn new(value: u32) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for InstanceId {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        InstanceId::new(value).ok_or_else(|| "instance id must be positive".to_string())
    }
}

impl From<InstanceId> for u32 {
    fn from(id: InstanceId) -> u32 {
        id.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u32 = s.trim().parse().map_err(|_| format!("invalid instance id '{s}'"))?;
        InstanceId::new(value).ok_or_else(|| "instance id must be positive".to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Geometry
// ─────────────────────────────────────────────────────────────────────────────

/// Stored value meaning "size the surface to its content"
pub const NATURAL_SIZE: i64 = -2;

/// One window dimension: an explicit pixel count or the content's natural size.
/// Persisted as a plain integer, with [`NATURAL_SIZE`] as the sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Dimension {
    #[default]
    Natural,
    Pixels(u32),
}

impl Dimension {
    /// Resolve against the content's natural extent
    pub fn resolve(self, natural: u32) -> u32 {
        match self {
            Dimension::Natural => natural,
            Dimension::Pixels(px) => px,
        }
    }

    pub fn is_natural(self) -> bool {
        matches!(self, Dimension::Natural)
    }
}

impl TryFrom<i64> for Dimension {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            NATURAL_SIZE => Ok(Dimension::Natural),
            v if v > 0 => u32::try_from(v)
                .map(Dimension::Pixels)
                .map_err(|_| format!("window dimension {v} out of range")),
            v => Err(format!("invalid window dimension {v}")),
        }
    }
}

impl From<Dimension> for i64 {
    fn from(d: Dimension) -> i64 {
        match d {
            Dimension::Natural => NATURAL_SIZE,
            Dimension::Pixels(px) => i64::from(px),
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Natural => f.write_str("natural"),
            Dimension::Pixels(px) => write!(f, "{px}"),
        }
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("natural") || s.eq_ignore_ascii_case("auto") {
            return Ok(Dimension::Natural);
        }
        let px: u32 = s.parse().map_err(|_| format!("invalid dimension '{s}'"))?;
        if px == 0 {
            return Err("dimension must be positive".to_string());
        }
        Ok(Dimension::Pixels(px))
    }
}

/// Window placement of an instance. Immutable value: every change produces a
/// new `Geometry` that replaces the previous one wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: Dimension,
    pub height: Dimension,
}

impl Geometry {
    pub fn new(x: i32, y: i32, width: Dimension, height: Dimension) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Geometry with explicit pixel size
    pub fn pixels(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self::new(x, y, Dimension::Pixels(width), Dimension::Pixels(height))
    }

    pub fn translated(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
            ..self
        }
    }

    pub fn with_position(self, x: i32, y: i32) -> Self {
        Self { x, y, ..self }
    }

    pub fn with_size(self, width: Dimension, height: Dimension) -> Self {
        Self {
            width,
            height,
            ..self
        }
    }

    /// Resolve natural dimensions to concrete pixels
    pub fn resolve(self, natural: (u32, u32)) -> (i32, i32, u32, u32) {
        (
            self.x,
            self.y,
            self.width.resolve(natural.0),
            self.height.resolve(natural.1),
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Opaque Tool Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// A single configuration value. The manager never interprets these; they are
/// handed to the tool's content renderer untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ConfigValue {
    /// Parse a literal typed by a user: booleans, integers, floats, else text
    pub fn parse_literal(s: &str) -> Self {
        let trimmed = s.trim();
        if let Ok(b) = trimmed.parse::<bool>() {
            return ConfigValue::Bool(b);
        }
        if let Ok(i) = trimmed.parse::<i64>() {
            return ConfigValue::Int(i);
        }
        match trimmed.parse::<f64>() {
            Ok(f) if f.is_finite() => return ConfigValue::Float(f),
            _ => {}
        }
        ConfigValue::Text(s.to_string())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConfigValue::Int(i) => Some(*i as f64),
            ConfigValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{b}"),
            ConfigValue::Int(i) => write!(f, "{i}"),
            ConfigValue::Float(v) => write!(f, "{v}"),
            ConfigValue::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Per-instance tool payload, keyed by field name
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolConfig(BTreeMap<String, ConfigValue>);

impl ToolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&ConfigValue> {
        self.0.get(field)
    }

    /// Set a field, returning true if the stored value changed
    pub fn set(&mut self, field: impl Into<String>, value: ConfigValue) -> bool {
        let field = field.into();
        if self.0.get(&field) == Some(&value) {
            return false;
        }
        self.0.insert(field, value);
        true
    }

    pub fn with(mut self, field: impl Into<String>, value: ConfigValue) -> Self {
        self.set(field, value);
        self
    }

    pub fn remove(&mut self, field: &str) -> Option<ConfigValue> {
        self.0.remove(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Persisted Records
// ─────────────────────────────────────────────────────────────────────────────

/// Durable per-instance state: tool payload plus window placement and flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceRecord {
    pub id: InstanceId,
    pub tool: ToolKind,
    pub window_x: i32,
    pub window_y: i32,
    pub window_width: Dimension,
    pub window_height: Dimension,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub config: ToolConfig,
}

impl InstanceRecord {
    /// Record with the tool's hard-coded default placement
    pub fn new(tool: ToolKind, id: InstanceId, config: ToolConfig) -> Self {
        let (x, y) = tool.default_position();
        let (width, height) = tool.default_size();
        Self {
            id,
            tool,
            window_x: x,
            window_y: y,
            window_width: width,
            window_height: height,
            is_locked: false,
            is_active: false,
            config,
        }
    }

    pub fn geometry(&self) -> Geometry {
        Geometry::new(
            self.window_x,
            self.window_y,
            self.window_width,
            self.window_height,
        )
    }

    pub fn set_geometry(&mut self, geometry: Geometry) {
        self.window_x = geometry.x;
        self.window_y = geometry.y;
        self.window_width = geometry.width;
        self.window_height = geometry.height;
    }

    /// Strip geometry and flags, keeping only what seeds future instances
    pub fn to_default(&self) -> DefaultRecord {
        DefaultRecord {
            tool: self.tool,
            config: self.config.clone(),
        }
    }
}

/// Seed configuration for the next new instance of a tool kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultRecord {
    pub tool: ToolKind,
    #[serde(default)]
    pub config: ToolConfig,
}

// ─────────────────────────────────────────────────────────────────────────────
// Application Settings
// ─────────────────────────────────────────────────────────────────────────────

fn default_touch_slop() -> f32 {
    16.0
}
fn default_tap_timeout_ms() -> u64 {
    300
}
fn default_double_tap_timeout_ms() -> u64 {
    500
}
fn default_resize_band() -> f32 {
    24.0
}
fn default_min_size() -> u32 {
    48
}
fn default_pass_through_restore_ms() -> u64 {
    40
}
fn default_clone_offset() -> i32 {
    32
}

/// Per-tool limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub max_instances: usize,
}

/// Thresholds for the gesture recognizer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureSettings {
    /// Displacement (px) a pointer must exceed before a touch becomes a drag
    #[serde(default = "default_touch_slop")]
    pub touch_slop_px: f32,
    /// Longest press that still counts as a tap
    #[serde(default = "default_tap_timeout_ms")]
    pub tap_timeout_ms: u64,
    /// Window in which a second tap on the same target is a double tap
    #[serde(default = "default_double_tap_timeout_ms")]
    pub double_tap_timeout_ms: u64,
    /// Width of the edge band that starts a resize instead of a drag
    #[serde(default = "default_resize_band")]
    pub resize_band_px: f32,
    #[serde(default = "default_min_size")]
    pub min_width: u32,
    #[serde(default = "default_min_size")]
    pub min_height: u32,
}

impl Default for GestureSettings {
    fn default() -> Self {
        Self {
            touch_slop_px: default_touch_slop(),
            tap_timeout_ms: default_tap_timeout_ms(),
            double_tap_timeout_ms: default_double_tap_timeout_ms(),
            resize_band_px: default_resize_band(),
            min_width: default_min_size(),
            min_height: default_min_size(),
        }
    }
}

/// Top-level persisted settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerchSettings {
    /// Delay before input pass-through is switched back off after a tap
    #[serde(default = "default_pass_through_restore_ms")]
    pub pass_through_restore_ms: u64,
    /// Offset applied to a cloned instance so it doesn't cover its source
    #[serde(default = "default_clone_offset")]
    pub clone_offset_px: i32,
    /// Directory for instance records; platform config dir when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<String>,
    #[serde(default)]
    pub gesture: GestureSettings,
    /// Per-tool overrides keyed by [`ToolKind::config_key`]
    #[serde(default)]
    pub tools: HashMap<String, ToolSettings>,
}

impl Default for PerchSettings {
    fn default() -> Self {
        Self {
            tools: HashMap::new(),
            gesture: GestureSettings::default(),
            pass_through_restore_ms: default_pass_through_restore_ms(),
            clone_offset_px: default_clone_offset(),
            store_dir: None,
        }
    }
}

impl PerchSettings {
    /// Effective instance cap for a tool kind
    pub fn max_instances(&self, tool: ToolKind) -> usize {
        self.tools
            .get(tool.config_key())
            .map(|t| t.max_instances)
            .unwrap_or_else(|| tool.default_max_instances())
    }

    pub fn set_max_instances(&mut self, tool: ToolKind, max_instances: usize) {
        self.tools
            .insert(tool.config_key().to_string(), ToolSettings { max_instances });
    }

    /// Instance caps for every tool kind
    pub fn instance_limits(&self) -> HashMap<ToolKind, usize> {
        ToolKind::all()
            .iter()
            .map(|&tool| (tool, self.max_instances(tool)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_kind_parses_config_keys_and_titles() {
        assert_eq!("traffic_light".parse::<ToolKind>(), Ok(ToolKind::TrafficLight));
        assert_eq!("Screen Shade".parse::<ToolKind>(), Ok(ToolKind::ScreenShade));
        assert_eq!("traffic-light".parse::<ToolKind>(), Ok(ToolKind::TrafficLight));
        assert!("toaster".parse::<ToolKind>().is_err());
    }

    #[test]
    fn instance_id_rejects_zero() {
        assert!(InstanceId::new(0).is_none());
        assert_eq!(InstanceId::new(3).map(InstanceId::get), Some(3));
        assert!("0".parse::<InstanceId>().is_err());
    }

    #[test]
    fn dimension_sentinel_conversion() {
        assert_eq!(i64::from(Dimension::Natural), NATURAL_SIZE);
        assert_eq!(Dimension::try_from(NATURAL_SIZE), Ok(Dimension::Natural));
        assert_eq!(Dimension::try_from(120_i64), Ok(Dimension::Pixels(120)));
        assert!(Dimension::try_from(0_i64).is_err());
        assert!(Dimension::try_from(-1_i64).is_err());
        assert_eq!("natural".parse::<Dimension>(), Ok(Dimension::Natural));
    }

    #[test]
    fn every_pixel_count_survives_the_stored_form() {
        let widest = Dimension::Pixels(u32::MAX);
        assert_eq!(Dimension::try_from(i64::from(widest)), Ok(widest));

        let parsed: Dimension = u32::MAX.to_string().parse().unwrap();
        assert_eq!(Dimension::try_from(i64::from(parsed)), Ok(parsed));

        assert!(Dimension::try_from(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn geometry_is_replaced_not_patched() {
        let g = Geometry::pixels(10, 20, 100, 50);
        let moved = g.translated(5, -5);
        assert_eq!(g.x, 10);
        assert_eq!((moved.x, moved.y), (15, 15));
        assert_eq!(moved.width, Dimension::Pixels(100));
        assert_eq!(
            Geometry::new(0, 0, Dimension::Natural, Dimension::Pixels(40)).resolve((80, 90)),
            (0, 0, 80, 40)
        );
    }

    #[test]
    fn config_literal_parsing() {
        assert_eq!(ConfigValue::parse_literal("true"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::parse_literal("42"), ConfigValue::Int(42));
        assert_eq!(ConfigValue::parse_literal("1.5"), ConfigValue::Float(1.5));
        assert_eq!(
            ConfigValue::parse_literal("digital"),
            ConfigValue::Text("digital".to_string())
        );
    }

    #[test]
    fn config_set_reports_changes() {
        let mut config = ToolConfig::new();
        assert!(config.set("color", ConfigValue::Text("red".into())));
        assert!(!config.set("color", ConfigValue::Text("red".into())));
        assert!(config.set("color", ConfigValue::Text("blue".into())));
        assert_eq!(config.len(), 1);
    }

    #[test]
    fn settings_limits_fall_back_to_tool_defaults() {
        let mut settings = PerchSettings::default();
        assert_eq!(settings.max_instances(ToolKind::Clock), 4);
        assert_eq!(settings.max_instances(ToolKind::Spotlight), 7);
        settings.set_max_instances(ToolKind::Clock, 2);
        assert_eq!(settings.max_instances(ToolKind::Clock), 2);
        assert_eq!(settings.instance_limits()[&ToolKind::Clock], 2);
    }

    #[test]
    fn record_default_strips_geometry() {
        let id = InstanceId::new(1).unwrap();
        let mut record = InstanceRecord::new(
            ToolKind::Dice,
            id,
            ToolConfig::new().with("sides", ConfigValue::Int(20)),
        );
        record.set_geometry(Geometry::pixels(5, 6, 70, 80));
        let default = record.to_default();
        assert_eq!(default.tool, ToolKind::Dice);
        assert_eq!(default.config.get("sides"), Some(&ConfigValue::Int(20)));
    }
}
