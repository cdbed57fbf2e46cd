//! Wire and registry models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use kotori_bot::{StateInfo, TutorConfig};

/// Voice playback preferences, stored and returned verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceSettings {
    #[serde(default)]
    pub voice_name: Option<String>,
    #[serde(default = "default_rate")]
    pub rate: f32,
    #[serde(default = "default_pitch")]
    pub pitch: f32,
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default = "default_true")]
    pub auto_play: bool,
}

fn default_rate() -> f32 {
    1.0
}
fn default_pitch() -> f32 {
    1.0
}
fn default_volume() -> f32 {
    1.0
}
fn default_true() -> bool {
    true
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            voice_name: None,
            rate: 1.0,
            pitch: 1.0,
            volume: 1.0,
            auto_play: true,
        }
    }
}

/// Client UI preferences. The backend stores them per session and never
/// interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(default = "default_theme")]
    pub theme: String,
    #[serde(default)]
    pub debug_mode: bool,
    #[serde(default = "default_true")]
    pub show_assessment: bool,
    #[serde(default)]
    pub show_debug_panel: bool,
    #[serde(default)]
    pub voice_settings: VoiceSettings,
}

fn default_theme() -> String {
    "light".to_string()
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            theme: default_theme(),
            debug_mode: false,
            show_assessment: true,
            show_debug_panel: false,
            voice_settings: VoiceSettings::default(),
        }
    }
}

/// Registry-owned record of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub config: TutorConfig,
    pub ui_settings: UiSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_state: Option<StateInfo>,
}

impl SessionRecord {
    /// Fresh, active record with default UI settings.
    pub fn new(session_id: impl Into<String>, config: TutorConfig) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            is_active: true,
            created_at: now,
            last_activity: now,
            config,
            ui_settings: UiSettings::default(),
            current_state: None,
        }
    }
}

/// The push-channel envelope, both directions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebSocketEvent {
    pub event_type: String,
    pub data: Value,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

impl WebSocketEvent {
    pub fn new(event_type: impl Into<String>, session_id: impl Into<String>, data: Value) -> Self {
        Self {
            event_type: event_type.into(),
            data,
            session_id: session_id.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Export formats for conversation history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Txt,
    Csv,
}

/// Body of the history-export request.
#[derive(Debug, Clone, Deserialize)]
pub struct ExportRequest {
    pub format: ExportFormat,
}

/// Error body used by every API error response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Health probe response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub services: std::collections::HashMap<String, String>,
}
