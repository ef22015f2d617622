use std::fmt;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// SoundId
// ---------------------------------------------------------------------------

/// Alert sounds the renderer knows how to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SoundId {
    #[default]
    Siren,
    ShipHorn,
    Bell,
    Alarm,
    TripleBeep,
    AirRaid,
    Foghorn,
    Bugle,
}

impl SoundId {
    pub const ALL: [SoundId; 8] = [
        SoundId::Siren,
        SoundId::ShipHorn,
        SoundId::Bell,
        SoundId::Alarm,
        SoundId::TripleBeep,
        SoundId::AirRaid,
        SoundId::Foghorn,
        SoundId::Bugle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SoundId::Siren => "Siren",
            SoundId::ShipHorn => "Ship Horn",
            SoundId::Bell => "Bell",
            SoundId::Alarm => "Alarm",
            SoundId::TripleBeep => "Triple Beep",
            SoundId::AirRaid => "Air Raid",
            SoundId::Foghorn => "Foghorn",
            SoundId::Bugle => "Bugle",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for SoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for SoundId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for SoundId {
    /// Unknown names fall back to the default sound rather than failing the
    /// whole settings file.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(SoundId::from_name(&name).unwrap_or_default())
    }
}

// ---------------------------------------------------------------------------
// AlertSettings
// ---------------------------------------------------------------------------

pub const POPUP_TIMEOUT_CHOICES: [u8; 4] = [1, 2, 3, 5];

/// User-facing alert preferences, persisted as a flat JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertSettings {
    pub sound: SoundId,
    /// 0–100.
    pub volume: u8,
    /// 1–3.
    pub repeat: u8,
    pub show_popup: bool,
    /// Minutes; one of [`POPUP_TIMEOUT_CHOICES`].
    pub popup_timeout: u8,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            sound: SoundId::Siren,
            volume: 80,
            repeat: 1,
            show_popup: true,
            popup_timeout: 2,
        }
    }
}

impl AlertSettings {
    /// Clamp every field into its allowed range.
    pub fn sanitized(self) -> Self {
        let defaults = Self::default();
        Self {
            sound: self.sound,
            volume: self.volume.min(100),
            repeat: self.repeat.clamp(1, 3),
            show_popup: self.show_popup,
            popup_timeout: if POPUP_TIMEOUT_CHOICES.contains(&self.popup_timeout) {
                self.popup_timeout
            } else {
                defaults.popup_timeout
            },
        }
    }

    /// Volume as a 0.0–1.0 gain.
    pub fn gain(&self) -> f32 {
        f32::from(self.volume.min(100)) / 100.0
    }

    pub fn popup_timeout_secs(&self) -> u32 {
        u32::from(self.popup_timeout) * 60
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Load settings from `path`. A missing, unreadable or corrupt file yields
/// the defaults; individual missing keys take their default values.
pub fn load_settings(path: &Path) -> AlertSettings {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "No settings file, using defaults");
            return AlertSettings::default();
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Failed to read settings, using defaults");
            return AlertSettings::default();
        }
    };

    match serde_json::from_str::<AlertSettings>(&raw) {
        Ok(settings) => settings.sanitized(),
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Corrupt settings file, using defaults");
            AlertSettings::default()
        }
    }
}

pub fn save_settings(path: &Path, settings: &AlertSettings) -> Result<(), SettingsError> {
    let body = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, body)?;
    tracing::debug!(path = %path.display(), "Settings saved");
    Ok(())
}
