//! Capability types and permission outcomes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// The capability a request asks to be authorized.
///
/// The broker treats this as an opaque tag: it only hashes, compares and
/// routes on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityType {
    Geolocation,
    ProtectedMediaIdentifier,
    Midi,
    MidiSysex,
    Notifications,
    AudioCapture,
    VideoCapture,
    DurableStorage,
    BackgroundSync,
}

impl CapabilityType {
    /// Every known capability, in declaration order.
    pub const ALL: [CapabilityType; 9] = [
        CapabilityType::Geolocation,
        CapabilityType::ProtectedMediaIdentifier,
        CapabilityType::Midi,
        CapabilityType::MidiSysex,
        CapabilityType::Notifications,
        CapabilityType::AudioCapture,
        CapabilityType::VideoCapture,
        CapabilityType::DurableStorage,
        CapabilityType::BackgroundSync,
    ];

    /// Stable lowercase name, matching the serde representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            CapabilityType::Geolocation => "geolocation",
            CapabilityType::ProtectedMediaIdentifier => "protected_media_identifier",
            CapabilityType::Midi => "midi",
            CapabilityType::MidiSysex => "midi_sysex",
            CapabilityType::Notifications => "notifications",
            CapabilityType::AudioCapture => "audio_capture",
            CapabilityType::VideoCapture => "video_capture",
            CapabilityType::DurableStorage => "durable_storage",
            CapabilityType::BackgroundSync => "background_sync",
        }
    }
}

impl fmt::Display for CapabilityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CapabilityType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CapabilityType::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| CoreError::UnknownCapability(s.to_string()))
    }
}

/// Outcome reported to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// No decision is known; asking would prompt.
    Ask,
}

impl PermissionStatus {
    /// Map a delegate's boolean decision.
    pub const fn from_grant(granted: bool) -> Self {
        if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }

    pub const fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl From<bool> for PermissionStatus {
    fn from(granted: bool) -> Self {
        Self::from_grant(granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_name_matches_serde() {
        for capability in CapabilityType::ALL {
            let json = serde_json::to_string(&capability).unwrap();
            assert_eq!(json, format!("\"{}\"", capability.as_str()));
            assert_eq!(capability.as_str().parse::<CapabilityType>().unwrap(), capability);
        }
    }

    #[test]
    fn test_unknown_capability() {
        let err = "camera_roll".parse::<CapabilityType>().unwrap_err();
        assert_eq!(err, CoreError::UnknownCapability("camera_roll".into()));
    }

    #[test]
    fn test_status_from_grant() {
        assert_eq!(PermissionStatus::from(true), PermissionStatus::Granted);
        assert_eq!(PermissionStatus::from(false), PermissionStatus::Denied);
        assert!(!PermissionStatus::Ask.is_granted());
    }
}
