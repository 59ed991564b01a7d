//! Broker configuration.

use std::collections::{BTreeMap, BTreeSet};

use permit_broker_core::{CapabilityType, PermissionStatus};
use serde::{Deserialize, Serialize};

use crate::error::{BrokerError, Result};

/// Configuration for the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Capabilities answered without consulting the delegate.
    pub fixed_decisions: BTreeMap<CapabilityType, PermissionStatus>,

    /// Capabilities whose last decision is remembered per
    /// (requesting, embedding) origin pair.
    pub cached_capabilities: BTreeSet<CapabilityType>,

    /// Maximum number of remembered decisions.
    pub max_cached_decisions: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            fixed_decisions: BTreeMap::from([(CapabilityType::Midi, PermissionStatus::Granted)]),
            cached_capabilities: BTreeSet::from([CapabilityType::ProtectedMediaIdentifier]),
            max_cached_decisions: 256,
        }
    }
}

impl BrokerConfig {
    /// A configuration that sends everything to the delegate and caches
    /// nothing.
    pub fn passthrough() -> Self {
        Self {
            fixed_decisions: BTreeMap::new(),
            cached_capabilities: BTreeSet::new(),
            max_cached_decisions: 0,
        }
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| BrokerError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Answer `capability` with `status` without asking the delegate.
    pub fn with_fixed_decision(mut self, capability: CapabilityType, status: PermissionStatus) -> Self {
        self.fixed_decisions.insert(capability, status);
        self
    }

    /// Remember decisions for `capability`.
    pub fn with_cached_capability(mut self, capability: CapabilityType) -> Self {
        self.cached_capabilities.insert(capability);
        self
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if let Some((capability, _)) = self
            .fixed_decisions
            .iter()
            .find(|(_, status)| **status == PermissionStatus::Ask)
        {
            return Err(BrokerError::InvalidConfig(format!(
                "fixed decision for {} must be granted or denied",
                capability
            )));
        }

        if let Some(capability) = self
            .cached_capabilities
            .iter()
            .find(|c| self.fixed_decisions.contains_key(*c))
        {
            return Err(BrokerError::InvalidConfig(format!(
                "{} is both fixed and cached",
                capability
            )));
        }

        Ok(())
    }

    pub fn fixed_decision(&self, capability: CapabilityType) -> Option<PermissionStatus> {
        self.fixed_decisions.get(&capability).copied()
    }

    pub fn is_cached(&self, capability: CapabilityType) -> bool {
        self.cached_capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = BrokerConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.fixed_decision(CapabilityType::Midi),
            Some(PermissionStatus::Granted)
        );
        assert!(config.is_cached(CapabilityType::ProtectedMediaIdentifier));
        assert!(!config.is_cached(CapabilityType::Geolocation));
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = BrokerConfig::from_json(r#"{ "max_cached_decisions": 8 }"#).unwrap();
        assert_eq!(config.max_cached_decisions, 8);
        assert_eq!(config.fixed_decisions, BrokerConfig::default().fixed_decisions);
    }

    #[test]
    fn test_from_json_roundtrip() {
        let config = BrokerConfig::passthrough()
            .with_fixed_decision(CapabilityType::Notifications, PermissionStatus::Denied)
            .with_cached_capability(CapabilityType::Geolocation);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"notifications\":\"denied\""));
        assert_eq!(BrokerConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_fixed_ask_rejected() {
        let err = BrokerConfig::from_json(r#"{ "fixed_decisions": { "geolocation": "ask" } }"#)
            .unwrap_err();
        assert!(matches!(err, BrokerError::InvalidConfig(_)));
    }

    #[test]
    fn test_fixed_and_cached_rejected() {
        let config = BrokerConfig::default().with_cached_capability(CapabilityType::Midi);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = BrokerConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, BrokerError::InvalidConfig(_)));
    }
}
