//! The service ledger: which service holds which VIP
//!
//! This is the document a caller persists between runs. Its JSON form is
//! `{"services": [{"vip": "192.168.1.1", "uid": "...", "serviceName": "..."}]}`.

use std::{net::IpAddr, path::Path};

use serde::{Deserialize, Serialize};

/// Errors raised while reading or writing a ledger
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Failed to access ledger file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse ledger: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single load-balanced service and the VIP it holds, if any
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vip: Option<IpAddr>,
    pub uid: String,
    #[serde(default)]
    pub service_name: String,
}

/// Every service known to the reconciler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceLedger {
    #[serde(default)]
    pub services: Vec<ServiceRecord>,
}

impl ServiceLedger {
    /// Load a ledger from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        let file_contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&file_contents)?)
    }

    /// Load a ledger, treating a missing file as an empty ledger
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, LedgerError> {
        match Self::load(path) {
            Err(LedgerError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("Ledger file does not exist yet. Starting empty");
                Ok(Self::default())
            }
            result => result,
        }
    }

    /// Write the ledger to a JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), LedgerError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Render the ledger as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, LedgerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Remove a service, returning its record if it was present
    pub fn remove_by_uid(&mut self, uid: &str) -> Option<ServiceRecord> {
        let idx = self.services.iter().position(|svc| svc.uid == uid)?;
        Some(self.services.remove(idx))
    }
}
