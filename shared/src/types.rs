//! Common domain types used across the platform

use serde::{Deserialize, Serialize};

/// Storage mode for ingredients and lots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    #[default]
    Ambient,
    Refrigerated,
    Frozen,
}

impl StorageMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageMode::Ambient => "ambient",
            StorageMode::Refrigerated => "refrigerated",
            StorageMode::Frozen => "frozen",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "ambient" => Some(StorageMode::Ambient),
            "refrigerated" => Some(StorageMode::Refrigerated),
            "frozen" => Some(StorageMode::Frozen),
            _ => None,
        }
    }
}

/// Direction of an inventory movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementDirection {
    Inbound,
    Outbound,
}

impl MovementDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementDirection::Inbound => "inbound",
            MovementDirection::Outbound => "outbound",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "inbound" => Some(MovementDirection::Inbound),
            "outbound" => Some(MovementDirection::Outbound),
            _ => None,
        }
    }

    /// Sign applied to the quantity when summing the movement ledger
    pub fn sign(&self) -> i8 {
        match self {
            MovementDirection::Inbound => 1,
            MovementDirection::Outbound => -1,
        }
    }
}

/// Status of a HACCP compliance record
///
/// The only legal transition is `recorded -> voided`; `voided` is terminal.
/// Records are never physically deleted (regulatory retention).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum HaccpStatus {
    #[default]
    Recorded,
    Voided,
}

impl HaccpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HaccpStatus::Recorded => "recorded",
            HaccpStatus::Voided => "voided",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "recorded" => Some(HaccpStatus::Recorded),
            "voided" => Some(HaccpStatus::Voided),
            _ => None,
        }
    }

    /// Whether a record in this status may still be voided
    pub fn can_void(&self) -> bool {
        matches!(self, HaccpStatus::Recorded)
    }
}

/// Action kinds recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    ApplyTemplate,
    AutoFill,
    Cancel,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "create",
            AuditAction::Update => "update",
            AuditAction::Delete => "delete",
            AuditAction::ApplyTemplate => "apply_template",
            AuditAction::AutoFill => "auto_fill",
            AuditAction::Cancel => "cancel",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "create" => Some(AuditAction::Create),
            "update" => Some(AuditAction::Update),
            "delete" => Some(AuditAction::Delete),
            "apply_template" => Some(AuditAction::ApplyTemplate),
            "auto_fill" => Some(AuditAction::AutoFill),
            "cancel" => Some(AuditAction::Cancel),
            _ => None,
        }
    }
}

/// Severity of a pre-flight validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueSeverity {
    /// Advisory; proceeding is discouraged but not blocked
    Warning,
    /// The affected line cannot produce a usable batch
    Error,
}

/// Supported languages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    Italian,
    English,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Italian => "it",
            Language::English => "en",
        }
    }
}
