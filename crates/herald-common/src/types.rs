//! Common identifier aliases for Herald

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Unique identifier for campaigns
pub type CampaignId = Uuid;

/// Unique identifier for sending identities (gateway sessions)
pub type IdentityId = Uuid;

/// Unique identifier for contacts
pub type ContactId = Uuid;

/// Unique identifier for synced channel groups
pub type GroupId = Uuid;

/// Unique identifier for properties (message payloads)
pub type PropertyId = Uuid;

/// Unique identifier for message log entries
pub type MessageLogId = Uuid;

/// Timestamp wrapper
pub type Timestamp = DateTime<Utc>;
