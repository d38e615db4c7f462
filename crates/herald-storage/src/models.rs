//! Database models

use chrono::{DateTime, Utc};
use herald_common::types::{
    CampaignId, ContactId, GroupId, IdentityId, MessageLogId, PropertyId,
};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Campaign lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CampaignStatus {
    Draft,
    Queued,
    Running,
    Paused,
    Completed,
    Failed,
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CampaignStatus::Draft => write!(f, "DRAFT"),
            CampaignStatus::Queued => write!(f, "QUEUED"),
            CampaignStatus::Running => write!(f, "RUNNING"),
            CampaignStatus::Paused => write!(f, "PAUSED"),
            CampaignStatus::Completed => write!(f, "COMPLETED"),
            CampaignStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for CampaignStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(CampaignStatus::Draft),
            "QUEUED" => Ok(CampaignStatus::Queued),
            "RUNNING" => Ok(CampaignStatus::Running),
            "PAUSED" => Ok(CampaignStatus::Paused),
            "COMPLETED" => Ok(CampaignStatus::Completed),
            "FAILED" => Ok(CampaignStatus::Failed),
            _ => Err(format!("Invalid campaign status: {}", s)),
        }
    }
}

/// Campaign model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub name: String,
    pub status: String,
    pub send_to_all_contacts: bool,
    pub target_tags: Vec<String>,
    pub send_to_all_groups: bool,
    pub send_to_whatsapp: bool,
    pub post_to_facebook: bool,
    pub post_to_instagram: bool,
    pub total_contacts: i32,
    pub total_groups: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Get status enum
    pub fn status_enum(&self) -> Option<CampaignStatus> {
        self.status.parse().ok()
    }

    /// Whether the campaign is currently being dispatched
    pub fn is_running(&self) -> bool {
        self.status_enum() == Some(CampaignStatus::Running)
    }

    /// Number of targets snapshotted at dispatch time
    pub fn total_targets(&self) -> i64 {
        self.total_contacts as i64 + self.total_groups as i64
    }
}

/// Pacing configuration owned 1:1 by a campaign
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct CampaignSettings {
    pub campaign_id: CampaignId,
    /// Minimum seconds between two sends
    pub delay_min: i32,
    /// Maximum seconds between two sends
    pub delay_max: i32,
    /// Advisory flag, not interpreted by the dispatch engine
    pub warmup_mode: bool,
    /// Pulse size
    pub pause_every_x_messages: i32,
    /// Rest duration used when no pulse window is configured
    pub pause_duration_seconds: i32,
    /// Advisory hourly cap, 0 = unlimited
    pub max_messages_per_hour: i32,
}

impl CampaignSettings {
    /// Settings for a campaign with the stock pacing values
    pub fn defaults_for(campaign_id: CampaignId) -> Self {
        let input = CampaignSettingsInput::default();
        Self {
            campaign_id,
            delay_min: input.delay_min,
            delay_max: input.delay_max,
            warmup_mode: input.warmup_mode,
            pause_every_x_messages: input.pause_every_x_messages,
            pause_duration_seconds: input.pause_duration_seconds,
            max_messages_per_hour: input.max_messages_per_hour,
        }
    }
}

/// Settings supplied when creating a campaign
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CampaignSettingsInput {
    pub delay_min: i32,
    pub delay_max: i32,
    pub warmup_mode: bool,
    pub pause_every_x_messages: i32,
    pub pause_duration_seconds: i32,
    pub max_messages_per_hour: i32,
}

impl Default for CampaignSettingsInput {
    fn default() -> Self {
        Self {
            delay_min: 8,
            delay_max: 12,
            warmup_mode: false,
            pause_every_x_messages: 5,
            pause_duration_seconds: 30,
            max_messages_per_hour: 0,
        }
    }
}

impl CampaignSettingsInput {
    /// Check the pacing bounds
    pub fn validate(&self) -> Result<(), String> {
        if self.delay_min < 0 {
            return Err("delay_min must not be negative".to_string());
        }
        if self.delay_min > self.delay_max {
            return Err(format!(
                "delay_min ({}) must not exceed delay_max ({})",
                self.delay_min, self.delay_max
            ));
        }
        if self.pause_every_x_messages <= 0 {
            return Err("pause_every_x_messages must be positive".to_string());
        }
        if self.pause_duration_seconds < 0 {
            return Err("pause_duration_seconds must not be negative".to_string());
        }
        Ok(())
    }
}

/// Create campaign input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCampaign {
    pub name: String,
    pub property_ids: Vec<PropertyId>,
    pub send_to_all_contacts: bool,
    pub target_tags: Vec<String>,
    pub send_to_all_groups: bool,
    pub target_group_ids: Vec<GroupId>,
    pub send_to_whatsapp: bool,
    pub post_to_facebook: bool,
    pub post_to_instagram: bool,
    pub settings: CampaignSettingsInput,
}

/// Sending identity connectivity status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdentityStatus {
    Connected,
    Disconnected,
    Paused,
    ScanRequired,
}

impl std::fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityStatus::Connected => write!(f, "CONNECTED"),
            IdentityStatus::Disconnected => write!(f, "DISCONNECTED"),
            IdentityStatus::Paused => write!(f, "PAUSED"),
            IdentityStatus::ScanRequired => write!(f, "SCAN_REQUIRED"),
        }
    }
}

impl std::str::FromStr for IdentityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECTED" => Ok(IdentityStatus::Connected),
            "DISCONNECTED" => Ok(IdentityStatus::Disconnected),
            "PAUSED" => Ok(IdentityStatus::Paused),
            "SCAN_REQUIRED" => Ok(IdentityStatus::ScanRequired),
            _ => Err(format!("Invalid identity status: {}", s)),
        }
    }
}

/// One outbound sending endpoint (a gateway session)
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SendingIdentity {
    pub id: IdentityId,
    pub name: String,
    pub session_name: String,
    /// Gateway URL override for this session
    pub api_url: Option<String>,
    pub is_primary: bool,
    pub status: String,
    pub total_sent: i64,
    pub sent_today: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SendingIdentity {
    /// Get status enum
    pub fn status_enum(&self) -> Option<IdentityStatus> {
        self.status.parse().ok()
    }
}

/// Contact status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContactStatus {
    Active,
    Unsubscribed,
    Blocked,
}

impl std::fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContactStatus::Active => write!(f, "ACTIVE"),
            ContactStatus::Unsubscribed => write!(f, "UNSUBSCRIBED"),
            ContactStatus::Blocked => write!(f, "BLOCKED"),
        }
    }
}

/// Contact model
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Contact {
    pub id: ContactId,
    pub name: String,
    pub phone: String,
    pub tags: Vec<String>,
    pub status: String,
    pub imported_at: DateTime<Utc>,
}

impl Contact {
    /// Whether the contact may receive campaign traffic
    pub fn is_active(&self) -> bool {
        self.status == ContactStatus::Active.to_string()
    }

    /// Exact, case-sensitive match against any of the given tags
    pub fn has_any_tag(&self, tags: &[String]) -> bool {
        self.tags.iter().any(|t| tags.contains(t))
    }
}

/// Channel group synced from a sending identity
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub id: GroupId,
    /// Identity whose session owns the group
    pub identity_id: IdentityId,
    /// Opaque channel identifier, e.g. `1203630239@g.us`
    pub group_jid: String,
    pub name: String,
    pub participants_count: i32,
    pub created_at: DateTime<Utc>,
}

/// Message payload sent to every target in a round
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, Eq)]
pub struct Property {
    pub id: PropertyId,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Create property input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateProperty {
    pub title: String,
    pub content: String,
}

/// Message log status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Sent,
    /// Reserved for delivery receipts
    Delivered,
    /// Reserved for read receipts
    Read,
    Failed,
}

impl std::fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageStatus::Sent => write!(f, "SENT"),
            MessageStatus::Delivered => write!(f, "DELIVERED"),
            MessageStatus::Read => write!(f, "READ"),
            MessageStatus::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for MessageStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SENT" => Ok(MessageStatus::Sent),
            "DELIVERED" => Ok(MessageStatus::Delivered),
            "READ" => Ok(MessageStatus::Read),
            "FAILED" => Ok(MessageStatus::Failed),
            _ => Err(format!("Invalid message status: {}", s)),
        }
    }
}

/// Channel a message log entry was written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Platform {
    Whatsapp,
    Facebook,
    Instagram,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Whatsapp => write!(f, "WHATSAPP"),
            Platform::Facebook => write!(f, "FACEBOOK"),
            Platform::Instagram => write!(f, "INSTAGRAM"),
        }
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WHATSAPP" => Ok(Platform::Whatsapp),
            "FACEBOOK" => Ok(Platform::Facebook),
            "INSTAGRAM" => Ok(Platform::Instagram),
            _ => Err(format!("Invalid platform: {}", s)),
        }
    }
}

/// Audit trail entry, one per send attempt
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MessageLog {
    pub id: MessageLogId,
    pub campaign_id: Option<CampaignId>,
    pub identity_id: Option<IdentityId>,
    pub contact_id: Option<ContactId>,
    pub group_id: Option<GroupId>,
    pub property_id: Option<PropertyId>,
    pub message_text: String,
    pub status: String,
    pub error_message: Option<String>,
    pub platform: String,
    pub sent_at: DateTime<Utc>,
}

impl MessageLog {
    /// Get status enum
    pub fn status_enum(&self) -> Option<MessageStatus> {
        self.status.parse().ok()
    }

    /// Get platform enum
    pub fn platform_enum(&self) -> Option<Platform> {
        self.platform.parse().ok()
    }
}

/// Append input for the message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessageLog {
    pub campaign_id: CampaignId,
    pub identity_id: Option<IdentityId>,
    pub contact_id: Option<ContactId>,
    pub group_id: Option<GroupId>,
    pub property_id: Option<PropertyId>,
    pub message_text: String,
    pub status: MessageStatus,
    pub error_message: Option<String>,
    pub platform: Platform,
}

/// Filter for listing message logs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageLogFilter {
    pub campaign_id: Option<CampaignId>,
    pub status: Option<MessageStatus>,
    pub platform: Option<Platform>,
    pub limit: i64,
    pub offset: i64,
}

/// Per-status message counts for one campaign and platform
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageStatusCounts {
    pub sent: i64,
    pub delivered: i64,
    pub read: i64,
    pub failed: i64,
}

impl MessageStatusCounts {
    /// Every attempt, regardless of outcome
    pub fn processed(&self) -> i64 {
        self.sent + self.delivered + self.read + self.failed
    }

    /// Attempts the channel accepted
    pub fn succeeded(&self) -> i64 {
        self.sent + self.delivered + self.read
    }

    pub(crate) fn add(&mut self, status: &str, count: i64) {
        match status.parse::<MessageStatus>() {
            Ok(MessageStatus::Sent) => self.sent += count,
            Ok(MessageStatus::Delivered) => self.delivered += count,
            Ok(MessageStatus::Read) => self.read += count,
            Ok(MessageStatus::Failed) => self.failed += count,
            Err(_) => {}
        }
    }
}

/// Campaign progress derived from the message log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignStats {
    pub campaign_id: CampaignId,
    pub status: String,
    pub total_contacts: i32,
    pub total_groups: i32,
    pub property_count: i64,
    pub expected: i64,
    pub processed: i64,
    pub sent: i64,
    pub failed: i64,
    pub progress_percentage: f64,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip_through_strings() {
        for status in [
            CampaignStatus::Draft,
            CampaignStatus::Queued,
            CampaignStatus::Running,
            CampaignStatus::Paused,
            CampaignStatus::Completed,
            CampaignStatus::Failed,
        ] {
            assert_eq!(status.to_string().parse::<CampaignStatus>(), Ok(status));
        }
        assert!("running".parse::<CampaignStatus>().is_err());
        assert_eq!(
            "SCAN_REQUIRED".parse::<IdentityStatus>(),
            Ok(IdentityStatus::ScanRequired)
        );
    }

    #[test]
    fn test_settings_validation() {
        assert!(CampaignSettingsInput::default().validate().is_ok());

        let inverted = CampaignSettingsInput {
            delay_min: 10,
            delay_max: 2,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let no_pulse = CampaignSettingsInput {
            pause_every_x_messages: 0,
            ..Default::default()
        };
        assert!(no_pulse.validate().is_err());
    }

    #[test]
    fn test_tag_match_is_case_sensitive() {
        let contact = Contact {
            id: uuid::Uuid::new_v4(),
            name: "Asha".to_string(),
            phone: "919800000001".to_string(),
            tags: vec!["Broker".to_string()],
            status: "ACTIVE".to_string(),
            imported_at: Utc::now(),
        };

        assert!(contact.has_any_tag(&["Builder".to_string(), "Broker".to_string()]));
        assert!(!contact.has_any_tag(&["broker".to_string()]));
        assert!(!contact.has_any_tag(&[]));
    }

    #[test]
    fn test_status_counts() {
        let mut counts = MessageStatusCounts::default();
        counts.add("SENT", 3);
        counts.add("READ", 1);
        counts.add("FAILED", 2);
        counts.add("bogus", 7);
        assert_eq!(counts.processed(), 6);
        assert_eq!(counts.succeeded(), 4);
    }
}
