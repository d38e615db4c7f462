//! In-process store
//!
//! Implements every repository trait over a single locked state. Used by
//! the engine and API tests, and by embedders that do not want a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use herald_common::types::{CampaignId, IdentityId, PropertyId};
use herald_common::{Error, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    Campaign, CampaignSettings, CampaignStatus, Contact, ContactStatus, CreateCampaign,
    CreateProperty, Group, IdentityStatus, MessageLog, MessageLogFilter, MessageStatusCounts,
    NewMessageLog, Platform, Property, SendingIdentity,
};
use crate::repository::{
    CampaignRepository, ContactRepository, GroupRepository, IdentityRepository,
    MessageLogRepository, PropertyRepository,
};

#[derive(Default)]
struct MemoryState {
    campaigns: Vec<Campaign>,
    settings: HashMap<CampaignId, CampaignSettings>,
    campaign_properties: HashMap<CampaignId, Vec<PropertyId>>,
    campaign_groups: HashMap<CampaignId, Vec<Uuid>>,
    identities: Vec<SendingIdentity>,
    contacts: Vec<Contact>,
    groups: Vec<Group>,
    properties: Vec<Property>,
    message_logs: Vec<MessageLog>,
}

impl MemoryState {
    fn campaign_mut(&mut self, id: CampaignId) -> Option<&mut Campaign> {
        self.campaigns.iter_mut().find(|c| c.id == id)
    }
}

/// In-memory implementation of every repository trait
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sending identity
    pub async fn add_identity(&self, name: &str, status: IdentityStatus) -> SendingIdentity {
        let now = Utc::now();
        let identity = SendingIdentity {
            id: Uuid::new_v4(),
            name: name.to_string(),
            session_name: name.to_lowercase().replace(' ', "-"),
            api_url: None,
            is_primary: false,
            status: status.to_string(),
            total_sent: 0,
            sent_today: 0,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.identities.push(identity.clone());
        identity
    }

    /// Change an identity's connectivity status
    pub async fn set_identity_status(&self, id: IdentityId, status: IdentityStatus) {
        let mut state = self.state.write().await;
        if let Some(identity) = state.identities.iter_mut().find(|i| i.id == id) {
            identity.status = status.to_string();
            identity.updated_at = Utc::now();
        }
    }

    /// Register a contact
    pub async fn add_contact(
        &self,
        phone: &str,
        name: &str,
        tags: &[&str],
        status: ContactStatus,
    ) -> Contact {
        let contact = Contact {
            id: Uuid::new_v4(),
            name: name.to_string(),
            phone: phone.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            status: status.to_string(),
            imported_at: Utc::now(),
        };
        self.state.write().await.contacts.push(contact.clone());
        contact
    }

    /// Register a group owned by an identity
    pub async fn add_group(&self, identity_id: IdentityId, group_jid: &str, name: &str) -> Group {
        let group = Group {
            id: Uuid::new_v4(),
            identity_id,
            group_jid: group_jid.to_string(),
            name: name.to_string(),
            participants_count: 0,
            created_at: Utc::now(),
        };
        self.state.write().await.groups.push(group.clone());
        group
    }

    /// Snapshot of the message log in insertion order
    pub async fn message_log_entries(&self) -> Vec<MessageLog> {
        self.state.read().await.message_logs.clone()
    }
}

/// Entry belongs to the campaign's run on `platform` that began at `since`
fn in_run(
    log: &MessageLog,
    campaign_id: CampaignId,
    platform: Platform,
    since: Option<DateTime<Utc>>,
) -> bool {
    log.campaign_id == Some(campaign_id)
        && log.platform_enum() == Some(platform)
        && since.map_or(true, |since| log.sent_at >= since)
}

#[async_trait]
impl CampaignRepository for MemoryStore {
    async fn create(&self, input: CreateCampaign) -> Result<Campaign> {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::now_v7(),
            name: input.name,
            status: CampaignStatus::Draft.to_string(),
            send_to_all_contacts: input.send_to_all_contacts,
            target_tags: input.target_tags,
            send_to_all_groups: input.send_to_all_groups,
            send_to_whatsapp: input.send_to_whatsapp,
            post_to_facebook: input.post_to_facebook,
            post_to_instagram: input.post_to_instagram,
            total_contacts: 0,
            total_groups: 0,
            started_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };

        let s = input.settings;
        let settings = CampaignSettings {
            campaign_id: campaign.id,
            delay_min: s.delay_min,
            delay_max: s.delay_max,
            warmup_mode: s.warmup_mode,
            pause_every_x_messages: s.pause_every_x_messages,
            pause_duration_seconds: s.pause_duration_seconds,
            max_messages_per_hour: s.max_messages_per_hour,
        };

        let mut state = self.state.write().await;
        for property_id in &input.property_ids {
            if !state.properties.iter().any(|p| p.id == *property_id) {
                return Err(Error::NotFound(format!("property {}", property_id)));
            }
        }
        for group_id in &input.target_group_ids {
            if !state.groups.iter().any(|g| g.id == *group_id) {
                return Err(Error::NotFound(format!("group {}", group_id)));
            }
        }

        state.settings.insert(campaign.id, settings);
        state
            .campaign_properties
            .insert(campaign.id, input.property_ids);
        state
            .campaign_groups
            .insert(campaign.id, input.target_group_ids);
        state.campaigns.push(campaign.clone());
        Ok(campaign)
    }

    async fn get(&self, id: CampaignId) -> Result<Option<Campaign>> {
        let state = self.state.read().await;
        Ok(state.campaigns.iter().find(|c| c.id == id).cloned())
    }

    async fn list(
        &self,
        status: Option<CampaignStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Campaign>> {
        let state = self.state.read().await;
        Ok(state
            .campaigns
            .iter()
            .rev()
            .filter(|c| status.map_or(true, |s| c.status_enum() == Some(s)))
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn settings(&self, id: CampaignId) -> Result<Option<CampaignSettings>> {
        Ok(self.state.read().await.settings.get(&id).cloned())
    }

    async fn properties(&self, id: CampaignId) -> Result<Vec<Property>> {
        let state = self.state.read().await;
        let ids = state.campaign_properties.get(&id).cloned().unwrap_or_default();
        Ok(state
            .properties
            .iter()
            .filter(|p| ids.contains(&p.id))
            .cloned()
            .collect())
    }

    async fn target_groups(&self, id: CampaignId) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        let ids = state.campaign_groups.get(&id).cloned().unwrap_or_default();
        Ok(state
            .groups
            .iter()
            .filter(|g| ids.contains(&g.id))
            .cloned()
            .collect())
    }

    async fn status(&self, id: CampaignId) -> Result<Option<CampaignStatus>> {
        let state = self.state.read().await;
        Ok(state
            .campaigns
            .iter()
            .find(|c| c.id == id)
            .and_then(|c| c.status_enum()))
    }

    async fn mark_running(
        &self,
        id: CampaignId,
        at: DateTime<Utc>,
        total_contacts: i32,
        total_groups: i32,
    ) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.campaign_mut(id) {
            Some(campaign) if !campaign.is_running() => {
                campaign.status = CampaignStatus::Running.to_string();
                campaign.started_at = Some(at);
                campaign.completed_at = None;
                campaign.total_contacts = total_contacts;
                campaign.total_groups = total_groups;
                campaign.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_status(
        &self,
        id: CampaignId,
        status: CampaignStatus,
    ) -> Result<Option<Campaign>> {
        let mut state = self.state.write().await;
        Ok(state.campaign_mut(id).map(|campaign| {
            campaign.status = status.to_string();
            campaign.updated_at = Utc::now();
            campaign.clone()
        }))
    }

    async fn complete_if_running(&self, id: CampaignId, at: DateTime<Utc>) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.campaign_mut(id) {
            Some(campaign) if campaign.is_running() => {
                campaign.status = CampaignStatus::Completed.to_string();
                campaign.completed_at = Some(at);
                campaign.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl IdentityRepository for MemoryStore {
    async fn get(&self, id: IdentityId) -> Result<Option<SendingIdentity>> {
        let state = self.state.read().await;
        Ok(state.identities.iter().find(|i| i.id == id).cloned())
    }

    async fn list(&self) -> Result<Vec<SendingIdentity>> {
        Ok(self.state.read().await.identities.clone())
    }

    async fn list_by_status(&self, status: IdentityStatus) -> Result<Vec<SendingIdentity>> {
        let state = self.state.read().await;
        Ok(state
            .identities
            .iter()
            .filter(|i| i.status_enum() == Some(status))
            .cloned()
            .collect())
    }

    async fn record_sent(&self, id: IdentityId) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(identity) = state.identities.iter_mut().find(|i| i.id == id) {
            identity.total_sent += 1;
            identity.sent_today += 1;
            identity.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn reset_sent_today(&self) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut touched = 0;
        for identity in state.identities.iter_mut().filter(|i| i.sent_today != 0) {
            identity.sent_today = 0;
            touched += 1;
        }
        Ok(touched)
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn list_active(&self) -> Result<Vec<Contact>> {
        let state = self.state.read().await;
        Ok(state
            .contacts
            .iter()
            .filter(|c| c.is_active())
            .cloned()
            .collect())
    }

    async fn list_active_with_any_tag(&self, tags: &[String]) -> Result<Vec<Contact>> {
        let state = self.state.read().await;
        Ok(state
            .contacts
            .iter()
            .filter(|c| c.is_active() && c.has_any_tag(tags))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl GroupRepository for MemoryStore {
    async fn list_by_identity(&self, identity_id: IdentityId) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        Ok(state
            .groups
            .iter()
            .filter(|g| g.identity_id == identity_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PropertyRepository for MemoryStore {
    async fn create(&self, input: CreateProperty) -> Result<Property> {
        let now = Utc::now();
        let property = Property {
            id: Uuid::now_v7(),
            title: input.title,
            content: input.content,
            created_at: now,
            updated_at: now,
        };
        self.state.write().await.properties.push(property.clone());
        Ok(property)
    }

    async fn get(&self, id: PropertyId) -> Result<Option<Property>> {
        let state = self.state.read().await;
        Ok(state.properties.iter().find(|p| p.id == id).cloned())
    }
}

#[async_trait]
impl MessageLogRepository for MemoryStore {
    async fn append(&self, entry: NewMessageLog) -> Result<MessageLog> {
        let log = MessageLog {
            id: Uuid::now_v7(),
            campaign_id: Some(entry.campaign_id),
            identity_id: entry.identity_id,
            contact_id: entry.contact_id,
            group_id: entry.group_id,
            property_id: entry.property_id,
            message_text: entry.message_text,
            status: entry.status.to_string(),
            error_message: entry.error_message,
            platform: entry.platform.to_string(),
            sent_at: Utc::now(),
        };
        self.state.write().await.message_logs.push(log.clone());
        Ok(log)
    }

    async fn count_for_campaign(
        &self,
        campaign_id: CampaignId,
        platform: Platform,
        since: Option<DateTime<Utc>>,
    ) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .message_logs
            .iter()
            .filter(|l| in_run(l, campaign_id, platform, since))
            .count() as i64)
    }

    async fn status_counts(
        &self,
        campaign_id: CampaignId,
        platform: Platform,
        since: Option<DateTime<Utc>>,
    ) -> Result<MessageStatusCounts> {
        let state = self.state.read().await;
        let mut counts = MessageStatusCounts::default();
        for log in state
            .message_logs
            .iter()
            .filter(|l| in_run(l, campaign_id, platform, since))
        {
            counts.add(&log.status, 1);
        }
        Ok(counts)
    }

    async fn list(&self, filter: MessageLogFilter) -> Result<Vec<MessageLog>> {
        let state = self.state.read().await;
        Ok(state
            .message_logs
            .iter()
            .rev()
            .filter(|l| filter.campaign_id.map_or(true, |id| l.campaign_id == Some(id)))
            .filter(|l| filter.status.map_or(true, |s| l.status_enum() == Some(s)))
            .filter(|l| filter.platform.map_or(true, |p| l.platform_enum() == Some(p)))
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
