//! Campaign dispatch engine
//!
//! The [`Dispatcher`] partitions a campaign across connected identities and
//! spawns one [`PacingWorker`] per identity. Workers pace their sends, write
//! one audit entry per attempt and hand off to the [`Reconciler`], which
//! completes the campaign once the audit log covers every expected send.

pub mod orchestrator;
pub mod pacing;
pub mod partition;
pub mod reconciler;
pub mod target;
pub mod worker;

pub use orchestrator::{Dispatch, Dispatcher};
pub use pacing::{Cadence, Pacer, Pause, PulseWindow, RecordingPacer, TokioPacer};
pub use partition::{identity_slot, partition_by_owner, partition_round_robin};
pub use reconciler::Reconciler;
pub use target::Target;
pub use worker::{PacingWorker, WorkerSummary};

#[cfg(test)]
pub(crate) mod test_support {
    use async_trait::async_trait;
    use herald_common::types::CampaignId;
    use herald_storage::models::{
        CampaignSettingsInput, CampaignStatus, CreateCampaign, CreateProperty, Platform,
        Property, SendingIdentity,
    };
    use herald_storage::Store;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use uuid::Uuid;

    use crate::channel::{ChannelAdapter, SendOutcome, SideChannelPoster};

    pub struct CampaignShape {
        pub properties: usize,
        pub send_to_all_contacts: bool,
        pub target_tags: Vec<String>,
        pub send_to_all_groups: bool,
        pub target_group_ids: Vec<Uuid>,
        pub send_to_whatsapp: bool,
        pub post_to_facebook: bool,
        pub post_to_instagram: bool,
        pub pause_every_x_messages: i32,
    }

    impl Default for CampaignShape {
        fn default() -> Self {
            Self {
                properties: 1,
                send_to_all_contacts: true,
                target_tags: Vec::new(),
                send_to_all_groups: false,
                target_group_ids: Vec::new(),
                send_to_whatsapp: true,
                post_to_facebook: false,
                post_to_instagram: false,
                pause_every_x_messages: 5,
            }
        }
    }

    pub async fn create_properties(store: &Store, count: usize) -> Vec<Property> {
        let mut properties = Vec::new();
        for i in 0..count {
            properties.push(
                store
                    .properties
                    .create(CreateProperty {
                        title: format!("Listing {}", i),
                        content: format!("Listing {} now open for booking", i),
                    })
                    .await
                    .unwrap(),
            );
        }
        properties
    }

    pub async fn seed_campaign_with(store: &Store, shape: CampaignShape) -> CampaignId {
        let properties = create_properties(store, shape.properties).await;
        store
            .campaigns
            .create(CreateCampaign {
                name: "Weekend launch".to_string(),
                property_ids: properties.iter().map(|p| p.id).collect(),
                send_to_all_contacts: shape.send_to_all_contacts,
                target_tags: shape.target_tags,
                send_to_all_groups: shape.send_to_all_groups,
                target_group_ids: shape.target_group_ids,
                send_to_whatsapp: shape.send_to_whatsapp,
                post_to_facebook: shape.post_to_facebook,
                post_to_instagram: shape.post_to_instagram,
                settings: CampaignSettingsInput {
                    delay_min: 0,
                    delay_max: 0,
                    pause_every_x_messages: shape.pause_every_x_messages,
                    ..Default::default()
                },
            })
            .await
            .unwrap()
            .id
    }

    /// Campaign plus the properties linked to it
    pub async fn seed_campaign(store: &Store, properties: usize) -> (CampaignId, Vec<Property>) {
        let campaign_id = seed_campaign_with(
            store,
            CampaignShape {
                properties,
                ..Default::default()
            },
        )
        .await;
        let properties = store.campaigns.properties(campaign_id).await.unwrap();
        (campaign_id, properties)
    }

    enum Script {
        AlwaysOk,
        Alternating,
        PauseOnCall {
            store: Store,
            campaign_id: CampaignId,
            call: usize,
        },
    }

    /// Channel double that records destinations and follows a script
    pub struct ScriptedChannel {
        script: Script,
        calls: AtomicUsize,
        destinations: Mutex<Vec<String>>,
    }

    impl ScriptedChannel {
        fn with_script(script: Script) -> Self {
            Self {
                script,
                calls: AtomicUsize::new(0),
                destinations: Mutex::new(Vec::new()),
            }
        }

        pub fn always_ok() -> Self {
            Self::with_script(Script::AlwaysOk)
        }

        /// Succeeds on odd calls, fails on even ones
        pub fn alternating() -> Self {
            Self::with_script(Script::Alternating)
        }

        /// Pauses the campaign while serving the given call (1-based)
        pub fn pausing(store: Store, campaign_id: CampaignId, call: usize) -> Self {
            Self::with_script(Script::PauseOnCall {
                store,
                campaign_id,
                call,
            })
        }

        pub fn destinations(&self) -> Vec<String> {
            self.destinations.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChannelAdapter for ScriptedChannel {
        async fn send(
            &self,
            _identity: &SendingIdentity,
            destination: &str,
            _text: &str,
        ) -> SendOutcome {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            self.destinations.lock().unwrap().push(destination.to_string());

            match &self.script {
                Script::AlwaysOk => SendOutcome::success("ok"),
                Script::Alternating if call % 2 == 0 => SendOutcome::failure("gateway down"),
                Script::Alternating => SendOutcome::success("ok"),
                Script::PauseOnCall {
                    store,
                    campaign_id,
                    call: pause_call,
                } => {
                    if call == *pause_call {
                        store
                            .campaigns
                            .update_status(*campaign_id, CampaignStatus::Paused)
                            .await
                            .unwrap();
                    }
                    SendOutcome::success("ok")
                }
            }
        }
    }

    pub struct ScriptedPoster {
        platform: Platform,
        ok: bool,
    }

    impl ScriptedPoster {
        pub fn new(platform: Platform, ok: bool) -> Self {
            Self { platform, ok }
        }
    }

    #[async_trait]
    impl SideChannelPoster for ScriptedPoster {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn post_text(&self, _content: &str) -> SendOutcome {
            if self.ok {
                SendOutcome::success("post-1")
            } else {
                SendOutcome::failure("token expired")
            }
        }
    }
}
