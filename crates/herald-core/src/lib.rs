//! Herald Core - campaign dispatch engine
//!
//! This crate partitions outbound messaging campaigns across connected
//! sending identities, paces every send like a human would, and closes out
//! campaigns from the audit trail. Outbound traffic leaves through the
//! channel adapters in [`channel`].

pub mod channel;
pub mod dispatch;
pub mod error;
pub mod maintenance;
pub mod manager;

pub use channel::{
    ChannelAdapter, FacebookPagePoster, InstagramPoster, SendOutcome, SideChannelPoster,
    WahaChannel,
};
pub use dispatch::{Dispatch, Dispatcher, PulseWindow, Reconciler, WorkerSummary};
pub use error::{DispatchError, DispatchResult};
pub use maintenance::Maintenance;
pub use manager::{CampaignManager, QuickBroadcast};
