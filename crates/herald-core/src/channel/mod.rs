//! Outbound channels
//!
//! The dispatch engine talks to the outside world through two seams:
//! [`ChannelAdapter`] for paced per-target sends, and [`SideChannelPoster`]
//! for the one-shot social posts fired at campaign start.

mod meta;
mod waha;

pub use meta::{FacebookPagePoster, InstagramPoster};
pub use waha::WahaChannel;

use async_trait::async_trait;
use herald_storage::models::{Platform, SendingIdentity};

/// Result of one send attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub ok: bool,
    /// Channel response on success, diagnostic on failure
    pub detail: String,
}

impl SendOutcome {
    pub fn success(detail: impl Into<String>) -> Self {
        Self {
            ok: true,
            detail: detail.into(),
        }
    }

    pub fn failure(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: detail.into(),
        }
    }
}

/// Performs a single send through an identity's messaging session
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Never fails; transport and gateway errors become a failed outcome
    async fn send(&self, identity: &SendingIdentity, destination: &str, text: &str)
        -> SendOutcome;
}

/// Publishes a campaign payload to a social side channel
#[async_trait]
pub trait SideChannelPoster: Send + Sync {
    /// Audit platform for entries written about this poster's outcomes
    fn platform(&self) -> Platform;

    async fn post_text(&self, content: &str) -> SendOutcome;
}
