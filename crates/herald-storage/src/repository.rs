//! Repository layer for data access

pub mod campaigns;
pub mod contacts;
pub mod groups;
pub mod identities;
pub mod message_logs;
pub mod properties;

// Re-export concrete repository implementations
pub use campaigns::DbCampaignRepository;
pub use contacts::DbContactRepository;
pub use groups::DbGroupRepository;
pub use identities::DbIdentityRepository;
pub use message_logs::DbMessageLogRepository;
pub use properties::DbPropertyRepository;

// Re-export repository traits
pub use campaigns::CampaignRepository;
pub use contacts::ContactRepository;
pub use groups::GroupRepository;
pub use identities::IdentityRepository;
pub use message_logs::MessageLogRepository;
pub use properties::PropertyRepository;
