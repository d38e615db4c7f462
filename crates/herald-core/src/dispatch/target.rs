//! Dispatch targets

use herald_common::types::{ContactId, GroupId};
use herald_storage::models::{Contact, Group};
use uuid::Uuid;

/// A recipient of campaign traffic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Contact(Contact),
    Group(Group),
}

impl Target {
    /// Channel address the gateway expects for this target
    pub fn destination(&self) -> String {
        match self {
            Target::Contact(contact) => {
                let digits: String = contact.phone.chars().filter(char::is_ascii_digit).collect();
                format!("{}@c.us", digits)
            }
            Target::Group(group) => group.group_jid.clone(),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Target::Contact(contact) => contact.id,
            Target::Group(group) => group.id,
        }
    }

    pub fn contact_id(&self) -> Option<ContactId> {
        match self {
            Target::Contact(contact) => Some(contact.id),
            Target::Group(_) => None,
        }
    }

    pub fn group_id(&self) -> Option<GroupId> {
        match self {
            Target::Contact(_) => None,
            Target::Group(group) => Some(group.id),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Target::Contact(_) => "contact",
            Target::Group(_) => "group",
        }
    }
}
