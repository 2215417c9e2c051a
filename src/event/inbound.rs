//! Canonical inbound event record

use serde::{Deserialize, Serialize};

/// Kind of message, derived from the numeric type code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Plain text
    Text,
    /// Picture
    Image,
    /// Voice clip
    Voice,
    /// Shared contact card
    ContactCard,
    /// Video clip
    Video,
    /// Sticker / emoticon
    Emoticon,
    /// Shared location
    Location,
    /// App message (links, files, mini programs, quotes)
    App,
    /// Voice/video call invitation
    VoipInvite,
    /// System notice
    System,
    /// A previously sent message was revoked
    Revoked,
    /// Any code not listed above
    Other(u32),
}

impl MessageKind {
    /// Numeric type code for this kind
    pub fn code(self) -> u32 {
        match self {
            MessageKind::Text => 1,
            MessageKind::Image => 3,
            MessageKind::Voice => 34,
            MessageKind::ContactCard => 42,
            MessageKind::Video => 43,
            MessageKind::Emoticon => 47,
            MessageKind::Location => 48,
            MessageKind::App => 49,
            MessageKind::VoipInvite => 50,
            MessageKind::System => 10000,
            MessageKind::Revoked => 10002,
            MessageKind::Other(code) => code,
        }
    }
}

impl From<u32> for MessageKind {
    fn from(code: u32) -> Self {
        match code {
            1 => MessageKind::Text,
            3 => MessageKind::Image,
            34 => MessageKind::Voice,
            42 => MessageKind::ContactCard,
            43 => MessageKind::Video,
            47 => MessageKind::Emoticon,
            48 => MessageKind::Location,
            49 => MessageKind::App,
            50 => MessageKind::VoipInvite,
            10000 => MessageKind::System,
            10002 => MessageKind::Revoked,
            other => MessageKind::Other(other),
        }
    }
}

/// A normalized inbound message
///
/// Built once by the normalizer and never mutated afterwards. The serialized
/// form is what subscribers receive as the `data` of each pushed message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundEvent {
    pub id: u64,
    pub ts: u32,
    pub sign: String,
    #[serde(rename = "type")]
    pub type_code: u32,
    pub xml: String,
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roomid: Option<String>,
    pub content: String,
    pub thumb: String,
    pub extra: String,
    /// The account itself was mentioned (group messages only)
    pub is_at: bool,
    /// Sent by the account itself
    pub is_self: bool,
    /// Posted in a group
    pub is_group: bool,
}

impl InboundEvent {
    /// Message kind derived from the type code
    pub fn kind(&self) -> MessageKind {
        MessageKind::from(self.type_code)
    }

    /// The conversation this event belongs to: the room for group
    /// messages, the sender otherwise
    pub fn conversation(&self) -> &str {
        self.roomid.as_deref().unwrap_or(&self.sender)
    }
}
