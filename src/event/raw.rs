//! Raw messages as produced by the messaging client

/// A message exactly as the client decoded it
///
/// Nothing here is validated; empty strings stand for absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// Client-assigned message ID
    pub id: u64,
    /// Unix timestamp in seconds
    pub ts: u32,
    /// Message signature
    pub sign: String,
    /// Numeric message type code
    pub type_code: u32,
    /// Raw protocol payload (XML)
    pub xml: String,
    /// Sender identifier
    pub sender: String,
    /// Room identifier, empty for direct messages
    pub roomid: String,
    /// Text content
    pub content: String,
    /// Thumbnail path
    pub thumb: String,
    /// Extra attachment path
    pub extra: String,
    /// Whether the account itself sent this message
    pub is_self: bool,
    /// Whether the client flagged this as a group message
    pub is_group: bool,
}

impl RawMessage {
    /// Create a direct text message
    pub fn text(id: u64, sender: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id,
            type_code: 1,
            sender: sender.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create a text message posted in a group
    pub fn group_text(
        id: u64,
        roomid: impl Into<String>,
        sender: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id,
            type_code: 1,
            roomid: roomid.into(),
            sender: sender.into(),
            content: content.into(),
            is_group: true,
            ..Default::default()
        }
    }

    /// Set the timestamp
    pub fn at(mut self, ts: u32) -> Self {
        self.ts = ts;
        self
    }

    /// Set the raw XML payload
    pub fn with_xml(mut self, xml: impl Into<String>) -> Self {
        self.xml = xml.into();
        self
    }

    /// Mark as sent by the account itself
    pub fn from_self(mut self) -> Self {
        self.is_self = true;
        self
    }
}
