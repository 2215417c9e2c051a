//! Raw message normalization

use thiserror::Error;

use super::inbound::InboundEvent;
use super::raw::RawMessage;

const GROUP_SUFFIX: &str = "@chatroom";
const AT_LIST_OPEN: &str = "<atuserlist>";
const AT_LIST_CLOSE: &str = "</atuserlist>";
const MENTION_ALL: [&str; 3] = ["@所有人", "@all", "@All"];

/// Why a raw message could not be normalized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    /// Message ID was zero
    #[error("message has no id")]
    MissingId,
    /// Sender was empty
    #[error("message {0} has no sender")]
    MissingSender(u64),
}

/// Converts raw client messages into [`InboundEvent`]s
///
/// Holds the account's own identifier, captured once at startup, which is
/// needed to decide whether a group message mentions the account.
#[derive(Debug, Clone)]
pub struct Normalizer {
    self_id: String,
}

impl Normalizer {
    /// Create a normalizer for the given account
    pub fn new(self_id: impl Into<String>) -> Self {
        Self {
            self_id: self_id.into(),
        }
    }

    /// The account identifier used for mention detection
    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    /// Normalize one raw message
    pub fn normalize(&self, raw: &RawMessage) -> Result<InboundEvent, NormalizationError> {
        if raw.id == 0 {
            return Err(NormalizationError::MissingId);
        }
        if raw.sender.is_empty() {
            return Err(NormalizationError::MissingSender(raw.id));
        }

        let is_group = raw.is_group || raw.roomid.ends_with(GROUP_SUFFIX);
        let is_at = is_group && self.mentions_self(raw);
        let roomid = if raw.roomid.is_empty() {
            None
        } else {
            Some(raw.roomid.clone())
        };

        Ok(InboundEvent {
            id: raw.id,
            ts: raw.ts,
            sign: raw.sign.clone(),
            type_code: raw.type_code,
            xml: raw.xml.clone(),
            sender: raw.sender.clone(),
            roomid,
            content: raw.content.clone(),
            thumb: raw.thumb.clone(),
            extra: raw.extra.clone(),
            is_at,
            is_self: raw.is_self,
            is_group,
        })
    }

    /// Whether the mention list names this account
    ///
    /// A mention-all in the text does not count as a personal mention. An
    /// unterminated list mentions nobody.
    fn mentions_self(&self, raw: &RawMessage) -> bool {
        let Some(start) = raw.xml.find(AT_LIST_OPEN) else {
            return false;
        };
        let body = &raw.xml[start + AT_LIST_OPEN.len()..];
        let Some(end) = body.find(AT_LIST_CLOSE) else {
            tracing::debug!(id = raw.id, "Unterminated mention list");
            return false;
        };

        if self.self_id.is_empty() || !body[..end].contains(&self.self_id) {
            return false;
        }

        !MENTION_ALL.iter().any(|m| raw.content.contains(m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SELF_ID: &str = "wxid_self";

    fn at_xml(ids: &str) -> String {
        format!("<msgsource><atuserlist><![CDATA[{}]]></atuserlist></msgsource>", ids)
    }

    #[test]
    fn test_direct_message() {
        let normalizer = Normalizer::new(SELF_ID);
        let raw = RawMessage::text(1, "wxid_friend", "hi").at(100);

        let event = normalizer.normalize(&raw).unwrap();
        assert_eq!(event.id, 1);
        assert_eq!(event.ts, 100);
        assert_eq!(event.content, "hi");
        assert_eq!(event.roomid, None);
        assert!(!event.is_group);
        assert!(!event.is_at);
        assert!(!event.is_self);
    }

    #[test]
    fn test_group_detected_from_roomid() {
        let normalizer = Normalizer::new(SELF_ID);
        let mut raw = RawMessage::text(2, "wxid_friend", "hi");
        raw.roomid = "4242@chatroom".into();

        let event = normalizer.normalize(&raw).unwrap();
        assert!(event.is_group);
        assert_eq!(event.roomid.as_deref(), Some("4242@chatroom"));
    }

    #[test]
    fn test_mention_in_group() {
        let normalizer = Normalizer::new(SELF_ID);
        let raw = RawMessage::group_text(3, "1@chatroom", "wxid_friend", "@me look")
            .with_xml(at_xml("wxid_other,wxid_self"));

        assert!(normalizer.normalize(&raw).unwrap().is_at);
    }

    #[test]
    fn test_mention_all_is_not_personal() {
        let normalizer = Normalizer::new(SELF_ID);
        let raw = RawMessage::group_text(4, "1@chatroom", "wxid_friend", "@所有人 meeting")
            .with_xml(at_xml("wxid_self"));

        assert!(!normalizer.normalize(&raw).unwrap().is_at);
    }

    #[test]
    fn test_mention_outside_group_ignored() {
        let normalizer = Normalizer::new(SELF_ID);
        let raw = RawMessage::text(5, "wxid_friend", "hi").with_xml(at_xml("wxid_self"));

        assert!(!normalizer.normalize(&raw).unwrap().is_at);
    }

    #[test]
    fn test_other_member_mentioned() {
        let normalizer = Normalizer::new(SELF_ID);
        let raw = RawMessage::group_text(6, "1@chatroom", "wxid_friend", "@bob")
            .with_xml(at_xml("wxid_bob"));

        assert!(!normalizer.normalize(&raw).unwrap().is_at);
    }

    #[test]
    fn test_self_flag_carried() {
        let normalizer = Normalizer::new(SELF_ID);
        let raw = RawMessage::text(7, SELF_ID, "note to self").from_self();

        assert!(normalizer.normalize(&raw).unwrap().is_self);
    }

    #[test]
    fn test_missing_id() {
        let normalizer = Normalizer::new(SELF_ID);
        let raw = RawMessage::text(0, "wxid_friend", "hi");

        assert_eq!(
            normalizer.normalize(&raw),
            Err(NormalizationError::MissingId)
        );
    }

    #[test]
    fn test_missing_sender() {
        let normalizer = Normalizer::new(SELF_ID);
        let raw = RawMessage::text(8, "", "hi");

        assert_eq!(
            normalizer.normalize(&raw),
            Err(NormalizationError::MissingSender(8))
        );
    }

    #[test]
    fn test_unterminated_at_list() {
        let normalizer = Normalizer::new(SELF_ID);
        let raw = RawMessage::group_text(9, "1@chatroom", "wxid_friend", "hi")
            .with_xml("<msgsource><atuserlist>wxid_self");

        let event = normalizer.normalize(&raw).unwrap();
        assert_eq!(event.id, 9);
        assert!(event.is_group);
        assert!(!event.is_at);
    }
}
