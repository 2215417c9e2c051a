//! Frames delivered to subscribers

use std::sync::Arc;

use bytes::Bytes;

use crate::event::InboundEvent;

use super::error::FrameError;

/// One event ready for delivery
///
/// Cheap to clone: the event sits behind an `Arc` and the encoded payload
/// is a reference-counted `Bytes`.
#[derive(Debug, Clone)]
pub struct EventFrame {
    /// The event itself
    pub event: Arc<InboundEvent>,
    /// JSON encoding of `event`
    pub payload: Bytes,
}

impl EventFrame {
    /// Encode an event into a frame
    pub fn encode(event: InboundEvent) -> Result<Self, FrameError> {
        let payload = serde_json::to_vec(&event).map_err(|source| FrameError {
            id: event.id,
            source,
        })?;

        Ok(Self {
            event: Arc::new(event),
            payload: Bytes::from(payload),
        })
    }

    /// The JSON payload as text
    pub fn json(&self) -> &str {
        // serde_json only ever produces UTF-8
        std::str::from_utf8(&self.payload).unwrap_or_default()
    }

    /// ID of the carried event
    pub fn id(&self) -> u64 {
        self.event.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Normalizer, RawMessage};

    #[test]
    fn test_encode_shares_payload() {
        let event = Normalizer::new("wxid_self")
            .normalize(&RawMessage::text(3, "wxid_a", "hello"))
            .unwrap();

        let frame = EventFrame::encode(event).unwrap();
        let copy = frame.clone();

        assert_eq!(frame.id(), 3);
        assert!(Arc::ptr_eq(&frame.event, &copy.event));
        assert_eq!(frame.payload.as_ptr(), copy.payload.as_ptr());

        let parsed: serde_json::Value = serde_json::from_str(frame.json()).unwrap();
        assert_eq!(parsed["content"], "hello");
        assert_eq!(parsed["id"], 3);
    }
}
