use serde::Deserialize;
use serde_json::Value;

use crate::models::signal::PayoutTable;
use crate::models::{FeedEvent, RawSignal};

/// Outer shape of every feed frame: `{"type": ..., "data": {...}}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Message kinds the client understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    PayoutUpdate,
    DivAlert,
    Other,
}

impl FrameKind {
    pub fn from_type(kind: &str) -> Self {
        match kind {
            "pocketoptions" | "payout_update" => FrameKind::PayoutUpdate,
            "div_alert" => FrameKind::DivAlert,
            _ => FrameKind::Other,
        }
    }
}

/// Decode and classify one text frame.
///
/// `Ok(None)` for well-formed frames of a type the client ignores; `Err` for
/// anything that is not JSON or whose payload does not fit its declared type.
pub fn decode_frame(text: &str) -> Result<Option<FeedEvent>, serde_json::Error> {
    let envelope: Envelope = serde_json::from_str(text)?;
    let data = if envelope.data.is_null() {
        Value::Object(Default::default())
    } else {
        envelope.data
    };

    match FrameKind::from_type(&envelope.kind) {
        FrameKind::PayoutUpdate => {
            let table: PayoutTable = serde_json::from_value(data)?;
            Ok(Some(FeedEvent::PayoutUpdate(table.pairs)))
        }
        FrameKind::DivAlert => {
            let raw: RawSignal = serde_json::from_value(data)?;
            Ok(Some(FeedEvent::Signal(raw)))
        }
        FrameKind::Other => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PairPayout;

    #[test]
    fn test_payout_update_frame() {
        let event = decode_frame(
            r#"{"type":"payout_update","data":{"pairs":[{"pair":"EURUSD","payout":80}]}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            Some(FeedEvent::PayoutUpdate(vec![PairPayout {
                pair: "EURUSD".into(),
                payout: 80.0,
            }]))
        );
    }

    #[test]
    fn test_pocketoptions_alias() {
        let event = decode_frame(r#"{"type":"pocketoptions","data":{"pairs":[]}}"#).unwrap();
        assert_eq!(event, Some(FeedEvent::PayoutUpdate(vec![])));
    }

    #[test]
    fn test_div_alert_frame() {
        let event = decode_frame(
            r#"{"type":"div_alert","data":{"alert":"DIV_FORMING","symbol":"EURUSD","direction":"BUY"}}"#,
        )
        .unwrap();
        match event {
            Some(FeedEvent::Signal(raw)) => {
                assert_eq!(raw.symbol, "EURUSD");
                assert_eq!(raw.direction, "BUY");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_type_ignored() {
        assert_eq!(decode_frame(r#"{"type":"heartbeat","data":{"t":1}}"#).unwrap(), None);
        assert_eq!(decode_frame(r#"{"data":{}}"#).unwrap(), None);
    }

    #[test]
    fn test_missing_data_treated_as_empty() {
        let event = decode_frame(r#"{"type":"payout_update"}"#).unwrap();
        assert_eq!(event, Some(FeedEvent::PayoutUpdate(vec![])));
    }

    #[test]
    fn test_malformed_frames_error() {
        assert!(decode_frame("not json").is_err());
        assert!(decode_frame("[1,2,3]").is_err());
        assert!(decode_frame(r#"{"type":"payout_update","data":{"pairs":"oops"}}"#).is_err());
    }
}
