//! The outbound message projection returned by the history endpoint.

use serde::{Deserialize, Serialize};

/// One message from a channel's history, reshaped for bridge consumers.
///
/// `sender` holds the author's resolved display name, not the raw Slack user
/// ID. `time` is the platform-native timestamp string, preserved verbatim so
/// callers can feed it back as a range bound.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMessage {
    pub text: String,
    pub sender: String,
    pub time: String,
    /// Replies in the message's thread, oldest first. Empty for unthreaded
    /// messages. The thread parent itself is not repeated here.
    pub thread: Vec<ThreadReply>,
}

/// One reply inside a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadReply {
    pub text: String,
    pub sender: String,
    pub time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_message_json_shape() {
        let message = ChannelMessage {
            text: "hi".to_owned(),
            sender: "alice".to_owned(),
            time: "1.0".to_owned(),
            thread: Vec::new(),
        };

        let json = serde_json::to_string(&message).expect("serializes");
        assert_eq!(
            json,
            r#"{"text":"hi","sender":"alice","time":"1.0","thread":[]}"#
        );
    }

    #[test]
    fn test_thread_reply_has_no_nested_thread() {
        let reply = ThreadReply {
            text: "pong".to_owned(),
            sender: "bob".to_owned(),
            time: "2.0".to_owned(),
        };

        let json = serde_json::to_value(&reply).expect("serializes");
        assert!(json.get("thread").is_none());
    }
}
