//! Mini-app context: the start payload record and its URL-safe token codec.

pub mod start_param;

pub use start_param::{decode_start_param, encode_start_param};

use serde::{Deserialize, Serialize};

/// Bank attached to a forum topic, as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankRef {
    pub id: i64,
    pub name: String,
}

/// Context a mini-app session is opened with: where the request came from
/// and which forum topic the published message must land in.
///
/// Created once per `/add` interaction, carried through the deep link's
/// `startapp` parameter, consumed exactly once by the publish endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPayload {
    pub chat_id: i64,
    pub thread_id: i64,
    pub chat_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank: Option<BankRef>,
}
