use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use cid::Cid;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::BlocklistError;

/// What the "block content" form submits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockData {
    /// URLs or paths describing the content being blocked.
    pub content: Vec<String>,
    /// Why the content is being blocked. May be empty.
    pub reason: String,
    /// Who requested the block.
    pub user: String,
}

/// Why, and by whom, a piece of content was blocked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlocklistItem {
    /// Normalized (CIDv1) identifier of the blocked content.
    pub hash: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: Vec<String>,
    #[serde(default)]
    pub reason: String,
    pub user: String,
}

impl BlocklistItem {
    pub fn encode(&self) -> Result<Vec<u8>, BlocklistError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BlocklistError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The two auditable operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Block,
    Unblock,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Block => "block",
            Self::Unblock => "unblock",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = BlocklistError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(Self::Block),
            "unblock" => Ok(Self::Unblock),
            other => Err(BlocklistError::InvalidActionType(other.to_string())),
        }
    }
}

impl Serialize for ActionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ActionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An auditable action a user asked us to perform. Immutable once logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Action {
    pub typ: ActionType,
    #[serde(with = "cid_list")]
    pub ids: Vec<Cid>,
    #[serde(default)]
    pub reason: String,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

impl Action {
    /// Create an action stamped with the current time.
    ///
    /// The timestamp is truncated to microseconds, the finest precision the
    /// relational store keeps.
    pub fn new(
        typ: ActionType,
        ids: Vec<Cid>,
        reason: impl Into<String>,
        user: impl Into<String>,
    ) -> Self {
        Self {
            typ,
            ids,
            reason: reason.into(),
            user: user.into(),
            created_at: Utc::now().trunc_subsecs(6),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, BlocklistError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, BlocklistError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Fail unless the action is fit to be appended to the audit log.
    pub fn validate(&self) -> Result<(), BlocklistError> {
        if self.ids.is_empty() {
            return Err(BlocklistError::EmptyAction);
        }
        Ok(())
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<String> = self.ids.iter().map(Cid::to_string).collect();
        write!(
            f,
            "{}\t {} by {}: [{}]: {}",
            self.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.typ,
            self.user,
            ids.join(" "),
            self.reason
        )
    }
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// CIDs encoded as IPLD links (`{"/": "<cid>"}`); bare strings are accepted
/// on read.
mod cid_list {
    use cid::Cid;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Link {
            #[serde(rename = "/")]
            link: String,
        },
        Plain(String),
    }

    pub fn serialize<S: Serializer>(ids: &[Cid], serializer: S) -> Result<S::Ok, S::Error> {
        let reprs: Vec<Repr> = ids
            .iter()
            .map(|id| Repr::Link {
                link: id.to_string(),
            })
            .collect();
        reprs.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Cid>, D::Error> {
        let reprs = Option::<Vec<Repr>>::deserialize(deserializer)?.unwrap_or_default();
        reprs
            .into_iter()
            .map(|repr| {
                let raw = match repr {
                    Repr::Link { link } => link,
                    Repr::Plain(raw) => raw,
                };
                Cid::try_from(raw.as_str()).map_err(serde::de::Error::custom)
            })
            .collect()
    }
}
