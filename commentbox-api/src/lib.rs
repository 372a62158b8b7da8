use std::fmt;

use chrono::Utc;

pub use uuid::Uuid;
pub type Time = chrono::DateTime<Utc>;

mod backend;
pub use backend::Backend;

mod error;
pub use error::Error;

mod response;
pub use response::{ApiResponse, ErrorPayload};

/// Collection endpoint, relative to the server host
pub const COMMENTS_PATH: &str = "/api/comments";

/// Prefix of the ids handed out to comments not yet confirmed by the server
pub const PLACEHOLDER_PREFIX: &str = "pending-";

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, serde::Serialize)]
#[serde(transparent)]
pub struct CommentId(pub String);

impl CommentId {
    pub fn placeholder() -> CommentId {
        CommentId(format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4()))
    }

    pub fn is_placeholder(&self) -> bool {
        self.0.starts_with(PLACEHOLDER_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CommentId {
    fn from(s: &str) -> CommentId {
        CommentId(String::from(s))
    }
}

// Some servers hand out numeric ids, keep them as opaque strings
impl<'de> serde::Deserialize<'de> for CommentId {
    fn deserialize<D>(deserializer: D) -> Result<CommentId, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Str(String),
            Int(i64),
        }
        Ok(
            match <RawId as serde::Deserialize>::deserialize(deserializer)? {
                RawId::Str(s) => CommentId(s),
                RawId::Int(i) => CommentId(i.to_string()),
            },
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id", alias = "id")]
    pub id: CommentId,
    pub author: String,

    /// Raw markdown, rendered only for display
    pub text: String,

    pub created_at: Time,
    pub updated_at: Time,
}

impl Comment {
    /// Local stand-in for a comment the server has not confirmed yet
    pub fn placeholder(author: String, text: String, now: Time) -> Comment {
        Comment {
            id: CommentId::placeholder(),
            author,
            text,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn avatar_url(&self) -> String {
        format!("https://picsum.photos/70?random={}", self.id)
    }
}

/// Request body of both create and update
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct NewComment {
    pub author: String,
    pub text: String,
}

impl NewComment {
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> NewComment {
        NewComment {
            author: author.into(),
            text: text.into(),
        }
    }

    pub fn is_complete(&self) -> bool {
        !self.author.is_empty() && !self.text.is_empty()
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.author.is_empty() {
            return Err(Error::new("author must not be empty"));
        }
        if self.text.is_empty() {
            return Err(Error::new("text must not be empty"));
        }
        Ok(())
    }
}
