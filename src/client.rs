//! Protocol client seam: the lookups the sync handlers make back into the
//! live connection.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Profile picture resolution tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PictureType {
    #[default]
    Preview,
    Image,
}

impl PictureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preview => "preview",
            Self::Image => "image",
        }
    }
}

impl std::str::FromStr for PictureType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "preview" => Ok(Self::Preview),
            "image" => Ok(Self::Image),
            other => anyhow::bail!("unknown picture type '{}'", other),
        }
    }
}

#[async_trait]
pub trait ProtocolClient: Send + Sync {
    /// URL of the profile picture for `jid`, or `None` when it has none.
    async fn profile_picture_url(&self, jid: &str, kind: PictureType)
    -> anyhow::Result<Option<String>>;
}

/// Stand-in when no live connection is attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopClient;

#[async_trait]
impl ProtocolClient for NoopClient {
    async fn profile_picture_url(&self, _jid: &str, _kind: PictureType) -> anyhow::Result<Option<String>> {
        Ok(None)
    }
}
