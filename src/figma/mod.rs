//! Figma upstream: document shapes and the REST client.

pub mod client;
pub mod types;

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;

pub use client::FigmaClient;
pub use types::{FigmaFile, Node, NodeType, PublishedComponent};

/// The upstream fetches the converter makes beyond the document itself.
///
/// Every call is best-effort from the converter's point of view: a failure
/// leaves the corresponding section of the context unset.
#[async_trait]
pub trait DesignSource: Send + Sync {
    /// Local variables and collections of a file.
    async fn local_variables(&self, file_key: &str) -> Result<types::LocalVariablesMeta>;

    /// Published components of a team.
    async fn team_components(&self, team_id: &str) -> Result<Vec<PublishedComponent>>;

    /// Image reference to download URL, for every image fill in a file.
    async fn image_fills(&self, file_key: &str) -> Result<HashMap<String, String>>;
}
