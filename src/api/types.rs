// Photo API payload types.
// Request and response bodies as the backend serializes them (camelCase).

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub primary_email: String,
    #[serde(default)]
    pub emails: Vec<String>,
}

/// Stored metadata for one photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub creator_email: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub description: String,
}

/// Metadata together with the photo's resource name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataWithName {
    #[serde(flatten)]
    pub metadata: Metadata,
    pub name: String,
}

/// One sample photo per tag.
pub type TagsWithSample = BTreeMap<String, MetadataWithName>;

/// Metadata sent alongside an upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataCreationRequest {
    /// Comma separated tag list.
    pub tags: String,
    pub description: String,
}

/// A photo upload.
///
/// `name` is chosen by the caller; the API stores the photo under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    pub name: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub metadata: MetadataCreationRequest,
}

/// Replacement tags and description for an existing photo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdateRequest {
    pub tags: Vec<String>,
    pub description: String,
}

impl MetadataUpdateRequest {
    /// Build an update from a comma separated tag list.
    pub fn from_tag_list(tags: &str, description: impl Into<String>) -> Self {
        Self {
            tags: split_tags(tags),
            description: description.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub token: String,
}

/// Split a comma separated tag list, dropping blanks.
pub fn split_tags(tags: &str) -> Vec<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
