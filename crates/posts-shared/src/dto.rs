//! Data Transfer Objects - request types for the API.

use serde::{Deserialize, Deserializer, Serialize};

/// Request body for creating or updating a post: `{"post": {...}}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRequest {
    pub post: PostParams,
}

/// Permitted post attributes.
///
/// Only `title` and `content` are read from the client; any other key in the
/// `post` object is dropped during deserialization. Each field distinguishes
/// "absent" (`None`) from an explicit `null` (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostParams {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<Option<String>>,
}

/// Form-encoded request body: `post[title]=...&post[content]=...`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostForm {
    #[serde(rename = "post[title]", default, deserialize_with = "present")]
    pub title: Option<Option<String>>,
    #[serde(rename = "post[content]", default, deserialize_with = "present")]
    pub content: Option<Option<String>>,
}

impl PostForm {
    /// The submitted post attributes, or `None` when the form carries no
    /// `post[...]` key at all.
    pub fn into_params(self) -> Option<PostParams> {
        if self.title.is_none() && self.content.is_none() {
            return None;
        }
        Some(PostParams {
            title: self.title,
            content: self.content,
        })
    }
}

/// Marks a field as submitted, keeping `null` distinguishable from a missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
