//! Agent-facing resources: documents, videos, playlists and links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::datetime::bson_datetime;
use crate::normalize_email;

/// A shared resource. The variant-specific payload lives in [`ResourceBody`],
/// stored as a tagged subdocument.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct Resource {
    #[serde(rename = "_id")]
    pub id: String,
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[validate(length(min = 1, max = 100))]
    pub category: String,
    pub country: Option<String>,
    pub created_by: String,
    pub body: ResourceBody,
    #[serde(with = "bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// Variant payloads, tagged by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceBody {
    /// An uploaded file kept in external storage.
    Document { file_key: String, file_url: String },
    Video { url: String },
    /// A third-party playlist; metadata is synced from the playlist API.
    Playlist {
        playlist_id: String,
        title: Option<String>,
        item_count: Option<u32>,
        thumbnail_url: Option<String>,
    },
    Link { url: String },
}

impl ResourceBody {
    pub fn kind(&self) -> &'static str {
        match self {
            ResourceBody::Document { .. } => "document",
            ResourceBody::Video { .. } => "video",
            ResourceBody::Playlist { .. } => "playlist",
            ResourceBody::Link { .. } => "link",
        }
    }
}

impl Resource {
    pub fn new(title: String, category: String, created_by: String, body: ResourceBody) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            category,
            country: None,
            created_by: normalize_email(&created_by),
            body,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies freshly fetched playlist metadata. No-op for other variants.
    pub fn sync_playlist(
        &mut self,
        title: Option<String>,
        item_count: Option<u32>,
        thumbnail_url: Option<String>,
    ) {
        if let ResourceBody::Playlist {
            title: t,
            item_count: c,
            thumbnail_url: thumb,
            ..
        } = &mut self.body
        {
            *t = title;
            *c = item_count;
            *thumb = thumbnail_url;
            self.touch();
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_kind_tags_match_variants() {
        let doc = ResourceBody::Document {
            file_key: "guides/visa.pdf".to_string(),
            file_url: "https://files.example/guides/visa.pdf".to_string(),
        };
        assert_eq!(doc.kind(), "document");

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["kind"], "document");
        assert_eq!(json["file_key"], "guides/visa.pdf");
    }

    #[test]
    fn playlist_sync_updates_metadata() {
        let mut resource = Resource::new(
            "Orientation videos".to_string(),
            "onboarding".to_string(),
            "admin@portal.example".to_string(),
            ResourceBody::Playlist {
                playlist_id: "PL123".to_string(),
                title: None,
                item_count: None,
                thumbnail_url: None,
            },
        );

        resource.sync_playlist(Some("Welcome".to_string()), Some(12), None);

        match &resource.body {
            ResourceBody::Playlist {
                title, item_count, ..
            } => {
                assert_eq!(title.as_deref(), Some("Welcome"));
                assert_eq!(*item_count, Some(12));
            }
            other => panic!("unexpected body: {:?}", other),
        }
    }

    #[test]
    fn sync_leaves_other_variants_alone() {
        let mut resource = Resource::new(
            "Visa guide".to_string(),
            "documents".to_string(),
            "admin@portal.example".to_string(),
            ResourceBody::Link {
                url: "https://example.com/visa".to_string(),
            },
        );
        let before = resource.body.clone();

        resource.sync_playlist(Some("ignored".to_string()), Some(1), None);
        assert_eq!(resource.body, before);
    }
}
