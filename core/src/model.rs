use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Provider tag stamped on every record.
pub const SOURCE_TAG: &str = "pixabay";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    #[default]
    Image,
    Video,
}

impl MediaKind {
    /// Lenient parse for query strings: anything but "video" is an image.
    pub fn parse_lenient(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("video") { MediaKind::Video } else { MediaKind::Image }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub src: String,
    pub thumb: String,
    pub title: String,
    /// Stored flattened as a single ", "-delimited string.
    #[serde(serialize_with = "join_tags", deserialize_with = "split_tags")]
    pub tags: Vec<String>,
    pub width: u32,
    pub height: u32,
    pub author: String,
    pub source: String,
    pub source_page: String,
    /// Epoch millis of the first normalization of this id.
    pub created_at: i64,
}

fn join_tags<S: Serializer>(tags: &[String], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&tags.join(", "))
}

fn split_tags<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(crate::tokenizer::split_tags(&raw))
}

/// One raw hit as returned by the media provider. Every field is optional; the
/// normalizer decides the fallbacks.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawHit {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default, rename = "pageURL")]
    pub page_url: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default, rename = "previewURL")]
    pub preview_url: Option<String>,
    #[serde(default, rename = "webformatURL")]
    pub webformat_url: Option<String>,
    #[serde(default, rename = "largeImageURL")]
    pub large_image_url: Option<String>,
    #[serde(default, rename = "imageWidth")]
    pub image_width: Option<u32>,
    #[serde(default, rename = "imageHeight")]
    pub image_height: Option<u32>,
    #[serde(default, rename = "webformatWidth")]
    pub webformat_width: Option<u32>,
    #[serde(default, rename = "webformatHeight")]
    pub webformat_height: Option<u32>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub videos: Option<VideoVariants>,
    /// String or number depending on the endpoint version.
    #[serde(default)]
    pub picture_id: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoVariants {
    #[serde(default)]
    pub large: Option<VideoVariant>,
    #[serde(default)]
    pub medium: Option<VideoVariant>,
    #[serde(default)]
    pub small: Option<VideoVariant>,
    #[serde(default)]
    pub tiny: Option<VideoVariant>,
}

impl VideoVariants {
    /// Variants in descending quality order.
    pub fn by_quality(&self) -> impl Iterator<Item = &VideoVariant> {
        [&self.large, &self.medium, &self.small, &self.tiny].into_iter().flatten()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoVariant {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub thumbnail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_wire_names() {
        let rec = MediaRecord {
            id: "1".into(),
            kind: MediaKind::Video,
            src: "s".into(),
            thumb: "t".into(),
            title: "Forest".into(),
            tags: vec!["forest".into(), "trees".into()],
            width: 0,
            height: 0,
            author: "unknown".into(),
            source: SOURCE_TAG.into(),
            source_page: "p".into(),
            created_at: 7,
        };
        let json = serde_json::to_value(&rec).unwrap();
        assert_eq!(json["type"], "video");
        assert_eq!(json["tags"], "forest, trees");
        assert_eq!(json["sourcePage"], "p");
        assert_eq!(json["createdAt"], 7);
        let back: MediaRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn kind_parse_defaults_to_image() {
        assert_eq!(MediaKind::parse_lenient("VIDEO"), MediaKind::Video);
        assert_eq!(MediaKind::parse_lenient("gif"), MediaKind::Image);
    }
}
