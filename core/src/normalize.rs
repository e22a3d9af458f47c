use crate::error::{CatalogError, Result};
use crate::keys::check_segment;
use crate::model::{MediaKind, MediaRecord, RawHit, SOURCE_TAG};
use crate::tokenizer::{capitalize, split_tags};

const DEFAULT_AUTHOR: &str = "unknown";

/// Maps a raw provider hit into a canonical record. Pure; `now_ms` becomes `created_at`.
pub fn normalize(hit: &RawHit, kind: MediaKind, now_ms: i64) -> Result<MediaRecord> {
    let id = hit_id(hit).ok_or_else(|| CatalogError::Validation("hit without id".into()))?;
    check_segment("id", &id)?;
    let tags = hit.tags.as_deref().map(split_tags).unwrap_or_default();
    let title = match tags.first() {
        Some(tag) => capitalize(tag),
        None => format!("{} {id}", capitalize(kind.as_str())),
    };
    let (src, thumb, width, height) = match kind {
        MediaKind::Image => image_fields(hit),
        MediaKind::Video => video_fields(hit),
    };
    Ok(MediaRecord {
        id,
        kind,
        src,
        thumb,
        title,
        tags,
        width,
        height,
        author: present(&hit.user).unwrap_or(DEFAULT_AUTHOR).to_string(),
        source: SOURCE_TAG.to_string(),
        source_page: present(&hit.page_url).unwrap_or_default().to_string(),
        created_at: now_ms,
    })
}

fn hit_id(hit: &RawHit) -> Option<String> {
    match hit.id.as_ref()? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn first_present<'a>(fields: &[&'a Option<String>]) -> Option<&'a str> {
    fields.iter().find_map(|f| present(*f))
}

fn image_fields(hit: &RawHit) -> (String, String, u32, u32) {
    let src = first_present(&[&hit.large_image_url, &hit.webformat_url, &hit.preview_url])
        .unwrap_or_default()
        .to_string();
    let thumb = first_present(&[&hit.preview_url, &hit.webformat_url])
        .map(str::to_string)
        .unwrap_or_else(|| src.clone());
    let (width, height) = match (hit.image_width, hit.image_height) {
        (Some(w), Some(h)) => (w, h),
        _ => (hit.webformat_width.unwrap_or(0), hit.webformat_height.unwrap_or(0)),
    };
    (src, thumb, width, height)
}

fn video_fields(hit: &RawHit) -> (String, String, u32, u32) {
    let variants = hit.videos.clone().unwrap_or_default();
    let best = variants.by_quality().find(|v| present(&v.url).is_some());
    let src = best.and_then(|v| present(&v.url)).unwrap_or_default().to_string();
    let width = best.and_then(|v| v.width).unwrap_or(0);
    let height = best.and_then(|v| v.height).unwrap_or(0);
    let thumb = best
        .and_then(|v| present(&v.thumbnail))
        .or_else(|| variants.by_quality().find_map(|v| present(&v.thumbnail)))
        .map(str::to_string)
        .or_else(|| picture_thumb(hit))
        .unwrap_or_default();
    (src, thumb, width, height)
}

fn picture_thumb(hit: &RawHit) -> Option<String> {
    let picture = match hit.picture_id.as_ref()? {
        serde_json::Value::String(s) if !s.is_empty() => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    Some(format!("https://i.vimeocdn.com/video/{picture}_640x360.jpg"))
}
