use super::types::{NormalizedResult, RawFormat, RawMediaInfo, VideoVariant};
use std::collections::BTreeMap;

pub const IMAGE_POST_TITLE: &str = "TikTok Image Post";

/// Shapes raw extractor output into the client-facing result. Pure, never fails.
pub fn normalize(info: &RawMediaInfo) -> NormalizedResult {
    let mut result = NormalizedResult {
        title: info.title.clone(),
        thumbnail: info.thumbnail.clone(),
        duration: info.duration.clone(),
        ..Default::default()
    };

    match &info.entries {
        Some(entries) => apply_image_post(&mut result, entries),
        None => {
            result.formats = rank_video_variants(&info.formats);
            result.mp3_url = best_audio_url(&info.formats);
        }
    }

    result
}

fn apply_image_post(result: &mut NormalizedResult, entries: &[RawMediaInfo]) {
    result.image_urls = entries
        .iter()
        .filter_map(|entry| entry.url.as_deref())
        .filter(|url| !url.is_empty())
        .map(|url| url.to_string())
        .collect();

    let first = entries.first();
    if result.title.is_none() {
        result.title = Some(
            first
                .and_then(|entry| entry.title.clone())
                .unwrap_or_else(|| IMAGE_POST_TITLE.to_string()),
        );
    }
    if result.thumbnail.is_none() {
        result.thumbnail = first.and_then(|entry| entry.thumbnail.clone());
    }
}

/// One variant per height, highest first. On a height collision the larger
/// filesize wins (missing counts as 0) and the earlier format keeps ties.
pub fn rank_video_variants(formats: &[RawFormat]) -> Vec<VideoVariant> {
    let mut best: BTreeMap<u32, &RawFormat> = BTreeMap::new();

    for format in formats.iter().filter(|f| f.is_video_with_audio()) {
        let Some(height) = format.height else {
            continue;
        };
        let larger = best.get(&height).is_none_or(|current| {
            format.filesize.unwrap_or(0) > current.filesize.unwrap_or(0)
        });
        if larger {
            best.insert(height, format);
        }
    }

    best.into_iter()
        .rev()
        .map(|(height, format)| VideoVariant {
            label: quality_label(height),
            quality: format!("{}p", height),
            url: format.url.clone(),
            filesize: format.filesize,
            format_id: format.format_id.clone(),
            ext: format.ext.clone(),
            fps: format.fps,
        })
        .collect()
}

/// URL of the audio-only format with the highest bitrate; the first one wins ties.
pub fn best_audio_url(formats: &[RawFormat]) -> Option<String> {
    let mut best: Option<&RawFormat> = None;

    for format in formats.iter().filter(|f| f.is_audio_only()) {
        let abr = format.abr.unwrap_or(0.0);
        if best.is_none_or(|current| abr > current.abr.unwrap_or(0.0)) {
            best = Some(format);
        }
    }

    best.and_then(|format| format.url.clone())
}

pub fn quality_label(height: u32) -> String {
    let tier = match height {
        h if h >= 2160 => Some("4K"),
        h if h >= 1440 => Some("2K"),
        h if h >= 1080 => Some("Full HD"),
        h if h >= 720 => Some("HD"),
        _ => None,
    };

    match tier {
        Some(tier) => format!("{}p {}", height, tier),
        None => format!("{}p", height),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn raw(value: Value) -> RawMediaInfo {
        serde_json::from_value(value).unwrap()
    }

    fn muxed(height: u32, filesize: Option<u64>, url: &str) -> Value {
        json!({
            "vcodec": "h264",
            "acodec": "aac",
            "height": height,
            "filesize": filesize,
            "url": url
        })
    }

    fn audio(abr: Option<f64>, url: &str) -> Value {
        json!({"vcodec": "none", "acodec": "mp4a.40.2", "abr": abr, "url": url})
    }

    #[test]
    fn test_quality_labels() {
        assert_eq!(quality_label(2160), "2160p 4K");
        assert_eq!(quality_label(1440), "1440p 2K");
        assert_eq!(quality_label(1080), "1080p Full HD");
        assert_eq!(quality_label(1024), "1024p HD");
        assert_eq!(quality_label(720), "720p HD");
        assert_eq!(quality_label(540), "540p");
        assert_eq!(quality_label(360), "360p");
    }

    #[test]
    fn test_height_collision_keeps_larger_filesize() {
        let ascending = raw(json!({"formats": [
            muxed(1080, Some(100), "https://v/small"),
            muxed(1080, Some(200), "https://v/large"),
        ]}));
        let descending = raw(json!({"formats": [
            muxed(1080, Some(200), "https://v/large"),
            muxed(1080, Some(100), "https://v/small"),
        ]}));

        for info in [ascending, descending] {
            let result = normalize(&info);
            assert_eq!(result.formats.len(), 1);
            assert_eq!(result.formats[0].filesize, Some(200));
            assert_eq!(result.formats[0].url.as_deref(), Some("https://v/large"));
        }
    }

    #[test]
    fn test_height_collision_missing_filesize() {
        let info = raw(json!({"formats": [
            muxed(720, None, "https://v/first"),
            muxed(720, None, "https://v/second"),
            muxed(480, None, "https://v/unsized"),
            muxed(480, Some(1), "https://v/sized"),
        ]}));

        let result = normalize(&info);
        assert_eq!(result.formats[0].url.as_deref(), Some("https://v/first"));
        assert_eq!(result.formats[1].url.as_deref(), Some("https://v/sized"));
    }

    #[test]
    fn test_formats_sorted_descending_and_unique() {
        let info = raw(json!({"formats": [
            muxed(540, Some(5), "https://v/540"),
            muxed(1080, Some(9), "https://v/1080"),
            muxed(720, Some(7), "https://v/720"),
            muxed(540, Some(6), "https://v/540b"),
            muxed(2160, Some(20), "https://v/2160"),
        ]}));

        let result = normalize(&info);
        let qualities: Vec<&str> = result.formats.iter().map(|f| f.quality.as_str()).collect();
        assert_eq!(qualities, ["2160p", "1080p", "720p", "540p"]);
        assert_eq!(result.formats[0].label, "2160p 4K");
        assert_eq!(result.formats[3].url.as_deref(), Some("https://v/540b"));
    }

    #[test]
    fn test_formats_without_height_or_audio_are_dropped() {
        let info = raw(json!({"formats": [
            {"vcodec": "h264", "acodec": "aac", "url": "https://v/no-height", "format_note": "HD"},
            {"vcodec": "h264", "acodec": "none", "height": 1080, "url": "https://v/silent"},
            muxed(360, None, "https://v/360"),
        ]}));

        let result = normalize(&info);
        assert_eq!(result.formats.len(), 1);
        assert_eq!(result.formats[0].quality, "360p");
        assert_eq!(result.formats[0].label, "360p");
    }

    #[test]
    fn test_variant_carries_format_details() {
        let info = raw(json!({"formats": [{
            "format_id": "bytevc1_1080p_60",
            "ext": "mp4",
            "vcodec": "h265",
            "acodec": "aac",
            "height": 1080,
            "fps": 60,
            "filesize": 12345,
            "url": "https://v/hd"
        }]}));

        let variant = &normalize(&info).formats[0];
        assert_eq!(variant.format_id.as_deref(), Some("bytevc1_1080p_60"));
        assert_eq!(variant.ext.as_deref(), Some("mp4"));
        assert_eq!(variant.fps, Some(60.0));
        assert_eq!(variant.filesize, Some(12345));
    }

    #[test]
    fn test_mp3_url_highest_bitrate() {
        let info = raw(json!({"formats": [
            audio(Some(128.0), "https://a/128"),
            audio(Some(320.0), "https://a/320"),
            audio(Some(64.0), "https://a/64"),
        ]}));

        assert_eq!(normalize(&info).mp3_url.as_deref(), Some("https://a/320"));
    }

    #[test]
    fn test_mp3_url_missing_bitrates_takes_first() {
        let info = raw(json!({"formats": [
            muxed(720, None, "https://v/720"),
            audio(None, "https://a/first"),
            audio(None, "https://a/second"),
        ]}));

        assert_eq!(normalize(&info).mp3_url.as_deref(), Some("https://a/first"));
    }

    #[test]
    fn test_empty_formats() {
        let result = normalize(&raw(json!({"title": "clip", "formats": []})));
        assert!(result.formats.is_empty());
        assert_eq!(result.mp3_url, None);
        assert!(result.image_urls.is_empty());
        assert_eq!(result.title.as_deref(), Some("clip"));

        let serialized = serde_json::to_value(&result).unwrap();
        assert_eq!(serialized["formats"], json!([]));
        assert_eq!(serialized["mp3_url"], Value::Null);
    }

    #[test]
    fn test_empty_object_degrades() {
        let result = normalize(&raw(json!({})));
        assert_eq!(result, NormalizedResult::default());
    }

    #[test]
    fn test_image_post_collects_urls_in_order() {
        let info = raw(json!({
            "formats": [muxed(1080, Some(1), "https://v/ignored")],
            "entries": [
                {"url": "https://img/1.jpeg", "title": "first slide", "thumbnail": "https://t/1"},
                {"title": "no url"},
                {"url": "https://img/2.jpeg"},
                {"url": "https://img/1.jpeg"},
            ]
        }));

        let result = normalize(&info);
        assert_eq!(
            result.image_urls,
            ["https://img/1.jpeg", "https://img/2.jpeg", "https://img/1.jpeg"]
        );
        assert!(result.formats.is_empty());
        assert_eq!(result.mp3_url, None);
        assert_eq!(result.title.as_deref(), Some("first slide"));
        assert_eq!(result.thumbnail.as_deref(), Some("https://t/1"));
    }

    #[test]
    fn test_image_post_prefers_top_level_metadata() {
        let info = raw(json!({
            "title": "post",
            "thumbnail": "https://t/top",
            "entries": [{"url": "https://img/1", "title": "slide", "thumbnail": "https://t/1"}]
        }));

        let result = normalize(&info);
        assert_eq!(result.title.as_deref(), Some("post"));
        assert_eq!(result.thumbnail.as_deref(), Some("https://t/top"));
    }

    #[test]
    fn test_image_post_title_placeholder() {
        let untitled = normalize(&raw(json!({"entries": [{"url": "https://img/1"}]})));
        assert_eq!(untitled.title.as_deref(), Some(IMAGE_POST_TITLE));
        assert_eq!(untitled.thumbnail, None);

        let empty = normalize(&raw(json!({"entries": []})));
        assert_eq!(empty.title.as_deref(), Some(IMAGE_POST_TITLE));
        assert!(empty.image_urls.is_empty());
    }
}
