use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// Metadata as reported by the extractor. Every field is optional: a value
/// of the wrong JSON type is treated as absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawMediaInfo {
    #[serde(deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub thumbnail: Option<String>,
    /// Kept as the extractor's number so integers stay integers.
    #[serde(deserialize_with = "lenient_number")]
    pub duration: Option<Number>,
    #[serde(deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient_formats")]
    pub formats: Vec<RawFormat>,
    /// Present only for multi-item (slideshow) posts.
    #[serde(deserialize_with = "lenient_entries")]
    pub entries: Option<Vec<RawMediaInfo>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFormat {
    #[serde(deserialize_with = "lenient_string")]
    pub format_id: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub ext: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub vcodec: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub acodec: Option<String>,
    #[serde(deserialize_with = "lenient_u32")]
    pub height: Option<u32>,
    #[serde(deserialize_with = "lenient_f64")]
    pub fps: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub abr: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub url: Option<String>,
    #[serde(deserialize_with = "lenient_u64")]
    pub filesize: Option<u64>,
}

impl RawFormat {
    fn codec_present(codec: &Option<String>) -> bool {
        codec.as_deref() != Some("none")
    }

    /// Muxed stream with a known height.
    pub fn is_video_with_audio(&self) -> bool {
        Self::codec_present(&self.vcodec)
            && Self::codec_present(&self.acodec)
            && self.height.is_some_and(|h| h > 0)
    }

    pub fn is_audio_only(&self) -> bool {
        !Self::codec_present(&self.vcodec) && Self::codec_present(&self.acodec)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoVariant {
    pub label: String,
    pub quality: String,
    pub url: Option<String>,
    pub filesize: Option<u64>,
    pub format_id: Option<String>,
    pub ext: Option<String>,
    pub fps: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NormalizedResult {
    pub title: Option<String>,
    pub thumbnail: Option<String>,
    pub duration: Option<Number>,
    pub formats: Vec<VideoVariant>,
    pub mp3_url: Option<String>,
    pub image_urls: Vec<String>,
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_str().map(|s| s.to_string()))
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_f64())
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<Number>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(number) => Ok(Some(number)),
        _ => Ok(None),
    }
}

fn as_whole_u64(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_whole_u64(&value))
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(as_whole_u64(&value).and_then(|v| u32::try_from(v).ok()))
}

fn lenient_formats<'de, D>(deserializer: D) -> Result<Vec<RawFormat>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(objects(value)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_entries<'de, D>(deserializer: D) -> Result<Option<Vec<RawMediaInfo>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_array() {
        return Ok(None);
    }
    Ok(Some(
        objects(value)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
    ))
}

/// Object items of a JSON array; anything else yields nothing.
fn objects(value: Value) -> impl Iterator<Item = Value> {
    let items = match value {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    items.into_iter().filter(Value::is_object)
}
