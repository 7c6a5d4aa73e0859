//! Upload Notification Events
//!
//! S3-style notification batches. Object keys arrive form-encoded
//! (`+` for space, `%XX` escapes) and are decoded before use.

use crate::PipelineError;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

/// A batch of upload notifications
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationBatch {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

/// One stored-object notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketRef,
    pub object: ObjectRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectRef {
    /// Form-encoded object key
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Decoded bucket and key of an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl NotificationBatch {
    /// Parse a batch from its JSON form
    pub fn from_json(bytes: &[u8]) -> Result<Self, PipelineError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl NotificationRecord {
    /// Location of the uploaded object, with its key decoded
    pub fn location(&self) -> Result<ObjectLocation, PipelineError> {
        Ok(ObjectLocation {
            bucket: self.s3.bucket.name.clone(),
            key: decode_key(&self.s3.object.key)?,
        })
    }
}

/// Decode a form-encoded object key
pub fn decode_key(raw: &str) -> Result<String, PipelineError> {
    let spaced = raw.replace('+', " ");
    let decoded = percent_decode_str(&spaced)
        .decode_utf8()
        .map_err(|e| PipelineError::InvalidKey(format!("{raw:?}: {e}")))?;
    if decoded.is_empty() {
        return Err(PipelineError::InvalidKey(format!("{raw:?}: empty key")));
    }
    Ok(decoded.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "Records": [
            {
                "eventVersion": "2.1",
                "eventName": "ObjectCreated:Put",
                "s3": {
                    "bucket": { "name": "sleep-lab", "arn": "arn:aws:s3:::sleep-lab" },
                    "object": { "key": "night+1/subject%281%29.edf", "size": 4096 }
                }
            }
        ]
    }"#;

    #[test]
    fn test_parse_batch() {
        let batch = NotificationBatch::from_json(SAMPLE.as_bytes()).unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].s3.object.size, Some(4096));

        let location = batch.records[0].location().unwrap();
        assert_eq!(
            location,
            ObjectLocation {
                bucket: "sleep-lab".into(),
                key: "night 1/subject(1).edf".into(),
            }
        );
    }

    #[test]
    fn test_decode_key() {
        assert_eq!(decode_key("a+b%2Bc.edf").unwrap(), "a b+c.edf");
        assert_eq!(decode_key("plain.edf").unwrap(), "plain.edf");
        assert!(decode_key("%FF%FE.edf").is_err());
        assert!(decode_key("").is_err());
    }

    #[test]
    fn test_empty_and_malformed_batches() {
        assert!(NotificationBatch::from_json(b"{}").unwrap().records.is_empty());
        assert!(matches!(
            NotificationBatch::from_json(br#"{"Records": [{"s3": {}}]}"#),
            Err(PipelineError::Event(_))
        ));
    }
}
