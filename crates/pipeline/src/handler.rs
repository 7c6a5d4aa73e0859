//! Upload Event Handler
//!
//! For every notification record: download the EDF into scratch, build its
//! report on a blocking task, and upload the report next to the source
//! bucket. Records run one after another; the first failure ends the batch.

use crate::config::PipelineConfig;
use crate::event::{NotificationBatch, NotificationRecord, ObjectLocation};
use crate::PipelineError;
use report_builder::{ReportBuilder, REPORT_SUFFIX};
use serde::Serialize;
use std::sync::Arc;
use storage::{ObjectStore, StorageGateway};
use tracing::{error, info};
use uuid::Uuid;

/// Outcome of one successfully processed record
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedRecord {
    pub request_id: String,
    pub source: ObjectLocation,
    pub destination: ObjectLocation,
}

/// Handles upload notification batches
pub struct EventHandler {
    gateway: StorageGateway,
    builder: Arc<ReportBuilder>,
    destination_suffix: String,
}

impl EventHandler {
    pub fn new(gateway: StorageGateway, builder: ReportBuilder, destination_suffix: impl Into<String>) -> Self {
        Self {
            gateway,
            builder: Arc::new(builder),
            destination_suffix: destination_suffix.into(),
        }
    }

    /// Wire a handler from configuration around an injected store
    pub fn from_config(config: &PipelineConfig, store: Arc<dyn ObjectStore>) -> Self {
        let gateway = StorageGateway::new(store, &config.scratch_dir);
        let builder = ReportBuilder::new(&config.scratch_dir, config.builder_config());
        Self::new(gateway, builder, config.destination_suffix.clone())
    }

    /// Where the report for a source object is stored
    pub fn destination_for(&self, source: &ObjectLocation) -> ObjectLocation {
        ObjectLocation {
            bucket: format!("{}{}", source.bucket, self.destination_suffix),
            key: format!("{}{}", source.key, REPORT_SUFFIX),
        }
    }

    /// Process every record of a batch in order
    pub async fn handle(&self, batch: &NotificationBatch) -> Result<Vec<ProcessedRecord>, PipelineError> {
        info!("Handling batch of {} records", batch.records.len());
        let mut processed = Vec::with_capacity(batch.records.len());
        for record in &batch.records {
            match self.process_record(record).await {
                Ok(done) => {
                    metrics::counter!("edf_reports_written").increment(1);
                    processed.push(done);
                }
                Err(e) => {
                    metrics::counter!("edf_records_failed").increment(1);
                    error!("Record for {}/{} failed: {}", record.s3.bucket.name, record.s3.object.key, e);
                    return Err(e);
                }
            }
        }
        Ok(processed)
    }

    /// Download, analyze, and upload the report for one record
    pub async fn process_record(&self, record: &NotificationRecord) -> Result<ProcessedRecord, PipelineError> {
        let source = record.location()?;
        let request_id = Uuid::new_v4().to_string();
        info!("Request {}: {}/{}", request_id, source.bucket, source.key);

        let input = self.gateway.download(&source.bucket, &source.key).await?;

        let builder = Arc::clone(&self.builder);
        let analysis = tokio::task::spawn_blocking({
            let request_id = request_id.clone();
            let input = input.clone();
            move || builder.analyze(&request_id, &input)
        })
        .await;
        self.gateway.discard(&input).await;
        let report_path = analysis.map_err(|e| PipelineError::Task(e.to_string()))??;

        let destination = self.destination_for(&source);
        let uploaded = self
            .gateway
            .upload(&report_path, &destination.bucket, &destination.key)
            .await;
        self.gateway.discard(&report_path).await;
        uploaded?;

        Ok(ProcessedRecord {
            request_id,
            source,
            destination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edf_format::EdfWriter;
    use report_builder::{BuilderConfig, Report};
    use storage::MemoryObjectStore;

    fn sine(freq: f64, rate: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| (2.0 * std::f64::consts::PI * freq * i as f64 / rate).sin())
            .collect()
    }

    fn edf_bytes(writer: EdfWriter) -> Vec<u8> {
        let mut bytes = Vec::new();
        writer.write_to(&mut bytes).unwrap();
        bytes
    }

    fn batch(records: &[(&str, &str)]) -> NotificationBatch {
        let records: Vec<_> = records
            .iter()
            .map(|(bucket, key)| {
                serde_json::json!({"s3": {"bucket": {"name": bucket}, "object": {"key": key}}})
            })
            .collect();
        serde_json::from_value(serde_json::json!({ "Records": records })).unwrap()
    }

    fn handler(store: Arc<MemoryObjectStore>, scratch: &std::path::Path) -> EventHandler {
        EventHandler::new(
            StorageGateway::new(store, scratch),
            ReportBuilder::new(scratch, BuilderConfig::default()),
            "_final_report",
        )
    }

    #[tokio::test]
    async fn test_end_to_end_report() {
        let scratch = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store
            .insert(
                "sleep-lab",
                "night 1/c3c4.edf",
                edf_bytes(
                    EdfWriter::new()
                        .with_signal("C3", 256.0, sine(5.0, 256.0, 2048))
                        .with_signal("C4", 256.0, sine(20.0, 256.0, 2048)),
                ),
            )
            .unwrap();

        let handler = handler(store.clone(), scratch.path());
        let processed = handler
            .handle(&batch(&[("sleep-lab", "night+1/c3c4.edf")]))
            .await
            .unwrap();

        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].destination.bucket, "sleep-lab_final_report");
        assert_eq!(processed[0].destination.key, "night 1/c3c4.edf-report.json");

        let body = store
            .get("sleep-lab_final_report", "night 1/c3c4.edf-report.json")
            .unwrap()
            .unwrap();
        let report = Report::from_json(&body).unwrap();
        assert!((report.get("C3").unwrap() - 5.0).abs() <= 0.25);
        assert!((report.get("C4").unwrap() - 20.0).abs() <= 0.25);

        // Scratch space is cleaned after upload
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_corrupt_upload_produces_no_report() {
        let scratch = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store.insert("raw", "bad.edf", b"garbage".to_vec()).unwrap();

        let handler = handler(store.clone(), scratch.path());
        let err = handler.handle(&batch(&[("raw", "bad.edf")])).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Analysis(report_builder::AnalysisError::Decode(_))
        ));
        assert_eq!(store.object_count(), 1);
        assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_missing_object_is_transfer_error() {
        let scratch = tempfile::tempdir().unwrap();
        let handler = handler(Arc::new(MemoryObjectStore::new()), scratch.path());
        let err = handler.handle(&batch(&[("raw", "absent.edf")])).await.unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }

    #[tokio::test]
    async fn test_first_failure_stops_batch() {
        let scratch = tempfile::tempdir().unwrap();
        let store = Arc::new(MemoryObjectStore::new());
        store
            .insert(
                "raw",
                "good.edf",
                edf_bytes(EdfWriter::new().with_signal("Fz", 128.0, sine(8.0, 128.0, 1024))),
            )
            .unwrap();

        let handler = handler(store.clone(), scratch.path());
        let result = handler
            .handle(&batch(&[("raw", "absent.edf"), ("raw", "good.edf")]))
            .await;

        assert!(result.is_err());
        assert!(store
            .get("raw_final_report", "good.edf-report.json")
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let scratch = tempfile::tempdir().unwrap();
        let handler = handler(Arc::new(MemoryObjectStore::new()), scratch.path());
        assert!(handler.handle(&NotificationBatch::default()).await.unwrap().is_empty());
    }
}
