//! src/services/classroom_service.rs
//!
//! ClassroomService: the operations the HTTP layer relies on. It is the
//! only place where the record store and the asset store are used together,
//! and it decides the ordering that keeps a lecture and its file paired.

use bytes::Bytes;
use futures::Stream;
use std::{io, sync::Arc};
use tokio::fs::File;
use tracing::{info, warn};

use crate::models::{
    lecture::Lecture,
    student::{Student, StudentGrades},
};

use super::{
    asset_store::{AssetStore, StoredAsset},
    record_store::{Collection, RecordStore, StoreError, StoreResult, find_by_id},
};

/// Shared application service handed to every handler as axum state.
#[derive(Clone)]
pub struct ClassroomService {
    pub records: RecordStore,
    pub assets: AssetStore,
    teacher_password: Arc<str>,
}

impl ClassroomService {
    pub fn new(records: RecordStore, assets: AssetStore, teacher_password: impl Into<Arc<str>>) -> Self {
        Self {
            records,
            assets,
            teacher_password: teacher_password.into(),
        }
    }

    /// Prepare on-disk state: uploads directory and an empty lectures file.
    pub async fn init(&self) -> StoreResult<()> {
        self.assets.ensure_dir().await?;
        self.records.ensure_collection(Collection::Lectures).await
    }

    /// Look up a student's grades by id.
    pub async fn get_student_grades(&self, student_id: &str) -> StoreResult<StudentGrades> {
        if student_id.is_empty() {
            return Err(StoreError::Validation("studentId required".into()));
        }
        let students: Vec<Student> = self.records.load_collection(Collection::Students).await?;
        find_by_id(&students, student_id)
            .cloned()
            .map(StudentGrades::from)
            .ok_or_else(|| StoreError::StudentNotFound(student_id.to_string()))
    }

    /// Compare a caller-supplied password with the configured one.
    pub fn check_teacher_credential(&self, password: &str) -> bool {
        constant_time_eq(password.as_bytes(), self.teacher_password.as_bytes())
    }

    /// Store an uploaded lecture file and record it.
    ///
    /// The file is fully written before the record is saved. If the record
    /// cannot be saved the file is removed again.
    pub async fn upload_lecture<S>(
        &self,
        original_name: &str,
        title: Option<String>,
        stream: S,
    ) -> StoreResult<Lecture>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let asset = self.stage_upload(original_name, stream).await?;
        self.commit_upload(asset, original_name, title).await
    }

    /// First half of an upload: write the file, reject empty uploads.
    ///
    /// The staged asset must be passed to `commit_upload` or `abort_upload`.
    pub async fn stage_upload<S>(&self, original_name: &str, stream: S) -> StoreResult<StoredAsset>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let asset = self.assets.store(original_name, stream).await?;
        if asset.size_bytes == 0 {
            self.abort_upload(&asset).await;
            return Err(StoreError::Validation("No file uploaded".into()));
        }
        Ok(asset)
    }

    /// Second half of an upload: append the lecture record for a staged asset.
    ///
    /// On failure the asset is removed again.
    pub async fn commit_upload(
        &self,
        asset: StoredAsset,
        original_name: &str,
        title: Option<String>,
    ) -> StoreResult<Lecture> {
        let lecture = Lecture::new(title, original_name, asset.file_name.clone());
        let saved = self
            .records
            .update_collection(Collection::Lectures, |lectures: &mut Vec<Lecture>| {
                lectures.push(lecture.clone());
                Ok(())
            })
            .await;

        if let Err(err) = saved {
            self.abort_upload(&asset).await;
            return Err(err);
        }

        info!(
            "uploaded lecture {} ({}, {} bytes)",
            lecture.id, lecture.file_name, asset.size_bytes
        );
        Ok(lecture)
    }

    /// Drop a staged asset that will not get a record.
    pub async fn abort_upload(&self, asset: &StoredAsset) {
        if let Err(err) = self.assets.delete(&asset.file_name).await {
            warn!("failed to discard asset {}: {}", asset.file_name, err);
        }
    }

    /// All lectures in upload order.
    pub async fn list_lectures(&self) -> StoreResult<Vec<Lecture>> {
        self.records.load_collection(Collection::Lectures).await
    }

    /// Remove a lecture and its file.
    ///
    /// The file is deleted before the record. A file that is already gone
    /// does not stop the record from being removed.
    pub async fn delete_lecture(&self, id: &str) -> StoreResult<Lecture> {
        let writer = self.records.begin_write().await;
        let mut lectures: Vec<Lecture> = writer.load(Collection::Lectures).await?;
        let lecture = find_by_id(&lectures, id)
            .cloned()
            .ok_or_else(|| StoreError::LectureNotFound(id.to_string()))?;

        if !self.assets.delete(&lecture.file_name).await? {
            warn!("lecture {} referenced missing file {}", lecture.id, lecture.file_name);
        }

        lectures.retain(|l| l.id != id);
        writer.save(Collection::Lectures, &lectures).await?;
        info!("deleted lecture {} ({})", lecture.id, lecture.file_name);
        Ok(lecture)
    }

    /// Open a stored lecture file for streaming.
    pub async fn get_asset_stream(&self, file_name: &str) -> StoreResult<(File, u64)> {
        self.assets.retrieve(file_name).await
    }
}

/// Length-independent byte comparison that does not short-circuit.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}
