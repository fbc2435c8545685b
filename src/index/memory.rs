//! In-memory vector index for tests
//!
//! Mirrors the trait contract closely enough to exercise upsert-by-identity,
//! filtered queries, per-document removal, and forced failures.

use super::{ChunkPayload, IndexFilter, IndexHit, IndexPoint, VectorIndex};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryIndex {
    points: Mutex<HashMap<String, (Vec<f32>, ChunkPayload)>>,
    fail_queries: AtomicBool,
    fail_upserts: AtomicBool,
    upsert_batch_sizes: Mutex<Vec<usize>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_queries(&self, fail: bool) {
        self.fail_queries.store(fail, Ordering::SeqCst);
    }

    pub fn fail_upserts(&self, fail: bool) {
        self.fail_upserts.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.points.lock().unwrap().len()
    }

    pub fn upsert_batch_sizes(&self) -> Vec<usize> {
        self.upsert_batch_sizes.lock().unwrap().clone()
    }

    pub fn payloads(&self) -> Vec<ChunkPayload> {
        self.points
            .lock()
            .unwrap()
            .values()
            .map(|(_, p)| p.clone())
            .collect()
    }

    fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm_a == 0.0 || norm_b == 0.0 {
            return 1.0;
        }
        (1.0 - dot / (norm_a * norm_b)).clamp(0.0, 1.0)
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn ensure_ready(&self) -> Result<()> {
        Ok(())
    }

    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if self.fail_upserts.load(Ordering::SeqCst) {
            return Err(Error::Index("memory index forced upsert failure".to_string()));
        }

        self.upsert_batch_sizes.lock().unwrap().push(points.len());

        let mut stored = self.points.lock().unwrap();
        for point in points {
            stored.insert(point.id.to_string(), (point.vector, point.payload));
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: Vec<f32>,
        k: usize,
        filter: Option<IndexFilter>,
    ) -> Result<Vec<IndexHit>> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(Error::Index("memory index forced query failure".to_string()));
        }

        let stored = self.points.lock().unwrap();
        let mut hits: Vec<IndexHit> = stored
            .iter()
            .filter(|(_, (_, payload))| {
                filter.as_ref().map(|f| f.matches(payload)).unwrap_or(true)
            })
            .map(|(id, (v, payload))| IndexHit {
                id: id.clone(),
                distance: Self::cosine_distance(&vector, v),
                payload: payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn remove_document(&self, doc_id: &str) -> Result<()> {
        self.points
            .lock()
            .unwrap()
            .retain(|_, (_, payload)| payload.doc_id != doc_id);
        Ok(())
    }

    async fn count(&self, filter: Option<IndexFilter>) -> Result<u64> {
        let stored = self.points.lock().unwrap();
        let count = stored
            .values()
            .filter(|(_, payload)| filter.as_ref().map(|f| f.matches(payload)).unwrap_or(true))
            .count();
        Ok(count as u64)
    }

    async fn clear(&self) -> Result<()> {
        self.points.lock().unwrap().clear();
        Ok(())
    }
}
