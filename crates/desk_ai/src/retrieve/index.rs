use std::fs;
use std::path::PathBuf;

use desk_core::error::AppError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::similarity::squared_euclidean;

/// Position sentinel meaning "no neighbor found". Search pads short result
/// sets with this value; it must never be dereferenced into chunk text.
pub const NO_NEIGHBOR: i64 = -1;

/// Flat nearest-neighbor index over fixed-dimensionality vectors, ranked by
/// Euclidean distance. Row N corresponds to chunk N of the paired chunk
/// list. Read-only at query time.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    dims: usize,
    rows: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn new(dims: usize) -> Self {
        Self {
            dims,
            rows: Vec::new(),
        }
    }

    pub fn dims(&self) -> usize {
        self.dims
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, vector: Vec<f32>) -> Result<(), AppError> {
        if vector.len() != self.dims {
            return Err(AppError::new(
                "INDEX_DIMS_MISMATCH",
                "Vector dimensionality does not match the index",
            )
            .with_details(format!("expected={}; got={}", self.dims, vector.len())));
        }
        self.rows.push(vector);
        Ok(())
    }

    /// k-nearest-neighbor search. Returns `(distances, positions)` of length
    /// exactly `k`; when fewer than `k` rows exist, the tail is padded with
    /// `(f32::INFINITY, NO_NEIGHBOR)`.
    pub fn search(&self, query: &[f32], k: usize) -> Result<(Vec<f32>, Vec<i64>), AppError> {
        if query.len() != self.dims {
            return Err(AppError::new(
                "INDEX_DIMS_MISMATCH",
                "Query dimensionality does not match the index",
            )
            .with_details(format!("expected={}; got={}", self.dims, query.len())));
        }

        let mut scored: Vec<(f32, usize)> = self
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| (squared_euclidean(query, row), i))
            .collect();
        scored.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.1.cmp(&b.1))
        });
        scored.truncate(k);

        let mut distances: Vec<f32> = scored.iter().map(|(d, _)| *d).collect();
        let mut positions: Vec<i64> = scored.iter().map(|(_, i)| *i as i64).collect();
        while positions.len() < k {
            distances.push(f32::INFINITY);
            positions.push(NO_NEIGHBOR);
        }
        Ok((distances, positions))
    }
}

/// Manifest linking the two halves of the offline build output. Load
/// refuses a pair whose checksums or row counts disagree, so the positional
/// invariant (vector N ↔ chunk N) is enforced rather than assumed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexManifest {
    pub model: String,
    pub dims: u32,
    pub rows: u32,
    pub vectors_sha256: String,
    pub chunks_sha256: String,
    pub built_at: String,
}

/// On-disk layout of the index artifact pair:
/// `<root>/index/{manifest.json, vectors.json, chunks.json}`. All writes are
/// atomic (tmp → rename), manifest last.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    fn index_dir(&self) -> PathBuf {
        self.root.join("index")
    }

    fn manifest_path(&self) -> PathBuf {
        self.index_dir().join("manifest.json")
    }

    fn vectors_path(&self) -> PathBuf {
        self.index_dir().join("vectors.json")
    }

    fn chunks_path(&self) -> PathBuf {
        self.index_dir().join("chunks.json")
    }

    fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.index_dir()).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to create index directory")
                .with_details(format!("path={}; err={}", self.index_dir().display(), e))
        })
    }

    fn write_atomic(&self, path: PathBuf, bytes: &[u8], what: &str) -> Result<(), AppError> {
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", format!("Failed to write {what}"))
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", format!("Failed to finalize {what} write"))
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
        })
    }

    /// Manifest of the last completed build, or `None` before any build.
    pub fn manifest(&self) -> Result<Option<IndexManifest>, AppError> {
        let path = self.manifest_path();
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&path).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to read index manifest")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        let manifest = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to decode index manifest")
                .with_details(format!("path={}; err={}", path.display(), e))
        })?;
        Ok(Some(manifest))
    }

    /// Persist a matched vector/chunk pair. Vectors and chunks must agree in
    /// length and dimensionality before anything is written.
    pub fn write_pair(
        &self,
        model: &str,
        built_at: &str,
        vectors: &[Vec<f32>],
        chunks: &[String],
    ) -> Result<IndexManifest, AppError> {
        if vectors.len() != chunks.len() {
            return Err(AppError::new(
                "INDEX_PAIR_MISMATCH",
                "Vector and chunk counts differ",
            )
            .with_details(format!("vectors={}; chunks={}", vectors.len(), chunks.len())));
        }
        if vectors.is_empty() {
            return Err(AppError::new(
                "INDEX_NO_CHUNKS",
                "Refusing to write an empty index",
            ));
        }
        let dims = vectors[0].len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            return Err(AppError::new(
                "INDEX_DIMS_MISMATCH",
                "Embedding dimension mismatch across chunks",
            )
            .with_details(format!("expected={dims}; got={}", bad.len())));
        }

        self.ensure_dirs()?;

        let vectors_json = serde_json::to_vec(vectors).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to encode index vectors")
                .with_details(e.to_string())
        })?;
        let chunks_json = serde_json::to_vec(chunks).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to encode index chunks")
                .with_details(e.to_string())
        })?;

        let manifest = IndexManifest {
            model: model.to_string(),
            dims: dims as u32,
            rows: vectors.len() as u32,
            vectors_sha256: hex::encode(Sha256::digest(&vectors_json)),
            chunks_sha256: hex::encode(Sha256::digest(&chunks_json)),
            built_at: built_at.to_string(),
        };
        let manifest_json = serde_json::to_vec_pretty(&manifest).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to encode index manifest")
                .with_details(e.to_string())
        })?;

        // Payloads first, manifest last: a crash mid-write leaves either the
        // previous complete pair or an unreferenced payload, never a
        // manifest pointing at missing data.
        self.write_atomic(self.vectors_path(), &vectors_json, "index vectors")?;
        self.write_atomic(self.chunks_path(), &chunks_json, "index chunks")?;
        self.write_atomic(self.manifest_path(), &manifest_json, "index manifest")?;
        Ok(manifest)
    }

    /// Load and verify the artifact pair against its manifest.
    pub fn load_pair(&self) -> Result<(VectorIndex, Vec<String>, IndexManifest), AppError> {
        let manifest = self.manifest()?.ok_or_else(|| {
            AppError::new(
                "INDEX_NOT_READY",
                "No index manifest; run the offline index build first",
            )
        })?;

        let vectors_bytes = fs::read(self.vectors_path()).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to read index vectors")
                .with_details(format!("path={}; err={}", self.vectors_path().display(), e))
        })?;
        let chunks_bytes = fs::read(self.chunks_path()).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to read index chunks")
                .with_details(format!("path={}; err={}", self.chunks_path().display(), e))
        })?;

        let vectors_sha = hex::encode(Sha256::digest(&vectors_bytes));
        if vectors_sha != manifest.vectors_sha256 {
            return Err(AppError::new(
                "INDEX_PAIR_MISMATCH",
                "Vector payload checksum does not match the manifest",
            )
            .with_details(format!(
                "manifest={}; actual={}",
                manifest.vectors_sha256, vectors_sha
            )));
        }
        let chunks_sha = hex::encode(Sha256::digest(&chunks_bytes));
        if chunks_sha != manifest.chunks_sha256 {
            return Err(AppError::new(
                "INDEX_PAIR_MISMATCH",
                "Chunk payload checksum does not match the manifest",
            )
            .with_details(format!(
                "manifest={}; actual={}",
                manifest.chunks_sha256, chunks_sha
            )));
        }

        let rows: Vec<Vec<f32>> = serde_json::from_slice(&vectors_bytes).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to decode index vectors")
                .with_details(e.to_string())
        })?;
        let chunks: Vec<String> = serde_json::from_slice(&chunks_bytes).map_err(|e| {
            AppError::new("INDEX_STORE_FAILED", "Failed to decode index chunks")
                .with_details(e.to_string())
        })?;

        if rows.len() != chunks.len()
            || rows.len() as u32 != manifest.rows
            || chunks.len() as u32 != manifest.rows
        {
            return Err(AppError::new(
                "INDEX_PAIR_MISMATCH",
                "Row counts disagree between manifest, vectors and chunks",
            )
            .with_details(format!(
                "manifest={}; vectors={}; chunks={}",
                manifest.rows,
                rows.len(),
                chunks.len()
            )));
        }

        let mut index = VectorIndex::new(manifest.dims as usize);
        for row in rows {
            index.push(row)?;
        }
        Ok((index, chunks, manifest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_ranks_by_distance_and_pads_with_sentinels() {
        let mut index = VectorIndex::new(2);
        index.push(vec![0.0, 0.0]).unwrap();
        index.push(vec![10.0, 0.0]).unwrap();
        index.push(vec![1.0, 0.0]).unwrap();

        let (distances, positions) = index.search(&[0.0, 0.0], 5).expect("search");
        assert_eq!(positions, vec![0, 2, 1, NO_NEIGHBOR, NO_NEIGHBOR]);
        assert_eq!(distances[0], 0.0);
        assert_eq!(distances[1], 1.0);
        assert_eq!(distances[2], 100.0);
        assert!(distances[3].is_infinite());
    }

    #[test]
    fn empty_index_returns_only_sentinels() {
        let index = VectorIndex::new(3);
        let (_, positions) = index.search(&[0.0, 0.0, 0.0], 4).expect("search");
        assert_eq!(positions, vec![NO_NEIGHBOR; 4]);
    }

    #[test]
    fn equal_distances_break_ties_by_position() {
        let mut index = VectorIndex::new(1);
        index.push(vec![1.0]).unwrap();
        index.push(vec![-1.0]).unwrap();
        let (_, positions) = index.search(&[0.0], 2).expect("search");
        assert_eq!(positions, vec![0, 1]);
    }

    #[test]
    fn mismatched_query_dims_are_rejected() {
        let index = VectorIndex::new(2);
        let err = index.search(&[0.0], 1).expect_err("dims");
        assert_eq!(err.code, "INDEX_DIMS_MISMATCH");
    }
}
