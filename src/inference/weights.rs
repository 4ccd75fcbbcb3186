//! Safetensors-backed weight loading.

use crate::error::{Result, SongSorterError};
use memmap2::{Mmap, MmapOptions};
use ndarray::{Array1, Array2};
use safetensors::tensor::{Dtype, SafeTensors};
use std::path::{Path, PathBuf};

/// Read-only memory map of a safetensors state dict
#[derive(Debug)]
pub struct WeightStore {
    path: PathBuf,
    mmap: Mmap,
}

impl WeightStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = std::fs::File::open(&path)
            .map_err(|e| SongSorterError::model_load_error(&path, e))?;
        // SAFETY: read-only file mapping for immutable tensor access.
        let mmap = unsafe { MmapOptions::new().map(&file) }
            .map_err(|e| SongSorterError::model_load_error(&path, e))?;

        // Fail early on a corrupt header rather than at first tensor access
        SafeTensors::deserialize(&mmap).map_err(|e| SongSorterError::model_load_error(&path, e))?;

        Ok(Self { path, mmap })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tensors(&self) -> Result<SafeTensors<'_>> {
        SafeTensors::deserialize(&self.mmap).map_err(|e| SongSorterError::model_load_error(&self.path, e))
    }

    pub fn names(&self) -> Result<Vec<String>> {
        let st = self.tensors()?;
        let mut names: Vec<String> = st.names().into_iter().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Raw f32 data and shape of a tensor
    fn tensor_f32(&self, name: &str) -> Result<(Vec<usize>, Vec<f32>)> {
        let st = self.tensors()?;
        let tv = st.tensor(name).map_err(|e| {
            SongSorterError::model_load_error(&self.path, format!("tensor '{}': {}", name, e))
        })?;
        let shape = tv.shape().to_vec();
        let raw = tv.data();

        let data = match tv.dtype() {
            Dtype::F32 => raw
                .chunks_exact(4)
                .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
            Dtype::F64 => raw
                .chunks_exact(8)
                .map(|c| {
                    f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32
                })
                .collect(),
            other => {
                return Err(SongSorterError::model_load_error(
                    &self.path,
                    format!("tensor '{}' has unsupported dtype {:?}", name, other),
                ));
            }
        };

        Ok((shape, data))
    }

    /// Load a 2-D tensor and check its shape
    pub fn matrix(&self, name: &str, expected: (usize, usize)) -> Result<Array2<f32>> {
        let (shape, data) = self.tensor_f32(name)?;
        if shape != [expected.0, expected.1] {
            return Err(self.shape_error(name, &shape, &[expected.0, expected.1]));
        }
        Array2::from_shape_vec(expected, data)
            .map_err(|e| SongSorterError::model_load_error(&self.path, format!("tensor '{}': {}", name, e)))
    }

    /// Load a 1-D tensor and check its length
    pub fn vector(&self, name: &str, expected: usize) -> Result<Array1<f32>> {
        let (shape, data) = self.tensor_f32(name)?;
        if shape != [expected] || data.len() != expected {
            return Err(self.shape_error(name, &shape, &[expected]));
        }
        Ok(Array1::from(data))
    }

    fn shape_error(&self, name: &str, actual: &[usize], expected: &[usize]) -> SongSorterError {
        SongSorterError::model_load_error(
            &self.path,
            format!(
                "tensor '{}' has shape {:?}, expected {:?}",
                name, actual, expected
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use safetensors::tensor::{serialize, TensorView};

    fn f32_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    fn write_store(dir: &Path) -> PathBuf {
        let a = f32_bytes(&[1.0, 2.5, -3.0, 4.25, 0.0, 1.0]);
        let b = f32_bytes(&[0.5, -0.5]);
        let a_view = TensorView::new(Dtype::F32, vec![2, 3], &a).unwrap();
        let b_view = TensorView::new(Dtype::F32, vec![2], &b).unwrap();
        let tensors = vec![("a", &a_view), ("b", &b_view)];
        let bytes = serialize(tensors, &None).unwrap();
        let path = dir.join("weights.safetensors");
        std::fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_loads_matrix_and_vector() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = WeightStore::open(write_store(dir.path())).unwrap();

        assert_eq!(store.names().unwrap(), vec!["a".to_string(), "b".to_string()]);

        let a = store.matrix("a", (2, 3)).unwrap();
        assert_eq!(a[[0, 1]], 2.5);
        assert_eq!(a[[1, 0]], 4.25);

        let b = store.vector("b", 2).unwrap();
        assert_eq!(b.to_vec(), vec![0.5, -0.5]);
    }

    #[test]
    fn test_shape_mismatch_is_load_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = WeightStore::open(write_store(dir.path())).unwrap();
        let err = store.matrix("a", (3, 2)).unwrap_err();
        assert!(matches!(err, SongSorterError::ModelLoadError { .. }));
        assert!(err.to_string().contains("expected [3, 2]"));
    }

    #[test]
    fn test_missing_tensor_is_load_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = WeightStore::open(write_store(dir.path())).unwrap();
        assert!(matches!(
            store.vector("missing", 2),
            Err(SongSorterError::ModelLoadError { .. })
        ));
    }

    #[test]
    fn test_corrupt_file_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.safetensors");
        std::fs::write(&path, b"not a safetensors file").unwrap();
        assert!(matches!(
            WeightStore::open(&path),
            Err(SongSorterError::ModelLoadError { .. })
        ));
    }
}
