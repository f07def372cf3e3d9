//! Weight loading for safetensors artifacts.

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use safetensors::SafeTensors;
use tracing::debug;

use crate::error::ModelLoadError;

/// Named tensors read from a model artifact.
///
/// Tensors are reference-counted, so handing out `VarBuilder`s is cheap.
#[derive(Debug, Clone)]
pub struct ModelWeights {
    tensors: HashMap<String, Tensor>,
    device: Device,
}

impl ModelWeights {
    /// Reads a safetensors file onto `device`.
    ///
    /// # Errors
    ///
    /// Returns `ModelLoadError::Missing` if the file does not exist,
    /// `Io` if it cannot be read and `Corrupt` if it is not valid safetensors.
    pub fn load(path: impl AsRef<Path>, device: &Device) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        debug!("Loading safetensors from {}", path.display());

        if !path.exists() {
            return Err(ModelLoadError::Missing {
                path: path.to_path_buf(),
            });
        }

        let data = std::fs::read(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let corrupt = |reason: String| ModelLoadError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let tensors = SafeTensors::deserialize(&data).map_err(|e| corrupt(e.to_string()))?;

        let mut tensor_map: HashMap<String, Tensor> = HashMap::new();
        for name in tensors.names() {
            let view = tensors
                .tensor(name)
                .map_err(|e| corrupt(format!("tensor '{name}': {e}")))?;

            let dtype = safetensors_dtype_to_candle(view.dtype()).map_err(&corrupt)?;
            let shape: Vec<usize> = view.shape().to_vec();

            let tensor = Tensor::from_raw_buffer(view.data(), dtype, &shape, device)
                .map_err(|e| corrupt(format!("tensor '{name}': {e}")))?;

            tensor_map.insert(name.clone(), tensor);
        }

        if tensor_map.is_empty() {
            return Err(corrupt("artifact contains no tensors".to_string()));
        }

        debug!("Loaded {} tensors", tensor_map.len());
        Ok(Self::from_tensors(tensor_map, device))
    }

    /// Wraps tensors that are already in memory.
    #[must_use]
    pub fn from_tensors(tensors: HashMap<String, Tensor>, device: &Device) -> Self {
        Self {
            tensors,
            device: device.clone(),
        }
    }

    /// Shape of the tensor called `name`.
    #[must_use]
    pub fn shape(&self, name: &str) -> Option<&[usize]> {
        self.tensors.get(name).map(Tensor::dims)
    }

    /// Whether a tensor called `name` exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(name)
    }

    /// Device the tensors live on.
    #[must_use]
    pub const fn device(&self) -> &Device {
        &self.device
    }

    /// `VarBuilder` over the weights, converting to `f32`.
    #[must_use]
    pub fn var_builder(&self) -> VarBuilder<'static> {
        VarBuilder::from_tensors(self.tensors.clone(), DType::F32, &self.device)
    }
}

/// Converts safetensors dtype to candle dtype.
fn safetensors_dtype_to_candle(dtype: safetensors::Dtype) -> Result<DType, String> {
    use safetensors::Dtype as S;
    match dtype {
        S::F32 => Ok(DType::F32),
        S::F64 => Ok(DType::F64),
        S::F16 => Ok(DType::F16),
        S::BF16 => Ok(DType::BF16),
        S::I64 => Ok(DType::I64),
        S::U8 => Ok(DType::U8),
        S::U32 => Ok(DType::U32),
        other => Err(format!("unsupported dtype {other:?}")),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_safetensors() -> NamedTempFile {
        use safetensors::serialize;
        use safetensors::tensor::TensorView;

        let data: Vec<f32> = vec![1.0, 2.0, 3.0, 4.0];
        let data_bytes: &[u8] = bytemuck::cast_slice(&data);

        let tensor = TensorView::new(safetensors::Dtype::F32, vec![2, 2], data_bytes)
            .expect("valid tensor view");

        let tensors = HashMap::from([("head.fc.weight".to_string(), tensor)]);
        let serialized = serialize(&tensors, &None).expect("serialize");

        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(&serialized).expect("write");
        file
    }

    #[test]
    fn test_load_safetensors() {
        let file = create_test_safetensors();
        let weights = ModelWeights::load(file.path(), &Device::Cpu).expect("load");
        assert!(weights.contains("head.fc.weight"));
        assert_eq!(weights.shape("head.fc.weight"), Some(&[2, 2][..]));
        assert_eq!(weights.shape("missing"), None);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ModelWeights::load("/nonexistent/path.safetensors", &Device::Cpu).unwrap_err();
        assert!(matches!(err, ModelLoadError::Missing { .. }));
    }

    #[test]
    fn test_load_garbage_is_corrupt() {
        let mut file = NamedTempFile::new().expect("temp file");
        file.write_all(b"definitely not safetensors").expect("write");

        let err = ModelWeights::load(file.path(), &Device::Cpu).unwrap_err();
        assert!(matches!(err, ModelLoadError::Corrupt { .. }));
    }
}
