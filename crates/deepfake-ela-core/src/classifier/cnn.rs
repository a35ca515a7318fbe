//! Candle implementation of the ELA CNN.
//!
//! ```text
//! [1,128,128,3] -> NCHW -> conv1 5x5 (32) -> relu -> conv2 5x5 (32) -> relu
//!   -> maxpool 2 -> flatten (channel-last) -> dense1 (256) -> relu
//!   -> dense2 (2) -> softmax
//! ```
//!
//! Weights are read from a safetensors file with tensors `conv1.weight`,
//! `conv1.bias`, `conv2.weight`, `conv2.bias`, `dense1.weight`,
//! `dense1.bias`, `dense2.weight`, `dense2.bias`. Convolution kernels are
//! OIHW and dense kernels are `[out, in]`. The flatten runs in
//! height-width-channel order so dense1 keeps the row order of a model that
//! was trained channel-last. Dropout is an identity at inference and has no
//! weights.

use std::path::Path;

use candle_core::{DType, Device, Module, Tensor, D};
use candle_nn::{Conv2d, Conv2dConfig, Linear, VarBuilder};
use serde::{Deserialize, Serialize};

use super::{Classifier, ClassifierError};
use crate::error::{DetectError, DetectResult};
use crate::preprocess::{NormalizedTensor, CHANNELS};

/// Layer sizes. Read from `config.json` beside the weights when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElaCnnConfig {
    #[serde(default = "default_input_size")]
    pub input_size: usize,
    #[serde(default = "default_conv_filters")]
    pub conv_filters: usize,
    #[serde(default = "default_kernel_size")]
    pub kernel_size: usize,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_hidden_units")]
    pub hidden_units: usize,
    #[serde(default = "default_num_classes")]
    pub num_classes: usize,
}

fn default_input_size() -> usize {
    128
}

fn default_conv_filters() -> usize {
    32
}

fn default_kernel_size() -> usize {
    5
}

fn default_pool_size() -> usize {
    2
}

fn default_hidden_units() -> usize {
    256
}

fn default_num_classes() -> usize {
    2
}

impl Default for ElaCnnConfig {
    fn default() -> Self {
        Self {
            input_size: default_input_size(),
            conv_filters: default_conv_filters(),
            kernel_size: default_kernel_size(),
            pool_size: default_pool_size(),
            hidden_units: default_hidden_units(),
            num_classes: default_num_classes(),
        }
    }
}

impl ElaCnnConfig {
    /// Spatial size after both valid convolutions.
    fn conv_output_size(&self) -> usize {
        self.input_size
            .saturating_sub(2 * self.kernel_size.saturating_sub(1))
    }

    /// Spatial size after pooling.
    pub fn pooled_size(&self) -> usize {
        self.conv_output_size() / self.pool_size.max(1)
    }

    /// Input width of dense1.
    pub fn flattened_features(&self) -> usize {
        self.pooled_size() * self.pooled_size() * self.conv_filters
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.kernel_size == 0 || self.pool_size == 0 {
            return Err("kernel_size and pool_size must be at least 1".to_string());
        }
        if self.conv_filters == 0 || self.hidden_units == 0 {
            return Err("conv_filters and hidden_units must be at least 1".to_string());
        }
        if self.num_classes != 2 {
            return Err(format!(
                "binary classifier needs num_classes = 2, got {}",
                self.num_classes
            ));
        }
        if self.pooled_size() == 0 {
            return Err(format!(
                "input_size {} too small for kernel {} and pool {}",
                self.input_size, self.kernel_size, self.pool_size
            ));
        }
        Ok(())
    }

    /// Load `config.json` from `dir`, or the defaults when the file is absent.
    pub fn load_or_default(dir: &Path) -> DetectResult<Self> {
        let config_path = dir.join("config.json");
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = serde_json::from_str(&content).map_err(|e| DetectError::ModelLoad {
            path: config_path.clone(),
            source: Box::new(e),
        })?;

        config.validate().map_err(|message| DetectError::ModelLoad {
            path: config_path.clone(),
            source: message.into(),
        })?;

        tracing::info!(
            "Loaded classifier config from {}: filters={}, kernel={}, hidden={}",
            config_path.display(),
            config.conv_filters,
            config.kernel_size,
            config.hidden_units
        );
        Ok(config)
    }
}

fn map_candle(e: candle_core::Error) -> ClassifierError {
    ClassifierError::Backend {
        message: format!("candle: {}", e),
    }
}

/// ELA CNN running on candle.
pub struct ElaCnnClassifier {
    conv1: Conv2d,
    conv2: Conv2d,
    dense1: Linear,
    dense2: Linear,
    config: ElaCnnConfig,
    device: Device,
}

impl ElaCnnClassifier {
    /// Build the network from an already prepared `VarBuilder`.
    pub fn from_var_builder(
        vb: VarBuilder,
        config: ElaCnnConfig,
        device: Device,
    ) -> candle_core::Result<Self> {
        let conv_cfg = Conv2dConfig::default();
        let filters = config.conv_filters;
        let kernel = config.kernel_size;

        let conv1 = candle_nn::conv2d(CHANNELS, filters, kernel, conv_cfg, vb.pp("conv1"))?;
        let conv2 = candle_nn::conv2d(filters, filters, kernel, conv_cfg, vb.pp("conv2"))?;
        let dense1 = candle_nn::linear(
            config.flattened_features(),
            config.hidden_units,
            vb.pp("dense1"),
        )?;
        let dense2 = candle_nn::linear(config.hidden_units, config.num_classes, vb.pp("dense2"))?;

        Ok(Self {
            conv1,
            conv2,
            dense1,
            dense2,
            config,
            device,
        })
    }

    /// Memory-map the safetensors file at `weights_path`.
    ///
    /// # Errors
    /// - `DetectError::ModelLoad` if the file is missing, malformed, or its
    ///   tensors do not match the configured layer sizes
    pub fn load(weights_path: &Path, device: Device) -> DetectResult<Self> {
        if !weights_path.is_file() {
            return Err(DetectError::ModelLoad {
                path: weights_path.to_path_buf(),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "weights file not found",
                )),
            });
        }

        let dir = weights_path.parent().unwrap_or_else(|| Path::new("."));
        let config = ElaCnnConfig::load_or_default(dir)?;

        // SAFETY: the weights file is not modified while the process runs.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, &device).map_err(
                |e| DetectError::ModelLoad {
                    path: weights_path.to_path_buf(),
                    source: Box::new(e),
                },
            )?
        };

        let model = Self::from_var_builder(vb, config, device).map_err(|e| {
            DetectError::ModelLoad {
                path: weights_path.to_path_buf(),
                source: Box::new(e),
            }
        })?;

        tracing::info!(
            "ELA classifier loaded from {} ({} dense1 inputs)",
            weights_path.display(),
            config.flattened_features()
        );
        Ok(model)
    }

    pub fn config(&self) -> &ElaCnnConfig {
        &self.config
    }

    /// NHWC batch in, softmax probabilities `[batch, 2]` out.
    pub fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let xs = xs.permute((0, 3, 1, 2))?.contiguous()?;
        let xs = self.conv1.forward(&xs)?.relu()?;
        let xs = self.conv2.forward(&xs)?.relu()?;
        let xs = xs.max_pool2d(self.config.pool_size)?;
        let xs = xs.permute((0, 2, 3, 1))?.contiguous()?.flatten_from(1)?;
        let xs = self.dense1.forward(&xs)?.relu()?;
        let logits = self.dense2.forward(&xs)?;
        candle_nn::ops::softmax(&logits, D::Minus1)
    }
}

impl Classifier for ElaCnnClassifier {
    fn predict(&self, input: &NormalizedTensor) -> Result<Vec<Vec<f32>>, ClassifierError> {
        let size = self.config.input_size;
        let expected = [1, size, size, CHANNELS];
        if input.shape() != expected {
            return Err(ClassifierError::InvalidInput {
                expected,
                actual: input.shape(),
            });
        }

        let xs = input.to_tensor(&self.device).map_err(map_candle)?;
        let probs = self.forward(&xs).map_err(map_candle)?;
        probs
            .to_dtype(DType::F32)
            .and_then(|t| t.to_vec2::<f32>())
            .map_err(map_candle)
    }

    fn name(&self) -> &str {
        "ela-cnn"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    fn small_config() -> ElaCnnConfig {
        ElaCnnConfig {
            conv_filters: 2,
            hidden_units: 4,
            ..Default::default()
        }
    }

    fn uniform_input(value: f32) -> NormalizedTensor {
        NormalizedTensor::from_vec(vec![value; 128 * 128 * 3], 128, 128).unwrap()
    }

    #[test]
    fn test_default_geometry() {
        let config = ElaCnnConfig::default();
        assert_eq!(config.pooled_size(), 60);
        assert_eq!(config.flattened_features(), 60 * 60 * 32);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let tiny = ElaCnnConfig {
            input_size: 8,
            ..Default::default()
        };
        assert!(tiny.validate().is_err());

        let three_class = ElaCnnConfig {
            num_classes: 3,
            ..Default::default()
        };
        assert!(three_class.validate().is_err());
    }

    #[test]
    fn test_zero_weights_give_even_split() {
        let device = Device::Cpu;
        let vb = VarBuilder::zeros(DType::F32, &device);
        let model = ElaCnnClassifier::from_var_builder(vb, small_config(), device).unwrap();

        let rows = model.predict(&uniform_input(0.5)).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 2);
        assert!((rows[0][0] - 0.5).abs() < 1e-6);
        assert!((rows[0][1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_input_shape_rejected() {
        let device = Device::Cpu;
        let vb = VarBuilder::zeros(DType::F32, &device);
        let model = ElaCnnClassifier::from_var_builder(vb, small_config(), device).unwrap();

        let input = NormalizedTensor::from_vec(vec![0.0; 64 * 64 * 3], 64, 64).unwrap();
        assert!(matches!(
            model.predict(&input),
            Err(ClassifierError::InvalidInput { .. })
        ));
    }

    #[test]
    fn test_load_from_safetensors_with_config() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("best_model.safetensors");
        let config = small_config();

        // Random weights, saved and loaded back through the public path
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        ElaCnnClassifier::from_var_builder(vb, config, Device::Cpu).unwrap();
        varmap.save(&weights).unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            serde_json::to_string(&config).unwrap(),
        )
        .unwrap();

        let model = ElaCnnClassifier::load(&weights, Device::Cpu).unwrap();
        assert_eq!(model.config(), &config);

        let rows = model.predict(&uniform_input(0.25)).unwrap();
        let sum: f32 = rows[0].iter().sum();
        assert!((sum - 1.0).abs() < 1e-4, "softmax sum {}", sum);
        assert!(rows[0].iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_load_missing_weights_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = ElaCnnClassifier::load(&dir.path().join("absent.safetensors"), Device::Cpu);
        assert!(matches!(result, Err(DetectError::ModelLoad { .. })));
    }

    #[test]
    fn test_load_mismatched_weights_fails() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("best_model.safetensors");

        // Saved with 2 filters, loaded with the default 32
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        ElaCnnClassifier::from_var_builder(vb, small_config(), Device::Cpu).unwrap();
        varmap.save(&weights).unwrap();

        let result = ElaCnnClassifier::load(&weights, Device::Cpu);
        assert!(matches!(result, Err(DetectError::ModelLoad { .. })));
    }

    #[test]
    fn test_load_garbage_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let weights = dir.path().join("best_model.safetensors");
        std::fs::write(&weights, b"not safetensors").unwrap();
        let result = ElaCnnClassifier::load(&weights, Device::Cpu);
        assert!(matches!(result, Err(DetectError::ModelLoad { .. })));
    }
}
