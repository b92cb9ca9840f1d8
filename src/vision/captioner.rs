//! Image captioning with a locally loaded BLIP model
//!
//! Weights are fetched from the Hugging Face hub on first use and cached, then
//! the model runs entirely in-process. Captions are generated greedily up to a
//! fixed token budget.

use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::generation::LogitsProcessor;
use candle_transformers::models::blip;
use tokenizers::Tokenizer;

use crate::config::CaptionConfig;
use crate::{Error, Result};

/// BLIP decoder start-of-sequence token
const BOS_TOKEN_ID: u32 = 30522;

/// BLIP decoder end-of-sequence token
const SEP_TOKEN_ID: u32 = 102;

/// Vision encoder input edge, pixels
const IMAGE_SIZE: u32 = 384;

/// CLIP normalization mean, RGB
const IMAGE_MEAN: [f32; 3] = [0.481_454_66, 0.457_827_5, 0.408_210_73];

/// CLIP normalization standard deviation, RGB
const IMAGE_STD: [f32; 3] = [0.268_629_54, 0.261_302_6, 0.275_777_1];

/// Generates natural-language captions for images on disk
pub struct BlipCaptioner {
    model: blip::BlipForConditionalGeneration,
    tokenizer: Tokenizer,
    device: Device,
    max_tokens: usize,
}

impl BlipCaptioner {
    /// Download (or reuse cached) weights and build the captioning model
    ///
    /// # Errors
    ///
    /// Returns error if the hub is unreachable, the weights are malformed, or
    /// no usable compute device exists
    pub fn load(config: &CaptionConfig) -> Result<Self> {
        tracing::info!(model = %config.model_id, "loading caption model");

        let api = hf_hub::api::sync::Api::new().map_err(|e| Error::Model(e.to_string()))?;
        let repo = api.repo(hf_hub::Repo::with_revision(
            config.model_id.clone(),
            hf_hub::RepoType::Model,
            config.revision.clone(),
        ));

        let weights = repo
            .get("model.safetensors")
            .map_err(|e| Error::Model(format!("failed to fetch model weights: {e}")))?;
        let tokenizer_file = repo
            .get("tokenizer.json")
            .map_err(|e| Error::Model(format!("failed to fetch tokenizer: {e}")))?;

        let tokenizer =
            Tokenizer::from_file(tokenizer_file).map_err(|e| Error::Model(e.to_string()))?;

        let device = Device::cuda_if_available(0).map_err(|e| Error::Model(e.to_string()))?;
        tracing::debug!(cuda = device.is_cuda(), "compute device selected");

        let model_config = blip::Config::image_captioning_large();
        // Audited: mmap of hub-fetched safetensors, required by the loader API
        #[allow(unsafe_code)]
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights], DType::F32, &device)
                .map_err(|e| Error::Model(e.to_string()))?
        };
        let model = blip::BlipForConditionalGeneration::new(&model_config, vb)
            .map_err(|e| Error::Model(e.to_string()))?;

        tracing::info!("caption model ready");

        Ok(Self {
            model,
            tokenizer,
            device,
            max_tokens: config.max_tokens,
        })
    }

    /// Caption the image at `path`
    ///
    /// # Errors
    ///
    /// Returns [`Error::ImageNotFound`] when the file does not exist, and
    /// [`Error::Caption`] when decoding or inference fails
    pub fn describe(&mut self, path: &Path) -> Result<String> {
        ensure_image_exists(path)?;

        tracing::info!(image = %path.display(), "captioning image");

        let image = self.load_image(path)?;
        let caption = self
            .generate(&image)
            .map_err(|e| Error::Caption(e.to_string()))?;

        tracing::info!(%caption, "caption generated");
        Ok(caption)
    }

    /// Decode, resize, and normalize the image into a model input tensor
    fn load_image(&self, path: &Path) -> Result<Tensor> {
        let image = image::ImageReader::open(path)
            .map_err(|e| Error::Caption(e.to_string()))?
            .decode()
            .map_err(|e| Error::Caption(e.to_string()))?
            .resize_to_fill(IMAGE_SIZE, IMAGE_SIZE, image::imageops::FilterType::Triangle)
            .to_rgb8();

        let data = image.into_raw();
        let tensor = (|| -> candle_core::Result<Tensor> {
            let pixels = Tensor::from_vec(
                data,
                (IMAGE_SIZE as usize, IMAGE_SIZE as usize, 3),
                &self.device,
            )?
            .permute((2, 0, 1))?
            .to_dtype(DType::F32)?
            .affine(1.0 / 255.0, 0.0)?;

            let mean = Tensor::new(&IMAGE_MEAN, &self.device)?.reshape((3, 1, 1))?;
            let std = Tensor::new(&IMAGE_STD, &self.device)?.reshape((3, 1, 1))?;
            pixels.broadcast_sub(&mean)?.broadcast_div(&std)
        })()
        .map_err(|e| Error::Caption(e.to_string()))?;

        Ok(tensor)
    }

    /// Greedy decode a caption from the encoded image
    fn generate(&mut self, image: &Tensor) -> candle_core::Result<String> {
        self.model.reset_kv_cache();

        let image_embeds = image.unsqueeze(0)?.apply(self.model.vision_model())?;

        let mut logits_processor = LogitsProcessor::new(1337, None, None);
        let mut token_ids = vec![BOS_TOKEN_ID];

        for index in 0..self.max_tokens {
            let context_size = if index > 0 { 1 } else { token_ids.len() };
            let start = token_ids.len().saturating_sub(context_size);
            let input_ids = Tensor::new(&token_ids[start..], &self.device)?.unsqueeze(0)?;

            let logits = self
                .model
                .text_decoder()
                .forward(&input_ids, &image_embeds)?;
            let logits = logits.squeeze(0)?;
            let logits = logits.get(logits.dim(0)? - 1)?;

            let token = logits_processor.sample(&logits)?;
            if token == SEP_TOKEN_ID {
                break;
            }
            token_ids.push(token);
        }

        let caption = self
            .tokenizer
            .decode(&token_ids[1..], true)
            .map_err(|e| candle_core::Error::Msg(e.to_string()))?;

        Ok(caption.trim().to_string())
    }
}

/// Check the image file before any model work happens
fn ensure_image_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(Error::ImageNotFound(PathBuf::from(path)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_reported_before_any_inference() {
        let err = ensure_image_exists(Path::new("/nonexistent/path.jpg")).unwrap_err();
        assert!(matches!(err, Error::ImageNotFound(_)));
        assert_eq!(
            err.to_string(),
            "Error: The file '/nonexistent/path.jpg' was not found."
        );
    }

    #[test]
    fn existing_file_passes_the_check() {
        assert!(ensure_image_exists(Path::new("Cargo.toml")).is_ok());
    }
}
