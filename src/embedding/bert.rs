use candle::{DType, Device, Result, Tensor};
use candle_core as candle;
use candle_core::IndexOp;
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use std::path::Path;

/// Encoder plus a single-logit classifier over the `[CLS]` position.
struct CrossEncoderHead {
    encoder: BertModel,
    classifier: Linear,
}

impl CrossEncoderHead {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        // Exported checkpoints nest the encoder under different prefixes.
        let encoder = ["bert", "roberta"]
            .into_iter()
            .find(|prefix| vb.contains_tensor(&format!("{prefix}.embeddings.word_embeddings.weight")))
            .map(|prefix| BertModel::load(vb.pp(prefix), config))
            .unwrap_or_else(|| BertModel::load(vb.clone(), config))?;

        let classifier = candle_nn::linear(config.hidden_size, 1, vb.pp("classifier"))?;

        Ok(Self {
            encoder,
            classifier,
        })
    }

    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: Option<&Tensor>,
    ) -> Result<Tensor> {
        let hidden = self
            .encoder
            .forward(input_ids, token_type_ids, attention_mask)?;
        let cls = hidden.i((.., 0, ..))?;
        self.classifier.forward(&cls)
    }
}

/// Shareable handle to a loaded cross-encoder. Cloning shares the weights.
#[derive(Clone)]
pub struct BertClassifier(std::sync::Arc<CrossEncoderHead>);

impl BertClassifier {
    /// Loads `config.json` and `model.safetensors` from `model_dir`.
    pub fn load<P: AsRef<Path>>(model_dir: P, device: &Device) -> Result<Self> {
        let model_dir = model_dir.as_ref();
        let config_content = std::fs::read_to_string(model_dir.join("config.json"))?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| candle::Error::Msg(format!("Failed to parse config: {}", e)))?;

        let weights_path = model_dir.join("model.safetensors");
        let vb =
            unsafe { VarBuilder::from_mmaped_safetensors(&[weights_path], DType::F32, device)? };

        Ok(Self(std::sync::Arc::new(CrossEncoderHead::load(vb, &config)?)))
    }

    /// Returns one logit per row, shape `(batch,)`.
    pub fn score_batch(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Vec<f32>> {
        self.0
            .forward(input_ids, token_type_ids, Some(attention_mask))?
            .flatten_all()?
            .to_vec1::<f32>()
    }
}
