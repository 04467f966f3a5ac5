//! Masked Language Model Inference
//!
//! The sequence recommender asks a masked language model for the most likely
//! tokens after a user's recent titles. `MaskedLanguageModel` is the seam;
//! `OnnxMaskedLm` runs a BERT-style export through ONNX Runtime when the
//! `onnx` feature is enabled.

use crate::config::SequenceConfig;
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

const CLS_TOKEN: &str = "[CLS]";
const SEP_TOKEN: &str = "[SEP]";
const PAD_TOKEN: &str = "[PAD]";
const MASK_TOKEN: &str = "[MASK]";
const UNK_TOKEN: &str = "[UNK]";
const MAX_WORD_CHARS: usize = 100;

/// Pretrained masked language model
pub trait MaskedLanguageModel: Send + Sync {
    /// Top `top_n` vocabulary tokens predicted at the masked final position
    /// of the encoded title sequence, best first
    fn predict_tokens(&self, titles: &[String], top_n: usize) -> Result<Vec<String>>;
}

/// Encoded model input with one masked position
#[derive(Debug, Clone, PartialEq)]
pub struct MaskedInput {
    pub input_ids: Vec<i64>,
    pub attention_mask: Vec<i64>,
    pub mask_position: usize,
}

/// Uncased WordPiece vocabulary and tokenizer
#[derive(Debug, Clone)]
pub struct WordPieceVocab {
    tokens: Vec<String>,
    ids: HashMap<String, i64>,
    cls: i64,
    sep: i64,
    pad: i64,
    mask: i64,
    unk: i64,
}

impl WordPieceVocab {
    /// Load a `vocab.txt` with one token per line
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read vocabulary {}", path.display()))?;
        Self::from_tokens(raw.lines().map(|line| line.trim_end().to_string()).collect())
    }

    pub fn from_tokens(tokens: Vec<String>) -> Result<Self> {
        let ids: HashMap<String, i64> = tokens
            .iter()
            .enumerate()
            .map(|(idx, token)| (token.clone(), idx as i64))
            .collect();

        let special = |token: &str| {
            ids.get(token)
                .copied()
                .ok_or_else(|| anyhow!("Vocabulary is missing {}", token))
        };

        Ok(Self {
            cls: special(CLS_TOKEN)?,
            sep: special(SEP_TOKEN)?,
            pad: special(PAD_TOKEN)?,
            mask: special(MASK_TOKEN)?,
            unk: special(UNK_TOKEN)?,
            tokens,
            ids,
        })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token(&self, id: usize) -> Option<&str> {
        self.tokens.get(id).map(String::as_str)
    }

    /// Lowercase, split on whitespace and punctuation, then greedy
    /// longest-match WordPiece
    pub fn tokenize(&self, text: &str) -> Vec<i64> {
        let lowered = text.to_lowercase();
        let mut ids = Vec::new();

        for chunk in lowered.split_whitespace() {
            let mut word = String::new();
            for c in chunk.chars() {
                if c.is_alphanumeric() {
                    word.push(c);
                } else {
                    self.push_word(&word, &mut ids);
                    word.clear();
                    self.push_word(c.encode_utf8(&mut [0; 4]), &mut ids);
                }
            }
            self.push_word(&word, &mut ids);
        }

        ids
    }

    fn push_word(&self, word: &str, ids: &mut Vec<i64>) {
        if word.is_empty() {
            return;
        }

        let chars: Vec<char> = word.chars().collect();
        if chars.len() > MAX_WORD_CHARS {
            ids.push(self.unk);
            return;
        }

        let mut pieces = Vec::new();
        let mut start = 0;
        while start < chars.len() {
            let mut end = chars.len();
            let mut found = None;
            while start < end {
                let mut piece: String = chars[start..end].iter().collect();
                if start > 0 {
                    piece.insert_str(0, "##");
                }
                if let Some(&id) = self.ids.get(&piece) {
                    found = Some(id);
                    break;
                }
                end -= 1;
            }

            match found {
                Some(id) => {
                    pieces.push(id);
                    start = end;
                }
                None => {
                    ids.push(self.unk);
                    return;
                }
            }
        }

        ids.extend(pieces);
    }

    /// `[CLS] t1 [SEP] t2 ... [SEP]`, truncated and padded to `max_len`, with
    /// the last non-padding position replaced by `[MASK]`
    pub fn encode_masked(&self, titles: &[String], max_len: usize) -> MaskedInput {
        let max_len = max_len.max(2);

        let mut body = Vec::new();
        for (idx, title) in titles.iter().enumerate() {
            if idx > 0 {
                body.push(self.sep);
            }
            body.extend(self.tokenize(title));
        }
        body.truncate(max_len - 2);

        let mut input_ids = Vec::with_capacity(max_len);
        input_ids.push(self.cls);
        input_ids.extend(body);
        input_ids.push(self.sep);

        let mask_position = input_ids.len() - 1;
        input_ids[mask_position] = self.mask;

        let mut attention_mask = vec![1; input_ids.len()];
        attention_mask.resize(max_len, 0);
        input_ids.resize(max_len, self.pad);

        MaskedInput {
            input_ids,
            attention_mask,
            mask_position,
        }
    }

    /// Tokens for the `top_n` highest logits, best first
    pub fn top_tokens(&self, logits: &[f32], top_n: usize) -> Vec<String> {
        let mut ranked: Vec<(usize, f32)> = logits.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        ranked
            .into_iter()
            .filter_map(|(idx, _)| self.token(idx).map(str::to_string))
            .take(top_n)
            .collect()
    }
}

/// Lock a shared session without queueing behind a running inference
#[cfg_attr(not(feature = "onnx"), allow(dead_code))]
pub(crate) fn try_acquire<T>(lock: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    match lock.try_lock() {
        Ok(guard) => Ok(guard),
        Err(TryLockError::WouldBlock) => Err(anyhow!("model session busy")),
        Err(TryLockError::Poisoned(_)) => Err(anyhow!("model session lock poisoned")),
    }
}

#[cfg(feature = "onnx")]
pub use onnx::OnnxMaskedLm;

#[cfg(feature = "onnx")]
mod onnx {
    use super::{try_acquire, MaskedLanguageModel, WordPieceVocab};
    use anyhow::{anyhow, Result};
    use ndarray::{Array2, Axis};
    use ort::{
        session::{builder::GraphOptimizationLevel, Session},
        value::Tensor,
    };
    use std::path::Path;
    use std::sync::Mutex;

    /// BERT-style masked LM exported to ONNX
    pub struct OnnxMaskedLm {
        session: Mutex<Session>,
        vocab: WordPieceVocab,
        max_sequence_length: usize,
    }

    impl OnnxMaskedLm {
        pub fn new(
            model_path: impl AsRef<Path>,
            vocab_path: impl AsRef<Path>,
            max_sequence_length: usize,
        ) -> Result<Self> {
            let start = std::time::Instant::now();

            let session = Session::builder()?
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_intra_threads(4)?
                .commit_from_file(model_path)?;
            let vocab = WordPieceVocab::from_file(vocab_path)?;

            tracing::info!(
                "ONNX masked LM loaded in {:.2}s (vocab={})",
                start.elapsed().as_secs_f64(),
                vocab.len()
            );

            Ok(Self {
                session: Mutex::new(session),
                vocab,
                max_sequence_length,
            })
        }
    }

    impl MaskedLanguageModel for OnnxMaskedLm {
        fn predict_tokens(&self, titles: &[String], top_n: usize) -> Result<Vec<String>> {
            let input = self.vocab.encode_masked(titles, self.max_sequence_length);
            let len = input.input_ids.len();

            let input_ids = Array2::from_shape_vec((1, len), input.input_ids)?;
            let attention_mask = Array2::from_shape_vec((1, len), input.attention_mask)?;

            let mut session = try_acquire(&self.session)?;
            let outputs = session.run(ort::inputs![
                "input_ids" => Tensor::from_array(input_ids)?,
                "attention_mask" => Tensor::from_array(attention_mask)?
            ])?;

            // Shape: [batch, seq_len, vocab]
            let logits = outputs["logits"].try_extract_array::<f32>()?;
            if logits.ndim() != 3 {
                return Err(anyhow!("Unexpected logits shape: {:?}", logits.shape()));
            }
            let row: Vec<f32> = logits
                .index_axis(Axis(0), 0)
                .index_axis(Axis(0), input.mask_position)
                .iter()
                .copied()
                .collect();

            Ok(self.vocab.top_tokens(&row, top_n))
        }
    }
}

/// Build the configured model handle, if any.
///
/// A missing or unloadable model is not fatal: the sequence path falls back
/// to the hybrid blender.
pub fn load_model(config: &SequenceConfig) -> Option<Arc<dyn MaskedLanguageModel>> {
    let (model_path, vocab_path) = match (&config.model_path, &config.vocab_path) {
        (Some(model), Some(vocab)) => (model, vocab),
        _ => {
            tracing::info!("No masked LM configured, sequence path uses hybrid fallback");
            return None;
        }
    };

    #[cfg(feature = "onnx")]
    {
        match OnnxMaskedLm::new(model_path, vocab_path, config.max_sequence_length) {
            Ok(model) => Some(Arc::new(model)),
            Err(e) => {
                tracing::warn!(
                    model = %model_path.display(),
                    "Failed to load masked LM: {:#}",
                    e
                );
                None
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        tracing::warn!(
            model = %model_path.display(),
            vocab = %vocab_path.display(),
            "Masked LM configured but the onnx feature is disabled"
        );
        None
    }
}
