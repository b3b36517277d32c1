use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::Tokenizer;

/// Encode one text into `[1, T]` id and attention-mask tensors. Truncation is
/// configured on the tokenizer itself, so no padding is applied here.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, device: &Device) -> Result<(Tensor, Tensor)> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let ids = enc.get_ids();
    let mask = enc.get_attention_mask();
    let input_ids = Tensor::new(ids, device)?.unsqueeze(0)?;
    let attention_mask = Tensor::new(mask, device)?.unsqueeze(0)?;
    Ok((input_ids, attention_mask))
}
