// ============================================================
// Layer 4: Seq2Seq Batcher
// ============================================================
// Converts a Vec<TokenPair> into tensors the model accepts.
//
// Unlike a fixed-length pipeline, source and target sequences
// arrive unpadded and with different lengths, so this batcher
// pads dynamically to the longest sequence on each side:
//
//   src: [5, 6, 7]      → [5, 6, 7]
//        [8, 9]         → [8, 9, 0]        (pad = 0)
//
// and builds the masks that go with the padded tensors:
//
//   src_mask  [batch, 1, 1, src_len]        padding only
//   tgt_mask  [batch, 1, tgt_len, tgt_len]  causal AND padding
//
// Then, as before, all rows are flattened into one Vec and
// shaped as [batch, len].
//
// Reference: Burn Book §4 (Batcher)
//            Vaswani et al. (2017) §5.1 (batching by length)

use burn::prelude::*;

use crate::domain::{ModelError, Result, SpecialTokens, TokenPair};
use crate::ml::{mask::AttentionMask, model::TransformerConfig};

// ─── Seq2SeqBatch ─────────────────────────────────────────────────────────────
/// A padded batch of source/target pairs plus their attention masks.
#[derive(Debug, Clone)]
pub struct Seq2SeqBatch<B: Backend> {
    /// Source ids - shape: [batch_size, src_len]
    pub src: Tensor<B, 2, Int>,

    /// Target (decoder input) ids - shape: [batch_size, tgt_len]
    pub tgt: Tensor<B, 2, Int>,

    /// Hides padded source keys from every query
    pub src_mask: AttentionMask<B>,

    /// Hides future and padded target keys
    pub tgt_mask: AttentionMask<B>,
}

// ─── Seq2SeqBatcher ───────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct Seq2SeqBatcher<B: Backend> {
    pub device:      B::Device,
    pub special:     SpecialTokens,
    pub max_src_len: usize,
    pub max_tgt_len: usize,
}

impl<B: Backend> Seq2SeqBatcher<B> {
    pub fn new(device: B::Device, special: SpecialTokens, max_src_len: usize, max_tgt_len: usize) -> Self {
        Self { device, special, max_src_len, max_tgt_len }
    }

    /// Limits taken from the model's positional tables
    pub fn for_config(config: &TransformerConfig, special: SpecialTokens, device: B::Device) -> Self {
        Self::new(device, special, config.src_seq_len, config.tgt_seq_len)
    }

    pub fn batch(&self, items: Vec<TokenPair>) -> Result<Seq2SeqBatch<B>> {
        if items.is_empty() {
            return Err(ModelError::EmptySequence("batch"));
        }

        let src_rows: Vec<&[u32]> = items.iter().map(|p| p.src.as_slice()).collect();
        let tgt_rows: Vec<&[u32]> = items.iter().map(|p| p.tgt.as_slice()).collect();

        let src = self.pad("source", &src_rows, self.max_src_len)?;
        let tgt = self.pad("target", &tgt_rows, self.max_tgt_len)?;

        let src_mask = AttentionMask::padding(src.clone(), self.special.pad);
        let tgt_mask = AttentionMask::causal_padding(tgt.clone(), self.special.pad);

        tracing::debug!("Batched {} pairs: src {:?}, tgt {:?}", items.len(), src.dims(), tgt.dims());

        Ok(Seq2SeqBatch { src, tgt, src_mask, tgt_mask })
    }

    /// Right-pad every row to the longest one and stack into [rows, len].
    fn pad(&self, side: &'static str, rows: &[&[u32]], max_len: usize) -> Result<Tensor<B, 2, Int>> {
        let mut len = 0;
        for row in rows {
            if row.is_empty() {
                return Err(ModelError::EmptySequence(side));
            }
            if row.len() > max_len {
                return Err(ModelError::SequenceTooLong { len: row.len(), max: max_len });
            }
            len = len.max(row.len());
        }

        // i64 holds every u32 id unchanged
        let pad = self.special.pad as i64;
        let flat: Vec<i64> = rows
            .iter()
            .flat_map(|row| {
                row.iter()
                    .map(|&id| id as i64)
                    .chain(std::iter::repeat(pad).take(len - row.len()))
            })
            .collect();

        Ok(Tensor::from_data(TensorData::new(flat, [rows.len(), len]), &self.device))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_utils::{device, TestBackend};

    fn batcher() -> Seq2SeqBatcher<TestBackend> {
        Seq2SeqBatcher::new(device(), SpecialTokens::default(), 6, 5)
    }

    fn pair(src: &[u32], tgt: &[u32]) -> TokenPair {
        TokenPair::new(src, tgt)
    }

    fn ints<const D: usize>(t: Tensor<TestBackend, D, Int>) -> Vec<i64> {
        t.into_data().to_vec::<i64>().unwrap()
    }

    fn bools(mask: &AttentionMask<TestBackend>) -> Vec<bool> {
        mask.allowed().into_data().to_vec::<bool>().unwrap()
    }

    #[test]
    fn test_pads_each_side_to_its_longest_row() {
        let batch = batcher()
            .batch(vec![
                pair(&[5, 6, 7], &[1, 9]),
                pair(&[8, 9], &[1, 3, 4]),
            ])
            .unwrap();

        assert_eq!(batch.src.dims(), [2, 3]);
        assert_eq!(batch.tgt.dims(), [2, 3]);
        assert_eq!(ints(batch.src), vec![5, 6, 7, 8, 9, 0]);
        assert_eq!(ints(batch.tgt), vec![1, 9, 0, 1, 3, 4]);
    }

    #[test]
    fn test_masks_follow_padding() {
        let batch = batcher()
            .batch(vec![
                pair(&[5, 6, 7], &[1, 9]),
                pair(&[8, 9], &[1, 3, 4]),
            ])
            .unwrap();

        assert_eq!(batch.src_mask.dims(), [2, 1, 1, 3]);
        assert_eq!(bools(&batch.src_mask), vec![true, true, true, true, true, false]);

        assert_eq!(batch.tgt_mask.dims(), [2, 1, 3, 3]);
        #[rustfmt::skip]
        let expected = vec![
            true, false, false,
            true, true,  false,
            true, true,  false,
            true, false, false,
            true, true,  false,
            true, true,  true,
        ];
        assert_eq!(bools(&batch.tgt_mask), expected);
    }

    #[test]
    fn test_rejects_empty_and_oversized_input() {
        let b = batcher();
        assert_eq!(b.batch(vec![]).unwrap_err(), ModelError::EmptySequence("batch"));
        assert_eq!(
            b.batch(vec![pair(&[], &[1])]).unwrap_err(),
            ModelError::EmptySequence("source")
        );
        assert_eq!(
            b.batch(vec![pair(&[3], &[1, 2, 3, 4, 5, 6])]).unwrap_err(),
            ModelError::SequenceTooLong { len: 6, max: 5 }
        );
    }

    #[test]
    fn test_large_ids_are_kept_exactly() {
        let special = SpecialTokens { pad: 4_000_000_000, ..SpecialTokens::default() };
        let batch = Seq2SeqBatcher::<TestBackend>::new(device(), special, 4, 4)
            .batch(vec![
                pair(&[3_000_000_000, 5], &[1]),
                pair(&[6], &[1]),
            ])
            .unwrap();
        assert_eq!(ints(batch.src), vec![3_000_000_000, 5, 6, 4_000_000_000]);
        assert_eq!(bools(&batch.src_mask), vec![true, true, true, false]);
    }

    #[test]
    fn test_limits_come_from_config() {
        let config = TransformerConfig::new(10, 10, 7, 3);
        let b = Seq2SeqBatcher::<TestBackend>::for_config(&config, SpecialTokens::default(), device());
        assert_eq!((b.max_src_len, b.max_tgt_len), (7, 3));
    }
}
