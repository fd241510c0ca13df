/*!
# Asset Allocation Logic

Isolated, thoroughly tested math for splitting a mint run into batches and a
batch into transaction outputs. Kept apart from the pipeline so the rounding
rules can be tested on their own.

## Allocation Hierarchy

1. **Run → Batches**: `count` asset indices are cut into contiguous ranges of
   `batch_size`; the last range may be shorter.
2. **Batch → Outputs**: a batch whose asset set exceeds the per-output cap is
   spread over several outputs, and the batch's lovelace reserve is split
   across them.

## Rounding Rule

Lovelace is split evenly with integer division; the remainder lands entirely
on the last chunk. Downstream balance reconciliation depends on this exact
rule, so `sum(chunks) == total` always holds.

```rust
use hydra_mint_sdk::split_lovelace;

assert_eq!(split_lovelace(10, 3).unwrap(), vec![3, 3, 4]);
```
*/

use crate::ledger::{AssetId, OutputSpec};
use std::ops::Range;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AllocationError {
    #[error("Cannot split into zero parts")]
    ZeroParts,

    #[error("Batch size must be greater than zero")]
    ZeroBatchSize,

    #[error("Per-output asset cap must be greater than zero")]
    ZeroOutputCap,

    #[error("No assets to allocate")]
    NoAssets,
}

pub type AllocationResult<T> = Result<T, AllocationError>;

/// Contiguous asset-index ranges covering `[0, count)` in `batch_size` steps
///
/// The ranges never overlap and leave no gap; there are exactly
/// `ceil(count / batch_size)` of them.
pub fn batch_ranges(count: u64, batch_size: u64) -> AllocationResult<Vec<Range<u64>>> {
    if batch_size == 0 {
        return Err(AllocationError::ZeroBatchSize);
    }

    let mut ranges = Vec::with_capacity(count.div_ceil(batch_size) as usize);
    let mut start = 0;
    while start < count {
        let end = (start + batch_size).min(count);
        ranges.push(start..end);
        start = end;
    }
    Ok(ranges)
}

/// Asset names `{prefix}_{i}` for every index in `range`
pub fn asset_names(prefix: &str, range: Range<u64>) -> Vec<String> {
    range.map(|i| format!("{prefix}_{i}")).collect()
}

/// Split `total` lovelace into `parts` chunks, remainder on the last chunk
///
/// # Errors
///
/// * `ZeroParts` - if `parts` is zero
pub fn split_lovelace(total: u64, parts: usize) -> AllocationResult<Vec<u64>> {
    if parts == 0 {
        return Err(AllocationError::ZeroParts);
    }

    let parts_u64 = parts as u64;
    let share = total / parts_u64;
    let remainder = total % parts_u64;

    let mut chunks = vec![share; parts];
    if let Some(last) = chunks.last_mut() {
        *last += remainder;
    }
    Ok(chunks)
}

/// Number of outputs needed to carry `asset_count` assets at `max_per_output` each
pub fn output_count(asset_count: usize, max_per_output: usize) -> AllocationResult<usize> {
    if max_per_output == 0 {
        return Err(AllocationError::ZeroOutputCap);
    }
    Ok(asset_count.div_ceil(max_per_output))
}

/// Spread a minted asset set over outputs to `address`
///
/// Each output carries at most `max_per_output` assets (quantity 1 each) and a
/// share of `reserve_lovelace` following [`split_lovelace`].
///
/// # Arguments
///
/// * `address` - owner of every asset output
/// * `assets` - the minted assets, in mint order
/// * `reserve_lovelace` - total lovelace locked alongside the assets
/// * `max_per_output` - distinct asset names allowed in one output
pub fn allocate_asset_outputs(
    address: &str,
    assets: &[AssetId],
    reserve_lovelace: u64,
    max_per_output: usize,
) -> AllocationResult<Vec<OutputSpec>> {
    if assets.is_empty() {
        return Err(AllocationError::NoAssets);
    }

    let outputs = output_count(assets.len(), max_per_output)?;
    let lovelace = split_lovelace(reserve_lovelace, outputs)?;

    Ok(assets
        .chunks(max_per_output)
        .zip(lovelace)
        .map(|(chunk, lovelace)| OutputSpec {
            address: address.to_string(),
            lovelace,
            assets: chunk.iter().map(|asset| (asset.clone(), 1)).collect(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lovelace_remainder_on_last_chunk() {
        assert_eq!(split_lovelace(10, 3).unwrap(), vec![3, 3, 4]);
        assert_eq!(split_lovelace(9, 3).unwrap(), vec![3, 3, 3]);
        assert_eq!(split_lovelace(2, 3).unwrap(), vec![0, 0, 2]);
        assert_eq!(split_lovelace(7, 1).unwrap(), vec![7]);
    }

    #[test]
    fn test_split_lovelace_preserves_total() {
        for total in [0u64, 1, 99, 1_000_003, u64::MAX] {
            for parts in 1..=9usize {
                let chunks = split_lovelace(total, parts).unwrap();
                assert_eq!(chunks.len(), parts);
                let sum: u128 = chunks.iter().map(|&c| c as u128).sum();
                assert_eq!(sum, total as u128);
                // all but the last chunk are equal
                assert!(chunks[..parts - 1].iter().all(|&c| c == total / parts as u64));
            }
        }
    }

    #[test]
    fn test_split_lovelace_zero_parts() {
        assert_eq!(split_lovelace(10, 0), Err(AllocationError::ZeroParts));
    }

    #[test]
    fn test_batch_ranges_cover_without_gaps() {
        for (count, batch_size) in [(1u64, 1u64), (10, 3), (200, 100), (10_000, 100), (7, 50)] {
            let ranges = batch_ranges(count, batch_size).unwrap();
            assert_eq!(ranges.len() as u64, count.div_ceil(batch_size));

            let mut expected_start = 0;
            for range in &ranges {
                assert_eq!(range.start, expected_start);
                assert!(range.end > range.start);
                assert!(range.end - range.start <= batch_size);
                expected_start = range.end;
            }
            assert_eq!(expected_start, count);
        }
    }

    #[test]
    fn test_batch_ranges_empty_and_zero_size() {
        assert!(batch_ranges(0, 10).unwrap().is_empty());
        assert_eq!(batch_ranges(10, 0), Err(AllocationError::ZeroBatchSize));
    }

    #[test]
    fn test_asset_names() {
        assert_eq!(
            asset_names("Hydra", 3..6),
            vec!["Hydra_3", "Hydra_4", "Hydra_5"]
        );
    }

    #[test]
    fn test_allocate_single_output() {
        let assets: Vec<AssetId> = asset_names("T", 0..5)
            .into_iter()
            .map(|name| AssetId::new("pol", name))
            .collect();

        let outputs = allocate_asset_outputs("addr_test1", &assets, 1_600_000, 80).unwrap();
        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].lovelace, 1_600_000);
        assert_eq!(outputs[0].assets.len(), 5);
    }

    #[test]
    fn test_allocate_fragmented_outputs() {
        // 500 assets at 80 per output -> 7 outputs
        let assets: Vec<AssetId> = asset_names("T", 0..500)
            .into_iter()
            .map(|name| AssetId::new("pol", name))
            .collect();

        let outputs = allocate_asset_outputs("addr_test1", &assets, 10_000_003, 80).unwrap();
        assert_eq!(outputs.len(), 7);
        assert_eq!(outputs.iter().map(|o| o.assets.len()).sum::<usize>(), 500);
        assert_eq!(outputs[6].assets.len(), 20);
        assert_eq!(outputs.iter().map(|o| o.lovelace).sum::<u64>(), 10_000_003);
        assert_eq!(outputs[0].lovelace, 1_428_571);
        assert_eq!(outputs[6].lovelace, 1_428_571 + 10_000_003 % 7);
    }

    #[test]
    fn test_allocate_rejects_empty_and_zero_cap() {
        assert_eq!(
            allocate_asset_outputs("addr", &[], 10, 80),
            Err(AllocationError::NoAssets)
        );
        let assets = vec![AssetId::new("pol", "a")];
        assert_eq!(
            allocate_asset_outputs("addr", &assets, 10, 0),
            Err(AllocationError::ZeroOutputCap)
        );
    }
}
