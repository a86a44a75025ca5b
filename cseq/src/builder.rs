//! Prefix-counting construction shared by [`crate::WaveletTree`] and [`crate::WaveletMatrix`].
//!
//! Builds, level by level, the packed bit content of a wavelet index from a stream of bytes,
//! following the histogram-then-bordering scheme used by prefix-counting wavelet tree/matrix
//! builders: one pass computes the root level directly from the top bit of every symbol and a
//! histogram of symbol counts, then each deeper level is derived from the previous level's
//! histogram by a bordering pass (an exclusive prefix scan for the tree layout, a
//! bit-reversal-ordered prefix scan for the matrix layout) followed by a scatter pass that writes
//! each symbol's bit at its level.
//!
//! Levels are built into one contiguous scratch buffer (level `l` occupying bits
//! `[l*len, (l+1)*len)`, mirroring the layout the bordering arithmetic below is expressed in) and
//! then materialized into independent, word-aligned bit vectors, one per level, so that each level
//! can carry its own [`bitm::RankSelect101111`] index.

use bitm::{BitAccess, BitVec};

use crate::bitreverse::bit_reversal_permutation;

/// The raw per-level content produced by [`build`].
pub(crate) struct Built {
    /// One independent, word-aligned bit vector per level, each holding `len` significant bits
    /// plus one padding bit (so that `rank(len)` never indexes past the end of the content).
    pub(crate) levels: Box<[Box<[u64]>]>,
    /// For each level, the start offset (local to that level's bit vector) of every node's
    /// segment at that level, plus a trailing sentinel equal to `len`. Level 0 (the root) always
    /// has the trivial `[0, len]`. The matrix layout only ever needs `node_starts[level][1]`
    /// (the number of zeros at that level); the tree layout uses the whole array to map a
    /// node-local index to a position in the level's bit vector.
    pub(crate) node_starts: Box<[Box<[usize]>]>,
}

/// Builds the `levels`-level content for `len` `symbols`, laid out for the tree interval-descent
/// query scheme if `matrix` is `false`, or for the matrix position-remap scheme if `true`.
pub(crate) fn build(symbols: &[u8], len: usize, levels: u8, matrix: bool) -> Built {
    assert!(levels >= 1 && levels <= 8);
    assert_eq!(symbols.len(), len);

    let mut raw = Box::<[u64]>::with_zeroed_bits(levels as usize * len);
    let mut node_starts: Vec<Option<Box<[usize]>>> = vec![None; levels as usize];

    // Level 0 (root): single node spanning the whole sequence, written directly from the most
    // significant bit of every symbol while a histogram of full symbol values is accumulated.
    let mut hist = vec![0usize; 1usize << levels];
    {
        let mask = 1u64 << (levels - 1);
        let shift_first_right = 64 - levels as u32;
        let mut word_idx = 0;
        let mut chunks = symbols.chunks_exact(64);
        for chunk in &mut chunks {
            let mut bit_block = 0u64;
            for &s in chunk {
                bit_block >>= 1;
                hist[s as usize] += 1;
                bit_block |= ((s as u64) & mask) << shift_first_right;
            }
            raw[word_idx] = bit_block;
            word_idx += 1;
        }
        let remainder = chunks.remainder();
        if !remainder.is_empty() {
            let mut bit_block = 0u64;
            for &s in remainder {
                hist[s as usize] += 1;
                bit_block >>= 1;
                bit_block |= ((s as u64) & mask) << shift_first_right;
            }
            bit_block >>= 64 - remainder.len() as u32;
            raw[word_idx] = bit_block;
        }
    }
    node_starts[0] = Some(vec![0, len].into_boxed_slice());

    // Deeper levels: pairwise-sum the histogram down to this level's alphabet size, compute each
    // node's write cursor (the border), then scatter every symbol's bit to its node's cursor.
    let mut borders = vec![0usize; 1usize << levels];
    for level in (1..levels).rev() {
        let cur_alphabet_size = 1usize << level;
        for i in 0..cur_alphabet_size {
            borders[i] = hist[2 * i] + hist[2 * i + 1];
        }
        hist[..cur_alphabet_size].copy_from_slice(&borders[..cur_alphabet_size]);

        let level_base = level as usize * len;
        if matrix {
            let brv = bit_reversal_permutation(level);
            borders[brv[0] as usize] = level_base;
            for i in 1..cur_alphabet_size {
                let prev = brv[i - 1] as usize;
                let cur = brv[i] as usize;
                borders[cur] = hist[prev] + borders[prev];
            }
        } else {
            let mut acc = level_base;
            for i in 0..cur_alphabet_size {
                let count = hist[i];
                borders[i] = acc;
                acc += count;
            }
        }

        let mut starts = vec![0usize; cur_alphabet_size + 1];
        starts[..cur_alphabet_size].copy_from_slice(&borders[..cur_alphabet_size]);
        starts[cur_alphabet_size] = level_base + len;
        for s in &mut starts { *s -= level_base; }
        node_starts[level as usize] = Some(starts.into_boxed_slice());

        let shift_word_for_bit = (levels - level - 1) as u32;
        for &s in symbols {
            let symbol_prefix = (s as usize) >> shift_word_for_bit;
            let position = borders[symbol_prefix >> 1];
            borders[symbol_prefix >> 1] += 1;
            raw.init_bit(position, symbol_prefix & 1 != 0);
        }
    }

    // The bordering loop above never visits level 0 itself (a single root node has no bordering
    // to do), but by the time it finishes, `hist[0]` has been repeatedly pairwise-merged down to
    // exactly the count of symbols whose top bit is 0 — precisely the root's zero count the matrix
    // layout needs as its `zeros_before`. (For `levels == 1` the loop never runs at all, but `hist`
    // still has its untouched two-bucket initial population, which already equals the same thing.)
    if matrix {
        node_starts[0] = Some(vec![0, hist[0]].into_boxed_slice());
    }

    let levels_content: Box<[Box<[u64]>]> = (0..levels as usize)
        .map(|level| extract_level(&raw, level, len))
        .collect();
    let node_starts: Box<[Box<[usize]>]> = node_starts.into_iter().map(|o| o.unwrap()).collect();

    Built { levels: levels_content, node_starts }
}

/// Copies the `len` bits occupied by `level` out of the shared construction buffer `raw` into a
/// standalone, word-aligned bit vector with one extra padding bit.
fn extract_level(raw: &[u64], level: usize, len: usize) -> Box<[u64]> {
    let mut out = Box::<[u64]>::with_zeroed_bits(len + 1);
    let base = level * len;
    for i in 0..len {
        if raw.get_bit(base + i) {
            out.init_bit(i, true);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_level_matches_input() {
        let symbols = [1u8, 0, 1, 1, 0];
        let built = build(&symbols, symbols.len(), 1, true);
        assert_eq!(built.levels.len(), 1);
        for (i, &s) in symbols.iter().enumerate() {
            assert_eq!(built.levels[0].get_bit(i), s != 0);
        }
    }

    #[test]
    fn matrix_level_zero_count_matches_histogram() {
        let symbols = [0u8, 1, 2, 3, 0, 1, 2, 3, 0];
        let built = build(&symbols, symbols.len(), 2, true);
        // level 1's zero count should equal the number of symbols whose 2nd bit is 0
        let zeros = symbols.iter().filter(|&&s| s & 1 == 0).count();
        assert_eq!(built.node_starts[1][1], zeros);
    }

    #[test]
    fn matrix_root_zero_count_matches_histogram() {
        let symbols = [3u8, 1, 0, 2, 3, 3, 1, 0];
        let built = build(&symbols, symbols.len(), 2, true);
        let zeros = symbols.iter().filter(|&&s| s >> 1 == 0).count();
        assert_eq!(built.node_starts[0][1], zeros);
    }

    #[test]
    fn matrix_root_zero_count_single_bit_alphabet() {
        let symbols = [1u8, 0, 1, 1, 0, 0, 0];
        let built = build(&symbols, symbols.len(), 1, true);
        let zeros = symbols.iter().filter(|&&s| s == 0).count();
        assert_eq!(built.node_starts[0][1], zeros);
    }

    #[test]
    fn tree_node_starts_partition_the_level() {
        let symbols = [0u8, 1, 2, 3, 0, 1, 2, 3, 0];
        let built = build(&symbols, symbols.len(), 2, false);
        let starts = &built.node_starts[1];
        assert_eq!(starts[0], 0);
        assert_eq!(*starts.last().unwrap(), symbols.len());
        assert!(starts.windows(2).all(|w| w[0] <= w[1]));
    }
}
