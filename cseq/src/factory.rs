//! Entry points that validate a caller-supplied sequence and alphabet size, then hand them to
//! the shared [`crate::builder`] to produce a [`WaveletTree`] or [`WaveletMatrix`].

use bitm::{bits_to_store, CombinedSampling};

use crate::error::{Error, Result};
use crate::wavelet_matrix::WaveletMatrix;
use crate::wavelet_tree::WaveletTree;

const MAX_ALPHABET_SIZE: usize = 256;

/// Number of levels (`ceil(log2(alphabet_size))`, clamped to at least 1) a wavelet index over an
/// alphabet of `alphabet_size` symbols needs.
fn levels_for(alphabet_size: usize) -> Result<u8> {
    if alphabet_size == 0 {
        return Err(Error::PreconditionViolation("alphabet_size must be at least 1"));
    }
    if alphabet_size > MAX_ALPHABET_SIZE {
        return Err(Error::PreconditionViolation("alphabet_size must not exceed 256"));
    }
    Ok(bits_to_store((alphabet_size - 1) as u64).max(1))
}

/// Copies `sequence` into a validated buffer, checking that every symbol fits `alphabet_size`.
fn collect_checked<I: IntoIterator<Item = u8>>(sequence: I, alphabet_size: usize) -> Result<Vec<u8>> {
    let symbols: Vec<u8> = sequence.into_iter().collect();
    if symbols.iter().any(|&s| s as usize >= alphabet_size) {
        return Err(Error::PreconditionViolation("symbol is not less than alphabet_size"));
    }
    Ok(symbols)
}

/// Builds a [`WaveletTree`] over `sequence`, whose symbols must all lie in `0..alphabet_size`.
///
/// Fails with [`Error::PreconditionViolation`] if `alphabet_size` is 0, exceeds 256, or some
/// symbol in `sequence` is not strictly less than `alphabet_size`.
pub fn build_wavelet_tree<I: IntoIterator<Item = u8>>(sequence: I, alphabet_size: usize) -> Result<WaveletTree<CombinedSampling>> {
    let levels = levels_for(alphabet_size)?;
    let symbols = collect_checked(sequence, alphabet_size)?;
    Ok(WaveletTree::build(&symbols, levels, alphabet_size))
}

/// Builds a [`WaveletMatrix`] over `sequence`, whose symbols must all lie in `0..alphabet_size`.
///
/// Fails with [`Error::PreconditionViolation`] if `alphabet_size` is 0, exceeds 256, or some
/// symbol in `sequence` is not strictly less than `alphabet_size`.
pub fn build_wavelet_matrix<I: IntoIterator<Item = u8>>(sequence: I, alphabet_size: usize) -> Result<WaveletMatrix<CombinedSampling>> {
    let levels = levels_for(alphabet_size)?;
    let symbols = collect_checked(sequence, alphabet_size)?;
    Ok(WaveletMatrix::build(&symbols, levels, alphabet_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_alphabet() {
        assert_eq!(build_wavelet_matrix([], 0), Err(Error::PreconditionViolation("alphabet_size must be at least 1")));
        assert_eq!(build_wavelet_tree([], 0), Err(Error::PreconditionViolation("alphabet_size must be at least 1")));
    }

    #[test]
    fn rejects_oversized_alphabet() {
        assert_eq!(build_wavelet_matrix([], 257).is_err(), true);
    }

    #[test]
    fn rejects_out_of_range_symbol() {
        assert_eq!(build_wavelet_matrix([0u8, 4], 4).is_err(), true);
        assert_eq!(build_wavelet_tree([0u8, 4], 4).is_err(), true);
    }

    #[test]
    fn single_symbol_alphabet_is_all_zero() {
        let wm = build_wavelet_matrix([0u8; 5], 1).unwrap();
        assert_eq!(wm.bits_per_item(), 1);
        for i in 0..5 {
            assert_eq!(wm.get(i), Some(0));
        }
    }

    #[test]
    fn empty_sequence_builds_and_answers_zero() {
        let wm = build_wavelet_matrix(std::iter::empty(), 4).unwrap();
        assert_eq!(wm.len(), 0);
        assert_eq!(wm.try_rank(0, 0), Some(0));
        assert_eq!(wm.select(1, 0), Err(Error::NotFound));
    }

    #[test]
    fn single_element_sequence() {
        let wm = build_wavelet_matrix([7u8], 8).unwrap();
        let wt = build_wavelet_tree([7u8], 8).unwrap();
        assert_eq!(wm.get(0), Some(7));
        assert_eq!(wm.rank(1, 7), Ok(1));
        assert_eq!(wm.select(1, 7), Ok(0));
        assert_eq!(wt.get(0), Some(7));
        assert_eq!(wt.rank(1, 7), Ok(1));
        assert_eq!(wt.select(1, 7), Ok(0));
    }

    #[test]
    fn alternating_two_symbol_sequence() {
        let symbols = [0u8, 1, 0, 1, 0];
        let wm = build_wavelet_matrix(symbols, 2).unwrap();
        assert_eq!(wm.get(3), Some(1));
        assert_eq!(wm.rank(4, 0), Ok(2));
        assert_eq!(wm.rank(5, 1), Ok(2));
        assert_eq!(wm.select(2, 0), Ok(2));
        assert_eq!(wm.select(2, 1), Ok(3));
    }

    #[test]
    fn ten_symbol_alphabet_sequence() {
        let symbols = [3u8, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5];
        let wm = build_wavelet_matrix(symbols, 10).unwrap();
        assert_eq!(wm.rank(11, 5), Ok(3));
        assert_eq!(wm.select(3, 5), Ok(10));
        assert_eq!(wm.rank(7, 1), Ok(2));
    }

    /// "mississippi" with its alphabet reduced to `0..4` by sorted order (i=0, m=1, p=2, s=3).
    #[test]
    fn mississippi_reduced_alphabet() {
        let symbols = [1u8, 0, 3, 3, 0, 3, 3, 0, 2, 2, 0];
        let wm = build_wavelet_matrix(symbols, 4).unwrap();
        assert_eq!(wm.rank(11, 3), Ok(4));
        assert_eq!(wm.select(4, 0), Ok(10));
        assert_eq!(wm.get(10), Some(0));
    }

    /// P2: rank changes by exactly one at the position of the queried symbol, not at all elsewhere.
    #[test]
    fn rank_access_duality() {
        let symbols = [3u8, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5];
        let wm = build_wavelet_matrix(symbols, 10).unwrap();
        for i in 0..symbols.len() {
            let s = symbols[i];
            assert_eq!(wm.rank(i + 1, s).unwrap(), wm.rank(i, s).unwrap() + 1);
            for c in 0..10u8 {
                if c != s {
                    assert_eq!(wm.rank(i + 1, c), wm.rank(i, c));
                }
            }
        }
    }

    /// P4: the rank of the position a select lands on is always the rank that was asked for.
    #[test]
    fn select_rank_round_trip() {
        let symbols = [3u8, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5];
        let wm = build_wavelet_matrix(symbols, 10).unwrap();
        for c in 0..10u8 {
            let count = wm.rank(symbols.len(), c).unwrap();
            for r in 1..=count {
                let pos = wm.select(r, c).unwrap();
                assert_eq!(wm.rank(pos + 1, c), Ok(r));
            }
        }
    }

    /// P5: rank is monotone in its index argument, and rank at the end equals the symbol's
    /// total occurrence count.
    #[test]
    fn rank_is_monotone_and_matches_histogram() {
        let symbols = [3u8, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5];
        let wm = build_wavelet_matrix(symbols, 10).unwrap();
        for c in 0..10u8 {
            let mut previous = 0;
            for i in 0..=symbols.len() {
                let r = wm.rank(i, c).unwrap();
                assert!(r >= previous);
                previous = r;
            }
            assert_eq!(previous, symbols.iter().filter(|&&s| s == c).count());
        }
    }

    /// P7: two builds of the same sequence produce bitwise-identical serialized output.
    #[test]
    fn build_is_deterministic() {
        let symbols = [3u8, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5];
        let first = build_wavelet_matrix(symbols, 10).unwrap();
        let second = build_wavelet_matrix(symbols, 10).unwrap();
        let mut first_bytes = Vec::new();
        let mut second_bytes = Vec::new();
        first.write(&mut first_bytes).unwrap();
        second.write(&mut second_bytes).unwrap();
        assert_eq!(first_bytes, second_bytes);

        let first_t = build_wavelet_tree(symbols, 10).unwrap();
        let second_t = build_wavelet_tree(symbols, 10).unwrap();
        let mut first_t_bytes = Vec::new();
        let mut second_t_bytes = Vec::new();
        first_t.write(&mut first_t_bytes).unwrap();
        second_t.write(&mut second_t_bytes).unwrap();
        assert_eq!(first_t_bytes, second_t_bytes);
    }

    /// A minimal xorshift64* generator, so this test needs no random-number crate as a
    /// dependency; good enough for generating test data, not for anything security-sensitive.
    struct Xorshift64(u64);

    impl Xorshift64 {
        fn next_u64(&mut self) -> u64 {
            self.0 ^= self.0 << 13;
            self.0 ^= self.0 >> 7;
            self.0 ^= self.0 << 17;
            self.0.wrapping_mul(0x2545F4914F6CDD1D)
        }
    }

    /// Scenario 6: on 5,000,000 uniform random bytes (reduced to an alphabet of 37 symbols),
    /// `select(rank(i+1, s[i]), s[i]) == i` holds for every index `i` (property P3).
    #[test]
    fn large_scale_rank_select_round_trip() {
        const N: usize = 5_000_000;
        const SIGMA: usize = 37;
        let mut gen = Xorshift64(0x243F6A8885A308D3);
        let symbols: Vec<u8> = (0..N).map(|_| (gen.next_u64() % SIGMA as u64) as u8).collect();
        let wm = build_wavelet_matrix(symbols.iter().copied(), SIGMA).unwrap();
        let wt = build_wavelet_tree(symbols.iter().copied(), SIGMA).unwrap();
        for i in 0..N {
            let c = symbols[i];
            let r = wm.rank(i + 1, c).unwrap();
            assert_eq!(wm.select(r, c), Ok(i));
            assert_eq!(wt.select(r, c), Ok(i));
        }
    }
}
