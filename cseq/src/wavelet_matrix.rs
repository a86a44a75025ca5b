//! Wavelet matrix representation of a small-alphabet byte sequence.
//!
//! At each level the bits of all symbols sharing the bits already written are grouped into a
//! "zeros" block followed by a "ones" block — the defining property of the wavelet *matrix*
//! layout (as opposed to the wavelet *tree* layout of [`crate::WaveletTree`], where each node's
//! bits stay in their own contiguous segment). That single `zeros_before` count per level, rather
//! than a per-node array, is all a matrix query needs to move between levels.

use std::{io, ops::{Deref, DerefMut}};

use binout::{AsIs, Serializer};
use bitm::{BitAccess, BitVec, RankSelect101111, CombinedSampling, Rank, Select, Select0, SelectForRank101111, Select0ForRank101111, ceiling_div};
use dyn_size_of::GetSize;

use crate::builder;
use crate::error::{Error, Result};

struct Level<S = CombinedSampling, BV = Box<[u64]>> {
    content: RankSelect101111<S, S, BV>,
    zeros_before: usize,
}

impl<S, BV> GetSize for Level<S, BV> where RankSelect101111<S, S, BV>: GetSize {
    fn size_bytes_dyn(&self) -> usize { self.content.size_bytes_dyn() }
    const USES_DYN_MEM: bool = true;
}

impl<S, BV> Level<S, BV> where RankSelect101111<S, S, BV>: From<BV> {
    #[inline] fn new(content: BV, zeros_before: usize) -> Self {
        Self { content: content.into(), zeros_before }
    }
}

impl<S, BV> Level<S, BV> where S: SelectForRank101111, BV: Deref<Target = [u64]> {
    #[inline] fn try_select(&self, rank: usize, len: usize) -> Option<usize> {
        self.content.try_select(rank).filter(|i| *i < len)
    }
}

impl<S, BV> Level<S, BV> where S: Select0ForRank101111, BV: Deref<Target = [u64]> {
    #[inline] fn try_select0(&self, rank: usize, len: usize) -> Option<usize> {
        self.content.try_select0(rank).filter(|i| *i < len)
    }
}

/// A wavelet matrix over a sequence of `len` bytes, each using `bits_per_item` bits (so
/// representing values in `0..2^bits_per_item`).
///
/// Supports, in `O(bits_per_item)` time:
/// - *access* — the symbol at a given index, see [`Self::get`];
/// - *rank* — the number of occurrences of a symbol up to a given index, see [`Self::rank`];
/// - *select* — the index of the `rank`-th occurrence of a symbol, see [`Self::select`].
///
/// By default [`bitm::CombinedSampling`] is used as the select strategy `S` for the internal bit
/// vectors (see [`bitm::RankSelect101111`]); this can be changed to [`bitm::BinaryRankSearch`] to
/// save a bit of space at the cost of slower *select* queries.
///
/// Based on: Claude, F., Navarro, G. "The Wavelet Matrix", SPIRE 2012.
pub struct WaveletMatrix<S = CombinedSampling, BV = Box<[u64]>> {
    levels: Box<[Level<S, BV>]>,
    len: usize,
    alphabet_size: usize,
}

impl<S, BV> WaveletMatrix<S, BV> {
    /// Returns the number of stored symbols.
    #[inline] pub fn len(&self) -> usize { self.len }

    /// Returns whether the sequence is empty.
    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Returns the number of bits used to represent each symbol (the base-2 logarithm, rounded
    /// up, of the alphabet size this matrix was built with).
    #[inline] pub fn bits_per_item(&self) -> u8 { self.levels.len() as u8 }

    /// Returns the alphabet size this matrix was built with. Every valid symbol lies in
    /// `0..alphabet_size`, a possibly tighter bound than `1 << bits_per_item()`.
    #[inline] pub fn alphabet_size(&self) -> usize { self.alphabet_size }
}

impl<S: SelectForRank101111 + Select0ForRank101111, BV: BitVec + DerefMut<Target = [u64]> + From<Box<[u64]>>> WaveletMatrix<S, BV> {
    /// Builds a wavelet matrix over `symbols`, each of which must be strictly less than
    /// `alphabet_size`. `bits_per_item` must be `bits_to_store(alphabet_size - 1)` (clamped to at
    /// least 1) and in `1..=8`.
    pub(crate) fn build(symbols: &[u8], bits_per_item: u8, alphabet_size: usize) -> Self {
        let built = builder::build(symbols, symbols.len(), bits_per_item, true);
        let levels = built.levels.into_vec().into_iter().zip(built.node_starts.iter())
            .map(|(content, starts)| Level::new(BV::from(content), starts[1]))
            .collect();
        Self { levels, len: symbols.len(), alphabet_size }
    }
}

impl<S, BV> WaveletMatrix<S, BV> where S: SelectForRank101111 + Select0ForRank101111, BV: Deref<Target = [u64]> {

    /// Returns the symbol at `index`. The result is undefined if `index` is out of bounds.
    pub unsafe fn get_unchecked(&self, mut index: usize) -> u8 {
        let mut result: u8 = 0;
        for level in self.levels.iter() {
            result <<= 1;
            if level.content.content.get_bit(index) {
                result |= 1;
                index = level.content.rank_unchecked(index) + level.zeros_before;
            } else {
                index = level.content.rank0_unchecked(index);
            }
        }
        result
    }

    /// Returns the symbol at `index`, or `None` if `index` is out of bounds.
    #[inline] pub fn get(&self, index: usize) -> Option<u8> {
        (index < self.len()).then(|| unsafe { self.get_unchecked(index) })
    }

    /// Returns the symbol at `index`, or [`Error::PreconditionViolation`] if `index` is out of
    /// bounds.
    #[inline] pub fn get_or_err(&self, index: usize) -> Result<u8> {
        self.get(index).ok_or(Error::PreconditionViolation("index out of bounds"))
    }

    /// Returns the symbol at `index`, or panics if `index` is out of bounds.
    #[inline] pub fn get_or_panic(&self, index: usize) -> u8 {
        self.get(index).expect("WaveletMatrix::get: index out of bounds")
    }

    /// Returns the number of occurrences of `symbol` in `range`, or `None` if `range` is out of
    /// bounds.
    pub fn try_count_in_range(&self, mut range: std::ops::Range<usize>, symbol: u8) -> Option<usize> {
        if self.len() < range.end { return None; }
        if range.start >= range.end { return Some(0); }
        if symbol >> self.bits_per_item() != 0 { return Some(0); }
        let mut level_bit_mask = 1u8 << self.bits_per_item();
        for level in self.levels.iter() {
            level_bit_mask >>= 1;
            if symbol & level_bit_mask == 0 {
                range.start = level.content.rank0(range.start);
                range.end = level.content.rank0(range.end);
            } else {
                range.start = level.content.rank(range.start) + level.zeros_before;
                range.end = level.content.rank(range.end) + level.zeros_before;
            }
        }
        Some(range.end - range.start)
    }

    /// Returns the number of occurrences of `symbol` before `index`, or `None` if `index` is out
    /// of bounds.
    #[inline] pub fn try_rank(&self, index: usize, symbol: u8) -> Option<usize> {
        self.try_count_in_range(0..index, symbol)
    }

    /// Returns the number of occurrences of `symbol` before `index`, or
    /// [`Error::PreconditionViolation`] if `index` is out of bounds or `symbol` is not less than
    /// [`Self::alphabet_size`].
    pub fn rank(&self, index: usize, symbol: u8) -> Result<usize> {
        if index > self.len() {
            return Err(Error::PreconditionViolation("index out of bounds"));
        }
        if symbol as usize >= self.alphabet_size {
            return Err(Error::PreconditionViolation("symbol is not less than alphabet_size"));
        }
        Ok(self.try_rank(index, symbol).expect("index and symbol were checked above"))
    }

    /// Returns the number of occurrences of `symbol` before `index`, or panics if `index` is out
    /// of bounds.
    #[inline] pub fn rank_or_panic(&self, index: usize, symbol: u8) -> usize {
        self.try_rank(index, symbol).expect("WaveletMatrix::rank: index out of bounds")
    }

    /// Returns the index of the `rank`-th (1-indexed, so `rank` must be at least 1) occurrence of
    /// `symbol`, or `None` if there are not that many occurrences.
    ///
    /// Walks the levels bottom-up from the deepest one, translating a row index at level `l+1`
    /// into its corresponding row index at level `l` via `select`/`select0` — the inverse of how
    /// [`Self::get_unchecked`] walks top-down via `rank`/`rank0`. Iterative, so no recursion and
    /// no mutable instance state is involved.
    pub fn try_select(&self, rank: usize, symbol: u8) -> Option<usize> {
        if rank == 0 { return None; }
        if symbol >> self.bits_per_item() != 0 { return None; }
        let depth = self.levels.len();
        let mut index = rank - 1;
        for level_nr in (0..depth).rev() {
            let level = &self.levels[level_nr];
            let bit = symbol & (1 << (depth - level_nr - 1)) != 0;
            index = if bit {
                level.try_select(index, self.len)?
            } else {
                level.try_select0(index, self.len)?
            };
        }
        Some(index)
    }

    /// Returns the index of the `rank`-th (1-indexed) occurrence of `symbol`.
    ///
    /// Fails with [`Error::PreconditionViolation`] if `rank` is 0 or `symbol` is not less than
    /// [`Self::alphabet_size`], and with [`Error::NotFound`] if `symbol` occurs fewer than `rank`
    /// times.
    pub fn select(&self, rank: usize, symbol: u8) -> Result<usize> {
        if rank == 0 {
            return Err(Error::PreconditionViolation("rank must be at least 1"));
        }
        if symbol as usize >= self.alphabet_size {
            return Err(Error::PreconditionViolation("symbol is not less than alphabet_size"));
        }
        self.try_select(rank, symbol).ok_or(Error::NotFound)
    }

    /// Returns the index of the `rank`-th (1-indexed) occurrence of `symbol`, or panics if there
    /// are not that many occurrences.
    #[inline] pub fn select_or_panic(&self, rank: usize, symbol: u8) -> usize {
        self.try_select(rank, symbol).expect("WaveletMatrix::select: not enough occurrences of symbol")
    }

    /// Returns an iterator over all symbols.
    pub fn iter(&self) -> impl Iterator<Item = u8> + DoubleEndedIterator + std::iter::FusedIterator + '_ {
        (0..self.len()).map(|i| unsafe { self.get_unchecked(i) })
    }
}

impl<S, BV> WaveletMatrix<S, BV> where S: SelectForRank101111 + Select0ForRank101111, BV: BitVec + Deref<Target = [u64]> + FromIterator<u64> {
    /// Reads a matrix previously written by [`Self::write`].
    pub fn read(input: &mut dyn io::Read) -> io::Result<Self> {
        let len: usize = AsIs::read(input)?;
        let alphabet_size: usize = AsIs::read(input)?;
        let bits_per_item: u8 = AsIs::read(input)?;
        let mut levels = Vec::with_capacity(bits_per_item as usize);
        for _ in 0..bits_per_item {
            let zeros_before: usize = AsIs::read(input)?;
            let content: BV = AsIs::read_n(input, ceiling_div(len + 1, 64))?.into_iter().collect();
            levels.push(Level::<S, BV>::new(content, zeros_before));
        }
        Ok(Self { levels: levels.into_boxed_slice(), len, alphabet_size })
    }
}

impl<S, BV> GetSize for WaveletMatrix<S, BV> where RankSelect101111<S, S, BV>: GetSize {
    fn size_bytes_dyn(&self) -> usize { self.levels.size_bytes_dyn() }
    const USES_DYN_MEM: bool = true;
}

impl<S, BV> WaveletMatrix<S, BV> where Self: GetSize {
    /// Returns the total number of bytes occupied by `self`, including its heap-allocated bit
    /// vector and rank/select index.
    #[inline] pub fn space_usage(&self) -> usize { self.size_bytes() }
}

impl<S, BV> WaveletMatrix<S, BV> where BV: Deref<Target = [u64]> {
    /// Returns the number of bytes [`Self::write`] will write.
    pub fn write_bytes(&self) -> usize {
        AsIs::size(self.len) +
        AsIs::size(self.alphabet_size) +
        AsIs::size(self.bits_per_item()) +
        self.levels.iter()
            .map(|level| AsIs::size(level.zeros_before) + AsIs::array_content_size(&level.content.content))
            .sum::<usize>()
    }

    /// Writes `self` to `output`.
    pub fn write(&self, output: &mut dyn io::Write) -> io::Result<()> {
        AsIs::write(output, self.len)?;
        AsIs::write(output, self.alphabet_size)?;
        AsIs::write(output, self.bits_per_item())?;
        self.levels.iter().try_for_each(|level| {
            AsIs::write(output, level.zeros_before)?;
            AsIs::write_all(output, level.content.content.iter())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build_wavelet_matrix;

    fn naive_rank(symbols: &[u8], index: usize, symbol: u8) -> usize {
        symbols[..index].iter().filter(|&&s| s == symbol).count()
    }

    #[test]
    fn access_matches_input() {
        let symbols = [3u8, 1, 0, 2, 3, 3, 1, 0];
        let wm = build_wavelet_matrix(symbols.iter().copied(), 4).unwrap();
        assert_eq!(wm.len(), symbols.len());
        for (i, &s) in symbols.iter().enumerate() {
            assert_eq!(wm.get(i), Some(s));
        }
        assert_eq!(wm.get(symbols.len()), None);
    }

    #[test]
    fn rank_matches_naive() {
        let symbols = [3u8, 1, 0, 2, 3, 3, 1, 0, 2, 2, 1];
        let wm = build_wavelet_matrix(symbols.iter().copied(), 4).unwrap();
        for i in 0..=symbols.len() {
            for s in 0..4u8 {
                assert_eq!(wm.try_rank(i, s), Some(naive_rank(&symbols, i, s)));
            }
        }
    }

    #[test]
    fn select_round_trips_through_rank() {
        let symbols = [3u8, 1, 0, 2, 3, 3, 1, 0, 2, 2, 1];
        let wm = build_wavelet_matrix(symbols.iter().copied(), 4).unwrap();
        for s in 0..4u8 {
            let occurrences: Vec<_> = symbols.iter().enumerate().filter(|(_, &v)| v == s).map(|(i, _)| i).collect();
            for (rank, &idx) in occurrences.iter().enumerate() {
                assert_eq!(wm.select(rank + 1, s), Ok(idx));
            }
            assert_eq!(wm.select(0, s), Err(Error::PreconditionViolation("rank must be at least 1")));
            assert_eq!(wm.select(occurrences.len() + 1, s), Err(Error::NotFound));
        }
    }

    #[test]
    fn rejects_symbol_beyond_alphabet_size_even_when_it_fits_bits_per_item() {
        let symbols = [0u8, 1, 2, 3, 4];
        let wm = build_wavelet_matrix(symbols.iter().copied(), 5).unwrap();
        assert_eq!(wm.bits_per_item(), 3);
        assert_eq!(wm.alphabet_size(), 5);
        // 6 fits in 3 bits but is not a valid symbol of a 5-element alphabet.
        assert_eq!(wm.rank(1, 6), Err(Error::PreconditionViolation("symbol is not less than alphabet_size")));
        assert_eq!(wm.select(1, 6), Err(Error::PreconditionViolation("symbol is not less than alphabet_size")));
    }

    #[test]
    fn rejects_out_of_bounds_index() {
        let symbols = [3u8, 1, 0, 2];
        let wm = build_wavelet_matrix(symbols.iter().copied(), 4).unwrap();
        assert_eq!(wm.get_or_err(symbols.len()), Err(Error::PreconditionViolation("index out of bounds")));
        assert_eq!(wm.rank(symbols.len() + 1, 0), Err(Error::PreconditionViolation("index out of bounds")));
    }

    #[test]
    fn write_read_round_trip() {
        let symbols = [3u8, 1, 0, 2, 3, 3, 1, 0];
        let wm = build_wavelet_matrix(symbols.iter().copied(), 4).unwrap();
        let mut buf = Vec::new();
        wm.write(&mut buf).unwrap();
        assert_eq!(buf.len(), wm.write_bytes());
        let read = WaveletMatrix::<CombinedSampling>::read(&mut &buf[..]).unwrap();
        for i in 0..symbols.len() {
            assert_eq!(wm.get(i), read.get(i));
        }
    }

    #[test]
    fn iter_matches_input() {
        let symbols = [3u8, 1, 0, 2, 3, 3, 1, 0];
        let wm = build_wavelet_matrix(symbols.iter().copied(), 4).unwrap();
        assert_eq!(wm.iter().collect::<Vec<_>>(), symbols.to_vec());
    }
}
