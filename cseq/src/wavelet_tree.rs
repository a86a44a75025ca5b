//! Wavelet tree representation of a small-alphabet byte sequence.
//!
//! Unlike [`crate::WaveletMatrix`], where every level's bit array is split into one contiguous
//! run of zeros followed by one contiguous run of ones, a wavelet *tree* keeps each node's bits
//! in their own segment: symbols sharing a prefix of already-decided bits stay grouped together,
//! in their original relative (stable) order, inside that node's slice of the level. A query
//! therefore needs to know which node (not just which level) it is in, and descends/ascends via
//! `node_starts`, an exclusive-prefix-scan-built table of per-node segment boundaries recomputed
//! fresh at each level from the symbol bits already fixed — no recursion, and (unlike the
//! instance-held backtracking stack of the scheme this is based on) no mutable state shared
//! across levels either.

use std::{io, ops::{Deref, DerefMut}};

use binout::{AsIs, Serializer};
use bitm::{BitAccess, BitVec, RankSelect101111, CombinedSampling, Rank, Select, Select0, SelectForRank101111, Select0ForRank101111, ceiling_div};
use dyn_size_of::GetSize;

use crate::builder;
use crate::error::{Error, Result};

struct Level<S = CombinedSampling, BV = Box<[u64]>> {
    content: RankSelect101111<S, S, BV>,
    /// Start offset (local to `content`) of every node's segment at this level, plus a trailing
    /// sentinel equal to the sequence length. Has `2^level + 1` entries.
    node_starts: Box<[usize]>,
}

impl<S, BV> GetSize for Level<S, BV> where RankSelect101111<S, S, BV>: GetSize {
    fn size_bytes_dyn(&self) -> usize {
        self.content.size_bytes_dyn() + self.node_starts.size_bytes_dyn()
    }
    const USES_DYN_MEM: bool = true;
}

impl<S, BV> Level<S, BV> where RankSelect101111<S, S, BV>: From<BV> {
    #[inline] fn new(content: BV, node_starts: Box<[usize]>) -> Self {
        Self { content: content.into(), node_starts }
    }
}

/// A wavelet tree over a sequence of `len` bytes, each using `bits_per_item` bits (so
/// representing values in `0..2^bits_per_item`).
///
/// Supports, in `O(bits_per_item)` time, the same *access*/*rank*/*select* queries as
/// [`crate::WaveletMatrix`]; the two share their construction scheme (see [`crate::builder`]) and
/// return identical results for the same input, differing only in the internal layout used to get
/// there. By default [`bitm::CombinedSampling`] is used as the select strategy `S` for the
/// internal bit vectors (see [`bitm::RankSelect101111`]); this can be changed to
/// [`bitm::BinaryRankSearch`] to save a bit of space at the cost of slower *select* queries.
pub struct WaveletTree<S = CombinedSampling, BV = Box<[u64]>> {
    levels: Box<[Level<S, BV>]>,
    len: usize,
    alphabet_size: usize,
}

impl<S, BV> WaveletTree<S, BV> {
    /// Returns the number of stored symbols.
    #[inline] pub fn len(&self) -> usize { self.len }

    /// Returns whether the sequence is empty.
    #[inline] pub fn is_empty(&self) -> bool { self.len == 0 }

    /// Returns the number of bits used to represent each symbol (the base-2 logarithm, rounded
    /// up, of the alphabet size this tree was built with).
    #[inline] pub fn bits_per_item(&self) -> u8 { self.levels.len() as u8 }

    /// Returns the alphabet size this tree was built with. Every valid symbol lies in
    /// `0..alphabet_size`, a possibly tighter bound than `1 << bits_per_item()`.
    #[inline] pub fn alphabet_size(&self) -> usize { self.alphabet_size }
}

impl<S, BV> WaveletTree<S, BV> where S: SelectForRank101111 + Select0ForRank101111, BV: BitVec + DerefMut<Target = [u64]> + From<Box<[u64]>> {
    /// Builds a wavelet tree over `symbols`, each of which must be strictly less than
    /// `alphabet_size`. `bits_per_item` must be `bits_to_store(alphabet_size - 1)` (clamped to at
    /// least 1) and in `1..=8`.
    pub(crate) fn build(symbols: &[u8], bits_per_item: u8, alphabet_size: usize) -> Self {
        let built = builder::build(symbols, symbols.len(), bits_per_item, false);
        let levels = built.levels.into_vec().into_iter().zip(built.node_starts.into_vec())
            .map(|(content, node_starts)| Level::new(BV::from(content), node_starts))
            .collect();
        Self { levels, len: symbols.len(), alphabet_size }
    }
}

impl<S, BV> WaveletTree<S, BV> where S: SelectForRank101111 + Select0ForRank101111, BV: Deref<Target = [u64]> {

    /// Returns the symbol at `index`. The result is undefined if `index` is out of bounds.
    pub unsafe fn get_unchecked(&self, index: usize) -> u8 {
        let mut node = 0usize;
        let mut pos = index;
        let mut result: u8 = 0;
        for level in self.levels.iter() {
            let start = level.node_starts[node];
            let global = start + pos;
            let bit = level.content.content.get_bit(global);
            result = (result << 1) | bit as u8;
            let ones_before_interval = level.content.rank(start);
            let ones_before_pos = level.content.rank(global) - ones_before_interval;
            if bit {
                node = node * 2 + 1;
                pos = ones_before_pos;
            } else {
                node = node * 2;
                pos -= ones_before_pos;
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
        self.get(index).expect("WaveletTree::get: index out of bounds")
    }

    /// Returns the number of occurrences of `symbol` before `index`, or `None` if `index` is out
    /// of bounds.
    ///
    /// Descends the same way [`Self::get_unchecked`] does, except the branch at each level is
    /// chosen by the matching bit of `symbol` (most significant first) rather than by the bit
    /// actually stored at the current position; the position reached after the last level is the
    /// answer.
    pub fn try_rank(&self, index: usize, symbol: u8) -> Option<usize> {
        if index > self.len { return None; }
        let depth = self.levels.len();
        if (symbol as usize) >> depth != 0 { return Some(0); }
        let mut node = 0usize;
        let mut pos = index;
        for (level_nr, level) in self.levels.iter().enumerate() {
            let start = level.node_starts[node];
            let global = start + pos;
            let ones_before_interval = level.content.rank(start);
            let ones_before_pos = level.content.rank(global) - ones_before_interval;
            let bit = symbol & (1 << (depth - level_nr - 1)) != 0;
            if bit {
                node = node * 2 + 1;
                pos = ones_before_pos;
            } else {
                node = node * 2;
                pos -= ones_before_pos;
            }
        }
        Some(pos)
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
        self.try_rank(index, symbol).expect("WaveletTree::rank: index out of bounds")
    }

    /// Returns the index of the `rank`-th (1-indexed, so `rank` must be at least 1) occurrence of
    /// `symbol`, or `None` if there are not that many occurrences.
    ///
    /// Because every node's position in the tree is fully determined by the bits of `symbol`
    /// (unlike a node reached by `access`/`rank`, which depends on the data), the node path needs
    /// no separate backtracking stack: it is recomputed level by level while ascending from the
    /// deepest level back to the root, using `select`/`select0` local to each node's segment.
    pub fn try_select(&self, rank: usize, symbol: u8) -> Option<usize> {
        if rank == 0 { return None; }
        let depth = self.levels.len();
        if (symbol as usize) >> depth != 0 { return None; }
        let mut pos = rank - 1;
        for level_nr in (0..depth).rev() {
            let level = &self.levels[level_nr];
            let node = (symbol as usize) >> (depth - level_nr);
            let start = level.node_starts[node];
            let end = level.node_starts[node + 1];
            let ones_before_interval = level.content.rank(start);
            let bit = symbol & (1 << (depth - level_nr - 1)) != 0;
            let global = if bit {
                level.content.try_select(ones_before_interval + pos)?
            } else {
                let zeros_before_interval = start - ones_before_interval;
                level.content.try_select0(zeros_before_interval + pos)?
            };
            if global >= end { return None; }
            pos = global - start;
        }
        Some(pos)
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
        self.try_select(rank, symbol).expect("WaveletTree::select: not enough occurrences of symbol")
    }

    /// Returns an iterator over all symbols.
    pub fn iter(&self) -> impl Iterator<Item = u8> + DoubleEndedIterator + std::iter::FusedIterator + '_ {
        (0..self.len()).map(|i| unsafe { self.get_unchecked(i) })
    }
}

impl<S, BV> WaveletTree<S, BV> where S: SelectForRank101111 + Select0ForRank101111, BV: BitVec + Deref<Target = [u64]> + FromIterator<u64> {
    /// Reads a tree previously written by [`Self::write`].
    pub fn read(input: &mut dyn io::Read) -> io::Result<Self> {
        let len: usize = AsIs::read(input)?;
        let alphabet_size: usize = AsIs::read(input)?;
        let bits_per_item: u8 = AsIs::read(input)?;
        let mut levels = Vec::with_capacity(bits_per_item as usize);
        for level_nr in 0..bits_per_item {
            let node_starts: Vec<usize> = AsIs::read_n(input, (1usize << level_nr) + 1)?;
            let content: BV = AsIs::read_n(input, ceiling_div(len + 1, 64))?.into_iter().collect();
            levels.push(Level::<S, BV>::new(content, node_starts.into_boxed_slice()));
        }
        Ok(Self { levels: levels.into_boxed_slice(), len, alphabet_size })
    }
}

impl<S, BV> GetSize for WaveletTree<S, BV> where RankSelect101111<S, S, BV>: GetSize {
    fn size_bytes_dyn(&self) -> usize { self.levels.size_bytes_dyn() }
    const USES_DYN_MEM: bool = true;
}

impl<S, BV> WaveletTree<S, BV> where Self: GetSize {
    /// Returns the total number of bytes occupied by `self`, including its heap-allocated bit
    /// vectors and rank/select indexes.
    #[inline] pub fn space_usage(&self) -> usize { self.size_bytes() }
}

impl<S, BV> WaveletTree<S, BV> where BV: Deref<Target = [u64]> {
    /// Returns the number of bytes [`Self::write`] will write.
    pub fn write_bytes(&self) -> usize {
        AsIs::size(self.len) +
        AsIs::size(self.alphabet_size) +
        AsIs::size(self.bits_per_item()) +
        self.levels.iter()
            .map(|level| AsIs::array_content_size(&level.node_starts) + AsIs::array_content_size(&level.content.content))
            .sum::<usize>()
    }

    /// Writes `self` to `output`.
    pub fn write(&self, output: &mut dyn io::Write) -> io::Result<()> {
        AsIs::write(output, self.len)?;
        AsIs::write(output, self.alphabet_size)?;
        AsIs::write(output, self.bits_per_item())?;
        self.levels.iter().try_for_each(|level| {
            AsIs::write_all(output, level.node_starts.iter())?;
            AsIs::write_all(output, level.content.content.iter())
        })
    }
}
