//! Exact nearest-neighbour search over squared L2 distance.
//!
//! Vectors live back to back in one `Vec<f32>`; search is a linear scan.

use ragdb_core::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub ordinal: usize,
    pub distance: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlatL2Index {
    dim: usize,
    count: usize,
    data: Vec<f32>,
}

impl FlatL2Index {
    pub fn new(dim: usize) -> Self {
        Self { dim, count: 0, data: Vec::new() }
    }

    /// Rebuild from row-major storage; `data.len()` must be a multiple of `dim`.
    pub fn from_raw(dim: usize, data: Vec<f32>) -> Result<Self> {
        if dim == 0 {
            if !data.is_empty() {
                return Err(Error::DimensionMismatch { expected: 0, actual: data.len() });
            }
            return Ok(Self::new(0));
        }
        if data.len() % dim != 0 {
            return Err(Error::DimensionMismatch { expected: dim, actual: data.len() % dim });
        }
        Ok(Self { dim, count: data.len() / dim, data })
    }

    pub fn dim(&self) -> usize { self.dim }

    pub fn len(&self) -> usize { self.count }

    pub fn is_empty(&self) -> bool { self.count == 0 }

    pub fn as_slice(&self) -> &[f32] { &self.data }

    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        if ordinal >= self.count {
            return None;
        }
        let start = ordinal * self.dim;
        Some(&self.data[start..start + self.dim])
    }

    pub fn check_dim(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::DimensionMismatch { expected: self.dim, actual: vector.len() });
        }
        Ok(())
    }

    /// Append a vector and return its ordinal.
    pub fn insert(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dim(vector)?;
        self.data.extend_from_slice(vector);
        self.count += 1;
        Ok(self.count - 1)
    }

    /// Drop every vector at or after `len`.
    pub fn truncate(&mut self, len: usize) {
        if len < self.count {
            self.count = len;
            self.data.truncate(len * self.dim);
        }
    }

    /// The `k` closest vectors, ascending by distance, ties to the smaller ordinal.
    /// `k` is clamped to `len()`; an empty index yields an empty result.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_dim(query)?;
        let k = k.min(self.count);
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut all: Vec<Neighbor> = (0..self.count)
            .map(|ordinal| Neighbor {
                ordinal,
                distance: squared_l2(&self.data[ordinal * self.dim..(ordinal + 1) * self.dim], query),
            })
            .collect();
        let order = |a: &Neighbor, b: &Neighbor| {
            a.distance.total_cmp(&b.distance).then(a.ordinal.cmp(&b.ordinal))
        };
        if k < all.len() {
            all.select_nth_unstable_by(k - 1, order);
            all.truncate(k);
        }
        all.sort_unstable_by(order);
        Ok(all)
    }
}

pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(rows: &[[f32; 2]]) -> FlatL2Index {
        let mut idx = FlatL2Index::new(2);
        for r in rows {
            idx.insert(r).unwrap();
        }
        idx
    }

    #[test]
    fn nearest_first() {
        let idx = index_of(&[[2.0, 0.0], [1.0, 0.0]]);
        let hits = idx.search(&[0.0, 0.0], 2).unwrap();
        assert_eq!(hits[0], Neighbor { ordinal: 1, distance: 1.0 });
        assert_eq!(hits[1], Neighbor { ordinal: 0, distance: 4.0 });
    }

    #[test]
    fn ties_go_to_earliest_insert() {
        let idx = index_of(&[[5.0, 5.0], [1.0, 0.0], [0.0, 1.0], [-1.0, 0.0]]);
        let hits = idx.search(&[0.0, 0.0], 3).unwrap();
        let ordinals: Vec<usize> = hits.iter().map(|h| h.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[test]
    fn k_is_clamped_and_empty_is_empty() {
        let empty = FlatL2Index::new(2);
        assert!(empty.search(&[0.0, 0.0], 3).unwrap().is_empty());
        let one = index_of(&[[3.0, 4.0]]);
        let hits = one.search(&[0.0, 0.0], 3).unwrap();
        assert_eq!(hits, vec![Neighbor { ordinal: 0, distance: 25.0 }]);
        assert!(one.search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn wrong_dimension_is_rejected_without_mutation() {
        let mut idx = index_of(&[[1.0, 1.0]]);
        assert!(matches!(idx.insert(&[1.0, 2.0, 3.0]), Err(Error::DimensionMismatch { expected: 2, actual: 3 })));
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.as_slice().len(), 2);
        assert!(idx.search(&[1.0], 1).is_err());
    }

    #[test]
    fn truncate_drops_tail() {
        let mut idx = index_of(&[[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]]);
        idx.truncate(1);
        assert_eq!(idx.len(), 1);
        assert_eq!(idx.vector(0), Some(&[0.0f32, 0.0][..]));
        assert_eq!(idx.vector(1), None);
    }

    #[test]
    fn from_raw_requires_whole_rows() {
        assert!(FlatL2Index::from_raw(3, vec![0.0; 7]).is_err());
        assert_eq!(FlatL2Index::from_raw(3, vec![0.0; 6]).unwrap().len(), 2);
    }
}
