use super::union_find::UnionFind;
use crate::grid::{BinaryMask, LabelMatrix};
use std::collections::BTreeSet;

/// Two-pass 4-connected labeling.
///
/// Only the upper and left neighbours are inspected during the raster pass;
/// lower/right adjacency is picked up when those cells are visited. The
/// second pass rewrites every cell to its root and counts distinct roots.
/// Returned labels are the roots themselves, not renumbered.
pub fn label(mask: &BinaryMask) -> (LabelMatrix, usize) {
    let (rows, cols) = mask.shape();
    let mut labels = LabelMatrix::filled(rows, cols, 0);
    let mut uf = UnionFind::new();

    for i in 0..rows {
        for j in 0..cols {
            if !mask.get(i, j) {
                continue;
            }

            let up = if i > 0 { labels.get(i - 1, j) } else { 0 };
            let left = if j > 0 { labels.get(i, j - 1) } else { 0 };

            let mut roots = [0u32; 2];
            let mut n = 0;
            for neighbour in [up, left] {
                if neighbour > 0 {
                    roots[n] = uf.find(neighbour);
                    n += 1;
                }
            }

            if n == 0 {
                labels.set(i, j, uf.make_set());
                continue;
            }

            let min_root = roots[..n].iter().copied().min().unwrap_or(roots[0]);
            labels.set(i, j, min_root);
            for &root in &roots[..n] {
                if root != min_root {
                    uf.union(min_root, root);
                }
            }
        }
    }

    let mut distinct = BTreeSet::new();
    for i in 0..rows {
        for j in 0..cols {
            let l = labels.get(i, j);
            if l != 0 {
                let root = uf.find(l);
                labels.set(i, j, root);
                distinct.insert(root);
            }
        }
    }

    (labels, distinct.len())
}
