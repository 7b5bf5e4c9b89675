//! Density clustering (DBSCAN) of the foreground pixels of a mask.
//!
//! Points are the integer `(row, col)` coordinates of every positive pixel in
//! row-major order. Neighborhoods are Euclidean discs of radius `eps`, looked
//! up through a pixel index grid instead of a spatial tree, since candidates
//! can only sit on the integer lattice inside the disc's bounding box.

use ndarray::{Array2, ArrayView2};

const NO_POINT: usize = usize::MAX;

/// Cluster assignment of every foreground pixel.
#[derive(Debug, Clone)]
pub struct Clustering {
    /// `(row, col)` of each foreground pixel, row-major
    pub points: Vec<(usize, usize)>,
    /// Cluster id per point; `None` marks noise
    pub labels: Vec<Option<usize>>,
    pub n_clusters: usize,
}

impl Clustering {
    /// Number of points in each cluster, indexed by cluster id.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.n_clusters];
        for label in self.labels.iter().flatten() {
            sizes[*label] += 1;
        }
        sizes
    }
}

/// Lattice offsets within Euclidean distance `eps` of the origin, origin included.
fn disc_offsets(eps: f32) -> Vec<(isize, isize)> {
    if eps.is_nan() || eps < 0.0 {
        return vec![(0, 0)];
    }
    let reach = eps.floor() as isize;
    let eps2 = eps * eps;
    let mut offsets = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if (dy * dy + dx * dx) as f32 <= eps2 {
                offsets.push((dy, dx));
            }
        }
    }
    offsets
}

/// Run DBSCAN on the positive pixels of `mask`.
///
/// A point is a core point when at least `min_pts` points (itself included)
/// lie within `eps`. Clusters grow from core points; border points join the
/// first cluster that reaches them; everything else is noise.
///
/// # Arguments
/// * `mask` - Single-channel mask; nonzero pixels are clustered
/// * `eps` - Neighborhood radius in pixels
/// * `min_pts` - Minimum neighborhood size of a core point
pub fn dbscan(mask: ArrayView2<u8>, eps: f32, min_pts: usize) -> Clustering {
    let (height, width) = mask.dim();

    let mut index = Array2::from_elem((height, width), NO_POINT);
    let mut points = Vec::new();
    for ((y, x), &v) in mask.indexed_iter() {
        if v > 0 {
            index[[y, x]] = points.len();
            points.push((y, x));
        }
    }

    let offsets = disc_offsets(eps);
    let neighbors = |p: usize, out: &mut Vec<usize>| {
        out.clear();
        let (y, x) = points[p];
        for &(dy, dx) in &offsets {
            let ny = y as isize + dy;
            let nx = x as isize + dx;
            if ny < 0 || nx < 0 || ny >= height as isize || nx >= width as isize {
                continue;
            }
            let q = index[[ny as usize, nx as usize]];
            if q != NO_POINT {
                out.push(q);
            }
        }
    };

    let mut labels: Vec<Option<usize>> = vec![None; points.len()];
    let mut visited = vec![false; points.len()];
    let mut n_clusters = 0;
    let mut hood = Vec::new();
    let mut stack = Vec::new();

    for p in 0..points.len() {
        if visited[p] {
            continue;
        }
        visited[p] = true;

        neighbors(p, &mut hood);
        if hood.len() < min_pts {
            continue;
        }

        let cluster = n_clusters;
        n_clusters += 1;
        labels[p] = Some(cluster);
        stack.extend(hood.iter().copied());

        while let Some(q) = stack.pop() {
            if labels[q].is_none() {
                labels[q] = Some(cluster);
            }
            if visited[q] {
                continue;
            }
            visited[q] = true;

            neighbors(q, &mut hood);
            if hood.len() >= min_pts {
                stack.extend(hood.iter().copied().filter(|&r| labels[r].is_none()));
            }
        }
    }

    Clustering {
        points,
        labels,
        n_clusters,
    }
}
