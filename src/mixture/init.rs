use crate::cloud::Point2;
use fastrand::Rng;

const LLOYD_MAX_ITER: usize = 300;

#[inline]
fn dist2(a: &Point2, b: &Point2) -> f64 {
    let dx = a[0] - b[0];
    let dy = a[1] - b[1];
    dx * dx + dy * dy
}

fn nearest(p: &Point2, centers: &[Point2]) -> usize {
    let mut best = 0;
    let mut best_d = f64::INFINITY;
    for (c, center) in centers.iter().enumerate() {
        let d = dist2(p, center);
        if d < best_d {
            best_d = d;
            best = c;
        }
    }
    best
}

/// k-means++ seeding: each new centre is drawn with probability
/// proportional to its squared distance from the nearest existing one.
pub(super) fn kmeans_plus_plus(points: &[Point2], k: usize, rng: &mut Rng) -> Vec<Point2> {
    let n = points.len();
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.usize(0..n)]);

    let mut closest: Vec<f64> = points.iter().map(|p| dist2(p, &centers[0])).collect();

    while centers.len() < k {
        let total: f64 = closest.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.f64() * total;
            let mut acc = 0.0;
            let mut chosen = n - 1;
            for (i, &d) in closest.iter().enumerate() {
                acc += d;
                if acc >= target && d > 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // Every point coincides with a centre already.
            rng.usize(0..n)
        };

        let center = points[pick];
        for (d, p) in closest.iter_mut().zip(points) {
            *d = d.min(dist2(p, &center));
        }
        centers.push(center);
    }
    centers
}

/// Lloyd iterations from k-means++ seeds, returned as one-hot
/// responsibilities (row-major, n x k) for the first M-step.
pub(super) fn kmeans_responsibilities(points: &[Point2], k: usize, rng: &mut Rng) -> Vec<f64> {
    let mut centers = kmeans_plus_plus(points, k, rng);
    let mut assignment: Vec<usize> = points.iter().map(|p| nearest(p, &centers)).collect();

    for _ in 0..LLOYD_MAX_ITER {
        let mut sums = vec![[0.0f64; 2]; k];
        let mut counts = vec![0usize; k];
        for (p, &a) in points.iter().zip(&assignment) {
            sums[a][0] += p[0];
            sums[a][1] += p[1];
            counts[a] += 1;
        }
        for c in 0..k {
            // Empty clusters keep their previous centre.
            if counts[c] > 0 {
                centers[c] = [sums[c][0] / counts[c] as f64, sums[c][1] / counts[c] as f64];
            }
        }

        let mut changed = false;
        for (p, a) in points.iter().zip(assignment.iter_mut()) {
            let next = nearest(p, &centers);
            if next != *a {
                *a = next;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    let mut resp = vec![0.0; points.len() * k];
    for (i, &a) in assignment.iter().enumerate() {
        resp[i * k + a] = 1.0;
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeds_are_distinct_points() {
        let points = [[0.0, 0.0], [0.0, 0.1], [50.0, 50.0], [50.1, 50.0]];
        let mut rng = Rng::with_seed(4);
        let centers = kmeans_plus_plus(&points, 2, &mut rng);
        assert_eq!(centers.len(), 2);
        assert!(dist2(&centers[0], &centers[1]) > 1.0);
    }

    #[test]
    fn test_responsibilities_are_one_hot() {
        let points = [[0.0, 0.0], [1.0, 0.0], [20.0, 20.0], [21.0, 20.0]];
        let mut rng = Rng::with_seed(8);
        let resp = kmeans_responsibilities(&points, 2, &mut rng);
        for row in resp.chunks(2) {
            assert_eq!(row.iter().sum::<f64>(), 1.0);
        }
        // Neighbouring points share a cluster.
        assert_eq!(resp[0..2], resp[2..4]);
        assert_ne!(resp[0..2], resp[4..6]);
    }

    #[test]
    fn test_duplicate_points_still_seed_k_centres() {
        let points = [[1.0, 1.0]; 5];
        let mut rng = Rng::with_seed(1);
        assert_eq!(kmeans_plus_plus(&points, 3, &mut rng).len(), 3);
    }
}
