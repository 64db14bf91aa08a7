use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::errors::EngineError;

/// Centroid clustering configuration. The seed is a configuration
/// constant so segment assignment is reproducible across runs.
#[derive(Debug, Clone)]
pub struct KMeansConfig {
    pub cluster_count: usize,
    pub max_iterations: usize,
    pub seed: u64,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn nearest_centroid(point: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (i, centroid) in centroids.iter().enumerate() {
        let dist = squared_distance(point, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = i;
        }
    }
    best
}

/// Spread initial centroids: the first is a seeded random point, each
/// further one is drawn with probability proportional to its squared
/// distance from the nearest chosen centroid.
fn seed_centroids(points: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    while centroids.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| squared_distance(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = weights.iter().sum();
        if total <= 0.0 {
            // every remaining point coincides with a centroid
            centroids.push(points[rng.gen_range(0..points.len())].clone());
            continue;
        }

        let mut draw = rng.gen::<f64>() * total;
        let mut chosen = points.len() - 1;
        for (i, weight) in weights.iter().enumerate() {
            if draw < *weight {
                chosen = i;
                break;
            }
            draw -= weight;
        }
        centroids.push(points[chosen].clone());
    }

    centroids
}

/// Partition points into `cluster_count` clusters; returns one cluster
/// index per input point.
///
/// Initial centroids are spread over the input with the seeded
/// generator; iteration stops when assignments stabilize or the
/// iteration cap is reached. A cluster left empty during refinement
/// keeps its previous centroid.
pub fn cluster(config: &KMeansConfig, points: &[Vec<f64>]) -> Result<Vec<usize>, EngineError> {
    let k = config.cluster_count;
    if k == 0 {
        return Err(EngineError::InvalidInput("cluster count of zero".into()));
    }
    if points.len() < k {
        return Err(EngineError::InsufficientData(format!(
            "{} points for {} clusters",
            points.len(),
            k
        )));
    }
    let width = points[0].len();
    if points.iter().any(|p| p.len() != width) {
        return Err(EngineError::ComputationError("ragged point matrix".into()));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut centroids = seed_centroids(points, k, &mut rng);

    let mut assignments: Vec<usize> = points
        .iter()
        .map(|p| nearest_centroid(p, &centroids))
        .collect();

    for _ in 0..config.max_iterations {
        let mut sums = vec![vec![0.0; width]; k];
        let mut counts = vec![0usize; k];
        for (point, &cluster) in points.iter().zip(&assignments) {
            counts[cluster] += 1;
            for (s, v) in sums[cluster].iter_mut().zip(point) {
                *s += v;
            }
        }
        for (cluster, count) in counts.iter().enumerate() {
            if *count == 0 {
                continue;
            }
            for (c, s) in centroids[cluster].iter_mut().zip(&sums[cluster]) {
                *c = s / *count as f64;
            }
        }

        let next: Vec<usize> = points
            .iter()
            .map(|p| nearest_centroid(p, &centroids))
            .collect();
        if next == assignments {
            break;
        }
        assignments = next;
    }

    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> KMeansConfig {
        KMeansConfig {
            cluster_count: 3,
            max_iterations: 100,
            seed: 42,
        }
    }

    fn three_blobs() -> Vec<Vec<f64>> {
        let mut points = Vec::new();
        for offset in [0.0, 10.0, 20.0] {
            for jitter in [-0.2, 0.0, 0.3, 0.1] {
                points.push(vec![offset + jitter, offset - jitter]);
            }
        }
        points
    }

    #[test]
    fn separates_well_spaced_groups() {
        let points = three_blobs();
        let assignments = cluster(&config(), &points).unwrap();
        // each block of four shares a cluster, blocks differ
        for block in assignments.chunks(4) {
            assert!(block.iter().all(|c| c == &block[0]));
        }
        assert_ne!(assignments[0], assignments[4]);
        assert_ne!(assignments[4], assignments[8]);
    }

    #[test]
    fn fixed_seed_reproduces_assignments() {
        let points = three_blobs();
        let a = cluster(&config(), &points).unwrap();
        let b = cluster(&config(), &points).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn identical_points_still_assign() {
        let points = vec![vec![1.0, 1.0]; 5];
        let assignments = cluster(&config(), &points).unwrap();
        assert_eq!(assignments.len(), 5);
        assert!(assignments.iter().all(|c| *c < 3));
    }

    #[test]
    fn fewer_points_than_clusters_is_insufficient() {
        let err = cluster(&config(), &[vec![1.0], vec![2.0]]).unwrap_err();
        assert_matches::assert_matches!(err, EngineError::InsufficientData(_));
    }
}
