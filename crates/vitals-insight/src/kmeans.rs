//! Seeded k-means++ with Lloyd iteration, silhouette scoring, and k selection.
//!
//! Everything here is deterministic for a given seed: initialization draws
//! from a [`StdRng`] seeded once per run, and ties always resolve to the
//! lowest centroid index.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vitals_core::math::{euclidean, squared_distance};

/// Outcome of one k-means run.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster index per input point.
    pub assignments: Vec<usize>,
    /// One centroid per cluster, including empty ones.
    pub centroids: Vec<Vec<f64>>,
    /// Lloyd iterations performed.
    pub iterations: usize,
}

/// Pick `k` initial centroids with k-means++ seeding.
///
/// The first centroid is uniform; later ones are drawn proportionally to
/// squared distance from the nearest chosen centroid. When every point
/// already coincides with a centroid the last one is duplicated.
pub fn kmeans_plus_plus<R: Rng>(points: &[Vec<f64>], k: usize, rng: &mut R) -> Vec<Vec<f64>> {
    if points.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut centroids = Vec::with_capacity(k);
    centroids.push(points[rng.gen_range(0..points.len())].clone());

    while centroids.len() < k {
        let distances: Vec<f64> = points
            .iter()
            .map(|p| {
                centroids
                    .iter()
                    .map(|c| squared_distance(p, c))
                    .fold(f64::INFINITY, f64::min)
            })
            .collect();
        let total: f64 = distances.iter().sum();

        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            // float drift can leave target just above the last bucket
            let mut chosen = distances.iter().rposition(|d| *d > 0.0).unwrap_or(0);
            for (i, d) in distances.iter().enumerate() {
                if *d <= 0.0 {
                    continue;
                }
                if target < *d {
                    chosen = i;
                    break;
                }
                target -= d;
            }
            points[chosen].clone()
        } else {
            centroids[centroids.len() - 1].clone()
        };
        centroids.push(chosen);
    }

    centroids
}

/// Run k-means++ initialization followed by Lloyd iteration.
///
/// Stops when assignments stop changing or after `max_iterations`.
///
/// # Examples
///
/// ```
/// use vitals_insight::kmeans::kmeans;
///
/// let points = vec![
///     vec![0.0, 0.0],
///     vec![0.1, 0.0],
///     vec![5.0, 5.0],
///     vec![5.1, 5.0],
/// ];
/// let result = kmeans(&points, 2, 42, 100);
/// assert_eq!(result.assignments[0], result.assignments[1]);
/// assert_ne!(result.assignments[0], result.assignments[2]);
/// ```
pub fn kmeans(points: &[Vec<f64>], k: usize, seed: u64, max_iterations: usize) -> KMeansResult {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut centroids = kmeans_plus_plus(points, k, &mut rng);
    let mut assignments = assign(points, &centroids);
    let mut iterations = 0;

    while iterations < max_iterations {
        iterations += 1;
        centroids = recompute(points, &assignments, &centroids);
        let next = assign(points, &centroids);
        if next == assignments {
            break;
        }
        assignments = next;
    }

    KMeansResult {
        assignments,
        centroids,
        iterations,
    }
}

fn assign(points: &[Vec<f64>], centroids: &[Vec<f64>]) -> Vec<usize> {
    points
        .iter()
        .map(|p| {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (i, c) in centroids.iter().enumerate() {
                let d = squared_distance(p, c);
                if d < best_distance {
                    best = i;
                    best_distance = d;
                }
            }
            best
        })
        .collect()
}

fn recompute(points: &[Vec<f64>], assignments: &[usize], previous: &[Vec<f64>]) -> Vec<Vec<f64>> {
    previous
        .iter()
        .enumerate()
        .map(|(cluster, old)| {
            let members: Vec<&Vec<f64>> = points
                .iter()
                .zip(assignments)
                .filter(|(_, a)| **a == cluster)
                .map(|(p, _)| p)
                .collect();
            if members.is_empty() {
                return old.clone();
            }
            let mut sum = vec![0.0; old.len()];
            for member in &members {
                for (s, v) in sum.iter_mut().zip(member.iter()) {
                    *s += v;
                }
            }
            sum.iter().map(|s| s / members.len() as f64).collect()
        })
        .collect()
}

/// Mean silhouette coefficient of a clustering.
///
/// Returns 0.0 with fewer than two non-empty clusters. Points in singleton
/// clusters score 0.0, so an all-singleton clustering also scores 0.0.
pub fn silhouette_score(points: &[Vec<f64>], assignments: &[usize]) -> f64 {
    let mut labels: Vec<usize> = assignments.to_vec();
    labels.sort_unstable();
    labels.dedup();
    if labels.len() < 2 || points.is_empty() {
        return 0.0;
    }

    let total: f64 = points
        .iter()
        .enumerate()
        .map(|(i, p)| {
            let own = assignments[i];
            let mean_to = |cluster: usize| -> Option<f64> {
                let distances: Vec<f64> = points
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| *j != i && assignments[*j] == cluster)
                    .map(|(_, q)| euclidean(p, q))
                    .collect();
                if distances.is_empty() {
                    None
                } else {
                    Some(distances.iter().sum::<f64>() / distances.len() as f64)
                }
            };

            let Some(a) = mean_to(own) else {
                return 0.0;
            };
            let b = labels
                .iter()
                .filter(|c| **c != own)
                .filter_map(|c| mean_to(*c))
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 && b.is_finite() {
                (b - a) / denom
            } else {
                0.0
            }
        })
        .sum();

    total / points.len() as f64
}

/// Choose k in `[k_min, min(k_max, n)]` maximizing the silhouette.
///
/// Returns `k_min` when there are too few points to search; ties keep the
/// smaller k.
pub fn auto_k(
    points: &[Vec<f64>],
    k_min: usize,
    k_max: usize,
    seed: u64,
    max_iterations: usize,
) -> usize {
    let k_min = k_min.max(1);
    if points.len() <= k_min {
        return k_min;
    }

    let upper = k_max.min(points.len()).max(k_min);
    let mut best_k = k_min;
    let mut best_score = f64::NEG_INFINITY;
    for k in k_min..=upper {
        let result = kmeans(points, k, seed, max_iterations);
        let score = silhouette_score(points, &result.assignments);
        if score > best_score {
            best_score = score;
            best_k = k;
        }
    }
    best_k
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![0.01, 0.02],
            vec![0.02, 0.01],
            vec![1.0, 1.0],
            vec![0.99, 0.98],
            vec![0.98, 0.99],
            vec![0.0, 1.0],
            vec![0.01, 0.99],
            vec![0.02, 0.98],
        ]
    }

    #[test]
    fn same_seed_same_result() {
        let points = blobs();
        assert_eq!(kmeans(&points, 3, 7, 100), kmeans(&points, 3, 7, 100));
    }

    #[test]
    fn separates_obvious_blobs() {
        let points = blobs();
        let result = kmeans(&points, 3, 42, 100);
        let a = &result.assignments;
        assert_eq!(a[0], a[1]);
        assert_eq!(a[1], a[2]);
        assert_eq!(a[3], a[4]);
        assert_eq!(a[6], a[8]);
        assert_ne!(a[0], a[3]);
        assert_ne!(a[0], a[6]);
        assert_ne!(a[3], a[6]);
    }

    #[test]
    fn identical_points_duplicate_centroids() {
        let points = vec![vec![0.5, 0.5]; 4];
        let mut rng = StdRng::seed_from_u64(1);
        let centroids = kmeans_plus_plus(&points, 3, &mut rng);
        assert_eq!(centroids.len(), 3);
        assert!(centroids.iter().all(|c| c == &vec![0.5, 0.5]));

        let result = kmeans(&points, 3, 1, 100);
        assert!(result.assignments.iter().all(|a| *a == 0));
    }

    #[test]
    fn silhouette_edge_cases() {
        let points = blobs();
        assert_eq!(silhouette_score(&points, &[0; 9]), 0.0);

        let singletons: Vec<usize> = (0..points.len()).collect();
        assert_eq!(silhouette_score(&points, &singletons), 0.0);

        let good = kmeans(&points, 3, 42, 100);
        let score = silhouette_score(&points, &good.assignments);
        assert!(score > 0.7 && score <= 1.0, "score {score}");
    }

    #[test]
    fn auto_k_finds_three_blobs() {
        assert_eq!(auto_k(&blobs(), 2, 8, 42, 100), 3);
    }

    #[test]
    fn auto_k_with_few_points_returns_floor() {
        let points = vec![vec![0.0], vec![1.0]];
        assert_eq!(auto_k(&points, 2, 8, 42, 100), 2);
    }

    #[test]
    fn iterations_bounded() {
        let result = kmeans(&blobs(), 3, 3, 1);
        assert_eq!(result.iterations, 1);
    }
}
