use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Cost used for both distance and time when a provider cannot route a pair.
/// Large enough that the optimizer never prefers such an edge.
pub const UNREACHABLE: f64 = 999_999_999.0;

/// TravelMatrices holds the travel distance (meters) and time (seconds) matrices.
/// Stored as flat vectors, `index = from * num_locations + to`
#[derive(Deserialize, Serialize, JsonSchema, Debug, Clone, PartialEq)]
pub struct TravelMatrices {
    pub distances: Vec<f64>,
    pub times: Vec<f64>,
}

impl TravelMatrices {
    pub fn from_rows(distances: Vec<Vec<f64>>, times: Vec<Vec<f64>>) -> Self {
        TravelMatrices {
            distances: distances.into_iter().flatten().collect(),
            times: times.into_iter().flatten().collect(),
        }
    }

    pub fn num_locations(&self) -> usize {
        self.distances.len().isqrt()
    }

    /// Both matrices are square and of the same size.
    pub fn is_well_formed(&self) -> bool {
        let n = self.num_locations();
        self.distances.len() == n * n && self.times.len() == n * n
    }

    pub fn distance(&self, from: usize, to: usize) -> f64 {
        self.distances[from * self.num_locations() + to]
    }

    pub fn time(&self, from: usize, to: usize) -> f64 {
        self.times[from * self.num_locations() + to]
    }

    /// Replaces every missing, non finite or negative value by [`UNREACHABLE`], returns the
    /// number of substituted pairs.
    pub(crate) fn fill_unreachable(
        distances: &[Option<f64>],
        times: &[Option<f64>],
    ) -> (TravelMatrices, usize) {
        let mut substituted = 0;
        let mut sanitized_distances = Vec::with_capacity(distances.len());
        let mut sanitized_times = Vec::with_capacity(times.len());

        for (distance, time) in distances.iter().zip(times) {
            match (distance, time) {
                (Some(distance), Some(time))
                    if distance.is_finite()
                        && time.is_finite()
                        && *distance >= 0.0
                        && *time >= 0.0 =>
                {
                    sanitized_distances.push(*distance);
                    sanitized_times.push(*time);
                }
                _ => {
                    substituted += 1;
                    sanitized_distances.push(UNREACHABLE);
                    sanitized_times.push(UNREACHABLE);
                }
            }
        }

        (
            TravelMatrices {
                distances: sanitized_distances,
                times: sanitized_times,
            },
            substituted,
        )
    }

    pub(crate) fn sanitized(self) -> (TravelMatrices, usize) {
        let distances = self.distances.into_iter().map(Some).collect::<Vec<_>>();
        let times = self.times.into_iter().map(Some).collect::<Vec<_>>();
        TravelMatrices::fill_unreachable(&distances, &times)
    }

    /// Builds the matrices of `order`, where `order[i]` is the index in `self` of the i-th point.
    pub(crate) fn reindex(&self, order: &[usize]) -> TravelMatrices {
        let n = order.len();
        let mut distances = Vec::with_capacity(n * n);
        let mut times = Vec::with_capacity(n * n);

        for &from in order {
            for &to in order {
                distances.push(self.distance(from, to));
                times.push(self.time(from, to));
            }
        }

        TravelMatrices { distances, times }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_unreachable() {
        let distances = [Some(0.0), None, Some(10.0), Some(0.0)];
        let times = [Some(0.0), Some(5.0), Some(f64::NAN), Some(0.0)];

        let (matrices, substituted) = TravelMatrices::fill_unreachable(&distances, &times);

        assert_eq!(substituted, 2);
        assert_eq!(matrices.distances, vec![0.0, UNREACHABLE, UNREACHABLE, 0.0]);
        assert_eq!(matrices.times, vec![0.0, UNREACHABLE, UNREACHABLE, 0.0]);
    }

    #[test]
    fn test_negative_entries_are_unreachable() {
        let matrices = TravelMatrices::from_rows(
            vec![vec![0.0, -3.0], vec![4.0, 0.0]],
            vec![vec![0.0, 1.0], vec![-1.0, 0.0]],
        );

        let (sanitized, substituted) = matrices.sanitized();

        assert_eq!(substituted, 2);
        assert_eq!(sanitized.distance(0, 1), UNREACHABLE);
        assert_eq!(sanitized.distance(1, 0), UNREACHABLE);
        assert_eq!(sanitized.time(1, 0), UNREACHABLE);
        assert_eq!(sanitized.distance(0, 0), 0.0);
    }

    #[test]
    fn test_reindex() {
        let matrices = TravelMatrices::from_rows(
            vec![vec![0.0, 1.0], vec![2.0, 0.0]],
            vec![vec![0.0, 10.0], vec![20.0, 0.0]],
        );

        let reindexed = matrices.reindex(&[1, 0, 1]);

        assert_eq!(reindexed.num_locations(), 3);
        assert_eq!(reindexed.distance(0, 1), 2.0);
        assert_eq!(reindexed.distance(1, 2), 1.0);
        assert_eq!(reindexed.distance(0, 2), 0.0);
        assert_eq!(reindexed.time(1, 0), 10.0);
    }
}
