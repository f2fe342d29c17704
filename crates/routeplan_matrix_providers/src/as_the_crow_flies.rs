use geo::{Distance, Haversine};

use crate::travel_matrices::TravelMatrices;

/// Points are `(x = lon, y = lat)`.
pub fn as_the_crow_flies_matrices(points: &[geo_types::Point], speed_kmh: f64) -> TravelMatrices {
    let num_points = points.len();
    let mut distances: Vec<f64> = vec![0.0; num_points * num_points];
    let mut times: Vec<f64> = vec![0.0; num_points * num_points];
    let speed_ms = speed_kmh / 3.6;

    for (i, &from) in points.iter().enumerate() {
        for (j, &to) in points.iter().enumerate() {
            let distance = Haversine.distance(from, to);
            distances[i * num_points + j] = distance;
            times[i * num_points + j] = if speed_ms > 0.0 {
                distance / speed_ms
            } else {
                f64::INFINITY
            };
        }
    }

    TravelMatrices { distances, times }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_as_the_crow_flies_matrices() {
        // Brussels -> Antwerp, roughly 41km
        let points = vec![
            geo_types::Point::new(4.3517, 50.8503),
            geo_types::Point::new(4.4025, 51.2194),
        ];

        let matrices = as_the_crow_flies_matrices(&points, 36.0);

        assert_eq!(matrices.distance(0, 0), 0.0);
        assert!((matrices.distance(0, 1) - 41_000.0).abs() < 1_000.0);
        assert_eq!(matrices.distance(0, 1), matrices.distance(1, 0));
        // 36 km/h is 10 m/s
        assert!((matrices.time(0, 1) - matrices.distance(0, 1) / 10.0).abs() < 1e-6);
    }
}
