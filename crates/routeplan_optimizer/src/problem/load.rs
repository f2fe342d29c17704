use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::Serialize;

const GRAMS_PER_KG: f64 = 1_000.0;
const MILLILITERS_PER_M3: f64 = 1_000_000.0;

/// Weight in grams and volume in milliliters.
///
/// Quantities are kept as integers so that cumulative loads along a route are exact.
#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Load {
    pub grams: i64,
    pub milliliters: i64,
}

impl Load {
    pub const ZERO: Load = Load {
        grams: 0,
        milliliters: 0,
    };

    pub fn new(grams: i64, milliliters: i64) -> Self {
        Load { grams, milliliters }
    }

    pub fn from_kg_m3(kg: f64, m3: f64) -> Self {
        Load {
            grams: (kg * GRAMS_PER_KG).round() as i64,
            milliliters: (m3 * MILLILITERS_PER_M3).round() as i64,
        }
    }

    pub fn kg(&self) -> f64 {
        self.grams as f64 / GRAMS_PER_KG
    }

    pub fn m3(&self) -> f64 {
        self.milliliters as f64 / MILLILITERS_PER_M3
    }

    /// Both dimensions lie in `[0, capacity]`.
    pub fn within(&self, capacity: &Load) -> bool {
        self.grams >= 0
            && self.milliliters >= 0
            && self.grams <= capacity.grams
            && self.milliliters <= capacity.milliliters
    }
}

impl Add for Load {
    type Output = Load;

    fn add(self, rhs: Load) -> Load {
        Load {
            grams: self.grams + rhs.grams,
            milliliters: self.milliliters + rhs.milliliters,
        }
    }
}

impl AddAssign for Load {
    fn add_assign(&mut self, rhs: Load) {
        self.grams += rhs.grams;
        self.milliliters += rhs.milliliters;
    }
}

impl Sub for Load {
    type Output = Load;

    fn sub(self, rhs: Load) -> Load {
        Load {
            grams: self.grams - rhs.grams,
            milliliters: self.milliliters - rhs.milliliters,
        }
    }
}

impl SubAssign for Load {
    fn sub_assign(&mut self, rhs: Load) {
        self.grams -= rhs.grams;
        self.milliliters -= rhs.milliliters;
    }
}

impl Neg for Load {
    type Output = Load;

    fn neg(self) -> Load {
        Load {
            grams: -self.grams,
            milliliters: -self.milliliters,
        }
    }
}

impl std::iter::Sum for Load {
    fn sum<I: Iterator<Item = Load>>(iter: I) -> Self {
        iter.fold(Load::ZERO, |acc, load| acc + load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_keeps_fractions() {
        let load = Load::from_kg_m3(0.4, 0.0025);
        assert_eq!(load, Load::new(400, 2_500));
        assert_eq!(load.kg(), 0.4);
    }

    #[test]
    fn test_within() {
        let capacity = Load::from_kg_m3(3.0, 1.0);

        assert!(Load::from_kg_m3(3.0, 1.0).within(&capacity));
        assert!(!Load::from_kg_m3(3.001, 0.5).within(&capacity));
        assert!(!Load::new(-1, 0).within(&capacity));
    }
}
