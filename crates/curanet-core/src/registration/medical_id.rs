//! Medical identifier generation.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::models::MEDICAL_ID_PREFIX;

/// Draws per registration before giving up.
pub const MAX_MEDICAL_ID_ATTEMPTS: usize = 16;

const LOWEST: u32 = 100_000;
const HIGHEST: u32 = 999_999;

/// Source of `MED` + six digit identifiers, uniform over the digit range.
///
/// Uniqueness is not guaranteed here; the registrar checks each draw
/// against the store.
#[derive(Debug, Clone)]
pub struct MedicalIdGenerator {
    rng: StdRng,
}

impl MedicalIdGenerator {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for tests and reproducible seeding.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn next_id(&mut self) -> String {
        let n = self.rng.gen_range(LOWEST..=HIGHEST);
        format!("{}{}", MEDICAL_ID_PREFIX, n)
    }
}

impl Default for MedicalIdGenerator {
    fn default() -> Self {
        Self::from_entropy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::is_medical_id;
    use proptest::prelude::*;

    #[test]
    fn test_seeded_is_deterministic() {
        let mut a = MedicalIdGenerator::seeded(42);
        let mut b = MedicalIdGenerator::seeded(42);
        for _ in 0..10 {
            assert_eq!(a.next_id(), b.next_id());
        }
    }

    proptest! {
        #[test]
        fn prop_ids_are_well_formed(seed in any::<u64>()) {
            let mut ids = MedicalIdGenerator::seeded(seed);
            for _ in 0..8 {
                let id = ids.next_id();
                prop_assert!(is_medical_id(&id), "bad id {}", id);
                let n: u32 = id[3..].parse().unwrap();
                prop_assert!((LOWEST..=HIGHEST).contains(&n));
            }
        }
    }
}
