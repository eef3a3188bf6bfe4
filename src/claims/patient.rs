//! Fake patient identities.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

const FIRST_NAMES: [&str; 24] = [
    "Aarav", "Amelia", "Ashwin", "Chloe", "Daniel", "Deepa", "Emma", "Fatima", "Gabriel", "Hannah",
    "Imran", "Jade", "Kevin", "Leela", "Lucas", "Maya", "Nadia", "Olivier", "Priya", "Rahul",
    "Sarah", "Thomas", "Vikash", "Yasmine",
];

const LAST_NAMES: [&str; 24] = [
    "Appadoo", "Bholah", "Chung", "Dupont", "Emrith", "Fok", "Gopaul", "Hossen", "Jeetun",
    "Kistnen", "Lebon", "Mohabeer", "Narain", "Oodally", "Perrine", "Ramdin", "Sewraj", "Tang",
    "Unuth", "Venkatasamy", "Wong", "Baptiste", "Martin", "Leclerc",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patient {
    pub name: String,
    pub id: u32,
}

impl Patient {
    pub fn fake<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
        let last = LAST_NAMES.choose(rng).copied().unwrap_or("Smith");
        Patient {
            name: format!("{} {}", first, last),
            id: rng.gen_range(100_000..=999_999),
        }
    }

    pub fn from_seed(seed: u64) -> Self {
        Self::fake(&mut StdRng::seed_from_u64(seed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_six_digits() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let p = Patient::fake(&mut rng);
            assert!((100_000..=999_999).contains(&p.id));
            assert_eq!(p.name.split(' ').count(), 2);
        }
    }

    #[test]
    fn seeded_patients_repeat() {
        assert_eq!(Patient::from_seed(42), Patient::from_seed(42));
    }
}
