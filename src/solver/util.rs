use chrono::{Datelike, Duration, NaiveDate};
use rand::Rng;

/// Lundi de la semaine du jour donné.
pub(super) fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Tirage pondéré ; uniforme quand tous les poids sont nuls.
pub(super) fn weighted_pick<R: Rng>(rng: &mut R, weights: &[f64]) -> usize {
    debug_assert!(!weights.is_empty());
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return rng.random_range(0..weights.len());
    }
    let mut x = rng.random_range(0.0..total);
    for (i, w) in weights.iter().enumerate() {
        if x < *w {
            return i;
        }
        x -= w;
    }
    weights.len() - 1
}

/// Un reliquat de nuits est couvrable par des séries de 3 ou 4 ssi il ne
/// vaut ni 1, ni 2, ni 5.
pub(super) fn night_tail_coverable(remaining: i64) -> bool {
    remaining >= 0 && !matches!(remaining, 1 | 2 | 5)
}
