mod audit;
mod construct;
mod improve;
mod legality;
mod nightrun;
mod score;
mod state;
mod types;
mod util;

pub use audit::Violation;
pub use types::{DenialReason, SolveError, SolveOptions, Weights};

use crate::model::{Resident, Schedule, ShiftCode, ShiftInstance};
use chrono::NaiveDate;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use state::SolveState;
use std::collections::BTreeMap;

/// Solveur : un roster, les créneaux étendus du gabarit, un horizon.
///
/// `solve` est déterministe pour une graine donnée ; toute la part
/// aléatoire passe par un unique générateur semé explicitement.
pub struct Solver<'a> {
    roster: &'a [Resident],
    shifts: &'a [ShiftInstance],
    start: NaiveDate,
    days: u32,
    options: SolveOptions,
}

impl<'a> Solver<'a> {
    pub fn new(
        roster: &'a [Resident],
        shifts: &'a [ShiftInstance],
        start: NaiveDate,
        days: u32,
    ) -> Self {
        Self {
            roster,
            shifts,
            start,
            days,
            options: SolveOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Construit puis améliore un planning complet.
    pub fn solve(&self, seed: u64) -> Result<Schedule, SolveError> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut state = SolveState::new(self.roster, self.shifts, self.start, self.days);

        construct::build_seed(&mut state, &mut rng, &self.options)?;
        tracing::debug!(
            score = score::full_score(&state, &self.options.weights),
            "constructive seed complete"
        );
        improve::improve(&mut state, &mut rng, &self.options);

        debug_assert!(
            audit::check(&state).is_empty(),
            "solver produced an illegal assignment"
        );
        let final_score = score::full_score(&state, &self.options.weights);
        Ok(state.to_schedule(seed, final_score))
    }

    /// Rejoue la descente locale sur un planning émis ; au point fixe, le
    /// score ne bouge plus.
    pub fn polish(&self, schedule: &Schedule) -> Result<Schedule, SolveError> {
        let mut state = self.state_from(schedule)?;
        improve::descent(&mut state, &self.options);
        let final_score = score::full_score(&state, &self.options.weights);
        Ok(state.to_schedule(schedule.seed, final_score))
    }

    /// Vérifie toutes les règles dures sur un planning émis.
    pub fn audit(&self, schedule: &Schedule) -> Result<Vec<Violation>, SolveError> {
        Ok(audit::check(&self.state_from(schedule)?))
    }

    /// Score d'un planning émis sous les pondérations courantes.
    pub fn score(&self, schedule: &Schedule) -> Result<i64, SolveError> {
        Ok(score::full_score(
            &self.state_from(schedule)?,
            &self.options.weights,
        ))
    }

    fn state_from(&self, schedule: &Schedule) -> Result<SolveState<'a>, SolveError> {
        let mut state = SolveState::new(self.roster, self.shifts, self.start, self.days);
        let keyed: BTreeMap<(NaiveDate, ShiftCode), usize> = self
            .shifts
            .iter()
            .enumerate()
            .map(|(i, s)| ((s.date, s.code), i))
            .collect();
        let by_handle: BTreeMap<&str, usize> = self
            .roster
            .iter()
            .enumerate()
            .map(|(i, r)| (r.handle.as_str(), i))
            .collect();

        for row in &schedule.rows {
            let key = (row.date, row.code);
            let Some(&shift) = keyed.get(&key) else {
                return Err(SolveError::UnknownShift(format!(
                    "{} {}",
                    row.date, row.code
                )));
            };
            if let Some(handle) = &row.resident {
                let Some(&resident) = by_handle.get(handle.as_str()) else {
                    return Err(SolveError::UnknownResident(handle.clone()));
                };
                state.assign(shift, resident);
            }
        }
        state.runs = nightrun::derive_runs(&state);
        Ok(state)
    }
}
