use super::nightrun::NightRun;
use crate::model::{Resident, Schedule, ScheduleRow, ShiftInstance};
use chrono::{Duration, NaiveDate};

/// État de résolution : l'affectation centrale plus deux index dérivés
/// (résident → créneaux triés par instant de début, jour → créneaux),
/// entretenus de façon incrémentale. Aucun pointeur arrière.
pub(crate) struct SolveState<'a> {
    pub shifts: &'a [ShiftInstance],
    pub roster: &'a [Resident],
    pub start: NaiveDate,
    pub days: u32,
    /// Créneau → résident (indice dans le roster) ou libre.
    pub assigned: Vec<Option<usize>>,
    /// Résident → créneaux affectés, triés par `start_min`.
    pub by_resident: Vec<Vec<usize>>,
    /// Jour de l'horizon → créneaux du gabarit (statique).
    pub by_date: Vec<Vec<usize>>,
    /// Résident → heures affectées cumulées.
    pub hours: Vec<i64>,
    /// Séries de nuits engagées.
    pub runs: Vec<NightRun>,
}

/// Capture restaurable (retour arrière journalier, meilleur état du recuit).
#[derive(Clone)]
pub(crate) struct Snapshot {
    assigned: Vec<Option<usize>>,
    by_resident: Vec<Vec<usize>>,
    hours: Vec<i64>,
    runs: Vec<NightRun>,
}

impl<'a> SolveState<'a> {
    pub fn new(
        roster: &'a [Resident],
        shifts: &'a [ShiftInstance],
        start: NaiveDate,
        days: u32,
    ) -> Self {
        let mut by_date = vec![Vec::new(); days as usize];
        for (i, shift) in shifts.iter().enumerate() {
            let day = (shift.date - start).num_days();
            if (0..i64::from(days)).contains(&day) {
                by_date[day as usize].push(i);
            }
        }
        Self {
            shifts,
            roster,
            start,
            days,
            assigned: vec![None; shifts.len()],
            by_resident: vec![Vec::new(); roster.len()],
            by_date,
            hours: vec![0; roster.len()],
            runs: Vec::new(),
        }
    }

    pub fn day_index(&self, date: NaiveDate) -> usize {
        (date - self.start).num_days().max(0) as usize
    }

    pub fn date_of_day(&self, day: usize) -> NaiveDate {
        self.start + Duration::days(day as i64)
    }

    /// Durée effective d'un créneau pour un résident donné.
    pub fn duration_of(&self, shift: usize, resident: usize) -> i64 {
        let dur = self.shifts[shift]
            .code
            .duration_hours(self.roster[resident].pgy);
        debug_assert!(dur.is_some(), "assigned shift without a defined duration");
        dur.unwrap_or_default()
    }

    /// Intervalle occupé [début, fin) en minutes d'horizon.
    pub fn interval_of(&self, shift: usize, resident: usize) -> (i64, i64) {
        let start = self.shifts[shift].start_min;
        (start, start + self.duration_of(shift, resident) * 60)
    }

    pub fn assign(&mut self, shift: usize, resident: usize) {
        debug_assert!(self.assigned[shift].is_none(), "shift already assigned");
        self.assigned[shift] = Some(resident);
        let duration = self.duration_of(shift, resident);
        let shifts = self.shifts;
        let key = shifts[shift].start_min;
        let list = &mut self.by_resident[resident];
        let pos = list.partition_point(|&s| shifts[s].start_min < key);
        list.insert(pos, shift);
        self.hours[resident] += duration;
    }

    pub fn unassign(&mut self, shift: usize) -> Option<usize> {
        let resident = self.assigned[shift].take()?;
        let list = &mut self.by_resident[resident];
        if let Some(pos) = list.iter().position(|&s| s == shift) {
            list.remove(pos);
        }
        self.hours[resident] -= self.duration_of(shift, resident);
        Some(resident)
    }

    /// Voisins temporels d'un instant de début dans l'agenda du résident.
    pub fn prev_next(&self, resident: usize, start_min: i64) -> (Option<usize>, Option<usize>) {
        let list = &self.by_resident[resident];
        let pos = list.partition_point(|&s| self.shifts[s].start_min < start_min);
        let prev = pos.checked_sub(1).map(|p| list[p]);
        let next = list.get(pos).copied();
        (prev, next)
    }

    pub fn works_on(&self, resident: usize, date: NaiveDate) -> bool {
        self.by_resident[resident]
            .iter()
            .any(|&s| self.shifts[s].date == date)
    }

    pub fn works_on_day(&self, resident: usize, day: usize) -> bool {
        self.works_on(resident, self.date_of_day(day))
    }

    pub fn works_night_on_day(&self, resident: usize, day: usize) -> bool {
        let date = self.date_of_day(day);
        self.by_resident[resident]
            .iter()
            .any(|&s| self.shifts[s].date == date && self.shifts[s].is_night())
    }

    /// Heures affectées dans la semaine commençant ce lundi-là.
    pub fn weekly_hours(&self, resident: usize, monday: NaiveDate) -> i64 {
        let sunday = monday + Duration::days(6);
        self.by_resident[resident]
            .iter()
            .filter(|&&s| {
                let d = self.shifts[s].date;
                d >= monday && d <= sunday
            })
            .map(|&s| self.duration_of(s, resident))
            .sum()
    }

    pub fn unfilled_optional_count(&self) -> i64 {
        self.shifts
            .iter()
            .zip(&self.assigned)
            .filter(|(shift, assigned)| !shift.required && assigned.is_none())
            .count() as i64
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            assigned: self.assigned.clone(),
            by_resident: self.by_resident.clone(),
            hours: self.hours.clone(),
            runs: self.runs.clone(),
        }
    }

    pub fn restore(&mut self, snap: &Snapshot) {
        self.assigned.clone_from(&snap.assigned);
        self.by_resident.clone_from(&snap.by_resident);
        self.hours.clone_from(&snap.hours);
        self.runs.clone_from(&snap.runs);
    }

    pub fn to_schedule(&self, seed: u64, score: i64) -> Schedule {
        let rows = self
            .shifts
            .iter()
            .zip(&self.assigned)
            .map(|(shift, assigned)| ScheduleRow {
                date: shift.date,
                code: shift.code,
                resident: assigned.map(|r| self.roster[r].handle.clone()),
            })
            .collect();
        Schedule { rows, seed, score }
    }
}
