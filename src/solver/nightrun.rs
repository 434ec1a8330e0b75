use super::state::SolveState;
use crate::model::{Hospital, Team};

/// Série de nuits planifiée : 3 ou 4 nuits consécutives d'un même résident,
/// hôpitaux alternés. Les nuits ne se placent jamais isolément ; toute la
/// série se pose ou se remplace d'un bloc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NightRun {
    pub resident: usize,
    pub team: Team,
    pub start_day: usize,
    pub len: u32,
    pub start_hospital: Hospital,
}

impl NightRun {
    /// Hôpital de la k-ième nuit de la série.
    pub fn hospital_on(&self, k: u32) -> Hospital {
        if k % 2 == 0 {
            self.start_hospital
        } else {
            self.start_hospital.other()
        }
    }

    pub fn last_day(&self) -> usize {
        self.start_day + self.len as usize - 1
    }

    pub fn covers_day(&self, day: usize) -> bool {
        (self.start_day..=self.last_day()).contains(&day)
    }
}

/// Reconstruit les séries depuis une affectation (reprise d'un planning émis) :
/// suites maximales de nuits consécutives par résident.
pub(crate) fn derive_runs(state: &SolveState<'_>) -> Vec<NightRun> {
    let mut runs = Vec::new();
    for r in 0..state.roster.len() {
        let nights: Vec<usize> = state.by_resident[r]
            .iter()
            .copied()
            .filter(|&s| state.shifts[s].is_night())
            .collect();
        let mut i = 0;
        while i < nights.len() {
            let start_day = state.day_index(state.shifts[nights[i]].date);
            let mut len = 1u32;
            while i + (len as usize) < nights.len() {
                let next_day = state.day_index(state.shifts[nights[i + len as usize]].date);
                if next_day != start_day + len as usize {
                    break;
                }
                len += 1;
            }
            runs.push(NightRun {
                resident: r,
                team: state.shifts[nights[i]].code.team,
                start_day,
                len,
                start_hospital: state.shifts[nights[i]].code.hospital,
            });
            i += len as usize;
        }
    }
    runs
}
