use super::state::SolveState;
use super::types::Weights;
use crate::model::{Pgy, Resident, Service, ShiftInstance, Team};

/// Score complet ; sert de référence et de garde-fou en debug.
pub(crate) fn full_score(state: &SolveState<'_>, weights: &Weights) -> i64 {
    let mut total = weights.unfilled_optional * state.unfilled_optional_count();
    for resident in 0..state.roster.len() {
        total += resident_score(state, weights, resident);
    }
    total
}

/// Contribution d'un seul résident : les mouvements locaux n'évaluent que
/// les résidents touchés.
pub(crate) fn resident_score(state: &SolveState<'_>, weights: &Weights, resident: usize) -> i64 {
    let res = &state.roster[resident];
    let mut score = 0i64;

    let deviation = res.target_hours - state.hours[resident];
    score += weights.hour_deviation * deviation * deviation;

    let list = &state.by_resident[resident];
    for &s in list {
        let inst = &state.shifts[s];
        score += preference_penalty(weights, inst, res);
        if res.has_requested(inst.date) {
            score += weights.request;
        }
    }

    // Transitions anti-circadiennes sur 72 h ; un jour entièrement libre
    // entre les deux créneaux efface la paire.
    for i in 0..list.len() {
        for j in (i + 1)..list.len() {
            let a = &state.shifts[list[i]];
            let b = &state.shifts[list[j]];
            if b.start_min - a.start_min > 72 * 60 {
                break;
            }
            let backward = a.code.token.circadian_rank() - b.code.token.circadian_rank();
            if backward > 0 && !free_day_between(state, resident, list[i], list[j]) {
                score += weights.circadian * backward;
            }
        }
    }

    for run in state.runs.iter().filter(|run| run.resident == resident) {
        if run.start_day == 0 || !state.works_on_day(resident, run.start_day - 1) {
            score -= weights.night_adjacency;
        }
        let after = run.last_day() + 1;
        if after >= state.days as usize || !state.works_on_day(resident, after) {
            score -= weights.night_adjacency;
        }
    }

    score
}

fn preference_penalty(weights: &Weights, inst: &ShiftInstance, res: &Resident) -> i64 {
    match inst.code.team {
        Team::Eval if res.pgy != Pgy::One => weights.preference,
        Team::Blue if !inst.required && res.pgy != Pgy::One => weights.preference,
        Team::Peds if res.service != Service::Peds => {
            if res.pgy == Pgy::Three {
                weights.peds_fallback_pgy3
            } else {
                weights.preference
            }
        }
        _ => 0,
    }
}

fn free_day_between(state: &SolveState<'_>, resident: usize, a: usize, b: usize) -> bool {
    let first = state.day_index(state.shifts[a].date);
    let last = state.day_index(state.shifts[b].date);
    (first + 1..last).any(|day| !state.works_on_day(resident, day))
}
