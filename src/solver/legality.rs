use super::state::SolveState;
use super::types::DenialReason;
use super::util::monday_of;
use crate::model::{Pgy, Service, ShiftInstance, Team};

/// Prédicat de légalité : `None` si l'affectation est admissible.
///
/// Pur : n'altère jamais l'état ; le solveur n'applique une mise à jour
/// qu'après acceptation du mouvement. Le créneau testé est supposé libre.
pub(crate) fn denial(state: &SolveState<'_>, resident: usize, shift: usize) -> Option<DenialReason> {
    let res = &state.roster[resident];
    let inst = &state.shifts[shift];

    // 1. Éligibilité de service.
    if !res.schedulable() {
        return Some(DenialReason::OffRoster);
    }
    if res.service == Service::Peds && inst.code.team != Team::Peds {
        return Some(DenialReason::OffRoster);
    }

    // 2. Pool de classe et durée définie.
    if !class_eligible(inst, res.pgy) {
        return Some(DenialReason::IneligibleClass);
    }
    let Some(duration) = inst.code.duration_hours(res.pgy) else {
        return Some(DenialReason::IneligibleClass);
    };

    // 3. Unicité journalière.
    if state.works_on(resident, inst.date) {
        return Some(DenialReason::SameDay);
    }

    // 4. Repos équivalent contre les voisins temporels.
    let start = inst.start_min;
    let end = start + duration * 60;
    let (prev, next) = state.prev_next(resident, start);
    if let Some(p) = prev {
        let (p_start, p_end) = state.interval_of(p, resident);
        let p_duration_min = p_end - p_start;
        if start - p_end < p_duration_min {
            return Some(DenialReason::RestBefore);
        }
    }
    if let Some(n) = next {
        if state.shifts[n].start_min - end < duration * 60 {
            return Some(DenialReason::RestAfter);
        }
    }

    // 5. Plafond hebdomadaire lundi–dimanche.
    if state.weekly_hours(resident, monday_of(inst.date)) + duration > 60 {
        return Some(DenialReason::WeeklyHours);
    }

    // 6. Période libre de 24 h dans chaque fenêtre de 7 jours.
    if !keeps_free_day(state, resident, shift, duration) {
        return Some(DenialReason::NoFreeDay);
    }

    None
}

/// Légalité complète : ajoute la priorité pédiatrique. Un résident de repli
/// n'est admis sur P que si aucun résident en bloc Peds ne l'est, et un
/// PGY-3 que si aucun PGY-1/2 ne l'est.
pub(crate) fn denial_with_fallback(
    state: &SolveState<'_>,
    resident: usize,
    shift: usize,
) -> Option<DenialReason> {
    if let Some(reason) = denial(state, resident, shift) {
        return Some(reason);
    }
    let inst = &state.shifts[shift];
    if inst.code.team != Team::Peds {
        return None;
    }
    let res = &state.roster[resident];
    if res.service != Service::Peds {
        let peds_available = (0..state.roster.len()).any(|other| {
            other != resident
                && state.roster[other].service == Service::Peds
                && denial(state, other, shift).is_none()
        });
        if peds_available {
            return Some(DenialReason::PedsPriority);
        }
        if res.pgy == Pgy::Three {
            let junior_available = (0..state.roster.len()).any(|other| {
                other != resident
                    && state.roster[other].pgy != Pgy::Three
                    && denial(state, other, shift).is_none()
            });
            if junior_available {
                return Some(DenialReason::PedsPriority);
            }
        }
    }
    None
}

/// Pool de classe par équipe ; le poste B obligatoire est réservé aux PGY-1.
pub(crate) fn class_eligible(inst: &ShiftInstance, pgy: Pgy) -> bool {
    match inst.code.team {
        Team::Red => pgy == Pgy::Three,
        Team::Green => pgy == Pgy::Two,
        Team::Intern => pgy == Pgy::One,
        Team::Eval => true,
        Team::Blue => {
            if inst.required {
                pgy == Pgy::One
            } else {
                true
            }
        }
        Team::Peds => true,
    }
}

/// Vérifie qu'après ajout du candidat, chaque fenêtre de 7 jours contenant
/// sa date garde un intervalle continu de 24 h sans affectation.
fn keeps_free_day(state: &SolveState<'_>, resident: usize, shift: usize, duration: i64) -> bool {
    let days = i64::from(state.days);
    if days < 7 {
        return true;
    }

    let inst = &state.shifts[shift];
    let cand = (inst.start_min, inst.start_min + duration * 60);
    let mut intervals: Vec<(i64, i64)> = state.by_resident[resident]
        .iter()
        .map(|&s| state.interval_of(s, resident))
        .collect();
    let pos = intervals.partition_point(|&(s, _)| s < cand.0);
    intervals.insert(pos, cand);

    let shift_day = state.day_index(inst.date) as i64;
    let lo = (shift_day - 6).max(0);
    let hi = shift_day.min(days - 7);
    for window in lo..=hi {
        let a = window * 24 * 60;
        let b = a + 7 * 24 * 60;
        let mut cursor = a;
        let mut best_gap = 0i64;
        for &(is, ie) in &intervals {
            if ie <= a {
                continue;
            }
            if is >= b {
                break;
            }
            let clipped_start = is.max(a);
            if clipped_start > cursor {
                best_gap = best_gap.max(clipped_start - cursor);
            }
            cursor = cursor.max(ie.min(b));
        }
        best_gap = best_gap.max(b - cursor);
        if best_gap < 24 * 60 {
            return false;
        }
    }
    true
}
