use super::legality::{denial, denial_with_fallback};
use super::nightrun::NightRun;
use super::state::{SolveState, Snapshot};
use super::types::{SolveError, SolveOptions};
use super::util::{night_tail_coverable, weighted_pick};
use crate::model::{Hospital, Pgy, Service, Team};
use rand::seq::SliceRandom;
use rand::Rng;

/// Phase constructive : jours en ordre chronologique, séries de nuits
/// d'abord, puis postes de jour obligatoires en ordre d'équipes mélangé.
/// Les créneaux optionnels restent libres ici.
///
/// Retour arrière journalier borné ; à l'épuisement du budget, erreur
/// d'infaisabilité nommant le créneau bloquant et le pool de candidats.
pub(crate) fn build_seed<R: Rng>(
    state: &mut SolveState<'_>,
    rng: &mut R,
    options: &SolveOptions,
) -> Result<(), SolveError> {
    let days = state.days as usize;
    let mut snapshots: Vec<Snapshot> = Vec::with_capacity(days);
    let mut retries = vec![0u32; days];
    let mut budget = options.backtrack_budget;

    let mut day = 0usize;
    while day < days {
        if snapshots.len() == day {
            snapshots.push(state.snapshot());
        }
        match plan_day(state, day, rng) {
            Ok(()) => day += 1,
            Err(blocking) => {
                if budget == 0 {
                    return Err(infeasible(state, blocking));
                }
                budget -= 1;
                state.restore(&snapshots[day]);
                retries[day] += 1;
                tracing::debug!(day, retry = retries[day], "construction retry");
                if retries[day] > options.day_retries && day > 0 {
                    retries[day] = 0;
                    day -= 1;
                    state.restore(&snapshots[day]);
                    snapshots.truncate(day + 1);
                }
            }
        }
    }
    Ok(())
}

/// Une journée : échec avec l'indice du créneau impossible à pourvoir.
fn plan_day<R: Rng>(state: &mut SolveState<'_>, day: usize, rng: &mut R) -> Result<(), usize> {
    plan_nights(state, day, rng)?;
    fill_day_shifts(state, day, rng)
}

/// Démarre une série pour chaque nuit du jour qu'aucune série en cours ne
/// couvre. Les engagements posent aussi les nuits des jours suivants.
fn plan_nights<R: Rng>(state: &mut SolveState<'_>, day: usize, rng: &mut R) -> Result<(), usize> {
    let tonight: Vec<usize> = state.by_date[day]
        .iter()
        .copied()
        .filter(|&s| {
            state.shifts[s].is_night() && state.shifts[s].required && state.assigned[s].is_none()
        })
        .collect();

    for shift in tonight {
        if state.assigned[shift].is_some() {
            continue;
        }
        start_run(state, day, shift, rng)?;
    }
    Ok(())
}

fn start_run<R: Rng>(
    state: &mut SolveState<'_>,
    day: usize,
    shift: usize,
    rng: &mut R,
) -> Result<(), usize> {
    let team = state.shifts[shift].code.team;
    let hospital = state.shifts[shift].code.hospital;

    // Longueurs laissant un reliquat de nuits couvrable par d'autres séries.
    let days = i64::from(state.days);
    let mut lengths: Vec<u32> = [3u32, 4]
        .into_iter()
        .filter(|&len| {
            let end = day as i64 + i64::from(len);
            end <= days && night_tail_coverable(days - end)
        })
        .collect();
    if lengths.is_empty() {
        return Err(shift);
    }
    lengths.shuffle(rng);

    let mut pool: Vec<usize> = (0..state.roster.len())
        .filter(|&r| denial_with_fallback(state, r, shift).is_none())
        .collect();

    // Souhaits honorés quand c'est possible : une série couvrant un jour
    // demandé libre ne se corrige plus à bas coût ensuite.
    let clear: Vec<usize> = pool
        .iter()
        .copied()
        .filter(|&r| !requests_in_span(state, r, day, 4))
        .collect();
    if !clear.is_empty() {
        pool = clear;
    }

    while !pool.is_empty() {
        let weights: Vec<f64> = pool
            .iter()
            .map(|&r| hour_deficit(state, r).max(1e-3))
            .collect();
        let picked = pool.swap_remove(weighted_pick(rng, &weights));
        for &len in &lengths {
            if commit_run(state, day, team, hospital, picked, len) {
                return Ok(());
            }
        }
    }
    Err(shift)
}

/// Pose les `len` nuits d'une série, alternance stricte des sites ;
/// tout ou rien.
fn commit_run(
    state: &mut SolveState<'_>,
    day: usize,
    team: Team,
    start_hospital: Hospital,
    resident: usize,
    len: u32,
) -> bool {
    // Une série ne doit pas prolonger une nuit existante du même résident,
    // sinon la suite dépasserait 4 nuits.
    if day > 0 && state.works_night_on_day(resident, day - 1) {
        return false;
    }
    let after_day = day + len as usize;
    if after_day < state.days as usize && state.works_night_on_day(resident, after_day) {
        return false;
    }

    let mut placed: Vec<usize> = Vec::with_capacity(len as usize);
    for k in 0..len {
        let run_day = day + k as usize;
        let hospital = if k % 2 == 0 {
            start_hospital
        } else {
            start_hospital.other()
        };
        let found = run_day < state.days as usize && {
            match night_shift_at(state, run_day, team, hospital) {
                Some(s) if state.assigned[s].is_none() && denial(state, resident, s).is_none() => {
                    state.assign(s, resident);
                    placed.push(s);
                    true
                }
                _ => false,
            }
        };
        if !found {
            for s in placed {
                state.unassign(s);
            }
            return false;
        }
    }
    state.runs.push(NightRun {
        resident,
        team,
        start_day: day,
        len,
        start_hospital,
    });
    true
}

fn night_shift_at(
    state: &SolveState<'_>,
    day: usize,
    team: Team,
    hospital: Hospital,
) -> Option<usize> {
    state.by_date[day]
        .iter()
        .copied()
        .find(|&s| {
            let code = state.shifts[s].code;
            code.is_night() && code.team == team && code.hospital == hospital
        })
}

/// Postes de jour obligatoires, équipe par équipe en ordre aléatoire ;
/// tirage pondéré par déficit horaire, modulé par souhaits et circadien.
fn fill_day_shifts<R: Rng>(
    state: &mut SolveState<'_>,
    day: usize,
    rng: &mut R,
) -> Result<(), usize> {
    let mut teams: Vec<Team> = Vec::new();
    for &s in &state.by_date[day] {
        let inst = &state.shifts[s];
        if inst.required && !inst.is_night() && !teams.contains(&inst.code.team) {
            teams.push(inst.code.team);
        }
    }
    teams.shuffle(rng);

    for team in teams {
        let pending: Vec<usize> = state.by_date[day]
            .iter()
            .copied()
            .filter(|&s| {
                let inst = &state.shifts[s];
                inst.required
                    && !inst.is_night()
                    && inst.code.team == team
                    && state.assigned[s].is_none()
            })
            .collect();
        for shift in pending {
            let pool: Vec<usize> = (0..state.roster.len())
                .filter(|&r| denial_with_fallback(state, r, shift).is_none())
                .collect();
            if pool.is_empty() {
                return Err(shift);
            }
            let weights: Vec<f64> = pool.iter().map(|&r| fill_weight(state, r, shift)).collect();
            let picked = pool[weighted_pick(rng, &weights)];
            state.assign(shift, picked);
        }
    }
    Ok(())
}

fn hour_deficit(state: &SolveState<'_>, resident: usize) -> f64 {
    (state.roster[resident].target_hours - state.hours[resident]).max(0) as f64
}

fn requests_in_span(state: &SolveState<'_>, resident: usize, day: usize, len: usize) -> bool {
    (day..day + len)
        .take_while(|&d| d < state.days as usize)
        .any(|d| state.roster[resident].has_requested(state.date_of_day(d)))
}

fn fill_weight(state: &SolveState<'_>, resident: usize, shift: usize) -> f64 {
    let inst = &state.shifts[shift];
    let res = &state.roster[resident];
    // Plancher : les multiplicateurs gardent un effet même à cible atteinte.
    let mut weight = hour_deficit(state, resident).max(1e-3);
    if res.has_requested(inst.date) {
        weight *= 0.05;
    }
    let preferred = match inst.code.team {
        Team::Eval => res.pgy == Pgy::One,
        Team::Peds => res.service == Service::Peds,
        _ => true,
    };
    if !preferred {
        weight *= 0.3;
    }
    // La veille finissait plus tard dans l'échelle circadienne : recul pénalisé.
    let day = state.day_index(inst.date);
    if day > 0 {
        let yesterday = state.date_of_day(day - 1);
        let prev_rank = state.by_resident[resident]
            .iter()
            .filter(|&&s| state.shifts[s].date == yesterday)
            .map(|&s| state.shifts[s].code.token.circadian_rank())
            .max();
        if let Some(rank) = prev_rank {
            if rank > inst.code.token.circadian_rank() {
                weight *= 0.5;
            }
        }
    }
    weight
}

fn infeasible(state: &SolveState<'_>, shift: usize) -> SolveError {
    let inst = &state.shifts[shift];
    let candidates = state
        .roster
        .iter()
        .enumerate()
        .filter(|(_, res)| res.schedulable())
        .filter_map(|(r, res)| {
            denial_with_fallback(state, r, shift).map(|reason| (res.handle.clone(), reason))
        })
        .collect();
    SolveError::Infeasible {
        code: inst.code,
        date: inst.date,
        candidates,
    }
}
