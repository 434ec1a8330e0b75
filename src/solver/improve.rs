use super::legality::{denial, denial_with_fallback};
use super::score::{full_score, resident_score};
use super::state::SolveState;
use super::types::{SolveOptions, Weights};
use crate::model::{Service, Team};
use rand::Rng;

/// Mouvement de voisinage ; les nuits ne bougent que par série entière.
#[derive(Debug, Clone, Copy)]
enum Move {
    /// Change le résident d'un créneau affecté.
    Reassign { shift: usize, to: usize },
    /// Échange les résidents de deux créneaux affectés.
    Swap { a: usize, b: usize },
    /// Pourvoit un créneau optionnel resté libre.
    Fill { shift: usize, to: usize },
    /// Libère un créneau optionnel qui pousse au-delà de la cible.
    Drop { shift: usize },
    /// Remplace le résident d'une série de nuits complète, longueur et
    /// alternance conservées.
    Reshape { run: usize, to: usize },
}

enum Undo {
    Reassign {
        shift: usize,
        from: usize,
    },
    Swap {
        a: usize,
        from_a: usize,
        b: usize,
        from_b: usize,
    },
    Fill {
        shift: usize,
    },
    Drop {
        shift: usize,
        from: usize,
    },
    Reshape {
        run: usize,
        from: usize,
        shifts: Vec<usize>,
    },
}

/// Phase d'amélioration : marche de recuit simulé (un état courant, un
/// meilleur état conservé à part), puis descente déterministe jusqu'au
/// point fixe. Tout mouvement accepté laisse l'affectation légale.
pub(crate) fn improve<R: Rng>(state: &mut SolveState<'_>, rng: &mut R, options: &SolveOptions) {
    let weights = &options.weights;
    let mut current = full_score(state, weights);
    let mut best = state.snapshot();
    let mut best_score = current;
    let mut temperature = options.sa_initial_temp;

    for _ in 0..options.sa_steps {
        if let Some(mv) = propose_random(state, rng) {
            if let Some((delta, undo_info)) = try_apply(state, &mv, weights) {
                if delta <= 0 || accept_worse(rng, delta as f64, temperature) {
                    current += delta;
                    debug_assert_eq!(current, full_score(state, weights));
                    if current < best_score {
                        best_score = current;
                        best = state.snapshot();
                    }
                } else {
                    undo(state, undo_info);
                }
            }
        }
        temperature = (temperature * options.sa_cooling).max(options.sa_min_temp);
    }

    if best_score < current {
        state.restore(&best);
    }
    tracing::debug!(score = best_score.min(current), "annealing walk finished");
    descent(state, options);
}

/// Balayages de descente stricte : appliqué sur sa propre sortie, aucun
/// mouvement améliorant ne subsiste.
pub(crate) fn descent(state: &mut SolveState<'_>, options: &SolveOptions) {
    let weights = &options.weights;
    for _ in 0..options.max_descent_sweeps {
        let mut improved = false;
        improved |= sweep_peds_repair(state);
        improved |= sweep_reassign(state, weights);
        improved |= sweep_fill(state, weights);
        improved |= sweep_drop(state, weights);
        improved |= sweep_swap(state, weights);
        improved |= sweep_reshape(state, weights);
        if !improved {
            break;
        }
    }
}

fn accept_worse<R: Rng>(rng: &mut R, delta: f64, temperature: f64) -> bool {
    rng.random::<f64>() < (-delta / temperature).exp()
}

fn propose_random<R: Rng>(state: &SolveState<'_>, rng: &mut R) -> Option<Move> {
    let residents = state.roster.len();
    match rng.random_range(0..100u32) {
        0..=34 => {
            let pool = movable_shifts(state);
            let shift = *pick(rng, &pool)?;
            Some(Move::Reassign {
                shift,
                to: rng.random_range(0..residents),
            })
        }
        35..=64 => {
            let pool = movable_shifts(state);
            let a = *pick(rng, &pool)?;
            let partners: Vec<usize> = pool
                .iter()
                .copied()
                .filter(|&b| {
                    b != a
                        && state.shifts[b].code.team == state.shifts[a].code.team
                        && state.assigned[b] != state.assigned[a]
                })
                .collect();
            let b = *pick(rng, &partners)?;
            Some(Move::Swap { a, b })
        }
        65..=79 => {
            let pool: Vec<usize> = (0..state.shifts.len())
                .filter(|&s| {
                    !state.shifts[s].required
                        && !state.shifts[s].is_night()
                        && state.assigned[s].is_none()
                })
                .collect();
            let shift = *pick(rng, &pool)?;
            Some(Move::Fill {
                shift,
                to: rng.random_range(0..residents),
            })
        }
        80..=89 => {
            let pool: Vec<usize> = (0..state.shifts.len())
                .filter(|&s| !state.shifts[s].required && state.assigned[s].is_some())
                .collect();
            let shift = *pick(rng, &pool)?;
            Some(Move::Drop { shift })
        }
        _ => {
            if state.runs.is_empty() {
                return None;
            }
            Some(Move::Reshape {
                run: rng.random_range(0..state.runs.len()),
                to: rng.random_range(0..residents),
            })
        }
    }
}

fn pick<'s, R: Rng>(rng: &mut R, pool: &'s [usize]) -> Option<&'s usize> {
    if pool.is_empty() {
        None
    } else {
        Some(&pool[rng.random_range(0..pool.len())])
    }
}

/// Créneaux de jour affectés, candidats aux mouvements unitaires.
fn movable_shifts(state: &SolveState<'_>) -> Vec<usize> {
    (0..state.shifts.len())
        .filter(|&s| !state.shifts[s].is_night() && state.assigned[s].is_some())
        .collect()
}

/// Applique un mouvement légal et rend son delta de score (résidents
/// touchés uniquement) ; `None` si le mouvement est illégal ou sans objet.
fn try_apply(state: &mut SolveState<'_>, mv: &Move, weights: &Weights) -> Option<(i64, Undo)> {
    match *mv {
        Move::Reassign { shift, to } => {
            let from = state.assigned[shift]?;
            if from == to || state.shifts[shift].is_night() {
                return None;
            }
            let before =
                resident_score(state, weights, from) + resident_score(state, weights, to);
            state.unassign(shift);
            if denial_with_fallback(state, to, shift).is_some() {
                state.assign(shift, from);
                return None;
            }
            state.assign(shift, to);
            let after = resident_score(state, weights, from) + resident_score(state, weights, to);
            Some((after - before, Undo::Reassign { shift, from }))
        }
        Move::Swap { a, b } => {
            if a == b || state.shifts[a].is_night() || state.shifts[b].is_night() {
                return None;
            }
            let from_a = state.assigned[a]?;
            let from_b = state.assigned[b]?;
            if from_a == from_b {
                return None;
            }
            let before =
                resident_score(state, weights, from_a) + resident_score(state, weights, from_b);
            state.unassign(a);
            state.unassign(b);
            if denial_with_fallback(state, from_b, a).is_some() {
                state.assign(a, from_a);
                state.assign(b, from_b);
                return None;
            }
            state.assign(a, from_b);
            if denial_with_fallback(state, from_a, b).is_some() {
                state.unassign(a);
                state.assign(a, from_a);
                state.assign(b, from_b);
                return None;
            }
            state.assign(b, from_a);
            let after =
                resident_score(state, weights, from_a) + resident_score(state, weights, from_b);
            Some((
                after - before,
                Undo::Swap {
                    a,
                    from_a,
                    b,
                    from_b,
                },
            ))
        }
        Move::Fill { shift, to } => {
            let inst = &state.shifts[shift];
            if inst.required || inst.is_night() || state.assigned[shift].is_some() {
                return None;
            }
            if state.hours[to] >= state.roster[to].target_hours {
                return None;
            }
            if denial_with_fallback(state, to, shift).is_some() {
                return None;
            }
            let before = resident_score(state, weights, to);
            state.assign(shift, to);
            let after = resident_score(state, weights, to);
            Some((
                after - before - weights.unfilled_optional,
                Undo::Fill { shift },
            ))
        }
        Move::Drop { shift } => {
            if state.shifts[shift].required {
                return None;
            }
            let from = state.assigned[shift]?;
            if state.hours[from] <= state.roster[from].target_hours {
                return None;
            }
            let before = resident_score(state, weights, from);
            state.unassign(shift);
            let after = resident_score(state, weights, from);
            Some((
                after - before + weights.unfilled_optional,
                Undo::Drop { shift, from },
            ))
        }
        Move::Reshape { run, to } => {
            let info = state.runs.get(run)?.clone();
            if info.resident == to {
                return None;
            }
            // Le repreneur ne doit pas déjà avoir une nuit collée à la série.
            if info.start_day > 0 && state.works_night_on_day(to, info.start_day - 1) {
                return None;
            }
            let day_after = info.last_day() + 1;
            if day_after < state.days as usize && state.works_night_on_day(to, day_after) {
                return None;
            }
            let from = info.resident;
            let shifts = run_shifts(state, run);
            debug_assert_eq!(shifts.len(), info.len as usize);
            let before =
                resident_score(state, weights, from) + resident_score(state, weights, to);
            for &s in &shifts {
                state.unassign(s);
            }
            let mut placed = 0usize;
            let mut legal = true;
            for &s in &shifts {
                if denial(state, to, s).is_some() {
                    legal = false;
                    break;
                }
                state.assign(s, to);
                placed += 1;
            }
            if !legal {
                for &s in shifts.iter().take(placed) {
                    state.unassign(s);
                }
                for &s in &shifts {
                    state.assign(s, from);
                }
                return None;
            }
            state.runs[run].resident = to;
            let after = resident_score(state, weights, from) + resident_score(state, weights, to);
            Some((after - before, Undo::Reshape { run, from, shifts }))
        }
    }
}

fn undo(state: &mut SolveState<'_>, undo: Undo) {
    match undo {
        Undo::Reassign { shift, from } => {
            state.unassign(shift);
            state.assign(shift, from);
        }
        Undo::Swap {
            a,
            from_a,
            b,
            from_b,
        } => {
            state.unassign(a);
            state.unassign(b);
            state.assign(a, from_a);
            state.assign(b, from_b);
        }
        Undo::Fill { shift } => {
            state.unassign(shift);
        }
        Undo::Drop { shift, from } => {
            state.assign(shift, from);
        }
        Undo::Reshape { run, from, shifts } => {
            for &s in &shifts {
                state.unassign(s);
            }
            for &s in &shifts {
                state.assign(s, from);
            }
            state.runs[run].resident = from;
        }
    }
}

/// Créneaux d'une série, dans l'ordre chronologique.
fn run_shifts(state: &SolveState<'_>, run: usize) -> Vec<usize> {
    let info = &state.runs[run];
    state.by_resident[info.resident]
        .iter()
        .copied()
        .filter(|&s| {
            state.shifts[s].is_night() && info.covers_day(state.day_index(state.shifts[s].date))
        })
        .collect()
}

fn keep_if_better(state: &mut SolveState<'_>, mv: Move, weights: &Weights) -> bool {
    if let Some((delta, undo_info)) = try_apply(state, &mv, weights) {
        if delta < 0 {
            return true;
        }
        undo(state, undo_info);
    }
    false
}

fn sweep_reassign(state: &mut SolveState<'_>, weights: &Weights) -> bool {
    let mut improved = false;
    for shift in 0..state.shifts.len() {
        if state.shifts[shift].is_night() {
            continue;
        }
        for to in 0..state.roster.len() {
            if state.assigned[shift].is_none() || state.assigned[shift] == Some(to) {
                continue;
            }
            improved |= keep_if_better(state, Move::Reassign { shift, to }, weights);
        }
    }
    improved
}

fn sweep_fill(state: &mut SolveState<'_>, weights: &Weights) -> bool {
    let mut improved = false;
    for shift in 0..state.shifts.len() {
        let inst = &state.shifts[shift];
        if inst.required || inst.is_night() {
            continue;
        }
        for to in 0..state.roster.len() {
            if state.assigned[shift].is_some() {
                break;
            }
            improved |= keep_if_better(state, Move::Fill { shift, to }, weights);
        }
    }
    improved
}

fn sweep_drop(state: &mut SolveState<'_>, weights: &Weights) -> bool {
    let mut improved = false;
    for shift in 0..state.shifts.len() {
        if !state.shifts[shift].required && state.assigned[shift].is_some() {
            improved |= keep_if_better(state, Move::Drop { shift }, weights);
        }
    }
    improved
}

fn sweep_swap(state: &mut SolveState<'_>, weights: &Weights) -> bool {
    let mut improved = false;
    for a in 0..state.shifts.len() {
        if state.shifts[a].is_night() || state.assigned[a].is_none() {
            continue;
        }
        for b in (a + 1)..state.shifts.len() {
            if state.shifts[b].is_night()
                || state.assigned[b].is_none()
                || state.shifts[b].code.team != state.shifts[a].code.team
            {
                continue;
            }
            improved |= keep_if_better(state, Move::Swap { a, b }, weights);
        }
    }
    improved
}

/// Règle dure, pas un gain de score : un créneau P tenu par un repli
/// retourne à un résident en bloc Peds dès que l'un d'eux redevient légal.
fn sweep_peds_repair(state: &mut SolveState<'_>) -> bool {
    let mut changed = false;
    for shift in 0..state.shifts.len() {
        if state.shifts[shift].code.team != Team::Peds {
            continue;
        }
        let Some(holder) = state.assigned[shift] else {
            continue;
        };
        if state.roster[holder].service == Service::Peds {
            continue;
        }
        state.unassign(shift);
        let replacement = (0..state.roster.len()).find(|&p| {
            state.roster[p].service == Service::Peds && denial(state, p, shift).is_none()
        });
        match replacement {
            Some(p) => {
                state.assign(shift, p);
                changed = true;
            }
            None => state.assign(shift, holder),
        }
    }
    changed
}

fn sweep_reshape(state: &mut SolveState<'_>, weights: &Weights) -> bool {
    let mut improved = false;
    for run in 0..state.runs.len() {
        for to in 0..state.roster.len() {
            improved |= keep_if_better(state, Move::Reshape { run, to }, weights);
        }
    }
    improved
}
