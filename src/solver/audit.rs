use super::legality::{class_eligible, denial};
use super::state::SolveState;
use super::util::monday_of;
use crate::model::{Service, Team};
use chrono::{Duration, NaiveDate};
use std::fmt;

/// Manquement à une règle dure constaté sur un planning complet.
///
/// Le solveur ne doit jamais en produire ; la vérification sert de contrôle
/// de bogue interne et alimente la commande `check`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    UnfilledRequired {
        date: NaiveDate,
        code: String,
    },
    NotSchedulable {
        handle: String,
        date: NaiveDate,
        code: String,
    },
    IneligibleClass {
        handle: String,
        date: NaiveDate,
        code: String,
    },
    DoubleBooked {
        handle: String,
        date: NaiveDate,
    },
    RestViolation {
        handle: String,
        date: NaiveDate,
        code: String,
    },
    WeeklyHours {
        handle: String,
        week_start: NaiveDate,
        hours: i64,
    },
    NoFreeDay {
        handle: String,
        window_start: NaiveDate,
    },
    BadNightRun {
        handle: String,
        start_date: NaiveDate,
        len: usize,
    },
    PedsFallbackSkipped {
        date: NaiveDate,
        code: String,
        idle_peds: String,
    },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::UnfilledRequired { date, code } => {
                write!(f, "required shift {code} on {date} is unfilled")
            }
            Violation::NotSchedulable { handle, date, code } => {
                write!(f, "{handle} is not schedulable but holds {code} on {date}")
            }
            Violation::IneligibleClass { handle, date, code } => {
                write!(f, "{handle} is not class-eligible for {code} on {date}")
            }
            Violation::DoubleBooked { handle, date } => {
                write!(f, "{handle} holds more than one shift on {date}")
            }
            Violation::RestViolation { handle, date, code } => {
                write!(f, "{handle} lacks equal rest before {code} on {date}")
            }
            Violation::WeeklyHours {
                handle,
                week_start,
                hours,
            } => write!(
                f,
                "{handle} works {hours} h in the week of {week_start} (cap 60)"
            ),
            Violation::NoFreeDay {
                handle,
                window_start,
            } => write!(
                f,
                "{handle} has no 24 h free period in the 7 days from {window_start}"
            ),
            Violation::BadNightRun {
                handle,
                start_date,
                len,
            } => write!(
                f,
                "{handle} has a night run of {len} starting {start_date} (want 3-4, alternating)"
            ),
            Violation::PedsFallbackSkipped {
                date,
                code,
                idle_peds,
            } => write!(
                f,
                "{code} on {date} bypasses available Peds-block resident {idle_peds}"
            ),
        }
    }
}

/// Vérifie toutes les règles dures sur l'affectation courante.
pub(crate) fn check(state: &SolveState<'_>) -> Vec<Violation> {
    let mut out = Vec::new();
    required_filled(state, &mut out);
    assignment_rules(state, &mut out);
    daily_uniqueness(state, &mut out);
    rest_rule(state, &mut out);
    weekly_hours(state, &mut out);
    free_day(state, &mut out);
    night_runs(state, &mut out);
    peds_priority(state, &mut out);
    out
}

fn required_filled(state: &SolveState<'_>, out: &mut Vec<Violation>) {
    for (s, inst) in state.shifts.iter().enumerate() {
        if inst.required && state.assigned[s].is_none() {
            out.push(Violation::UnfilledRequired {
                date: inst.date,
                code: inst.code.to_string(),
            });
        }
    }
}

fn assignment_rules(state: &SolveState<'_>, out: &mut Vec<Violation>) {
    for (s, inst) in state.shifts.iter().enumerate() {
        let Some(r) = state.assigned[s] else { continue };
        let res = &state.roster[r];
        if !res.schedulable() || (res.service == Service::Peds && inst.code.team != Team::Peds) {
            out.push(Violation::NotSchedulable {
                handle: res.handle.clone(),
                date: inst.date,
                code: inst.code.to_string(),
            });
        }
        let class_ok = match inst.code.team {
            // Le repli P est vérifié à part.
            Team::Peds => true,
            _ => class_eligible(inst, res.pgy),
        };
        if !class_ok || inst.code.duration_hours(res.pgy).is_none() {
            out.push(Violation::IneligibleClass {
                handle: res.handle.clone(),
                date: inst.date,
                code: inst.code.to_string(),
            });
        }
    }
}

fn daily_uniqueness(state: &SolveState<'_>, out: &mut Vec<Violation>) {
    for r in 0..state.roster.len() {
        let list = &state.by_resident[r];
        for pair in list.windows(2) {
            let (a, b) = (&state.shifts[pair[0]], &state.shifts[pair[1]]);
            if a.date == b.date {
                out.push(Violation::DoubleBooked {
                    handle: state.roster[r].handle.clone(),
                    date: a.date,
                });
            }
        }
    }
}

fn rest_rule(state: &SolveState<'_>, out: &mut Vec<Violation>) {
    for r in 0..state.roster.len() {
        let list = &state.by_resident[r];
        for pair in list.windows(2) {
            let (p_start, p_end) = state.interval_of(pair[0], r);
            let next_start = state.shifts[pair[1]].start_min;
            if next_start - p_end < p_end - p_start {
                out.push(Violation::RestViolation {
                    handle: state.roster[r].handle.clone(),
                    date: state.shifts[pair[1]].date,
                    code: state.shifts[pair[1]].code.to_string(),
                });
            }
        }
    }
}

fn weekly_hours(state: &SolveState<'_>, out: &mut Vec<Violation>) {
    let first_monday = monday_of(state.start);
    let end = state.start + Duration::days(i64::from(state.days));
    for r in 0..state.roster.len() {
        let mut monday = first_monday;
        while monday < end {
            let hours = state.weekly_hours(r, monday);
            if hours > 60 {
                out.push(Violation::WeeklyHours {
                    handle: state.roster[r].handle.clone(),
                    week_start: monday,
                    hours,
                });
            }
            monday += Duration::days(7);
        }
    }
}

fn free_day(state: &SolveState<'_>, out: &mut Vec<Violation>) {
    let days = i64::from(state.days);
    if days < 7 {
        return;
    }
    for r in 0..state.roster.len() {
        let intervals: Vec<(i64, i64)> = state.by_resident[r]
            .iter()
            .map(|&s| state.interval_of(s, r))
            .collect();
        for window in 0..=(days - 7) {
            let a = window * 24 * 60;
            let b = a + 7 * 24 * 60;
            if max_free_gap(&intervals, a, b) < 24 * 60 {
                out.push(Violation::NoFreeDay {
                    handle: state.roster[r].handle.clone(),
                    window_start: state.date_of_day(window as usize),
                });
            }
        }
    }
}

fn max_free_gap(intervals: &[(i64, i64)], a: i64, b: i64) -> i64 {
    let mut cursor = a;
    let mut best = 0i64;
    for &(is, ie) in intervals {
        if ie <= a {
            continue;
        }
        if is >= b {
            break;
        }
        let clipped = is.max(a);
        if clipped > cursor {
            best = best.max(clipped - cursor);
        }
        cursor = cursor.max(ie.min(b));
    }
    best.max(b - cursor)
}

fn night_runs(state: &SolveState<'_>, out: &mut Vec<Violation>) {
    for r in 0..state.roster.len() {
        let nights: Vec<usize> = state.by_resident[r]
            .iter()
            .copied()
            .filter(|&s| state.shifts[s].is_night())
            .collect();
        let mut i = 0;
        while i < nights.len() {
            let start_day = state.day_index(state.shifts[nights[i]].date);
            let mut len = 1usize;
            let mut alternates = true;
            while i + len < nights.len() {
                let prev = &state.shifts[nights[i + len - 1]];
                let next = &state.shifts[nights[i + len]];
                if state.day_index(next.date) != start_day + len {
                    break;
                }
                if next.code.hospital == prev.code.hospital {
                    alternates = false;
                }
                len += 1;
            }
            if !(3..=4).contains(&len) || !alternates {
                out.push(Violation::BadNightRun {
                    handle: state.roster[r].handle.clone(),
                    start_date: state.shifts[nights[i]].date,
                    len,
                });
            }
            i += len;
        }
    }
}

fn peds_priority(state: &SolveState<'_>, out: &mut Vec<Violation>) {
    // État de travail pour tester les alternatives sans toucher l'original.
    let mut scratch = SolveState::new(state.roster, state.shifts, state.start, state.days);
    for (s, &a) in state.assigned.iter().enumerate() {
        if let Some(r) = a {
            scratch.assign(s, r);
        }
    }
    for s in 0..state.shifts.len() {
        if state.shifts[s].code.team != Team::Peds {
            continue;
        }
        let Some(r) = state.assigned[s] else { continue };
        if state.roster[r].service == Service::Peds {
            continue;
        }
        scratch.unassign(s);
        let idle = (0..state.roster.len()).find(|&other| {
            state.roster[other].service == Service::Peds && denial(&scratch, other, s).is_none()
        });
        if let Some(other) = idle {
            out.push(Violation::PedsFallbackSkipped {
                date: state.shifts[s].date,
                code: state.shifts[s].code.to_string(),
                idle_peds: state.roster[other].handle.clone(),
            });
        }
        scratch.assign(s, r);
    }
}
