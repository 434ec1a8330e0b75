use crate::model::{Pgy, Resident, Schedule, Service, ShiftInstance};
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Bilan horaire d'un résident sur le bloc.
#[derive(Debug, Clone)]
pub struct ResidentSummary {
    pub handle: String,
    pub pgy: Pgy,
    pub service: Service,
    pub chief: bool,
    pub target_hours: i64,
    pub worked_hours: i64,
    pub shifts: usize,
    pub nights: usize,
    pub requests_violated: usize,
}

impl ResidentSummary {
    pub fn deviation(&self) -> i64 {
        self.target_hours - self.worked_hours
    }
}

/// Rendu personnalisable du bilan (texte brut, futur HTML…).
pub trait SummaryRenderer {
    fn render(&self, summaries: &[ResidentSummary]) -> String;
}

/// Gabarit texte simple pour la console de l'opérateur.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextSummary;

impl SummaryRenderer for TextSummary {
    fn render(&self, summaries: &[ResidentSummary]) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:<16} {:<6} {:<12} {:>7} {:>7} {:>5} {:>7} {:>9}",
            "resident", "pgy", "service", "worked", "target", "dev", "nights", "missed"
        );
        for s in summaries {
            let chief = if s.chief { " (chief)" } else { "" };
            let _ = writeln!(
                out,
                "{:<16} {:<6} {:<12} {:>6}h {:>6}h {:>+5} {:>7} {:>9}{}",
                s.handle,
                s.pgy.to_string(),
                s.service.to_string(),
                s.worked_hours,
                s.target_hours,
                -s.deviation(),
                s.nights,
                s.requests_violated,
                chief
            );
        }
        out
    }
}

/// Agrège le planning par résident ; inclut les résidents planifiables sans
/// aucune affectation.
pub fn summarize(
    residents: &[Resident],
    shifts: &[ShiftInstance],
    schedule: &Schedule,
) -> Vec<ResidentSummary> {
    let by_handle: BTreeMap<&str, &Resident> =
        residents.iter().map(|r| (r.handle.as_str(), r)).collect();
    let mut acc: BTreeMap<&str, ResidentSummary> = residents
        .iter()
        .filter(|r| r.schedulable())
        .map(|r| {
            (
                r.handle.as_str(),
                ResidentSummary {
                    handle: r.handle.clone(),
                    pgy: r.pgy,
                    service: r.service,
                    chief: r.chief,
                    target_hours: r.target_hours,
                    worked_hours: 0,
                    shifts: 0,
                    nights: 0,
                    requests_violated: 0,
                },
            )
        })
        .collect();

    let keyed: BTreeMap<_, _> = shifts.iter().map(|s| ((s.date, s.code), s)).collect();
    for row in &schedule.rows {
        let Some(handle) = row.resident.as_deref() else {
            continue;
        };
        let Some(resident) = by_handle.get(handle) else {
            continue;
        };
        let Some(summary) = acc.get_mut(handle) else {
            continue;
        };
        summary.shifts += 1;
        if row.code.is_night() {
            summary.nights += 1;
        }
        if resident.has_requested(row.date) {
            summary.requests_violated += 1;
        }
        if keyed.contains_key(&(row.date, row.code)) {
            summary.worked_hours += row.code.duration_hours(resident.pgy).unwrap_or_default();
        }
    }

    residents
        .iter()
        .filter_map(|r| acc.remove(r.handle.as_str()))
        .collect()
}
