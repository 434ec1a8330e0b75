use crate::model::ShiftCode;
use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Pondérations de la fonction objectif (plus bas = mieux).
///
/// L'écart horaire est quadratique et domine : aucune accumulation de
/// pénalités mineures ne compense un écart de 10 h (100 points).
#[derive(Debug, Clone, Copy)]
pub struct Weights {
    /// Par heure² d'écart à la cible.
    pub hour_deviation: i64,
    /// Par créneau optionnel resté libre ; en dessous de 25 = 5², le plus
    /// petit surcoût d'un remplissage au-delà de la cible.
    pub unfilled_optional: i64,
    /// Par affectation d'une classe non préférée sur E, B ou P.
    pub preference: i64,
    /// Repli le plus profond : un PGY-3 sur P.
    pub peds_fallback_pgy3: i64,
    /// Par affectation sur un jour demandé libre.
    pub request: i64,
    /// Par rang de recul sur l'échelle matin < après-midi < nuit.
    pub circadian: i64,
    /// Bonus (soustrait) par jour libre collé à une série de nuits.
    pub night_adjacency: i64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            hour_deviation: 1,
            unfilled_optional: 20,
            preference: 8,
            peds_fallback_pgy3: 16,
            request: 15,
            circadian: 3,
            night_adjacency: 5,
        }
    }
}

/// Réglages du solveur.
#[derive(Debug, Clone, Copy)]
pub struct SolveOptions {
    pub weights: Weights,
    /// Pas de recuit simulé avant la descente finale.
    pub sa_steps: u32,
    pub sa_initial_temp: f64,
    pub sa_cooling: f64,
    pub sa_min_temp: f64,
    /// Plafond de balayages de descente (arrêt anticipé au point fixe).
    pub max_descent_sweeps: u32,
    /// Reprises d'une même journée avant de remonter d'un jour.
    pub day_retries: u32,
    /// Restaurations de journée au total avant l'abandon.
    pub backtrack_budget: u32,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            sa_steps: 20_000,
            sa_initial_temp: 2.5,
            sa_cooling: 0.999,
            sa_min_temp: 1e-3,
            max_descent_sweeps: 12,
            day_retries: 8,
            backtrack_budget: 64,
        }
    }
}

/// Motif de refus d'une affectation par le modèle de contraintes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenialReason {
    /// Hors bloc ED/Peds, ou résident Peds hors équipe P.
    OffRoster,
    /// Classe PGY hors du pool de l'équipe, ou durée non définie.
    IneligibleClass,
    /// Travaille déjà ce jour-là.
    SameDay,
    /// Repos insuffisant après le créneau précédent.
    RestBefore,
    /// Repos insuffisant avant le créneau suivant.
    RestAfter,
    /// Dépasserait 60 h sur la semaine lundi–dimanche.
    WeeklyHours,
    /// Perdrait la période libre de 24 h sur une fenêtre de 7 jours.
    NoFreeDay,
    /// Un résident en bloc Peds doit prendre ce créneau.
    PedsPriority,
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DenialReason::OffRoster => "not on a schedulable service",
            DenialReason::IneligibleClass => "PGY class not eligible",
            DenialReason::SameDay => "already works that day",
            DenialReason::RestBefore => "insufficient rest after the previous shift",
            DenialReason::RestAfter => "insufficient rest before the next shift",
            DenialReason::WeeklyHours => "would exceed 60 hours in the week",
            DenialReason::NoFreeDay => "would lose the 24-hour free period",
            DenialReason::PedsPriority => "a Peds-block resident must take this shift",
        };
        f.write_str(msg)
    }
}

/// Erreurs du solveur.
#[derive(Debug, Error)]
pub enum SolveError {
    /// Aucune complétion légale trouvée dans le budget de retours arrière.
    #[error("no legal resident for required shift {code} on {date}")]
    Infeasible {
        code: ShiftCode,
        date: NaiveDate,
        candidates: Vec<(String, DenialReason)>,
    },
    #[error("schedule row {0} does not match any expanded shift")]
    UnknownShift(String),
    #[error("schedule references unknown resident handle: {0}")]
    UnknownResident(String),
}

impl SolveError {
    /// Diagnostic détaillé : le créneau bloquant et chaque refus du pool.
    pub fn diagnostic(&self) -> String {
        match self {
            SolveError::Infeasible {
                code,
                date,
                candidates,
            } => {
                let mut out = format!("required shift {code} on {date} cannot be filled:\n");
                if candidates.is_empty() {
                    out.push_str("  (no schedulable resident in the roster)\n");
                }
                for (handle, reason) in candidates {
                    out.push_str(&format!("  {handle}: {reason}\n"));
                }
                out
            }
            other => other.to_string(),
        }
    }
}
