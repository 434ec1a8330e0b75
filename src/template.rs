use crate::model::{Hospital, ShiftCode, ShiftInstance, StartToken, Team};
use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Ligne du gabarit : un code et ses jours d'apparition (1 = lundi … 7 = dimanche).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateRow {
    pub code: ShiftCode,
    pub days: Vec<u8>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// Gabarit hebdomadaire complet ; remplaçable par un fichier JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub rows: Vec<TemplateRow>,
}

const ALL_DAYS: [u8; 7] = [1, 2, 3, 4, 5, 6, 7];
const NOT_WEDNESDAY: [u8; 6] = [1, 2, 4, 5, 6, 7];
const WEDNESDAY: [u8; 1] = [3];

impl Default for Template {
    /// Gabarit par défaut des deux sites. Les matins de 7 h n'existent pas
    /// le mercredi ; `LIdw` et `LB11w` les remplacent ce jour-là.
    fn default() -> Self {
        use Hospital::{L, W};
        use StartToken::{Dw, ElevenW, Four, Night, Nine, One, Seven, Two, Eleven};
        use Team::{Blue, Eval, Green, Intern, Peds, Red};

        fn row(
            hospital: Hospital,
            team: Team,
            token: StartToken,
            days: &[u8],
            required: bool,
        ) -> TemplateRow {
            TemplateRow {
                code: ShiftCode::new(hospital, team, token),
                days: days.to_vec(),
                required,
            }
        }

        Template {
            rows: vec![
                // Rouge (PGY-3)
                row(L, Red, Seven, &NOT_WEDNESDAY, true),
                row(W, Red, Seven, &NOT_WEDNESDAY, true),
                row(L, Red, One, &ALL_DAYS, true),
                row(W, Red, One, &ALL_DAYS, true),
                row(L, Red, Night, &ALL_DAYS, true),
                row(W, Red, Night, &ALL_DAYS, true),
                row(L, Red, Four, &ALL_DAYS, false),
                // Vert (PGY-2)
                row(L, Green, Seven, &NOT_WEDNESDAY, true),
                row(W, Green, Nine, &ALL_DAYS, true),
                row(L, Green, One, &ALL_DAYS, true),
                row(W, Green, Four, &ALL_DAYS, true),
                row(L, Green, Night, &ALL_DAYS, true),
                row(W, Green, Night, &ALL_DAYS, true),
                row(L, Green, Four, &ALL_DAYS, false),
                // Internes (PGY-1)
                row(L, Intern, Seven, &NOT_WEDNESDAY, true),
                row(W, Intern, Seven, &NOT_WEDNESDAY, true),
                row(L, Intern, One, &ALL_DAYS, true),
                row(W, Intern, Two, &ALL_DAYS, true),
                row(L, Intern, Night, &ALL_DAYS, true),
                row(W, Intern, Night, &ALL_DAYS, true),
                row(L, Intern, Dw, &WEDNESDAY, true),
                row(L, Intern, Four, &ALL_DAYS, false),
                // Évaluation
                row(L, Eval, Eleven, &ALL_DAYS, true),
                // Bleu : un seul poste obligatoire, site L
                row(L, Blue, Eleven, &NOT_WEDNESDAY, true),
                row(L, Blue, ElevenW, &WEDNESDAY, true),
                // Pédiatrie
                row(L, Peds, Nine, &ALL_DAYS, true),
            ],
        }
    }
}

impl Template {
    pub fn validate(&self) -> Result<()> {
        if self.rows.is_empty() {
            bail!("template must contain at least one row");
        }
        let mut seen: BTreeSet<(ShiftCode, u8)> = BTreeSet::new();
        for row in &self.rows {
            if row.days.is_empty() {
                bail!("row {} must list at least one day", row.code);
            }
            for &d in &row.days {
                if !(1..=7).contains(&d) {
                    bail!("row {} has invalid day {} (expected 1-7)", row.code, d);
                }
                if !seen.insert((row.code, d)) {
                    bail!("duplicate template entry {} on day {}", row.code, d);
                }
            }
            if row.code.token == StartToken::Seven && row.days.contains(&3) {
                bail!("row {}: 7 AM shifts do not exist on Wednesday", row.code);
            }
            if matches!(row.code.token, StartToken::Dw | StartToken::ElevenW)
                && row.days.iter().any(|&d| d != 3)
            {
                bail!("row {}: this code only exists on Wednesday", row.code);
            }
            if row.code.is_night() && !row.required {
                bail!("row {}: night shifts cannot be optional", row.code);
            }
            if row.code.team == Team::Blue && row.code.hospital != Hospital::L {
                bail!("row {}: B shifts only exist at hospital L", row.code);
            }
        }
        Ok(())
    }

    /// Étend le gabarit en créneaux datés sur `[start, start + days)`.
    ///
    /// Sortie triée par (date, heure, code) ; aucune décision n'est prise ici.
    pub fn expand(&self, start: NaiveDate, days: u32) -> Result<Vec<ShiftInstance>> {
        self.validate()?;
        if days == 0 {
            bail!("horizon must cover at least one day");
        }

        let mut out = Vec::new();
        for offset in 0..days {
            let date = start + Duration::days(i64::from(offset));
            let weekday = date.weekday().number_from_monday() as u8;
            for row in &self.rows {
                if !row.days.contains(&weekday) {
                    continue;
                }
                let start_min = i64::from(offset) * 24 * 60 + row.code.start_minutes();
                out.push(ShiftInstance::new(date, row.code, row.required, start_min));
            }
        }
        out.sort_by(|a, b| {
            (a.date, a.start_min, a.code.to_string()).cmp(&(b.date, b.start_min, b.code.to_string()))
        });
        Ok(out)
    }
}

pub fn load_template_from_file<P: AsRef<Path>>(path: P) -> Result<Template> {
    let path = path.as_ref();
    let data = fs::read(path).with_context(|| format!("reading template {}", path.display()))?;
    let template: Template = serde_json::from_slice(&data)
        .with_context(|| format!("parsing template {}", path.display()))?;
    template.validate()?;
    Ok(template)
}

pub fn export_template_json<P: AsRef<Path>>(path: P, template: &Template) -> Result<()> {
    let json = serde_json::to_string_pretty(template)?;
    fs::write(path, json)?;
    Ok(())
}
