use crate::model::{Pgy, Resident, Schedule, ScheduleRow, Service, ShiftCode};
use anyhow::{bail, Context, Result};
use chrono::{Datelike, Duration, NaiveDate};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::BTreeSet;
use std::path::Path;

/// Import de la table des résidents.
///
/// Colonnes (entêtes insensibles à la casse) : `resident`, `pgy`, `service`,
/// `hours` (ou `Hours/Block Goal`), `requests` (dates `M/D` ou `M/D/YYYY`,
/// séparées par des virgules), `chief` optionnelle. Relue à chaque
/// invocation ; toute erreur est fatale avec le numéro de ligne.
pub fn read_residents<P: AsRef<Path>>(
    path: P,
    horizon_start: NaiveDate,
    horizon_days: u32,
) -> Result<Vec<Resident>> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("reading residents {}", path.display()))?;

    let headers = rdr.headers()?.clone();
    let col_handle = find_col(&headers, &["resident", "handle", "name"])
        .context("missing 'resident' column")?;
    let col_pgy = find_col(&headers, &["pgy"]).context("missing 'pgy' column")?;
    let col_service = find_col(&headers, &["service"]).context("missing 'service' column")?;
    let col_hours = find_col(&headers, &["hours", "hours/block goal", "target"])
        .context("missing 'hours' column")?;
    let col_requests = find_col(&headers, &["requests"]);
    let col_chief = find_col(&headers, &["chief"]);

    let horizon_end = horizon_start + Duration::days(i64::from(horizon_days));
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut out = Vec::new();

    for (i, rec) in rdr.records().enumerate() {
        let row = i + 2; // l'entête est la ligne 1
        let rec = rec?;

        let handle = field(&rec, col_handle);
        if handle.is_empty() {
            bail!("row {row}: empty resident handle");
        }
        if !seen.insert(handle.to_string()) {
            bail!("row {row}: duplicate resident handle '{handle}'");
        }

        let pgy_raw = field(&rec, col_pgy);
        let pgy = pgy_raw
            .parse::<u8>()
            .ok()
            .and_then(Pgy::from_year)
            .with_context(|| format!("row {row}: invalid PGY year '{pgy_raw}'"))?;

        let service_raw = field(&rec, col_service);
        let service: Service = service_raw
            .parse()
            .ok()
            .with_context(|| format!("row {row}: unknown service '{service_raw}'"))?;

        let hours_raw = field(&rec, col_hours);
        let target_hours = hours_raw
            .parse::<i64>()
            .with_context(|| format!("row {row}: invalid hour target '{hours_raw}'"))?;

        let mut resident = Resident::new(handle, pgy, service, target_hours);

        if let Some(col) = col_requests {
            for raw in field(&rec, col).split(',') {
                let raw = raw.trim();
                if raw.is_empty() {
                    continue;
                }
                match resolve_request_date(raw, horizon_start, horizon_end) {
                    Some(date) => {
                        resident.requests.insert(date);
                    }
                    None => eprintln!(
                        "Warning: could not parse request date '{raw}' for resident {}",
                        resident.handle
                    ),
                }
            }
        }

        if let Some(col) = col_chief {
            let raw = field(&rec, col);
            if !raw.is_empty() {
                resident.chief = parse_chief_flag(raw)
                    .with_context(|| format!("row {row}: invalid chief flag '{raw}'"))?;
                if resident.chief && resident.pgy != Pgy::Three {
                    bail!("row {row}: chief flag on a non-PGY-3 resident");
                }
            }
        }

        out.push(resident);
    }

    if out.is_empty() {
        bail!("resident table {} is empty", path.display());
    }
    Ok(out)
}

fn field<'a>(rec: &'a StringRecord, col: usize) -> &'a str {
    rec.get(col).unwrap_or("").trim()
}

fn find_col(headers: &StringRecord, names: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| names.iter().any(|n| h.trim().eq_ignore_ascii_case(n)))
}

/// Valeurs admises pour la colonne `chief`.
fn parse_chief_flag(s: &str) -> Result<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => bail!("expected true/false, yes/no or 1/0"),
    }
}

/// Résout `M/D` dans l'horizon (l'année vient du bloc) ; `M/D/YYYY` accepté.
fn resolve_request_date(raw: &str, start: NaiveDate, end: NaiveDate) -> Option<NaiveDate> {
    let parts: Vec<&str> = raw.split('/').collect();
    match parts.as_slice() {
        [m, d] => {
            let month: u32 = m.parse().ok()?;
            let day: u32 = d.parse().ok()?;
            for year in [start.year(), start.year() + 1] {
                if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
                    if date >= start && date < end {
                        return Some(date);
                    }
                }
            }
            NaiveDate::from_ymd_opt(start.year(), month, day)
        }
        [m, d, y] => {
            let month: u32 = m.parse().ok()?;
            let day: u32 = d.parse().ok()?;
            let year: i32 = y.parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, day)
        }
        _ => None,
    }
}

/// Rendu CSV du planning : entête `date,shift,resident`, lignes
/// chronologiques groupées par date, affectation vide pour un créneau
/// optionnel resté libre.
pub fn schedule_csv_string(schedule: &Schedule) -> Result<String> {
    let mut w = WriterBuilder::new().from_writer(Vec::new());
    w.write_record(["date", "shift", "resident"])?;
    for row in &schedule.rows {
        w.write_record([
            row.date.format("%Y-%m-%d").to_string(),
            row.code.to_string(),
            row.resident.clone().unwrap_or_default(),
        ])?;
    }
    let bytes = w
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing schedule csv: {e}"))?;
    String::from_utf8(bytes).context("schedule csv is not utf-8")
}

pub fn write_schedule_csv<P: AsRef<Path>>(path: P, schedule: &Schedule) -> Result<()> {
    let path = path.as_ref();
    let csv = schedule_csv_string(schedule)?;
    std::fs::write(path, csv).with_context(|| format!("writing schedule {}", path.display()))
}

/// Relit un planning émis (pour `check` et `report`).
pub fn read_schedule_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ScheduleRow>> {
    let path = path.as_ref();
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("reading schedule {}", path.display()))?;

    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let row = i + 2;
        let rec = rec?;
        let date_raw = field(&rec, 0);
        let date = NaiveDate::parse_from_str(date_raw, "%Y-%m-%d")
            .with_context(|| format!("row {row}: invalid date '{date_raw}'"))?;
        let code_raw = field(&rec, 1);
        let code: ShiftCode = code_raw
            .parse()
            .with_context(|| format!("row {row}: invalid shift code '{code_raw}'"))?;
        let resident = match field(&rec, 2) {
            "" => None,
            h => Some(h.to_string()),
        };
        out.push(ScheduleRow {
            date,
            code,
            resident,
        });
    }
    Ok(out)
}
