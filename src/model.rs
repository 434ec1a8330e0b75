use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Hôpital du système (deux sites).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Hospital {
    L,
    W,
}

impl Hospital {
    pub fn letter(self) -> char {
        match self {
            Hospital::L => 'L',
            Hospital::W => 'W',
        }
    }

    /// L'autre site (alternance des séries de nuits).
    pub fn other(self) -> Hospital {
        match self {
            Hospital::L => Hospital::W,
            Hospital::W => Hospital::L,
        }
    }

    fn from_letter(c: char) -> Option<Hospital> {
        match c {
            'L' => Some(Hospital::L),
            'W' => Some(Hospital::W),
            _ => None,
        }
    }
}

/// Équipe clinique (deuxième lettre du code de garde).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Team {
    /// R — séniors (PGY-3).
    Red,
    /// G — PGY-2.
    Green,
    /// I — internes (PGY-1).
    Intern,
    /// E — évaluation, PGY-1 de préférence.
    Eval,
    /// B — poste PGY-1 obligatoire, site L uniquement.
    Blue,
    /// P — pédiatrie, toujours 10 h.
    Peds,
}

impl Team {
    pub fn letter(self) -> char {
        match self {
            Team::Red => 'R',
            Team::Green => 'G',
            Team::Intern => 'I',
            Team::Eval => 'E',
            Team::Blue => 'B',
            Team::Peds => 'P',
        }
    }

    fn from_letter(c: char) -> Option<Team> {
        match c {
            'R' => Some(Team::Red),
            'G' => Some(Team::Green),
            'I' => Some(Team::Intern),
            'E' => Some(Team::Eval),
            'B' => Some(Team::Blue),
            'P' => Some(Team::Peds),
            _ => None,
        }
    }
}

/// Jeton de début : encode l'heure de prise de poste.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StartToken {
    Seven,
    Nine,
    Eleven,
    One,
    Two,
    Four,
    Night,
    /// `dw` — poste interne du mercredi, 14 h–19 h.
    Dw,
    /// `11w` — poste B du mercredi, 14 h–23 h.
    ElevenW,
}

impl StartToken {
    pub fn as_str(self) -> &'static str {
        match self {
            StartToken::Seven => "7",
            StartToken::Nine => "9",
            StartToken::Eleven => "11",
            StartToken::One => "1",
            StartToken::Two => "2",
            StartToken::Four => "4",
            StartToken::Night => "n",
            StartToken::Dw => "dw",
            StartToken::ElevenW => "11w",
        }
    }

    fn from_token(s: &str) -> Option<StartToken> {
        match s {
            "7" => Some(StartToken::Seven),
            "9" => Some(StartToken::Nine),
            "11" => Some(StartToken::Eleven),
            "1" => Some(StartToken::One),
            "2" => Some(StartToken::Two),
            "4" => Some(StartToken::Four),
            "n" => Some(StartToken::Night),
            "dw" => Some(StartToken::Dw),
            "11w" => Some(StartToken::ElevenW),
            _ => None,
        }
    }

    /// Heure de début (horloge murale locale).
    pub fn start_hour(self) -> i64 {
        match self {
            StartToken::Seven => 7,
            StartToken::Nine => 9,
            StartToken::Eleven => 11,
            StartToken::One => 13,
            StartToken::Two | StartToken::Dw | StartToken::ElevenW => 14,
            StartToken::Four => 16,
            StartToken::Night => 19,
        }
    }

    pub fn is_night(self) -> bool {
        matches!(self, StartToken::Night)
    }

    /// Échelle circadienne : matin (0) < après-midi (1) < nuit (2).
    pub fn circadian_rank(self) -> i64 {
        match self {
            StartToken::Seven | StartToken::Nine | StartToken::Eleven => 0,
            StartToken::One
            | StartToken::Two
            | StartToken::Four
            | StartToken::Dw
            | StartToken::ElevenW => 1,
            StartToken::Night => 2,
        }
    }
}

/// Année de résidanat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Pgy {
    One,
    Two,
    Three,
}

impl Pgy {
    pub fn year(self) -> u8 {
        match self {
            Pgy::One => 1,
            Pgy::Two => 2,
            Pgy::Three => 3,
        }
    }

    pub fn from_year(year: u8) -> Option<Pgy> {
        match year {
            1 => Some(Pgy::One),
            2 => Some(Pgy::Two),
            3 => Some(Pgy::Three),
            _ => None,
        }
    }
}

impl fmt::Display for Pgy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PGY-{}", self.year())
    }
}

/// Rotation du résident sur le bloc ; seuls ED et Peds sont planifiés.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    #[serde(rename = "ED")]
    Ed,
    Peds,
    #[serde(rename = "Off-Service")]
    OffService,
    Vacation,
}

impl Service {
    pub fn as_str(self) -> &'static str {
        match self {
            Service::Ed => "ED",
            Service::Peds => "Peds",
            Service::OffService => "Off-Service",
            Service::Vacation => "Vacation",
        }
    }
}

impl FromStr for Service {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ed" => Ok(Service::Ed),
            "peds" => Ok(Service::Peds),
            "off-service" => Ok(Service::OffService),
            "vacation" => Ok(Service::Vacation),
            _ => Err(CodeParseError(s.to_owned())),
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("invalid code: {0}")]
pub struct CodeParseError(pub String);

/// Code de garde : hôpital, équipe, jeton (`LR7`, `WGn`, `LIdw`…).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShiftCode {
    pub hospital: Hospital,
    pub team: Team,
    pub token: StartToken,
}

impl ShiftCode {
    pub fn new(hospital: Hospital, team: Team, token: StartToken) -> ShiftCode {
        ShiftCode {
            hospital,
            team,
            token,
        }
    }

    /// Minute de début dans la journée.
    pub fn start_minutes(&self) -> i64 {
        self.token.start_hour() * 60
    }

    pub fn is_night(&self) -> bool {
        self.token.is_night()
    }

    /// Durée en heures pour une année donnée ; `None` si la classe ne peut
    /// pas tenir ce poste.
    pub fn duration_hours(&self, pgy: Pgy) -> Option<i64> {
        match self.team {
            Team::Peds => Some(10),
            Team::Eval => Some(match pgy {
                Pgy::One => 12,
                _ => 10,
            }),
            _ => match (self.token, pgy) {
                (StartToken::Dw, Pgy::One) => Some(5),
                (StartToken::ElevenW, Pgy::One) => Some(9),
                (StartToken::Dw | StartToken::ElevenW, _) => None,
                (StartToken::Nine, Pgy::One) => None,
                (StartToken::Eleven, Pgy::One) => Some(12),
                (StartToken::Eleven, _) => None,
                (_, Pgy::One) => Some(12),
                (_, _) => Some(10),
            },
        }
    }
}

impl fmt::Display for ShiftCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.hospital.letter(),
            self.team.letter(),
            self.token.as_str()
        )
    }
}

impl FromStr for ShiftCode {
    type Err = CodeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || CodeParseError(s.to_owned());
        let mut chars = s.chars();
        let hospital = chars.next().and_then(Hospital::from_letter).ok_or_else(err)?;
        let team = chars.next().and_then(Team::from_letter).ok_or_else(err)?;
        let token = StartToken::from_token(chars.as_str()).ok_or_else(err)?;
        Ok(ShiftCode::new(hospital, team, token))
    }
}

impl TryFrom<String> for ShiftCode {
    type Error = CodeParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<ShiftCode> for String {
    fn from(code: ShiftCode) -> String {
        code.to_string()
    }
}

/// Résident : identifié par son handle, unique dans la table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resident {
    pub handle: String,
    pub pgy: Pgy,
    pub service: Service,
    /// Cible horaire sur le bloc.
    pub target_hours: i64,
    /// Jours demandés libres (contrainte souple).
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub requests: BTreeSet<NaiveDate>,
    #[serde(default)]
    pub chief: bool,
}

impl Resident {
    pub fn new<H: Into<String>>(handle: H, pgy: Pgy, service: Service, target_hours: i64) -> Self {
        Self {
            handle: handle.into(),
            pgy,
            service,
            target_hours,
            requests: BTreeSet::new(),
            chief: false,
        }
    }

    /// Un résident hors bloc ED/Peds n'est jamais planifié.
    pub fn schedulable(&self) -> bool {
        matches!(self.service, Service::Ed | Service::Peds)
    }

    pub fn has_requested(&self, date: NaiveDate) -> bool {
        self.requests.contains(&date)
    }
}

/// Créneau daté issu de l'expansion du gabarit, clé (date, code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftInstance {
    pub date: NaiveDate,
    pub code: ShiftCode,
    pub required: bool,
    /// Minutes depuis le début de l'horizon.
    pub start_min: i64,
}

impl ShiftInstance {
    pub fn new(date: NaiveDate, code: ShiftCode, required: bool, start_min: i64) -> Self {
        Self {
            date,
            code,
            required,
            start_min,
        }
    }

    pub fn is_night(&self) -> bool {
        self.code.is_night()
    }

    pub fn end_min(&self, pgy: Pgy) -> Option<i64> {
        self.code
            .duration_hours(pgy)
            .map(|d| self.start_min + d * 60)
    }
}

/// Ligne du planning émis : un créneau, son affectation éventuelle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    pub date: NaiveDate,
    pub code: ShiftCode,
    pub resident: Option<String>,
}

/// Planning résolu, lignes en ordre chronologique groupées par date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub rows: Vec<ScheduleRow>,
    pub seed: u64,
    pub score: i64,
}

impl Schedule {
    pub fn assigned_count(&self) -> usize {
        self.rows.iter().filter(|r| r.resident.is_some()).count()
    }
}
