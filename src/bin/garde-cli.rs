#![forbid(unsafe_code)]
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use garde::{
    export_template_json, io, load_template_from_file, summarize, JsonStorage, Schedule,
    SolveError, Solver, Storage, SummaryRenderer, Template, TextSummary,
};
use rand::Rng;
#[cfg(feature = "logging")]
use tracing_subscriber::{fmt::Subscriber, EnvFilter};

/// Tableau de garde mensuel des résidents (deux hôpitaux)
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Active les logs (feature `logging`)
    #[arg(long, global = true)]
    log: bool,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Résout et émet le planning CSV
    Schedule {
        /// Table des résidents (CSV, relue à chaque invocation)
        #[arg(long)]
        residents: String,
        /// Début de l'horizon (YYYY-MM-DD)
        #[arg(long)]
        start: String,
        /// Longueur de l'horizon en jours (un bloc = 28)
        #[arg(long, default_value_t = 28)]
        days: u32,
        /// Gabarit hebdomadaire JSON de remplacement
        #[arg(long)]
        template: Option<String>,
        /// Graine 64 bits ; nouvelle graine à chaque invocation sinon
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long, default_value = "schedule.csv")]
        out: String,
        /// Sauvegarde JSON du planning résolu
        #[arg(long)]
        json: Option<String>,
        /// Affiche le bilan horaire par résident
        #[arg(long)]
        summary: bool,
    },

    /// Vérifie un planning émis contre toutes les règles dures
    Check {
        #[arg(long)]
        residents: String,
        #[arg(long)]
        start: String,
        #[arg(long, default_value_t = 28)]
        days: u32,
        #[arg(long)]
        template: Option<String>,
        /// Planning CSV à vérifier
        #[arg(long)]
        schedule: String,
        /// Export CSV des manquements (optionnel)
        #[arg(long)]
        report: Option<String>,
    },

    /// Bilan horaire par résident d'un planning émis
    Report {
        #[arg(long)]
        residents: String,
        #[arg(long)]
        start: String,
        #[arg(long, default_value_t = 28)]
        days: u32,
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        schedule: String,
    },

    /// Gérer le gabarit hebdomadaire
    Template {
        #[command(subcommand)]
        cmd: TemplateCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    /// Exporte le gabarit par défaut en JSON
    Export {
        #[arg(long)]
        out: String,
    },
    /// Valide un gabarit JSON
    Check { file: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    #[cfg(feature = "logging")]
    if cli.log {
        let _ = Subscriber::builder()
            .with_env_filter(EnvFilter::from_default_env())
            .try_init();
    }

    let code = match cli.cmd {
        Commands::Schedule {
            residents,
            start,
            days,
            template,
            seed,
            out,
            json,
            summary,
        } => {
            let start = parse_date(&start)?;
            let roster = io::read_residents(&residents, start, days)?;
            let template = load_template(template.as_deref())?;
            let shifts = template.expand(start, days)?;
            let seed = seed.unwrap_or_else(|| rand::rng().random());

            let solver = Solver::new(&roster, &shifts, start, days);
            match solver.solve(seed) {
                Ok(schedule) => {
                    io::write_schedule_csv(&out, &schedule)?;
                    if let Some(path) = json {
                        JsonStorage::open(path)?.save(&schedule)?;
                    }
                    if summary {
                        let rows = summarize(&roster, &shifts, &schedule);
                        print!("{}", TextSummary.render(&rows));
                    }
                    println!(
                        "Schedule written to {out} ({} shifts, seed {seed}, score {})",
                        schedule.rows.len(),
                        schedule.score
                    );
                    0
                }
                Err(err @ SolveError::Infeasible { .. }) => {
                    eprintln!("{}", err.diagnostic());
                    3
                }
                Err(err) => return Err(err.into()),
            }
        }

        Commands::Check {
            residents,
            start,
            days,
            template,
            schedule,
            report,
        } => {
            let start = parse_date(&start)?;
            let roster = io::read_residents(&residents, start, days)?;
            let template = load_template(template.as_deref())?;
            let shifts = template.expand(start, days)?;
            let rows = io::read_schedule_csv(&schedule)?;
            let schedule = Schedule {
                rows,
                seed: 0,
                score: 0,
            };

            let solver = Solver::new(&roster, &shifts, start, days);
            let violations = solver.audit(&schedule)?;
            if violations.is_empty() {
                println!("OK: no violations");
                0
            } else {
                eprintln!("Found {} violation(s)", violations.len());
                for v in &violations {
                    eprintln!("  {v}");
                }
                if let Some(path) = report {
                    let mut w = csv::Writer::from_path(path)?;
                    w.write_record(["violation"])?;
                    for v in &violations {
                        w.write_record([v.to_string()])?;
                    }
                    w.flush()?;
                }
                // Code 2 = planning émis mais non conforme
                2
            }
        }

        Commands::Report {
            residents,
            start,
            days,
            template,
            schedule,
        } => {
            let start = parse_date(&start)?;
            let roster = io::read_residents(&residents, start, days)?;
            let template = load_template(template.as_deref())?;
            let shifts = template.expand(start, days)?;
            let rows = io::read_schedule_csv(&schedule)?;
            let schedule = Schedule {
                rows,
                seed: 0,
                score: 0,
            };
            let summaries = summarize(&roster, &shifts, &schedule);
            print!("{}", TextSummary.render(&summaries));
            0
        }

        Commands::Template { cmd } => match cmd {
            TemplateCommand::Export { out } => {
                let template = Template::default();
                export_template_json(&out, &template)?;
                println!("Default template written to {out}");
                0
            }
            TemplateCommand::Check { file } => {
                let template = load_template_from_file(&file)?;
                println!(
                    "Template {file} is valid ({} rows)",
                    template.rows.len()
                );
                0
            }
        },
    };

    std::process::exit(code);
}

fn load_template(path: Option<&str>) -> Result<Template> {
    match path {
        Some(p) => load_template_from_file(p),
        None => Ok(Template::default()),
    }
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date (expected YYYY-MM-DD): {value}"))
}
