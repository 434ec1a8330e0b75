#![forbid(unsafe_code)]
use chrono::{Duration, NaiveDate};
use garde::{
    io, summarize, Hospital, Pgy, Resident, Service, ShiftInstance, SolveError, SolveOptions,
    Solver, Team, Template,
};
use std::collections::BTreeMap;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

/// Cohorte par défaut : 60 résidents, 20 par année, cibles alignées sur la
/// charge du gabarit.
fn cohort() -> Vec<Resident> {
    let mut out = Vec::new();
    for i in 0..13 {
        out.push(Resident::new(format!("int-{i:02}"), Pgy::One, Service::Ed, 200));
    }
    out.push(Resident::new("int-peds", Pgy::One, Service::Peds, 140));
    for i in 0..4 {
        out.push(Resident::new(
            format!("int-off-{i}"),
            Pgy::One,
            Service::OffService,
            0,
        ));
    }
    for i in 0..2 {
        out.push(Resident::new(
            format!("int-vac-{i}"),
            Pgy::One,
            Service::Vacation,
            0,
        ));
    }

    for i in 0..9 {
        out.push(Resident::new(format!("doc2-{i:02}"), Pgy::Two, Service::Ed, 190));
    }
    out.push(Resident::new("doc2-peds", Pgy::Two, Service::Peds, 140));
    for i in 0..8 {
        out.push(Resident::new(
            format!("doc2-off-{i}"),
            Pgy::Two,
            Service::OffService,
            0,
        ));
    }
    for i in 0..2 {
        out.push(Resident::new(
            format!("doc2-vac-{i}"),
            Pgy::Two,
            Service::Vacation,
            0,
        ));
    }

    for i in 0..8 {
        out.push(Resident::new(format!("doc3-{i:02}"), Pgy::Three, Service::Ed, 170));
    }
    for i in 0..2 {
        let mut chief = Resident::new(format!("chief-{i}"), Pgy::Three, Service::Ed, 150);
        chief.chief = true;
        out.push(chief);
    }
    for i in 0..7 {
        out.push(Resident::new(
            format!("doc3-off-{i}"),
            Pgy::Three,
            Service::OffService,
            0,
        ));
    }
    for i in 0..3 {
        out.push(Resident::new(
            format!("doc3-vac-{i}"),
            Pgy::Three,
            Service::Vacation,
            0,
        ));
    }

    assert_eq!(out.len(), 60);
    out
}

fn options() -> SolveOptions {
    SolveOptions {
        sa_steps: 3_000,
        max_descent_sweeps: 32,
        ..SolveOptions::default()
    }
}

fn month_shifts(start: NaiveDate) -> Vec<ShiftInstance> {
    Template::default().expand(start, 28).unwrap()
}

#[test]
fn full_month_is_legal_and_close_to_targets() {
    let roster = cohort();
    let start = d(2026, 7, 1);
    let shifts = month_shifts(start);
    let solver = Solver::new(&roster, &shifts, start, 28).with_options(options());
    let schedule = solver.solve(42).unwrap();

    let violations = solver.audit(&schedule).unwrap();
    assert!(violations.is_empty(), "{violations:?}");

    // Tout créneau obligatoire est pourvu.
    let keyed: BTreeMap<_, _> = shifts.iter().map(|s| ((s.date, s.code), s)).collect();
    for row in &schedule.rows {
        let inst = keyed[&(row.date, row.code)];
        if inst.required {
            assert!(row.resident.is_some(), "unfilled {} {}", row.date, row.code);
        }
    }

    // Les hors-service et vacanciers ne travaillent jamais.
    let idle: Vec<&str> = roster
        .iter()
        .filter(|r| !r.schedulable())
        .map(|r| r.handle.as_str())
        .collect();
    assert!(schedule
        .rows
        .iter()
        .all(|row| row.resident.as_deref().map_or(true, |h| !idle.contains(&h))));

    // Écart moyen à la cible sous 10 h pour les résidents en bloc ED.
    let summaries = summarize(&roster, &shifts, &schedule);
    let (count, total) = summaries
        .iter()
        .filter(|s| s.service == Service::Ed)
        .fold((0usize, 0i64), |(c, t), s| (c + 1, t + s.deviation().abs()));
    let mean = total as f64 / count as f64;
    assert!(mean < 10.0, "mean |target - worked| = {mean}");
}

#[test]
fn fixed_seed_reproduces_byte_identical_csv() {
    let roster = cohort();
    let start = d(2026, 7, 1);
    let shifts = month_shifts(start);
    let solver = Solver::new(&roster, &shifts, start, 28).with_options(options());

    let first = io::schedule_csv_string(&solver.solve(7).unwrap()).unwrap();
    let second = io::schedule_csv_string(&solver.solve(7).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn distinct_seeds_usually_differ() {
    let roster = cohort();
    let start = d(2026, 7, 1);
    let shifts = month_shifts(start);
    let solver = Solver::new(&roster, &shifts, start, 28).with_options(options());

    let first = io::schedule_csv_string(&solver.solve(1).unwrap()).unwrap();
    let second = io::schedule_csv_string(&solver.solve(2).unwrap()).unwrap();
    assert_ne!(first, second);
}

#[test]
fn day_off_request_is_honored_when_alternatives_exist() {
    let mut roster = cohort();
    let requested = d(2026, 7, 4);
    roster
        .iter_mut()
        .find(|r| r.handle == "doc3-00")
        .unwrap()
        .requests
        .insert(requested);

    let start = d(2026, 7, 1);
    let shifts = month_shifts(start);
    let solver = Solver::new(&roster, &shifts, start, 28).with_options(options());
    let schedule = solver.solve(11).unwrap();

    assert!(schedule
        .rows
        .iter()
        .all(|row| !(row.date == requested && row.resident.as_deref() == Some("doc3-00"))));
}

#[test]
fn peds_shortage_falls_back_to_junior_classes() {
    let mut roster = cohort();
    for r in roster.iter_mut() {
        if r.service == Service::Peds {
            r.service = Service::OffService;
            r.target_hours = 0;
        }
    }

    let start = d(2026, 7, 1);
    let shifts = month_shifts(start);
    let solver = Solver::new(&roster, &shifts, start, 28).with_options(options());
    let schedule = solver.solve(5).unwrap();

    let violations = solver.audit(&schedule).unwrap();
    assert!(violations.is_empty(), "{violations:?}");

    let by_handle: BTreeMap<&str, &Resident> =
        roster.iter().map(|r| (r.handle.as_str(), r)).collect();
    for row in schedule.rows.iter().filter(|r| r.code.team == Team::Peds) {
        let handle = row.resident.as_deref().expect("P shift left unfilled");
        let resident = by_handle[handle];
        assert_ne!(resident.service, Service::Peds);
        assert_ne!(resident.pgy, Pgy::Three, "{handle} is a PGY-3 on P");
    }
}

#[test]
fn wednesdays_have_no_seven_am_and_run_the_special_interns() {
    let roster = cohort();
    let start = d(2026, 7, 1);
    let shifts = month_shifts(start);
    let solver = Solver::new(&roster, &shifts, start, 28).with_options(options());
    let schedule = solver.solve(9).unwrap();

    let lidw: garde::ShiftCode = "LIdw".parse().unwrap();
    let lb11w: garde::ShiftCode = "LB11w".parse().unwrap();
    for wednesday in [d(2026, 7, 1), d(2026, 7, 8), d(2026, 7, 15), d(2026, 7, 22)] {
        let day: Vec<_> = schedule
            .rows
            .iter()
            .filter(|r| r.date == wednesday)
            .collect();
        assert!(day
            .iter()
            .all(|r| r.code.token != garde::StartToken::Seven));
        assert!(day
            .iter()
            .any(|r| r.code == lidw && r.resident.is_some()));
        assert!(day
            .iter()
            .any(|r| r.code == lb11w && r.resident.is_some()));
    }
}

#[test]
fn night_runs_are_three_or_four_nights_alternating_hospitals() {
    let roster = cohort();
    let start = d(2026, 7, 1);
    let shifts = month_shifts(start);
    let solver = Solver::new(&roster, &shifts, start, 28).with_options(options());
    let schedule = solver.solve(13).unwrap();

    let mut nights: BTreeMap<&str, Vec<(NaiveDate, Hospital)>> = BTreeMap::new();
    for row in &schedule.rows {
        if row.code.is_night() {
            if let Some(handle) = row.resident.as_deref() {
                nights
                    .entry(handle)
                    .or_default()
                    .push((row.date, row.code.hospital));
            }
        }
    }
    assert!(!nights.is_empty());

    for (handle, mut list) in nights {
        list.sort();
        let mut i = 0;
        while i < list.len() {
            let mut len = 1;
            while i + len < list.len()
                && list[i + len].0 == list[i + len - 1].0 + Duration::days(1)
            {
                assert_ne!(
                    list[i + len].1,
                    list[i + len - 1].1,
                    "{handle} repeats a hospital mid-run"
                );
                len += 1;
            }
            assert!(
                (3..=4).contains(&len),
                "{handle} has a night run of {len} starting {}",
                list[i].0
            );
            i += len;
        }
    }
}

#[test]
fn overconstrained_red_team_reports_the_blocking_shift() {
    let mut roster = Vec::new();
    for i in 0..13 {
        roster.push(Resident::new(format!("int-{i:02}"), Pgy::One, Service::Ed, 50));
    }
    for i in 0..9 {
        roster.push(Resident::new(format!("doc2-{i:02}"), Pgy::Two, Service::Ed, 45));
    }
    roster.push(Resident::new("int-peds", Pgy::One, Service::Peds, 35));
    roster.push(Resident::new("doc2-peds", Pgy::Two, Service::Peds, 35));
    // Trois PGY-3 seulement : les six postes R quotidiens sont intenables.
    for i in 0..3 {
        roster.push(Resident::new(format!("doc3-{i:02}"), Pgy::Three, Service::Ed, 100));
    }

    let start = d(2026, 7, 6);
    let shifts = Template::default().expand(start, 7).unwrap();
    let solver = Solver::new(&roster, &shifts, start, 7).with_options(options());

    match solver.solve(3) {
        Ok(schedule) => {
            let violations = solver.audit(&schedule).unwrap();
            assert!(violations.is_empty(), "{violations:?}");
        }
        Err(err @ SolveError::Infeasible { .. }) => {
            let SolveError::Infeasible {
                code, candidates, ..
            } = &err
            else {
                unreachable!()
            };
            assert_eq!(code.team, Team::Red);
            assert!(!candidates.is_empty());
            assert!(err.diagnostic().contains("cannot be filled"));
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
}

#[test]
fn local_search_is_idempotent_on_its_own_output() {
    let roster = cohort();
    let start = d(2026, 7, 1);
    let shifts = month_shifts(start);
    let solver = Solver::new(&roster, &shifts, start, 28).with_options(options());
    let schedule = solver.solve(21).unwrap();

    let polished = solver.polish(&schedule).unwrap();
    assert_eq!(polished.score, schedule.score);
    assert_eq!(polished.rows, schedule.rows);
}
