#![forbid(unsafe_code)]
use chrono::NaiveDate;
use garde::{io, Pgy, Schedule, ScheduleRow, Service};
use std::io::Write as _;
use tempfile::NamedTempFile;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn csv_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn reads_basic_table() {
    let file = csv_file(
        "resident,pgy,service,hours,requests,chief\n\
         ali,1,ED,216,,\n\
         bea,2,Off-Service,190,,\n\
         cyr,3,Peds,170,,\n\
         dom,3,ED,150,,true\n",
    );
    let roster = io::read_residents(file.path(), d(2026, 7, 1), 28).unwrap();
    assert_eq!(roster.len(), 4);

    assert_eq!(roster[0].handle, "ali");
    assert_eq!(roster[0].pgy, Pgy::One);
    assert_eq!(roster[0].service, Service::Ed);
    assert_eq!(roster[0].target_hours, 216);
    assert!(roster[0].requests.is_empty());
    assert!(!roster[0].chief);

    assert_eq!(roster[1].service, Service::OffService);
    assert!(!roster[1].schedulable());
    assert_eq!(roster[2].service, Service::Peds);
    assert!(roster[3].chief);
}

#[test]
fn accepts_the_operator_spreadsheet_headers() {
    let file = csv_file(
        "Resident,PGY,Service,Hours/Block Goal,Requests\n\
         Jo Marchal,2,ED,190,\"7/4, 7/12\"\n",
    );
    let roster = io::read_residents(file.path(), d(2026, 7, 1), 28).unwrap();
    assert_eq!(roster[0].handle, "Jo Marchal");
    assert!(roster[0].has_requested(d(2026, 7, 4)));
    assert!(roster[0].has_requested(d(2026, 7, 12)));
}

#[test]
fn request_years_resolve_into_the_horizon() {
    // Bloc à cheval sur la nouvelle année : 1/2 tombe en janvier suivant.
    let file = csv_file(
        "resident,pgy,service,hours,requests\n\
         noe,1,ED,216,\"12/24, 1/2\"\n\
         zia,2,ED,190,7/4/2026\n",
    );
    let roster = io::read_residents(file.path(), d(2026, 12, 21), 28).unwrap();
    assert!(roster[0].has_requested(d(2026, 12, 24)));
    assert!(roster[0].has_requested(d(2027, 1, 2)));

    let file = csv_file(
        "resident,pgy,service,hours,requests\n\
         zia,2,ED,190,7/4/2026\n",
    );
    let roster = io::read_residents(file.path(), d(2026, 7, 1), 28).unwrap();
    assert!(roster[0].has_requested(d(2026, 7, 4)));
}

#[test]
fn invalid_request_dates_are_skipped_with_a_warning() {
    let file = csv_file(
        "resident,pgy,service,hours,requests\n\
         gus,1,ED,216,\"7/32, 13/1, 7/15\"\n",
    );
    let roster = io::read_residents(file.path(), d(2026, 7, 1), 28).unwrap();
    assert_eq!(roster[0].requests.len(), 1);
    assert!(roster[0].has_requested(d(2026, 7, 15)));
}

#[test]
fn duplicate_handle_is_a_row_error() {
    let file = csv_file(
        "resident,pgy,service,hours\n\
         ali,1,ED,216\n\
         ali,2,ED,190\n",
    );
    let err = io::read_residents(file.path(), d(2026, 7, 1), 28).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("row 3"), "{msg}");
    assert!(msg.contains("ali"), "{msg}");
}

#[test]
fn unknown_service_is_a_row_error() {
    let file = csv_file(
        "resident,pgy,service,hours\n\
         ali,1,Nightfloat,216\n",
    );
    let err = io::read_residents(file.path(), d(2026, 7, 1), 28).unwrap_err();
    assert!(format!("{err:#}").contains("Nightfloat"));
}

#[test]
fn invalid_pgy_is_a_row_error() {
    let file = csv_file(
        "resident,pgy,service,hours\n\
         ali,4,ED,216\n",
    );
    assert!(io::read_residents(file.path(), d(2026, 7, 1), 28).is_err());
}

#[test]
fn chief_flag_requires_pgy3() {
    let file = csv_file(
        "resident,pgy,service,hours,requests,chief\n\
         ali,1,ED,216,,yes\n",
    );
    let err = io::read_residents(file.path(), d(2026, 7, 1), 28).unwrap_err();
    assert!(format!("{err:#}").contains("chief"));
}

#[test]
fn schedule_csv_round_trips() {
    let schedule = Schedule {
        rows: vec![
            ScheduleRow {
                date: d(2026, 7, 1),
                code: "LB11w".parse().unwrap(),
                resident: Some("ali".to_string()),
            },
            ScheduleRow {
                date: d(2026, 7, 2),
                code: "LR4".parse().unwrap(),
                resident: None,
            },
        ],
        seed: 7,
        score: 42,
    };
    let text = io::schedule_csv_string(&schedule).unwrap();
    assert!(text.starts_with("date,shift,resident\n"));
    assert!(text.contains("2026-07-01,LB11w,ali\n"));
    assert!(text.contains("2026-07-02,LR4,\n"));

    let file = NamedTempFile::new().unwrap();
    io::write_schedule_csv(file.path(), &schedule).unwrap();
    let rows = io::read_schedule_csv(file.path()).unwrap();
    assert_eq!(rows, schedule.rows);
}
