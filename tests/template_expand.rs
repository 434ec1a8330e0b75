#![forbid(unsafe_code)]
use chrono::NaiveDate;
use garde::{Pgy, ShiftCode, StartToken, Template, TemplateRow};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn code(s: &str) -> ShiftCode {
    s.parse().unwrap()
}

#[test]
fn default_template_is_valid() {
    Template::default().validate().unwrap();
}

#[test]
fn codes_round_trip() {
    for raw in ["LR7", "WR1", "LIdw", "LB11w", "WGn", "LE11", "WI2", "LP9", "LB11"] {
        let parsed: ShiftCode = raw.parse().unwrap();
        assert_eq!(parsed.to_string(), raw);
    }
    for bad in ["XR7", "LQ7", "LR8", "L", "", "LRnn", "lr7"] {
        assert!(bad.parse::<ShiftCode>().is_err(), "{bad} should not parse");
    }
}

#[test]
fn durations_follow_class_and_team() {
    // Gardes standard : 12 h en PGY-1, 10 h ensuite.
    assert_eq!(code("LR7").duration_hours(Pgy::One), Some(12));
    assert_eq!(code("LR7").duration_hours(Pgy::Three), Some(10));
    assert_eq!(code("WIn").duration_hours(Pgy::One), Some(12));
    // Jetons réservés à une classe.
    assert_eq!(code("WG9").duration_hours(Pgy::One), None);
    assert_eq!(code("WG9").duration_hours(Pgy::Two), Some(10));
    assert_eq!(code("LB11").duration_hours(Pgy::One), Some(12));
    assert_eq!(code("LB11").duration_hours(Pgy::Two), None);
    // Évaluation : 10 h en PGY-2/3, 12 h en PGY-1.
    assert_eq!(code("LE11").duration_hours(Pgy::One), Some(12));
    assert_eq!(code("LE11").duration_hours(Pgy::Two), Some(10));
    assert_eq!(code("LE11").duration_hours(Pgy::Three), Some(10));
    // Pédiatrie : toujours 10 h.
    assert_eq!(code("LP9").duration_hours(Pgy::One), Some(10));
    assert_eq!(code("LP9").duration_hours(Pgy::Three), Some(10));
    // Postes spéciaux du mercredi.
    assert_eq!(code("LIdw").duration_hours(Pgy::One), Some(5));
    assert_eq!(code("LIdw").duration_hours(Pgy::Two), None);
    assert_eq!(code("LB11w").duration_hours(Pgy::One), Some(9));
}

#[test]
fn expand_week_counts_and_wednesday_exception() {
    // Semaine du lundi 6 juillet 2026 ; mercredi le 8.
    let shifts = Template::default().expand(d(2026, 7, 6), 7).unwrap();
    assert_eq!(shifts.len(), 164);
    assert_eq!(shifts.iter().filter(|s| s.required).count(), 143);

    let wednesday = d(2026, 7, 8);
    let wed: Vec<_> = shifts.iter().filter(|s| s.date == wednesday).collect();
    assert_eq!(wed.len(), 20);
    assert!(wed.iter().all(|s| s.code.token != StartToken::Seven));
    assert!(wed.iter().any(|s| s.code == code("LIdw")));
    assert!(wed.iter().any(|s| s.code == code("LB11w")));

    // Les postes du mercredi n'existent pas les autres jours.
    assert!(shifts
        .iter()
        .filter(|s| s.date != wednesday)
        .all(|s| s.code != code("LIdw") && s.code != code("LB11w")));
}

#[test]
fn expand_stamps_absolute_instants() {
    let shifts = Template::default().expand(d(2026, 7, 6), 2).unwrap();
    let first_day_morning = shifts
        .iter()
        .find(|s| s.date == d(2026, 7, 6) && s.code == code("LR7"))
        .unwrap();
    assert_eq!(first_day_morning.start_min, 7 * 60);
    let second_day_morning = shifts
        .iter()
        .find(|s| s.date == d(2026, 7, 7) && s.code == code("LR7"))
        .unwrap();
    assert_eq!(second_day_morning.start_min, 24 * 60 + 7 * 60);
    assert_eq!(second_day_morning.end_min(Pgy::One), Some(24 * 60 + 19 * 60));

    // Sortie triée chronologiquement.
    assert!(shifts.windows(2).all(|w| w[0].start_min <= w[1].start_min));
}

#[test]
fn wednesday_seven_am_is_rejected() {
    let template = Template {
        rows: vec![TemplateRow {
            code: code("LR7"),
            days: vec![3],
            required: true,
        }],
    };
    assert!(template.validate().is_err());
}

#[test]
fn optional_night_is_rejected() {
    let template = Template {
        rows: vec![TemplateRow {
            code: code("LRn"),
            days: vec![1],
            required: false,
        }],
    };
    assert!(template.validate().is_err());
}

#[test]
fn duplicate_entry_is_rejected() {
    let row = TemplateRow {
        code: code("LG1"),
        days: vec![1, 2],
        required: true,
    };
    let template = Template {
        rows: vec![
            row.clone(),
            TemplateRow {
                days: vec![2, 5],
                ..row
            },
        ],
    };
    assert!(template.validate().is_err());
}

#[test]
fn blue_outside_hospital_l_is_rejected() {
    let template = Template {
        rows: vec![TemplateRow {
            code: code("WB1"),
            days: vec![1],
            required: true,
        }],
    };
    assert!(template.validate().is_err());
}
