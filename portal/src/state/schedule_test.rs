use super::*;
use time::macros::{date, time};

fn weekday_clinic() -> Availability {
    Availability::new(
        vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday],
        Some((time!(9:00), time!(17:00))),
    )
}

// =============================================================
// Parsing
// =============================================================

#[test]
fn parse_time_accepts_wire_and_display_forms() {
    assert_eq!(parse_time("09:30"), Ok(time!(9:30)));
    assert_eq!(parse_time("17:00:00"), Ok(time!(17:00)));
    assert_eq!(parse_time("9:30PM"), Ok(time!(21:30)));
    assert_eq!(parse_time("09:30 am"), Ok(time!(9:30)));
    assert_eq!(parse_time("half past"), Err(ScheduleError::InvalidTime("half past".to_owned())));
}

#[test]
fn twelve_hour_format_is_zero_padded() {
    assert_eq!(format_time_12h(time!(9:00)), "09:00AM");
    assert_eq!(format_time_12h(time!(17:00)), "05:00PM");
    assert_eq!(format_time(time!(7:05)), "07:05");
}

#[test]
fn dates_round_trip_wire_format() {
    assert_eq!(parse_date("2026-10-21"), Ok(date!(2026 - 10 - 21)));
    assert_eq!(format_date(date!(2026 - 01 - 05)), "2026-01-05");
    assert!(matches!(parse_date("10/21/2026"), Err(ScheduleError::InvalidDate(_))));
}

#[test]
fn weekday_names_are_case_insensitive() {
    assert_eq!(parse_weekday("Monday"), Some(Weekday::Monday));
    assert_eq!(parse_weekday("tue"), Some(Weekday::Tuesday));
    assert_eq!(parse_weekday(" SATURDAY "), Some(Weekday::Saturday));
    assert_eq!(parse_weekday("Thurs"), None);
    assert_eq!(parse_weekday("Funday"), None);
    assert_eq!(parse_weekday("mo"), None);
}

// =============================================================
// Dates
// =============================================================

#[test]
fn only_available_weekdays_are_selectable() {
    let clinic = weekday_clinic();
    let today = date!(2026 - 10 - 19);
    assert_eq!(clinic.check_date(date!(2026 - 10 - 21), today), Ok(date!(2026 - 10 - 21)));
    assert_eq!(
        clinic.check_date(date!(2026 - 10 - 22), today),
        Err(ScheduleError::UnavailableDay(Weekday::Thursday))
    );
}

#[test]
fn past_dates_are_rejected_but_today_is_allowed() {
    let clinic = weekday_clinic();
    let today = date!(2026 - 10 - 19);
    assert_eq!(clinic.check_date(today, today), Ok(today));
    assert_eq!(clinic.check_date(date!(2026 - 10 - 16), today), Err(ScheduleError::PastDate));
}

#[test]
fn upcoming_dates_skip_unavailable_days() {
    let dates = weekday_clinic().upcoming_dates(date!(2026 - 10 - 20), 3);
    assert_eq!(dates, vec![date!(2026 - 10 - 21), date!(2026 - 10 - 23), date!(2026 - 10 - 26)]);
    assert!(Availability::default().upcoming_dates(date!(2026 - 10 - 20), 3).is_empty());
}

// =============================================================
// Times
// =============================================================

#[test]
fn window_boundaries_are_inclusive() {
    let clinic = weekday_clinic();
    let range = TimeRange::new(time!(9:00), time!(17:00)).unwrap();
    assert_eq!(clinic.check_time(range), Ok(range));
}

#[test]
fn outside_window_echoes_bounds() {
    let clinic = weekday_clinic();
    let range = TimeRange::new(time!(16:30), time!(17:30)).unwrap();
    let err = clinic.check_time(range).unwrap_err();
    assert_eq!(err.to_string(), "Please select between 09:00AM ~ 05:00PM");

    let early = TimeRange::new(time!(8:59), time!(10:00)).unwrap();
    assert!(clinic.check_time(early).is_err());
}

#[test]
fn reversed_range_is_rejected() {
    assert_eq!(TimeRange::parse("11:00", "10:00"), Err(ScheduleError::ReversedRange));
    assert!(TimeRange::parse("10:00", "10:00").is_ok());
}

#[test]
fn no_configured_hours_accepts_any_slot() {
    let open = Availability::new(vec![Weekday::Sunday], None);
    let range = TimeRange::parse("06:00", "23:00").unwrap();
    assert_eq!(open.check_time(range), Ok(range));
    assert_eq!(open.window_label(), None);
}

#[test]
fn range_renders_for_wire_and_display() {
    let range = TimeRange::parse("13:00", "14:30").unwrap();
    assert_eq!(range.to_wire(), ["13:00".to_owned(), "14:30".to_owned()]);
    assert_eq!(range.to_string(), "01:00PM ~ 02:30PM");
}

// =============================================================
// Profiles
// =============================================================

#[test]
fn availability_reads_doctor_profile() {
    let profile: DoctorProfile = serde_json::from_value(serde_json::json!({
        "id": 4,
        "days_available": "Monday, friday, someday",
        "time_start": "08:00:00",
        "time_end": "12:00",
    }))
    .unwrap();
    let availability = Availability::from_profile(&profile);
    assert_eq!(availability.days(), &[Weekday::Monday, Weekday::Friday]);
    assert_eq!(availability.window_label().as_deref(), Some("08:00AM ~ 12:00PM"));
}

#[test]
fn upcoming_dates_are_capped_at_a_year() {
    let every_day = Availability::new(
        vec![
            Weekday::Monday,
            Weekday::Tuesday,
            Weekday::Wednesday,
            Weekday::Thursday,
            Weekday::Friday,
            Weekday::Saturday,
            Weekday::Sunday,
        ],
        None,
    );
    let dates = every_day.upcoming_dates(date!(2026 - 10 - 19), usize::MAX);
    assert_eq!(dates.len(), MAX_UPCOMING_DATES);
    assert_eq!(dates.last(), Some(&date!(2027 - 10 - 19)));
}
