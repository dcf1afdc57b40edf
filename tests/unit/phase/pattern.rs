use super::*;

#[test]
fn parses_integer_and_decimal_patterns() {
    let p = BreathingPattern::parse("4-7-8").unwrap();
    assert_eq!((p.inhale_secs, p.hold_secs, p.exhale_secs), (4.0, 7.0, 8.0));
    assert_eq!(p.total_cycle_secs(), 19.0);

    let p = BreathingPattern::parse(" 3.5 - 0 - 4.5 ").unwrap();
    assert_eq!((p.inhale_secs, p.hold_secs, p.exhale_secs), (3.5, 0.0, 4.5));
}

#[test]
fn malformed_strings_fall_back_without_error() {
    for s in ["abc", "4-7", "", "4-7-8-9", "-4-0-4", "0-0-0", "4-x-4", "inf-0-4", "NaN-1-1"] {
        assert!(BreathingPattern::parse(s).is_err(), "{s} should be rejected");
        assert_eq!(
            BreathingPattern::parse_or_default(s),
            BreathingPattern::FALLBACK,
            "{s} should degrade to the fallback"
        );
    }
    assert_eq!(BreathingPattern::default().to_string(), "4-0-4");
}

#[test]
fn new_rejects_negative_values() {
    assert!(BreathingPattern::new(-1.0, 0.0, 4.0).is_err());
    assert!(BreathingPattern::new(0.0, 0.0, 0.0).is_err());
    assert!(BreathingPattern::new(0.0, 2.0, 0.0).is_ok());
}

#[test]
fn display_uses_dash_separated_seconds() {
    assert_eq!(BreathingPattern::parse("4-7-8").unwrap().to_string(), "4-7-8");
    assert_eq!(
        BreathingPattern::parse("3.5-0-4").unwrap().to_string(),
        "3.5-0-4"
    );
}

#[test]
fn exercises_carry_valid_patterns() {
    for ex in Exercise::ALL {
        let p = ex.pattern();
        assert_eq!(p.to_string(), ex.pattern_source());
        assert!(p.total_cycle_secs() > 0.0);
        assert!(!ex.label().is_empty());
    }
    assert_eq!(Exercise::Relaxing.pattern().total_cycle_secs(), 19.0);
}
