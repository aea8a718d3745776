//! End-to-end parsing properties over arbitrary input.

use lis_model::{LessThanPolicy, ParsingRules, ValueFlag};
use lis_transform::{ValueParser, detect_value_formats, extract_numeric};
use proptest::prelude::*;

fn parser() -> ValueParser {
    ValueParser::default()
}

#[test]
fn documented_examples() {
    let half = ValueParser::new(ParsingRules::default().with_less_than(LessThanPolicy::Half));
    let parsed = half.parse("<0.5").unwrap();
    assert_eq!((parsed.numeric, parsed.flag), (Some(0.25), ValueFlag::LessThan));

    assert_eq!(extract_numeric("1:128"), Some(128.0));
    assert_eq!(extract_numeric("1.5-2.0"), Some(1.75));
    assert_eq!(extract_numeric("10^3"), Some(1000.0));

    let positive = parser().parse("阳性").unwrap();
    assert_eq!((positive.numeric, positive.flag), (Some(1.0), ValueFlag::TextPositive));
    let weak = parser().parse("弱阳性").unwrap();
    assert_eq!((weak.numeric, weak.flag), (Some(0.5), ValueFlag::TextPositive));

    let extreme = parser().parse("1e11").unwrap();
    assert_eq!((extreme.numeric, extreme.flag), (Some(1e11), ValueFlag::ExtremeValue));
}

#[test]
fn threshold_is_configurable() {
    let parser = ValueParser::new(ParsingRules::default().with_extreme_value_threshold(100.0));
    assert_eq!(parser.parse("150").unwrap().flag, ValueFlag::ExtremeValue);
    assert_eq!(parser.parse("99").unwrap().flag, ValueFlag::Normal);
}

#[test]
fn rules_from_profile_yaml_drive_the_parser() {
    let yaml = r"
less_than:
  rule: lower_bound
greater_than:
  rule: cap
  cap_value: 500
positive_text:
  mapping:
    positive: 1
    weak positive: 0.5
";
    let rules: ParsingRules = serde_yaml::from_str(yaml).unwrap();
    let parser = ValueParser::new(rules);

    assert_eq!(parser.parse("<3").unwrap().numeric, Some(3.0));
    assert_eq!(parser.parse(">9999").unwrap().numeric, Some(500.0));
    assert_eq!(parser.parse("Weak Positive").unwrap().numeric, Some(0.5));
    // The provided table replaced the defaults.
    assert_eq!(parser.parse("阳性").unwrap().flag, ValueFlag::Invalid);
}

#[test]
fn format_survey_serializes_with_flag_keys() {
    let summary = detect_value_formats([Some("1:64"), Some("2")], 100);
    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["formats"]["titer"]["count"], 1);
    assert_eq!(json["formats"]["normal"]["samples"][0], "2");
    assert_eq!(json["total"], 2);
}

proptest! {
    #[test]
    fn flag_is_from_closed_set(raw in ".*") {
        if let Some(parsed) = parser().parse(&raw) {
            prop_assert!(ValueFlag::ALL.contains(&parsed.flag));
        } else {
            prop_assert!(raw.trim().is_empty());
        }
    }

    #[test]
    fn invalid_implies_null_with_default_rules(raw in "\\PC{0,12}") {
        if let Some(parsed) = parser().parse(&raw) {
            if parsed.flag == ValueFlag::Invalid {
                prop_assert_eq!(parsed.numeric, None);
            }
        }
    }

    #[test]
    fn numeric_is_always_finite(raw in "[0-9eE^:.<>+-]{1,10}") {
        if let Some(numeric) = parser().parse(&raw).and_then(|parsed| parsed.numeric) {
            prop_assert!(numeric.is_finite());
        }
    }

    #[test]
    fn plain_numbers_parse_as_themselves(value in -1.0e6f64..1.0e6) {
        let text = format!("{value}");
        let parsed = parser().parse(&text).unwrap();
        prop_assert_eq!(parsed.numeric, Some(value));
    }

    #[test]
    fn parse_is_deterministic(raw in "\\PC{0,16}") {
        let parser = parser();
        prop_assert_eq!(parser.parse(&raw), parser.parse(&raw));
    }
}
