//! Date helper functions

use chrono::{DateTime, Locale, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TOKEN: Regex =
        Regex::new(r"'(?:[^']|'')*'|yyyy|yy|MMMM|MMM|MM|M|dd|d|EEEE|EEE|HH|H|mm|ss").unwrap();
}

/// Format a date using a date-fns style pattern, in the given timezone and
/// language
///
/// # Examples
/// ```ignore
/// format_date(&date, "dd MMM yyyy", "pt-BR", chrono_tz::America::Sao_Paulo) // -> "15 mar 2021"
/// ```
pub fn format_date(date: &DateTime<Utc>, pattern: &str, language: &str, tz: Tz) -> String {
    let chrono_format = date_fns_to_chrono_format(pattern);
    date.with_timezone(&tz)
        .format_localized(&chrono_format, locale_for(language))
        .to_string()
}

/// Map a site language to a chrono locale
pub fn locale_for(language: &str) -> Locale {
    match language.replace('_', "-").to_lowercase().as_str() {
        "pt-br" | "pt" => Locale::pt_BR,
        "pt-pt" => Locale::pt_PT,
        "es" | "es-es" => Locale::es_ES,
        "fr" | "fr-fr" => Locale::fr_FR,
        "de" | "de-de" => Locale::de_DE,
        "en-gb" => Locale::en_GB,
        _ => Locale::en_US,
    }
}

/// Convert a date-fns pattern to a chrono format string. Text in single
/// quotes is literal and `''` is an escaped quote.
fn date_fns_to_chrono_format(pattern: &str) -> String {
    let mut result = String::with_capacity(pattern.len() * 2);
    let mut last = 0;

    for m in TOKEN.find_iter(pattern) {
        push_literal(&mut result, &pattern[last..m.start()]);
        let token = m.as_str();
        match token {
            "yyyy" => result.push_str("%Y"),
            "yy" => result.push_str("%y"),
            "MMMM" => result.push_str("%B"),
            "MMM" => result.push_str("%b"),
            "MM" => result.push_str("%m"),
            "M" => result.push_str("%-m"),
            "dd" => result.push_str("%d"),
            "d" => result.push_str("%-d"),
            "EEEE" => result.push_str("%A"),
            "EEE" => result.push_str("%a"),
            "HH" => result.push_str("%H"),
            "H" => result.push_str("%-H"),
            "mm" => result.push_str("%M"),
            "ss" => result.push_str("%S"),
            quoted => {
                let inner = &quoted[1..quoted.len() - 1];
                push_literal(&mut result, &inner.replace("''", "'"));
            }
        }
        last = m.end();
    }
    push_literal(&mut result, &pattern[last..]);

    result
}

fn push_literal(out: &mut String, text: &str) {
    out.push_str(&text.replace('%', "%%"));
}

/// Format a date in ISO 8601 / XML format
pub fn date_xml(date: &DateTime<Utc>) -> String {
    date.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 13, 5, 0).unwrap()
    }

    #[test]
    fn test_format_date() {
        assert_eq!(
            format_date(&date(), "dd MMM yyyy", "en", chrono_tz::UTC),
            "15 Jan 2024"
        );
        assert_eq!(
            format_date(&date(), "yyyy-MM-dd", "en", chrono_tz::UTC),
            "2024-01-15"
        );
    }

    #[test]
    fn test_format_in_timezone() {
        // 13:05 UTC is 10:05 in São Paulo
        assert_eq!(
            format_date(&date(), "HH:mm", "pt-BR", chrono_tz::America::Sao_Paulo),
            "10:05"
        );
    }

    #[test]
    fn test_quoted_literals() {
        assert_eq!(
            date_fns_to_chrono_format("'*editado em 'dd MMM yyyy 'ás' HH:mm"),
            "*editado em %d %b %Y ás %H:%M"
        );
        assert_eq!(date_fns_to_chrono_format("'it''s' d"), "it's %-d");
        assert_eq!(date_fns_to_chrono_format("100% yy"), "100%% %y");
    }

    #[test]
    fn test_localized_edited_pattern() {
        let formatted = format_date(
            &date(),
            "'*editado em 'dd MMM yyyy 'ás' HH:mm",
            "pt-BR",
            chrono_tz::UTC,
        );
        assert!(formatted.starts_with("*editado em 15 "));
        assert!(formatted.ends_with(" 2024 ás 13:05"));
    }

    #[test]
    fn test_locale_for() {
        assert_eq!(locale_for("pt-BR"), Locale::pt_BR);
        assert_eq!(locale_for("pt_BR"), Locale::pt_BR);
        assert_eq!(locale_for("klingon"), Locale::en_US);
    }

    #[test]
    fn test_date_xml() {
        assert_eq!(date_xml(&date()), "2024-01-15T13:05:00.000Z");
    }
}
