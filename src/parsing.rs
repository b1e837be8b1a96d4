//! Parsers for the duration, date and identifier encodings used by Areena
//!
//! All functions here are pure and return `None` on malformed input instead
//! of failing.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static PT_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^PT(?:(?P<hours>\d+)H)?(?:(?P<mins>\d+)M)?(?:(?P<secs>\d+)(?:\.\d+)?S)?$")
        .unwrap()
});

static FINNISH_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<day>\d{2})\.(?P<month>\d{2})\.(?P<year>\d{4})$").unwrap());

static RELEASE_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z]{2} (?P<day>\d{1,2})\.(?P<month>\d{1,2})\.(?P<year>\d{4})").unwrap()
});

/// Converts an ISO-8601 style `PT` duration into whole seconds.
///
/// Fractional seconds are truncated. At least one of the hour, minute or
/// second components has to be present.
///
/// ```
/// use areena_browser::iso_duration_as_seconds;
///
/// assert_eq!(iso_duration_as_seconds("PT1H28M14S"), Some(5294));
/// assert_eq!(iso_duration_as_seconds("PT123"), None);
/// ```
pub fn iso_duration_as_seconds(duration: &str) -> Option<u64> {
    let caps = PT_DURATION.captures(duration)?;

    let component = |name: &str| -> Option<Option<u64>> {
        match caps.name(name) {
            Some(m) => m.as_str().parse::<u64>().ok().map(Some),
            None => Some(None),
        }
    };

    let hours = component("hours")?;
    let mins = component("mins")?;
    let secs = component("secs")?;

    if hours.is_none() && mins.is_none() && secs.is_none() {
        return None;
    }

    let total = hours
        .unwrap_or(0)
        .checked_mul(3600)?
        .checked_add(mins.unwrap_or(0).checked_mul(60)?)?
        .checked_add(secs.unwrap_or(0))?;

    Some(total)
}

/// Parses a date written as `dd.mm.yyyy`, e.g. `"14.05.2021"`.
pub fn parse_finnish_date(text: &str) -> Option<NaiveDate> {
    let caps = FINNISH_DATE.captures(text)?;
    date_from_captures(&caps)
}

/// Parses the release date out of a formatted episode label such as
/// `"ti 4.5.2021"` (two-letter weekday abbreviation, then `D.M.YYYY`).
pub fn parse_release_label(label: &str) -> Option<NaiveDate> {
    let caps = RELEASE_LABEL.captures(label)?;
    date_from_captures(&caps)
}

fn date_from_captures(caps: &regex::Captures<'_>) -> Option<NaiveDate> {
    let year = caps["year"].parse().ok()?;
    let month = caps["month"].parse().ok()?;
    let day = caps["day"].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Extracts the item identifier from an opaque page reference.
///
/// The identifier is the last path segment; query string and fragment are
/// ignored. Works for `yleareena://items/1-787136`,
/// `https://areena.yle.fi/1-787136?foo=bar` and a bare `1-787136` alike.
pub fn item_id_from_ref(page_ref: &str) -> Option<&str> {
    let path = page_ref
        .split(['?', '#'])
        .next()
        .unwrap_or(page_ref);

    path.rsplit('/')
        .next()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

/// Normalizes a free-text description: strips HTML markup and surrounding
/// whitespace, mapping empty results to `None`.
pub fn plain_text(text: &str) -> Option<String> {
    let text = if text.contains('<') {
        nanohtml2text::html2text(text)
    } else {
        text.to_string()
    };

    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
