//! Reply formatting
//!
//! Pure functions producing Telegram HTML. Every value taken from a record
//! or typed by a user is escaped, and missing or blank values render as
//! [`NOT_AVAILABLE`].

use std::fmt::Write;

use crate::models::{DgrClass, HazmatRecord};

/// Placeholder for absent fields
pub const NOT_AVAILABLE: &str = "N/A";

/// Telegram rejects messages longer than this
pub const MESSAGE_CHAR_LIMIT: usize = 4096;

/// Room kept free for the "…and N more." footer
const FOOTER_RESERVE: usize = 64;

/// Width of the label column inside the record block
const LABEL_WIDTH: usize = 22;

/// Longest rendered field value, counted after escaping
const FIELD_CHAR_LIMIT: usize = 500;

/// Longest rendered UN number key, counted after escaping
const KEY_CHAR_LIMIT: usize = 64;

/// Marks a value cut short to fit a message
const ELLIPSIS: char = '…';

/// Escape the characters Telegram's HTML parse mode treats as markup
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Escape `text`, cutting it so the escaped form is at most `limit` chars.
///
/// A cut never splits an entity and ends with `…`.
fn escape_within(text: &str, limit: usize) -> String {
    let escaped = escape_html(text);
    if escaped.chars().count() <= limit {
        return escaped;
    }

    let mut out = String::new();
    let mut used = 0;
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let piece = escape_html(c.encode_utf8(&mut buf));
        let len = piece.chars().count();
        if used + len + 1 > limit {
            break;
        }
        out.push_str(&piece);
        used += len;
    }
    out.push(ELLIPSIS);
    out
}

/// Render an optional value: trimmed and escaped, or `N/A` when absent or blank.
///
/// Values longer than [`FIELD_CHAR_LIMIT`] are cut short.
pub fn field_or_na(value: Option<&str>) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => escape_within(v, FIELD_CHAR_LIMIT),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Details block for a single UN number
pub fn format_record(key: &str, record: &HazmatRecord) -> String {
    let mut out = format!(
        "<b>Details for UN number {}:</b>\n\n<pre>\n",
        escape_within(key, KEY_CHAR_LIMIT)
    );

    for (label, value) in record.labeled_fields() {
        let label = format!("{}:", label);
        let _ = writeln!(out, "{:<width$}{}", label, field_or_na(value), width = LABEL_WIDTH);
    }

    out.push_str("</pre>");
    out
}

/// Reply for a lookup that matched no rows
pub fn not_found(key: &str) -> String {
    format!(
        "No information found for UN number {}.",
        escape_within(key, KEY_CHAR_LIMIT)
    )
}

/// Numbered class list, 1-based, in input order.
///
/// At most `max_entries` entries are rendered (`0` means no cap) and the
/// output never exceeds [`MESSAGE_CHAR_LIMIT`]; entries left out are
/// summarized in a trailing line. Field values are cut short, so the first
/// entry always fits.
pub fn format_class_list(records: &[DgrClass], max_entries: usize) -> String {
    let cap = if max_entries == 0 {
        records.len()
    } else {
        max_entries.min(records.len())
    };

    let mut out = String::from("<b>List of DGR Classes:</b>\n\n");
    let mut rendered = 0;

    for (index, class) in records.iter().take(cap).enumerate() {
        let entry = format_class_entry(index + 1, class);
        let remaining_after = records.len() - (index + 1);
        let reserve = if remaining_after > 0 { FOOTER_RESERVE } else { 0 };

        if out.chars().count() + entry.chars().count() + reserve > MESSAGE_CHAR_LIMIT {
            break;
        }
        out.push_str(&entry);
        rendered += 1;
    }

    let omitted = records.len() - rendered;
    if omitted > 0 {
        let _ = write!(out, "<i>…and {} more.</i>", omitted);
    }

    out.trim_end().to_string()
}

fn format_class_entry(position: usize, class: &DgrClass) -> String {
    format!(
        "<b>{}.</b> ICAO Class: {}\nDescription: {}\n<b>IATA Code:</b> {}\n\n",
        position,
        field_or_na(class.icao_class.as_deref()),
        field_or_na(class.description.as_deref()),
        field_or_na(class.iata_code.as_deref()),
    )
}
