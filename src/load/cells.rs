use chrono::{Duration, NaiveDate};

fn excel_epoch() -> NaiveDate {
    // Serial 0; serials count days from here.
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap()
}

/// Convert a column letter ("A", "AA") to its 1-based index.
pub fn column_index(letter: &str) -> Option<u32> {
    let letter = letter.trim();
    if letter.is_empty() {
        return None;
    }
    let mut index: u32 = 0;
    for c in letter.chars() {
        let c = c.to_ascii_uppercase();
        if !c.is_ascii_uppercase() {
            return None;
        }
        index = index.checked_mul(26)?.checked_add(c as u32 - 'A' as u32 + 1)?;
    }
    Some(index)
}

/// Convert a 1-based column index back to letters.
pub fn column_letter(mut index: u32) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        letters.push(b'A' + ((index - 1) % 26) as u8);
        index = (index - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

pub fn serial_from_date(date: NaiveDate) -> f64 {
    (date - excel_epoch()).num_days() as f64
}

pub fn date_from_serial(serial: f64) -> Option<NaiveDate> {
    // 2958465 is 9999-12-31; values outside the serial range are not dates.
    if !(1.0..=2_958_465.0).contains(&serial) {
        return None;
    }
    excel_epoch().checked_add_signed(Duration::days(serial as i64))
}

/// Read a date from a cell's stored value: day serials first, ISO text second.
pub fn parse_cell_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(serial) = value.parse::<f64>() {
        return date_from_serial(serial);
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Parse an A1 range like "B4:D4" into ((col, row), (col, row)), 1-based.
pub fn parse_a1_range(range: &str) -> Option<((u32, u32), (u32, u32))> {
    let (start, end) = match range.split_once(':') {
        Some((a, b)) => (a, b),
        None => (range, range),
    };
    Some((parse_a1(start)?, parse_a1(end)?))
}

fn parse_a1(cell: &str) -> Option<(u32, u32)> {
    let cell = cell.trim().trim_start_matches('$');
    let split = cell.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, rest) = cell.split_at(split);
    let row = rest.trim_start_matches('$').parse().ok()?;
    Some((column_index(letters)?, row))
}

// ── Tests ──
