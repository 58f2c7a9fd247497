//! Roman numeral decoding and encoding for article numbers.

fn symbol_value(c: char) -> Option<u32> {
    match c.to_ascii_uppercase() {
        'I' => Some(1),
        'V' => Some(5),
        'X' => Some(10),
        'L' => Some(50),
        'C' => Some(100),
        'D' => Some(500),
        'M' => Some(1000),
        _ => None,
    }
}

/// Decode a Roman numeral using subtractive notation.
///
/// Returns `None` for empty input or any non-numeral character.
///
/// # Examples
/// ```
/// use lawph_harvester::roman::parse_roman;
///
/// assert_eq!(parse_roman("XIV"), Some(14));
/// assert_eq!(parse_roman("ix"), Some(9));
/// assert_eq!(parse_roman("ARTICLE"), None);
/// ```
pub fn parse_roman(numeral: &str) -> Option<u32> {
    let values = numeral
        .trim()
        .chars()
        .map(symbol_value)
        .collect::<Option<Vec<_>>>()?;

    if values.is_empty() {
        return None;
    }

    let mut total = 0;
    for (i, value) in values.iter().enumerate() {
        match values.get(i + 1) {
            Some(next) if value < next => total -= *value as i64,
            _ => total += *value as i64,
        }
    }

    u32::try_from(total).ok().filter(|v| *v > 0)
}

/// Parse an article identifier written either as a Roman or Arabic numeral.
pub fn parse_article_number(label: &str) -> Option<u32> {
    let label = label.trim().trim_end_matches('.');
    if label.chars().all(|c| c.is_ascii_digit()) {
        label.parse().ok()
    } else {
        parse_roman(label)
    }
}

/// Encode a number as an uppercase Roman numeral.
///
/// # Examples
/// ```
/// use lawph_harvester::roman::to_roman;
///
/// assert_eq!(to_roman(18), "XVIII");
/// assert_eq!(to_roman(4), "IV");
/// ```
pub fn to_roman(mut value: u32) -> String {
    const TABLE: &[(u32, &str)] = &[
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    let mut out = String::new();
    for (amount, symbol) in TABLE {
        while value >= *amount {
            out.push_str(symbol);
            value -= amount;
        }
    }
    out
}
