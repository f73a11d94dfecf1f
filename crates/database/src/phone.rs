//! Phone number parsing and WhatsApp JID helpers.
//!
//! Numbers are normalised to E.164 (`+<country><national>`) using a table of
//! country calling codes with the national-number lengths each one allows.
//! Unknown codes fall back to the general E.164 rule of 7 to 15 digits.

use serde::Serialize;

/// Suffix WhatsApp appends to individual-chat JIDs.
pub const JID_SUFFIX: &str = "@s.whatsapp.net";

/// Legacy JID suffix still seen on older payloads.
pub const LEGACY_JID_SUFFIX: &str = "@c.us";

/// A country calling code and its allowed national-number lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryCode {
    pub code: &'static str,
    pub name: &'static str,
    pub min_len: usize,
    pub max_len: usize,
}

const fn cc(code: &'static str, name: &'static str, min_len: usize, max_len: usize) -> CountryCode {
    CountryCode {
        code,
        name,
        min_len,
        max_len,
    }
}

/// Known calling codes.
pub const COUNTRY_CODES: &[CountryCode] = &[
    cc("1", "United States/Canada", 10, 10),
    cc("7", "Russia/Kazakhstan", 10, 10),
    cc("20", "Egypt", 10, 10),
    cc("27", "South Africa", 9, 9),
    cc("30", "Greece", 10, 10),
    cc("31", "Netherlands", 9, 9),
    cc("32", "Belgium", 9, 9),
    cc("33", "France", 9, 9),
    cc("34", "Spain", 9, 9),
    cc("36", "Hungary", 9, 9),
    cc("39", "Italy", 9, 11),
    cc("40", "Romania", 9, 9),
    cc("41", "Switzerland", 9, 9),
    cc("43", "Austria", 10, 13),
    cc("44", "United Kingdom", 10, 10),
    cc("45", "Denmark", 8, 8),
    cc("46", "Sweden", 9, 9),
    cc("47", "Norway", 8, 8),
    cc("48", "Poland", 9, 9),
    cc("49", "Germany", 11, 12),
    cc("51", "Peru", 9, 9),
    cc("52", "Mexico", 10, 10),
    cc("53", "Cuba", 8, 8),
    cc("54", "Argentina", 10, 11),
    cc("55", "Brazil", 10, 11),
    cc("56", "Chile", 9, 9),
    cc("57", "Colombia", 10, 10),
    cc("58", "Venezuela", 10, 10),
    cc("60", "Malaysia", 9, 10),
    cc("61", "Australia", 9, 9),
    cc("62", "Indonesia", 9, 12),
    cc("63", "Philippines", 10, 10),
    cc("64", "New Zealand", 9, 9),
    cc("65", "Singapore", 8, 8),
    cc("66", "Thailand", 9, 9),
    cc("81", "Japan", 10, 11),
    cc("82", "South Korea", 9, 11),
    cc("84", "Vietnam", 9, 10),
    cc("86", "China", 11, 11),
    cc("90", "Turkey", 10, 10),
    cc("91", "India", 10, 10),
    cc("92", "Pakistan", 10, 10),
    cc("93", "Afghanistan", 9, 9),
    cc("94", "Sri Lanka", 9, 9),
    cc("95", "Myanmar", 9, 10),
    cc("98", "Iran", 10, 10),
    cc("212", "Morocco", 9, 9),
    cc("213", "Algeria", 9, 9),
    cc("216", "Tunisia", 8, 8),
    cc("218", "Libya", 9, 9),
    cc("220", "Gambia", 7, 7),
    cc("221", "Senegal", 9, 9),
    cc("222", "Mauritania", 8, 8),
    cc("223", "Mali", 8, 8),
    cc("224", "Guinea", 9, 9),
    cc("225", "Ivory Coast", 8, 8),
    cc("226", "Burkina Faso", 8, 8),
    cc("227", "Niger", 8, 8),
    cc("228", "Togo", 8, 8),
    cc("229", "Benin", 8, 8),
    cc("230", "Mauritius", 8, 8),
    cc("231", "Liberia", 8, 9),
    cc("232", "Sierra Leone", 8, 8),
    cc("233", "Ghana", 9, 9),
    cc("234", "Nigeria", 10, 10),
    cc("235", "Chad", 8, 8),
    cc("236", "Central African Republic", 8, 8),
    cc("237", "Cameroon", 9, 9),
    cc("238", "Cape Verde", 7, 7),
    cc("239", "Sao Tome and Principe", 7, 7),
    cc("240", "Equatorial Guinea", 9, 9),
    cc("241", "Gabon", 8, 8),
    cc("242", "Republic of the Congo", 9, 9),
    cc("243", "Democratic Republic of the Congo", 9, 9),
    cc("244", "Angola", 9, 9),
    cc("245", "Guinea-Bissau", 7, 7),
    cc("246", "British Indian Ocean Territory", 7, 7),
    cc("247", "Ascension Island", 4, 4),
    cc("248", "Seychelles", 7, 7),
    cc("249", "Sudan", 9, 9),
    cc("250", "Rwanda", 9, 9),
    cc("251", "Ethiopia", 9, 9),
    cc("252", "Somalia", 8, 9),
    cc("253", "Djibouti", 8, 8),
    cc("254", "Kenya", 9, 9),
    cc("255", "Tanzania", 9, 9),
    cc("256", "Uganda", 9, 9),
    cc("257", "Burundi", 8, 8),
    cc("258", "Mozambique", 9, 9),
    cc("260", "Zambia", 9, 9),
    cc("261", "Madagascar", 9, 9),
    cc("262", "Reunion", 9, 9),
    cc("263", "Zimbabwe", 9, 9),
    cc("264", "Namibia", 9, 9),
    cc("265", "Malawi", 9, 9),
    cc("266", "Lesotho", 8, 8),
    cc("267", "Botswana", 8, 8),
    cc("268", "Swaziland", 8, 8),
    cc("269", "Comoros", 7, 7),
    cc("290", "Saint Helena", 4, 4),
    cc("291", "Eritrea", 7, 7),
    cc("297", "Aruba", 7, 7),
    cc("298", "Faroe Islands", 6, 6),
    cc("299", "Greenland", 6, 6),
    cc("350", "Gibraltar", 8, 8),
    cc("351", "Portugal", 9, 9),
    cc("352", "Luxembourg", 9, 9),
    cc("353", "Ireland", 9, 9),
    cc("354", "Iceland", 7, 7),
    cc("355", "Albania", 9, 9),
    cc("356", "Malta", 8, 8),
    cc("357", "Cyprus", 8, 8),
    cc("358", "Finland", 9, 10),
    cc("359", "Bulgaria", 9, 9),
    cc("370", "Lithuania", 8, 8),
    cc("371", "Latvia", 8, 8),
    cc("372", "Estonia", 8, 8),
    cc("373", "Moldova", 8, 8),
    cc("374", "Armenia", 8, 8),
    cc("375", "Belarus", 9, 9),
    cc("376", "Andorra", 6, 6),
    cc("377", "Monaco", 8, 8),
    cc("378", "San Marino", 9, 10),
    cc("380", "Ukraine", 9, 9),
    cc("381", "Serbia", 9, 9),
    cc("382", "Montenegro", 8, 8),
    cc("383", "Kosovo", 8, 8),
    cc("385", "Croatia", 9, 9),
    cc("386", "Slovenia", 8, 8),
    cc("387", "Bosnia and Herzegovina", 8, 8),
    cc("389", "North Macedonia", 8, 8),
    cc("420", "Czech Republic", 9, 9),
    cc("421", "Slovakia", 9, 9),
    cc("423", "Liechtenstein", 7, 7),
    cc("500", "Falkland Islands", 5, 5),
    cc("501", "Belize", 7, 7),
    cc("502", "Guatemala", 8, 8),
    cc("503", "El Salvador", 8, 8),
    cc("504", "Honduras", 8, 8),
    cc("505", "Nicaragua", 8, 8),
    cc("506", "Costa Rica", 8, 8),
    cc("507", "Panama", 8, 8),
    cc("508", "Saint Pierre and Miquelon", 6, 6),
    cc("509", "Haiti", 8, 8),
    cc("590", "Guadeloupe", 9, 9),
    cc("591", "Bolivia", 8, 8),
    cc("592", "Guyana", 7, 7),
    cc("593", "Ecuador", 9, 9),
    cc("594", "French Guiana", 9, 9),
    cc("595", "Paraguay", 9, 9),
    cc("596", "Martinique", 9, 9),
    cc("597", "Suriname", 7, 7),
    cc("598", "Uruguay", 8, 8),
    cc("599", "Netherlands Antilles", 7, 7),
    cc("670", "East Timor", 8, 8),
    cc("672", "Australian External Territories", 9, 9),
    cc("673", "Brunei", 7, 7),
    cc("674", "Nauru", 7, 7),
    cc("675", "Papua New Guinea", 8, 8),
    cc("676", "Tonga", 7, 7),
    cc("677", "Solomon Islands", 7, 7),
    cc("678", "Vanuatu", 7, 7),
    cc("679", "Fiji", 7, 7),
    cc("680", "Palau", 7, 7),
    cc("681", "Wallis and Futuna", 6, 6),
    cc("682", "Cook Islands", 5, 5),
    cc("683", "Niue", 4, 4),
    cc("684", "American Samoa", 7, 7),
    cc("685", "Samoa", 7, 7),
    cc("686", "Kiribati", 8, 8),
    cc("687", "New Caledonia", 6, 6),
    cc("688", "Tuvalu", 6, 6),
    cc("689", "French Polynesia", 8, 8),
    cc("690", "Tokelau", 4, 4),
    cc("691", "Micronesia", 7, 7),
    cc("692", "Marshall Islands", 7, 7),
    cc("850", "North Korea", 8, 10),
    cc("852", "Hong Kong", 8, 8),
    cc("853", "Macao", 8, 8),
    cc("855", "Cambodia", 9, 9),
    cc("856", "Laos", 10, 10),
    cc("880", "Bangladesh", 10, 10),
    cc("886", "Taiwan", 9, 9),
    cc("960", "Maldives", 7, 7),
    cc("961", "Lebanon", 8, 8),
    cc("962", "Jordan", 9, 9),
    cc("963", "Syria", 9, 9),
    cc("964", "Iraq", 10, 10),
    cc("965", "Kuwait", 8, 8),
    cc("966", "Saudi Arabia", 9, 9),
    cc("967", "Yemen", 9, 9),
    cc("968", "Oman", 8, 8),
    cc("970", "Palestine", 9, 9),
    cc("971", "United Arab Emirates", 9, 9),
    cc("972", "Israel", 9, 9),
    cc("973", "Bahrain", 8, 8),
    cc("974", "Qatar", 8, 8),
    cc("975", "Bhutan", 8, 8),
    cc("976", "Mongolia", 8, 8),
    cc("977", "Nepal", 10, 10),
    cc("992", "Tajikistan", 9, 9),
    cc("993", "Turkmenistan", 8, 8),
    cc("994", "Azerbaijan", 9, 9),
    cc("995", "Georgia", 9, 9),
    cc("996", "Kyrgyzstan", 9, 9),
    cc("998", "Uzbekistan", 9, 9),
];

/// Result of parsing a raw phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedPhone {
    pub country_code: Option<String>,
    pub national_number: String,
    pub is_valid: bool,
    /// `+<country><national>` when valid, otherwise the cleaned input
    pub formatted: String,
    pub country: Option<&'static str>,
}

impl ParsedPhone {
    fn invalid(cleaned: String) -> Self {
        Self {
            country_code: None,
            national_number: cleaned.clone(),
            is_valid: false,
            formatted: cleaned,
            country: None,
        }
    }
}

/// Look up a calling code in the table.
pub fn lookup_country(code: &str) -> Option<&'static CountryCode> {
    COUNTRY_CODES.iter().find(|c| c.code == code)
}

/// Parse and normalise a phone number to E.164.
///
/// Accepts `+` or `00` international prefixes; bare digit strings of at
/// least seven digits are assumed to already include a country code.
pub fn parse_phone_number(input: &str) -> ParsedPhone {
    let cleaned: String = input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();

    if cleaned.is_empty() {
        return ParsedPhone::invalid(String::new());
    }

    let cleaned = if cleaned.starts_with('+') {
        cleaned
    } else if let Some(rest) = cleaned.strip_prefix("00") {
        format!("+{}", rest)
    } else if cleaned.len() >= 7 {
        format!("+{}", cleaned)
    } else {
        return ParsedPhone::invalid(cleaned);
    };

    let digits = &cleaned[1..];
    let (country_code, national_number) = split_country_code(digits);
    let known = country_code.and_then(lookup_country);

    let is_valid = match country_code {
        Some(code) => is_valid_split(code, national_number, known),
        None => false,
    };

    ParsedPhone {
        country_code: country_code.map(str::to_string),
        national_number: national_number.to_string(),
        is_valid,
        formatted: if is_valid {
            format!("+{}{}", country_code.unwrap_or_default(), national_number)
        } else {
            cleaned.clone()
        },
        country: known.map(|c| c.name),
    }
}

/// Split digits into (calling code, national number), longest known code first.
fn split_country_code(digits: &str) -> (Option<&str>, &str) {
    let mut best: Option<&CountryCode> = None;
    for entry in COUNTRY_CODES {
        if digits.starts_with(entry.code)
            && best.map_or(true, |b| entry.code.len() > b.code.len())
        {
            best = Some(entry);
        }
    }
    if let Some(entry) = best {
        return (Some(&digits[..entry.code.len()]), &digits[entry.code.len()..]);
    }

    // Unknown code: take the longest prefix that leaves at least four digits.
    for len in [3, 2, 1] {
        if digits.len() >= len + 4 && digits.is_char_boundary(len) {
            return (Some(&digits[..len]), &digits[len..]);
        }
    }
    (None, "")
}

fn is_valid_split(code: &str, national: &str, known: Option<&CountryCode>) -> bool {
    if national.is_empty() || !national.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    match known {
        Some(c) => (c.min_len..=c.max_len).contains(&national.len()),
        None => {
            let total = code.len() + national.len();
            (7..=15).contains(&total) && national.len() >= 4
        }
    }
}

/// True when the number parses to a valid international number.
pub fn is_valid_phone_number(input: &str) -> bool {
    parse_phone_number(input).is_valid
}

/// Keep only digits, dropping a leading `00` international prefix.
pub fn clean_digits(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();
    match digits.strip_prefix("00") {
        Some(rest) => rest.to_string(),
        None => digits,
    }
}

/// Build the WhatsApp JID for a phone number.
pub fn to_whatsapp_jid(phone: &str) -> String {
    let parsed = parse_phone_number(phone);
    if parsed.is_valid {
        format!("{}{}", &parsed.formatted[1..], JID_SUFFIX)
    } else {
        let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();
        format!("{}{}", digits, JID_SUFFIX)
    }
}

/// Extract a `+digits` phone number from a JID.
///
/// Non-numeric user parts (groups, broadcast lists) are returned as-is.
pub fn extract_phone_from_jid(jid: &str) -> String {
    let user = jid.replacen(JID_SUFFIX, "", 1).replacen(LEGACY_JID_SUFFIX, "", 1);
    if !user.is_empty() && user.chars().all(|c| c.is_ascii_digit()) {
        format!("+{}", user)
    } else {
        user
    }
}

/// Display form `+DD DDD DDD DDDD` of the first twelve digits.
///
/// Shorter inputs are returned as `+digits` without grouping.
pub fn format_grouped(digits: &str) -> String {
    let all_digits = digits.chars().all(|c| c.is_ascii_digit());
    if digits.len() < 12 || !all_digits {
        return format!("+{}", digits);
    }
    format!(
        "+{} {} {} {}{}",
        &digits[0..2],
        &digits[2..5],
        &digits[5..8],
        &digits[8..12],
        &digits[12..]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_formats() {
        let nl = parse_phone_number("+31 6 12345678");
        assert!(nl.is_valid);
        assert_eq!(nl.country_code.as_deref(), Some("31"));
        assert_eq!(nl.national_number, "612345678");
        assert_eq!(nl.formatted, "+31612345678");
        assert_eq!(nl.country, Some("Netherlands"));

        let us = parse_phone_number("+1 555 123 4567");
        assert!(us.is_valid);
        assert_eq!(us.formatted, "+15551234567");

        let uk = parse_phone_number("+44 20 7946 0958");
        assert!(uk.is_valid);
        assert_eq!(uk.country_code.as_deref(), Some("44"));
    }

    #[test]
    fn prefers_longest_calling_code() {
        let mk = parse_phone_number("+389 79 340 766");
        assert_eq!(mk.country_code.as_deref(), Some("389"));
        assert_eq!(mk.national_number, "79340766");
        assert!(mk.is_valid);
    }

    #[test]
    fn bare_digits_and_double_zero_prefix() {
        let eg = parse_phone_number("201143515957");
        assert!(eg.is_valid);
        assert_eq!(eg.country_code.as_deref(), Some("20"));
        assert_eq!(eg.formatted, "+201143515957");

        let qa = parse_phone_number("00974 12345678");
        assert!(qa.is_valid);
        assert_eq!(qa.formatted, "+97412345678");
    }

    #[test]
    fn rejects_short_or_empty_input() {
        let bare = parse_phone_number("+974");
        assert!(!bare.is_valid);
        assert_eq!(bare.formatted, "+974");

        let short = parse_phone_number("12345");
        assert!(!short.is_valid);
        assert_eq!(short.formatted, "12345");

        assert!(!parse_phone_number("").is_valid);
        assert!(!is_valid_phone_number("not a number"));
    }

    #[test]
    fn wrong_length_for_known_country() {
        assert!(!is_valid_phone_number("+31 6 1234"));
    }

    #[test]
    fn jid_helpers() {
        assert_eq!(to_whatsapp_jid("+31 6 12345678"), "31612345678@s.whatsapp.net");
        assert_eq!(to_whatsapp_jid("12-34"), "1234@s.whatsapp.net");
        assert_eq!(extract_phone_from_jid("31612345678@s.whatsapp.net"), "+31612345678");
        assert_eq!(extract_phone_from_jid("31612345678@c.us"), "+31612345678");
        assert_eq!(extract_phone_from_jid("120363@g.us"), "120363@g.us");
    }

    #[test]
    fn clean_and_group() {
        assert_eq!(clean_digits("+31 (6) 123-45678"), "31612345678");
        assert_eq!(clean_digits("0031612345678"), "31612345678");
        assert_eq!(format_grouped("201143515957"), "+20 114 351 5957");
        assert_eq!(format_grouped("3161234567"), "+3161234567");
    }
}
