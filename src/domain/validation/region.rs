//! Algerian administrative regions (wilayas)

use super::text::fold_accents;

/// Number of valid region codes, `01` through `58`
pub const REGION_COUNT: u32 = 58;

/// Region names indexed by `code - 1`
pub const WILAYAS: [&str; REGION_COUNT as usize] = [
    "Adrar",
    "Chlef",
    "Laghouat",
    "Oum El Bouaghi",
    "Batna",
    "Béjaïa",
    "Biskra",
    "Béchar",
    "Blida",
    "Bouira",
    "Tamanrasset",
    "Tébessa",
    "Tlemcen",
    "Tiaret",
    "Tizi Ouzou",
    "Alger",
    "Djelfa",
    "Jijel",
    "Sétif",
    "Saïda",
    "Skikda",
    "Sidi Bel Abbès",
    "Annaba",
    "Guelma",
    "Constantine",
    "Médéa",
    "Mostaganem",
    "M'Sila",
    "Mascara",
    "Ouargla",
    "Oran",
    "El Bayadh",
    "Illizi",
    "Bordj Bou Arréridj",
    "Boumerdès",
    "El Tarf",
    "Tindouf",
    "Tissemsilt",
    "El Oued",
    "Khenchela",
    "Souk Ahras",
    "Tipaza",
    "Mila",
    "Aïn Defla",
    "Naâma",
    "Aïn Témouchent",
    "Ghardaïa",
    "Relizane",
    "Timimoun",
    "Bordj Badji Mokhtar",
    "Ouled Djellal",
    "Béni Abbès",
    "In Salah",
    "In Guezzam",
    "Touggourt",
    "Djanet",
    "El M'Ghair",
    "El Meniaa",
];

/// Result of parsing a region reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionLookup {
    /// Canonical two-digit code
    Valid(String),
    /// Numeric but outside `1..=58`
    OutOfRange(u32),
    /// Neither a number nor a known name
    Unknown,
}

/// Resolves a code (`"16"`, `"9"`, `"09"`) or a name (`"Alger"`, `"bejaia"`)
pub fn lookup_region(raw: &str) -> RegionLookup {
    let trimmed = raw.trim();

    if !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return match trimmed.parse::<u32>() {
            Ok(code) if (1..=REGION_COUNT).contains(&code) => {
                RegionLookup::Valid(format!("{:02}", code))
            }
            Ok(code) => RegionLookup::OutOfRange(code),
            Err(_) => RegionLookup::OutOfRange(u32::MAX),
        };
    }

    let wanted = name_key(trimmed);

    if wanted.is_empty() {
        return RegionLookup::Unknown;
    }

    // "Algiers" is the common English name for Alger
    if wanted == "algiers" {
        return RegionLookup::Valid("16".to_string());
    }

    WILAYAS
        .iter()
        .position(|name| name_key(name) == wanted)
        .map(|index| RegionLookup::Valid(format!("{:02}", index + 1)))
        .unwrap_or(RegionLookup::Unknown)
}

/// Returns the display name for a canonical code
pub fn region_name(code: &str) -> Option<&'static str> {
    let index = code.parse::<usize>().ok()?;

    if index == 0 {
        return None;
    }

    WILAYAS.get(index - 1).copied()
}

fn name_key(name: &str) -> String {
    fold_accents(name)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_normalized_to_two_digits() {
        assert_eq!(lookup_region("16"), RegionLookup::Valid("16".to_string()));
        assert_eq!(lookup_region("9"), RegionLookup::Valid("09".to_string()));
        assert_eq!(lookup_region(" 01 "), RegionLookup::Valid("01".to_string()));
        assert_eq!(lookup_region("58"), RegionLookup::Valid("58".to_string()));
    }

    #[test]
    fn test_out_of_range_codes() {
        assert_eq!(lookup_region("99"), RegionLookup::OutOfRange(99));
        assert_eq!(lookup_region("0"), RegionLookup::OutOfRange(0));
        assert_eq!(lookup_region("59"), RegionLookup::OutOfRange(59));
    }

    #[test]
    fn test_names_resolve_case_and_accent_insensitively() {
        assert_eq!(lookup_region("Alger"), RegionLookup::Valid("16".to_string()));
        assert_eq!(lookup_region("algiers"), RegionLookup::Valid("16".to_string()));
        assert_eq!(lookup_region("bejaia"), RegionLookup::Valid("06".to_string()));
        assert_eq!(lookup_region("Sidi bel abbes"), RegionLookup::Valid("22".to_string()));
        assert_eq!(lookup_region("M'Sila"), RegionLookup::Valid("28".to_string()));
    }

    #[test]
    fn test_unknown_names() {
        assert_eq!(lookup_region("Paris"), RegionLookup::Unknown);
        assert_eq!(lookup_region(""), RegionLookup::Unknown);
    }

    #[test]
    fn test_region_name() {
        assert_eq!(region_name("16"), Some("Alger"));
        assert_eq!(region_name("31"), Some("Oran"));
        assert_eq!(region_name("00"), None);
        assert_eq!(region_name("99"), None);
    }
}
