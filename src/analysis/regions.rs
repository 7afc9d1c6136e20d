//! Mapping from federative-unit abbreviations to the five macro-regions.

/// Returns the macro-region of a UF abbreviation, or `None` when the input
/// is not one of the 26 states or the federal district.
pub fn region_of(uf: &str) -> Option<&'static str> {
    match uf.trim().to_ascii_uppercase().as_str() {
        "AC" | "AP" | "AM" | "PA" | "RO" | "RR" | "TO" => Some("Norte"),
        "AL" | "BA" | "CE" | "MA" | "PB" | "PE" | "PI" | "RN" | "SE" => Some("Nordeste"),
        "DF" | "GO" | "MT" | "MS" => Some("Centro-Oeste"),
        "ES" | "MG" | "RJ" | "SP" => Some("Sudeste"),
        "PR" | "RS" | "SC" => Some("Sul"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::region_of;

    #[test]
    fn every_region_is_reachable() {
        assert_eq!(region_of("AM"), Some("Norte"));
        assert_eq!(region_of("BA"), Some("Nordeste"));
        assert_eq!(region_of("DF"), Some("Centro-Oeste"));
        assert_eq!(region_of("SP"), Some("Sudeste"));
        assert_eq!(region_of("SC"), Some("Sul"));
    }

    #[test]
    fn input_is_trimmed_and_case_folded() {
        assert_eq!(region_of(" sp "), Some("Sudeste"));
        assert_eq!(region_of("rs"), Some("Sul"));
    }

    #[test]
    fn unknown_ufs_have_no_region() {
        assert_eq!(region_of("ZZ"), None);
        assert_eq!(region_of(""), None);
    }
}
