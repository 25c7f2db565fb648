//! Free-text normalization shared by the validator and the matcher

/// Maps common Latin accented characters to their ASCII base letter
pub fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'à' | 'á' | 'â' | 'ä' | 'ã' | 'å' => 'a',
            'À' | 'Á' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'A',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'î' | 'ï' | 'í' | 'ì' => 'i',
            'Î' | 'Ï' | 'Í' | 'Ì' => 'I',
            'ô' | 'ö' | 'ó' | 'ò' | 'õ' => 'o',
            'Ô' | 'Ö' | 'Ó' | 'Ò' | 'Õ' => 'O',
            'û' | 'ü' | 'ú' | 'ù' => 'u',
            'Û' | 'Ü' | 'Ú' | 'Ù' => 'U',
            'ç' => 'c',
            'Ç' => 'C',
            _ => c,
        })
        .collect()
}

/// Trims and collapses runs of whitespace into single spaces
pub fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalizes Latin-script Darja so spelling variants compare equal
///
/// Lowercases, then maps `ch` to `sh` and `ou` to `u` ("chouf" and "shuf"
/// both become "shuf").
pub fn normalize_free_text(input: &str) -> String {
    collapse_whitespace(&input.to_lowercase())
        .replace("ch", "sh")
        .replace("ou", "u")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_accents() {
        assert_eq!(fold_accents("Béjaïa"), "Bejaia");
        assert_eq!(fold_accents("Médéa"), "Medea");
        assert_eq!(fold_accents("plain"), "plain");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  a   b \t c  "), "a b c");
        assert_eq!(collapse_whitespace("   "), "");
    }

    #[test]
    fn test_normalize_free_text_darja_variants() {
        assert_eq!(normalize_free_text("Chouf"), "shuf");
        assert_eq!(normalize_free_text("shuf"), "shuf");
        assert_eq!(normalize_free_text("  Nheb   nchouf  "), "nheb nshuf");
    }
}
