// Text normalization pipeline - canonicalizes chat text before matching.
//
// Evasion tricks this pipeline folds away: mixed case, accents, leetspeak
// digits/symbols, Cyrillic look-alikes, separator stuffing, and stretched
// letters ("heeeey"). Stage order is a contract: patterns are compiled
// against the output of this exact sequence, so reordering stages changes
// what the stores detect.
//
// NO I/O here - a pure string -> string function plus its configuration.

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Leetspeak substitutions, looked up case-insensitively per character.
const LEET_MAP: [(char, char); 10] = [
    ('0', 'o'),
    ('1', 'i'),
    ('3', 'e'),
    ('4', 'a'),
    ('5', 's'),
    ('7', 't'),
    ('@', 'a'),
    ('$', 's'),
    ('!', 'i'),
    ('|', 'i'),
];

/// Which normalization stages run, in the fixed pipeline order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    /// Master switch. When off, input passes through untouched.
    pub enabled: bool,
    pub case_fold: bool,
    /// NFD decomposition followed by deletion of combining marks.
    pub strip_diacritics: bool,
    pub leet_map: bool,
    pub strip_non_alphanumeric: bool,
    pub collapse_repeats: bool,
    pub transliterate_cyrillic: bool,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            case_fold: true,
            strip_diacritics: true,
            leet_map: true,
            strip_non_alphanumeric: true,
            collapse_repeats: true,
            transliterate_cyrillic: true,
        }
    }
}

/// Deterministic text canonicalizer shared by the pattern stores and the
/// moderation engine. Pure: identical input and config always produce
/// identical output.
pub struct Normalizer {
    config: NormalizeConfig,
}

impl Normalizer {
    pub fn new(config: NormalizeConfig) -> Self {
        Self { config }
    }

    /// Run every enabled stage over `input`, in pipeline order.
    pub fn normalize(&self, input: &str) -> String {
        if !self.config.enabled {
            return input.to_string();
        }
        let mut result = input.to_string();
        if self.config.case_fold {
            result = result.to_lowercase();
        }
        if self.config.strip_diacritics {
            result = result.nfd().filter(|c| !is_combining_mark(*c)).collect();
        }
        if self.config.leet_map {
            result = apply_leet_map(&result);
        }
        if self.config.transliterate_cyrillic {
            result = transliterate_cyrillic(&result);
        }
        if self.config.strip_non_alphanumeric {
            result.retain(char::is_alphanumeric);
        }
        if self.config.collapse_repeats {
            result = collapse_repeats(&result);
        }
        result
    }
}

fn apply_leet_map(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            let key = c.to_ascii_lowercase();
            LEET_MAP
                .iter()
                .find(|(from, _)| *from == key)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

fn collapse_repeats(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut last: Option<char> = None;
    for c in input.chars() {
        if last != Some(c) {
            out.push(c);
            last = Some(c);
        }
    }
    out
}

fn transliterate_cyrillic(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match cyrillic_to_latin(c) {
            Some(mapped) => out.push_str(mapped),
            None => out.push(c),
        }
    }
    out
}

/// Fixed per-character Russian-to-Latin table (BGN-style digraphs).
/// Both cases are mapped since case folding is independently toggleable.
fn cyrillic_to_latin(c: char) -> Option<&'static str> {
    Some(match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'е' => "e",
        'ё' => "e",
        'ж' => "zh",
        'з' => "z",
        'и' => "i",
        'й' => "y",
        'к' => "k",
        'л' => "l",
        'м' => "m",
        'н' => "n",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "kh",
        'ц' => "ts",
        'ч' => "ch",
        'ш' => "sh",
        'щ' => "shch",
        'ъ' => "",
        'ы' => "y",
        'ь' => "",
        'э' => "e",
        'ю' => "yu",
        'я' => "ya",
        'А' => "A",
        'Б' => "B",
        'В' => "V",
        'Г' => "G",
        'Д' => "D",
        'Е' => "E",
        'Ё' => "E",
        'Ж' => "Zh",
        'З' => "Z",
        'И' => "I",
        'Й' => "Y",
        'К' => "K",
        'Л' => "L",
        'М' => "M",
        'Н' => "N",
        'О' => "O",
        'П' => "P",
        'Р' => "R",
        'С' => "S",
        'Т' => "T",
        'У' => "U",
        'Ф' => "F",
        'Х' => "Kh",
        'Ц' => "Ts",
        'Ч' => "Ch",
        'Ш' => "Sh",
        'Щ' => "Shch",
        'Ъ' => "",
        'Ы' => "Y",
        'Ь' => "",
        'Э' => "E",
        'Ю' => "Yu",
        'Я' => "Ya",
        _ => return None,
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn full() -> Normalizer {
        Normalizer::new(NormalizeConfig::default())
    }

    /// All stage flags off except the ones enabled by `f`.
    fn only(f: impl FnOnce(&mut NormalizeConfig)) -> Normalizer {
        let mut config = NormalizeConfig {
            enabled: true,
            case_fold: false,
            strip_diacritics: false,
            leet_map: false,
            strip_non_alphanumeric: false,
            collapse_repeats: false,
            transliterate_cyrillic: false,
        };
        f(&mut config);
        Normalizer::new(config)
    }

    #[test]
    fn disabled_pipeline_passes_through() {
        let normalizer = Normalizer::new(NormalizeConfig {
            enabled: false,
            ..NormalizeConfig::default()
        });
        assert_eq!(normalizer.normalize("HeLLo!! Wörld"), "HeLLo!! Wörld");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(full().normalize(""), "");
    }

    #[test]
    fn case_fold_is_unicode_aware() {
        let normalizer = only(|c| c.case_fold = true);
        assert_eq!(normalizer.normalize("HeLLo ÄÖÜ"), "hello äöü");
    }

    #[test]
    fn diacritics_are_stripped_canonically() {
        let normalizer = only(|c| c.strip_diacritics = true);
        assert_eq!(normalizer.normalize("crème brûlée"), "creme brulee");
    }

    #[test]
    fn leet_substitutions_apply_per_character() {
        let normalizer = only(|c| c.leet_map = true);
        assert_eq!(normalizer.normalize("h3ll0 w0rld"), "hello world");
        assert_eq!(normalizer.normalize("b@d $!gn"), "bad sign");
        // unmapped digits pass through
        assert_eq!(normalizer.normalize("room 269"), "room 269");
    }

    #[test]
    fn cyrillic_transliterates_deterministically() {
        let normalizer = only(|c| c.transliterate_cyrillic = true);
        assert_eq!(normalizer.normalize("привет"), "privet");
        assert_eq!(normalizer.normalize("хорошо"), "khorosho");
    }

    #[test]
    fn strip_non_alphanumeric_deletes_rather_than_replaces() {
        let normalizer = only(|c| c.strip_non_alphanumeric = true);
        assert_eq!(normalizer.normalize("a b-c.d"), "abcd");
    }

    #[test]
    fn collapse_repeats_is_greedy_left_to_right() {
        let normalizer = only(|c| c.collapse_repeats = true);
        assert_eq!(normalizer.normalize("heeeey"), "hey");
        assert_eq!(normalizer.normalize("aabbaa"), "aba");

        let without = only(|_| {});
        assert_eq!(without.normalize("heeeey"), "heeeey");
    }

    #[test]
    fn stage_order_applies_leet_after_case_and_diacritics() {
        // Leet must see already-casefolded, diacritic-stripped text; the
        // Cyrillic stage then maps м, and strip/collapse leave the rest.
        assert_eq!(full().normalize("Ꭰ4мn"), "ꭰamn");
    }

    #[test]
    fn full_pipeline_folds_mixed_evasions() {
        assert_eq!(full().normalize("B-4-D w0rrrd"), "badword");
    }

    #[test]
    fn normalize_is_idempotent_on_canonical_text() {
        let normalizer = full();
        for input in ["hello", "B4DW0RD", "Приве-е-ет", "crème"] {
            let once = normalizer.normalize(input);
            assert_eq!(normalizer.normalize(&once), once);
        }
    }

    #[test]
    fn normalize_is_deterministic() {
        let normalizer = full();
        assert_eq!(
            normalizer.normalize("sP@мMy  t3xt"),
            normalizer.normalize("sP@мMy  t3xt")
        );
    }
}
