//! Text normalization for recitation comparison
//!
//! Transcribed utterances and canonical verse text pass through the same
//! [`normalize`] function before they are compared. The steps run in a fixed
//! order:
//!
//! 1. Drop vocalization marks (harakat, tanween, shadda, sukun, dagger alef,
//!    Quranic annotation signs, tatweel) and generic combining marks.
//! 2. Fold interchangeable letter forms (hamza-carrying alefs, alef wasla,
//!    ta marbuta, alef maqsura, Persian kaf/yeh) to one canonical letter.
//! 3. Remove punctuation and collapse whitespace runs.
//! 4. Lower-case scripts that have case.
//!
//! The result is idempotent: `normalize(&normalize(x)) == normalize(x)`.

/// Normalize raw text into its comparable form.
///
/// Total: never fails. Empty or punctuation-only input yields `""`.
pub fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !is_vocalization_mark(*c))
        .map(fold_letter_variant)
        .map(|c| if c.is_whitespace() { ' ' } else { c })
        .filter(|c| is_kept(*c))
        .flat_map(char::to_lowercase)
        // `to_lowercase` may expand into a base letter plus a combining mark
        .filter(|c| is_kept(*c))
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize and split into word tokens.
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(' ')
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

fn is_kept(c: char) -> bool {
    c == ' ' || (c.is_alphanumeric() && !is_vocalization_mark(c))
}

/// Marks a speech-to-text system does not reproduce reliably
fn is_vocalization_mark(c: char) -> bool {
    matches!(c,
        '\u{0300}'..='\u{036F}'   // generic combining diacritics
        | '\u{0610}'..='\u{061A}' // honorific and small high signs
        | '\u{064B}'..='\u{065F}' // tanween, harakat, shadda, sukun
        | '\u{0670}'              // superscript (dagger) alef
        | '\u{06D6}'..='\u{06ED}' // Quranic annotation and pause marks
        | '\u{08D3}'..='\u{08FF}' // extended Arabic marks
        | '\u{0640}'              // tatweel
    )
}

fn fold_letter_variant(c: char) -> char {
    match c {
        'أ' | 'إ' | 'آ' | 'ٱ' | 'ٲ' | 'ٳ' => 'ا',
        'ة' => 'ه',
        'ى' | 'ی' | 'ئ' => 'ي',
        'ؤ' => 'و',
        'ک' => 'ك',
        _ => c,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "   ",
        "بِسْمِ ٱللَّهِ ٱلرَّحْمَٰنِ ٱلرَّحِيمِ",
        "الحمد لله رب العالمين",
        "إِيَّاكَ نَعْبُدُ وَإِيَّاكَ نَسْتَعِينُ ۝",
        "قُلْ هُوَ ٱللَّهُ أَحَدٌ، ٱللَّهُ ٱلصَّمَدُ؟",
        "ـــالله ـــ",
        "Hello,   WORLD!!  ",
        "İstanbul Straße",
        "مؤمنة مسئول على",
        "١٢٣ 456",
        "\t\nمرحبا\u{200C}بالعالم\r\n",
        "!!!???...",
    ];

    #[test]
    fn test_strips_vocalization_marks() {
        assert_eq!(
            normalize("بِسْمِ ٱللَّهِ ٱلرَّحْمَٰنِ ٱلرَّحِيمِ"),
            "بسم الله الرحمن الرحيم"
        );
    }

    #[test]
    fn test_folds_letter_variants() {
        assert_eq!(normalize("أحمد إبراهيم آمن"), "احمد ابراهيم امن");
        assert_eq!(normalize("رحمة"), "رحمه");
        assert_eq!(normalize("على"), "علي");
        assert_eq!(normalize("مؤمن"), "مومن");
    }

    #[test]
    fn test_strips_punctuation_and_collapses_whitespace() {
        assert_eq!(normalize("  قل ،  هو ؟ الله!  "), "قل هو الله");
        assert_eq!(normalize("Hello,   WORLD!!  "), "hello world");
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \t\n"), "");
        assert_eq!(normalize("!!!???..."), "");
    }

    #[test]
    fn test_lowercases_cased_scripts() {
        assert_eq!(normalize("ABC def"), "abc def");
        // Dotted capital I lowercases to i plus a combining dot
        assert_eq!(normalize("İ"), "i");
    }

    #[test]
    fn test_idempotent_over_samples() {
        for sample in SAMPLES {
            let once = normalize(sample);
            let twice = normalize(&once);
            assert_eq!(once, twice, "normalize not idempotent for {:?}", sample);
        }
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("بِسْمِ ٱللَّهِ"),
            vec!["بسم".to_string(), "الله".to_string()]
        );
        assert!(tokenize("  ،  ").is_empty());
    }
}
