use whatlang::Lang;

/// Blocks at or under this many characters are treated as noise.
pub const MIN_BLOCK_CHARS: usize = 5;

const KHMER_RATIO: f64 = 0.4;
const MIN_KHMER_CHARS: usize = 10;

/// Which bucket a text block lands in. `Unknown` blocks are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    English,
    Khmer,
    Unknown,
}

/// Raw verdict of a statistical detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    English,
    Khmer,
    /// Some other language, by ISO 639-3 code.
    Other(&'static str),
    /// The detector could not produce a verdict for this text.
    DetectorUnavailable,
}

/// Statistical language detection. Implementations must be deterministic.
pub trait LanguageDetector: Send + Sync {
    fn detect(&self, text: &str) -> Detection;
}

/// `whatlang` trigram detector. Has no random state, so output depends only on input.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhatlangDetector;

impl LanguageDetector for WhatlangDetector {
    fn detect(&self, text: &str) -> Detection {
        match whatlang::detect(text) {
            Some(info) => match info.lang() {
                Lang::Eng => Detection::English,
                Lang::Khm => Detection::Khmer,
                other => Detection::Other(other.code()),
            },
            None => Detection::DetectorUnavailable,
        }
    }
}

pub fn is_khmer_char(c: char) -> bool {
    ('\u{1780}'..='\u{17FF}').contains(&c)
}

/// True when Khmer characters make up at least 40% of the text and number at least 10.
pub fn is_mostly_khmer(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let khmer = text.chars().filter(|&c| is_khmer_char(c)).count();
    khmer >= MIN_KHMER_CHARS && (khmer as f64 / total as f64) >= KHMER_RATIO
}

/// Raw flattened text too short to be worth classifying.
pub fn is_noise(text: &str) -> bool {
    text.chars().count() <= MIN_BLOCK_CHARS
}

pub struct Classifier<D = WhatlangDetector> {
    detector: D,
}

impl Default for Classifier<WhatlangDetector> {
    fn default() -> Self {
        Self::new(WhatlangDetector)
    }
}

impl<D: LanguageDetector> Classifier<D> {
    pub fn new(detector: D) -> Self {
        Self { detector }
    }

    /// Classify a content block. Languages other than English/Khmer are
    /// stored as English; a detector with no verdict yields `Unknown`.
    pub fn classify(&self, text: &str) -> Classification {
        if is_mostly_khmer(text) {
            return Classification::Khmer;
        }
        match self.detector.detect(text) {
            Detection::English | Detection::Other(_) => Classification::English,
            Detection::Khmer => Classification::Khmer,
            Detection::DetectorUnavailable => Classification::Unknown,
        }
    }

    /// Like [`classify`](Self::classify), but other languages stay `Unknown`.
    /// Used for the synthesized post-info fragment.
    pub fn classify_strict(&self, text: &str) -> Classification {
        if is_mostly_khmer(text) {
            return Classification::Khmer;
        }
        match self.detector.detect(text) {
            Detection::English => Classification::English,
            Detection::Khmer => Classification::Khmer,
            Detection::Other(_) | Detection::DetectorUnavailable => Classification::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Detection);

    impl LanguageDetector for Fixed {
        fn detect(&self, _text: &str) -> Detection {
            self.0.clone()
        }
    }

    const KHMER: &str = "សាកលវិទ្យាល័យអាមេរិកាំងភ្នំពេញ";

    #[test]
    fn khmer_fast_path_ignores_detector() {
        for verdict in [
            Detection::English,
            Detection::Other("fra"),
            Detection::DetectorUnavailable,
        ] {
            let c = Classifier::new(Fixed(verdict));
            assert_eq!(c.classify(KHMER), Classification::Khmer);
            assert_eq!(c.classify_strict(KHMER), Classification::Khmer);
        }
    }

    #[test]
    fn khmer_ratio_threshold() {
        // 10 Khmer chars out of 25 total = 0.4
        let text = format!("{}{}", "ក".repeat(10), "a".repeat(15));
        assert!(is_mostly_khmer(&text));
        // 10 Khmer chars out of 26 total < 0.4
        let text = format!("{}{}", "ក".repeat(10), "a".repeat(16));
        assert!(!is_mostly_khmer(&text));
        // high ratio but fewer than 10 chars
        assert!(!is_mostly_khmer(&"ក".repeat(9)));
        assert!(!is_mostly_khmer(""));
    }

    #[test]
    fn other_languages_coerced_to_english() {
        let c = Classifier::new(Fixed(Detection::Other("deu")));
        assert_eq!(c.classify("Guten Morgen aus Berlin"), Classification::English);
        assert_eq!(c.classify_strict("Guten Morgen aus Berlin"), Classification::Unknown);
    }

    #[test]
    fn detector_unavailable_is_unknown() {
        let c = Classifier::new(Fixed(Detection::DetectorUnavailable));
        assert_eq!(c.classify("something here"), Classification::Unknown);
    }

    #[test]
    fn detector_khmer_verdict() {
        let c = Classifier::new(Fixed(Detection::Khmer));
        assert_eq!(c.classify("short ក"), Classification::Khmer);
    }

    #[test]
    fn whatlang_english_is_deterministic() {
        let c = Classifier::default();
        let text = "The American University of Phnom Penh welcomes new students to the campus this fall.";
        let first = c.classify(text);
        assert_eq!(first, Classification::English);
        for _ in 0..10 {
            assert_eq!(c.classify(text), first);
        }
    }

    #[test]
    fn noise_threshold() {
        assert!(is_noise("Hello"));
        assert!(!is_noise("Hello!"));
        assert!(is_noise("ក្ក្ក"));
    }
}
