use std::collections::BTreeMap;

use rand::seq::IteratorRandom;
use strum::{Display, EnumIter, IntoEnumIterator};
use thiserror::Error;

const FEMALE_VOICES: &[&str] = &[
    "achernar",
    "aoede",
    "autonoe",
    "callirrhoe",
    "despina",
    "erinome",
    "gacrux",
    "kore",
    "laomedeia",
    "leda",
    "pulcherrima",
    "sulafat",
    "vindemiatrix",
    "zephyr",
];

const MALE_VOICES: &[&str] = &[
    "achird",
    "algenib",
    "algieba",
    "alnilam",
    "charon",
    "enceladus",
    "fenrir",
    "iapetus",
    "orus",
    "puck",
    "rasalgethi",
    "sadachbia",
    "sadaltager",
    "schedar",
    "umbriel",
    "zubenelgenubi",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumIter)]
pub enum VoiceCategory {
    Female,
    Male,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum VoiceError {
    #[error("voice name must not be empty")]
    Empty,
}

/// Prebuilt voices accepted by the Gemini TTS models. Lookups are
/// case-insensitive; names are stored lower-case.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    voices: BTreeMap<String, VoiceCategory>,
}

impl Default for VoiceCatalog {
    fn default() -> Self {
        Self::gemini()
    }
}

impl VoiceCatalog {
    pub fn gemini() -> Self {
        let female = FEMALE_VOICES.iter().map(|v| (*v, VoiceCategory::Female));
        let male = MALE_VOICES.iter().map(|v| (*v, VoiceCategory::Male));
        Self::from_entries(female.chain(male))
    }

    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a str, VoiceCategory)>) -> Self {
        let voices = entries
            .into_iter()
            .map(|(name, category)| (name.to_lowercase(), category))
            .collect();
        Self { voices }
    }

    pub fn is_valid(&self, name: &str) -> bool {
        self.voices.contains_key(&name.to_lowercase())
    }

    pub fn category_of(&self, name: &str) -> Option<VoiceCategory> {
        self.voices.get(&name.to_lowercase()).copied()
    }

    /// Picks a voice uniformly at random from the thread-local RNG.
    pub fn pick_random(&self) -> Option<&str> {
        self.voices
            .keys()
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
    }

    /// Voices in `category`, sorted alphabetically.
    pub fn voices(&self, category: VoiceCategory) -> Vec<&str> {
        self.voices
            .iter()
            .filter(|(_, c)| **c == category)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn categories(&self) -> impl Iterator<Item = VoiceCategory> {
        VoiceCategory::iter()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

/// Formats a voice id the way the API expects it: first character
/// upper-case, the rest lower-case.
pub fn capitalize_voice(name: &str) -> Result<String, VoiceError> {
    let mut chars = name.chars();
    let first = chars.next().ok_or(VoiceError::Empty)?;
    Ok(first
        .to_uppercase()
        .chain(chars.as_str().to_lowercase().chars())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let catalog = VoiceCatalog::gemini();
        assert!(catalog.is_valid("zephyr"));
        assert!(catalog.is_valid("ZEPHYR"));
        assert!(catalog.is_valid("Puck"));
        assert!(!catalog.is_valid("nobody"));
        assert!(!catalog.is_valid(""));
    }

    #[test]
    fn test_category_of() {
        let catalog = VoiceCatalog::gemini();
        assert_eq!(catalog.category_of("Kore"), Some(VoiceCategory::Female));
        assert_eq!(catalog.category_of("charon"), Some(VoiceCategory::Male));
        assert_eq!(catalog.category_of("nobody"), None);
    }

    #[test]
    fn test_categories_are_disjoint_and_complete() {
        let catalog = VoiceCatalog::gemini();
        let female: HashSet<_> = catalog.voices(VoiceCategory::Female).into_iter().collect();
        let male: HashSet<_> = catalog.voices(VoiceCategory::Male).into_iter().collect();

        assert!(female.is_disjoint(&male));
        assert_eq!(female.len(), FEMALE_VOICES.len());
        assert_eq!(male.len(), MALE_VOICES.len());
        assert_eq!(catalog.len(), female.len() + male.len());
    }

    #[test]
    fn test_voices_are_sorted() {
        let catalog = VoiceCatalog::gemini();
        let female = catalog.voices(VoiceCategory::Female);
        let mut sorted = female.clone();
        sorted.sort();
        assert_eq!(female, sorted);
    }

    #[test]
    fn test_pick_random_returns_member() {
        let catalog = VoiceCatalog::gemini();
        for _ in 0..50 {
            let voice = catalog.pick_random().unwrap();
            assert!(catalog.is_valid(voice));
        }
    }

    #[test]
    fn test_pick_random_on_empty_catalog() {
        let catalog = VoiceCatalog::from_entries(std::iter::empty());
        assert!(catalog.is_empty());
        assert_eq!(catalog.pick_random(), None);
    }

    #[test]
    fn test_capitalize_voice() {
        assert_eq!(capitalize_voice("zephyr").unwrap(), "Zephyr");
        assert_eq!(capitalize_voice("AUTONOE").unwrap(), "Autonoe");
        assert_eq!(capitalize_voice("pUcK").unwrap(), "Puck");
        assert_eq!(capitalize_voice("a").unwrap(), "A");
        assert_eq!(capitalize_voice(""), Err(VoiceError::Empty));
    }

    #[test]
    fn test_capitalize_every_catalog_voice() {
        let catalog = VoiceCatalog::gemini();
        for category in catalog.categories() {
            for voice in catalog.voices(category) {
                let capitalized = capitalize_voice(&voice.to_uppercase()).unwrap();
                assert_eq!(capitalized[1..], voice[1..]);
                assert!(capitalized.chars().next().unwrap().is_uppercase());
            }
        }
    }
}
