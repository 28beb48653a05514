//! Wordlist-driven status phrases for posting plugins

use rand::Rng;
use rand::seq::SliceRandom;
use serde::Deserialize;

/// Word choices keyed by state direction
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StateWords {
    pub open: Vec<String>,
    pub closed: Vec<String>,
}

impl StateWords {
    fn for_state(&self, open: bool) -> &[String] {
        if open { &self.open } else { &self.closed }
    }
}

/// Configurable word pool for status messages
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Wordlist {
    pub name: Vec<String>,
    pub verb: Vec<String>,
    pub state: StateWords,
    pub adjective: StateWords,
}

impl Default for Wordlist {
    fn default() -> Self {
        Self {
            name: vec!["The space".to_string()],
            verb: vec!["is".to_string()],
            state: StateWords {
                open: vec!["open".to_string()],
                closed: vec!["closed".to_string()],
            },
            adjective: StateWords::default(),
        }
    }
}

/// Build a status phrase like `"The space is open. Splendid!"`.
///
/// Picks one name, verb and state word at random, then with 50%
/// probability appends a capitalized adjective for the new state (only
/// when that list is non-empty). Returns `None` when the wordlist has
/// no name, verb or state word to choose from.
pub fn build_phrase(words: &Wordlist, open: bool, rng: &mut impl Rng) -> Option<String> {
    let name = words.name.choose(rng)?;
    let verb = words.verb.choose(rng)?;
    let state = words.state.for_state(open).choose(rng)?;

    let mut phrase = format!("{name} {verb} {state}. ");

    if rng.gen_bool(0.5)
        && let Some(adjective) = words.adjective.for_state(open).choose(rng)
    {
        phrase.push_str(&title_case(adjective));
        phrase.push('!');
    }

    Some(phrase.trim_end().to_string())
}

/// Capitalize the first letter of every word, lowercasing the rest.
fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_choice_wordlist() -> Wordlist {
        Wordlist {
            name: vec!["The space".into()],
            verb: vec!["is".into()],
            state: StateWords {
                open: vec!["open".into()],
                closed: vec!["closed".into()],
            },
            adjective: StateWords {
                open: vec!["great".into()],
                closed: vec!["sad".into()],
            },
        }
    }

    #[test]
    fn test_phrase_structure() {
        let words = single_choice_wordlist();
        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            let phrase = build_phrase(&words, true, &mut rng).unwrap();
            assert!(phrase.starts_with("The space is open."));
            assert!(phrase == "The space is open." || phrase == "The space is open. Great!");
        }
    }

    #[test]
    fn test_closed_state_uses_closed_words() {
        let words = single_choice_wordlist();
        let mut rng = rand::thread_rng();

        let phrase = build_phrase(&words, false, &mut rng).unwrap();
        assert!(phrase.starts_with("The space is closed."));
    }

    #[test]
    fn test_adjective_appears_sometimes() {
        let words = single_choice_wordlist();
        let mut rng = rand::thread_rng();

        let phrases: Vec<String> = (0..200)
            .map(|_| build_phrase(&words, true, &mut rng).unwrap())
            .collect();
        assert!(phrases.iter().any(|p| p.ends_with("Great!")));
        assert!(phrases.iter().any(|p| p.ends_with("open.")));
    }

    #[test]
    fn test_empty_adjective_list_never_appends() {
        let words = Wordlist::default();
        let mut rng = rand::thread_rng();

        for _ in 0..50 {
            let phrase = build_phrase(&words, true, &mut rng).unwrap();
            assert_eq!(phrase, "The space is open.");
        }
    }

    #[test]
    fn test_empty_name_list_yields_none() {
        let words = Wordlist {
            name: Vec::new(),
            ..Wordlist::default()
        };
        assert!(build_phrase(&words, true, &mut rand::thread_rng()).is_none());
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("great"), "Great");
        assert_eq!(title_case("VERY NICE"), "Very Nice");
        assert_eq!(title_case("splendid indeed"), "Splendid Indeed");
    }

    #[test]
    fn test_wordlist_deserializes_from_partial_table() {
        let words: Wordlist = toml::from_str("verb = [\"was\"]").unwrap();
        assert_eq!(words.verb, vec!["was".to_string()]);
        // Unspecified fields fall back to their defaults
        assert_eq!(words.name, vec!["The space".to_string()]);
    }
}
