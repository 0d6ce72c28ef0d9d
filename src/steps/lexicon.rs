//! Offline entity recognizer.
//!
//! Tags festivals, Indian cities, community groups and date words from a built-in
//! lexicon (extensible from config), and marks the remaining content words as
//! nouns. Good enough for short campaign goals; swap in
//! [`LlmEntityRecognizer`](super::entities::LlmEntityRecognizer) for anything richer.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::LexiconExtensions;

use super::entities::{Annotation, EntityRecognizer, NamedEntity, PartOfSpeech, RecognizerError, Token};

static WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9][A-Za-z0-9'&%-]*").expect("word regex"));

static YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(19|20)\d\d$").expect("year regex"));

const EVENTS: &[&str] = &[
    "diwali", "deepavali", "holi", "navratri", "dussehra", "durga puja", "ganesh chaturthi",
    "ganeshotsav", "eid", "eid al-fitr", "christmas", "new year", "onam", "pongal",
    "makar sankranti", "raksha bandhan", "janmashtami", "gudi padwa", "lohri", "baisakhi",
    "karva chauth", "valentine's day", "black friday", "independence day", "republic day",
];

const LOCATIONS: &[&str] = &[
    "india", "mumbai", "pune", "delhi", "new delhi", "bangalore", "bengaluru", "chennai",
    "hyderabad", "kolkata", "ahmedabad", "jaipur", "lucknow", "surat", "nagpur", "indore",
    "bhopal", "chandigarh", "kochi", "goa", "noida", "gurgaon", "gurugram", "thane", "nashik",
    "maharashtra", "karnataka", "kerala", "gujarat", "tamil nadu",
];

const GROUPS: &[&str] = &[
    "indian", "marathi", "gujarati", "punjabi", "tamil", "bengali", "hindu", "muslim",
    "christian", "sikh", "jain", "parsi",
];

const DATES: &[&str] = &[
    "today", "tomorrow", "weekend", "weekends", "this weekend", "this week", "next week",
    "this month", "next month", "monday", "tuesday", "wednesday", "thursday", "friday",
    "saturday", "sunday", "january", "february", "march", "april", "may", "june", "july",
    "august", "september", "october", "november", "december",
];

const TIMES: &[&str] = &["tonight", "morning", "evening", "afternoon", "night"];

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "again", "all", "also", "am", "an", "and", "any", "are", "around",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "could", "did", "do", "does", "doing", "down", "during", "each", "either",
    "enough", "even", "every", "few", "for", "from", "further", "had", "has", "have", "having",
    "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in", "into", "is", "it", "its",
    "just", "least", "less", "many", "me", "more", "most", "much", "must", "my", "near", "no",
    "nor", "not", "now", "of", "off", "on", "once", "only", "or", "other", "our", "ours", "out",
    "over", "own", "per", "please", "same", "she", "should", "so", "some", "such", "than",
    "that", "the", "their", "them", "then", "there", "these", "they", "this", "those",
    "through", "to", "too", "under", "until", "up", "upon", "us", "very", "via", "was", "we",
    "well", "were", "what", "when", "where", "which", "while", "who", "whom", "why", "will",
    "with", "within", "without", "would", "you", "your", "yours",
];

/// Common verbs and adjectives in campaign goals.
const NON_NOUNS: &[&str] = &[
    "attract", "boost", "bring", "build", "buy", "drive", "get", "grow", "improve", "increase",
    "launch", "make", "need", "promote", "run", "want", "big", "best", "exclusive", "festive",
    "grand", "great", "local", "new", "special", "upcoming", "free", "nearby",
];

struct WordSpan<'a> {
    text: &'a str,
    lower: String,
    start: usize,
    end: usize,
    sentence_start: bool,
}

fn split_words(text: &str) -> Vec<WordSpan<'_>> {
    let mut words = Vec::new();
    let mut last_end = 0;
    for m in WORD.find_iter(text) {
        let raw = m.as_str().trim_end_matches(['\'', '-', '&']);
        if raw.is_empty() {
            continue;
        }
        let between = &text[last_end..m.start()];
        let sentence_start = words.is_empty() || between.contains(['.', '!', '?']);
        words.push(WordSpan {
            text: raw,
            lower: raw.to_lowercase(),
            start: m.start(),
            end: m.start() + raw.len(),
            sentence_start,
        });
        last_end = m.end();
    }
    words
}

fn lemmatize(lower: &str) -> String {
    let n = lower.len();
    if n > 4 && lower.ends_with("ies") {
        format!("{}y", &lower[..n - 3])
    } else if ["sses", "ches", "shes", "xes"].iter().any(|s| lower.ends_with(s)) {
        lower[..n - 2].to_string()
    } else if n > 3
        && lower.ends_with('s')
        && !["ss", "us", "is"].iter().any(|s| lower.ends_with(s))
    {
        lower[..n - 1].to_string()
    } else {
        lower.to_string()
    }
}

pub struct LexiconRecognizer {
    phrases: HashMap<String, &'static str>,
    longest: usize,
    stop_words: HashSet<&'static str>,
}

impl Default for LexiconRecognizer {
    fn default() -> Self {
        Self::new(&LexiconExtensions::default())
    }
}

impl LexiconRecognizer {
    pub fn new(extra: &LexiconExtensions) -> Self {
        let mut phrases = HashMap::new();
        let built_in: [(&[&str], &'static str); 5] = [
            (EVENTS, "EVENT"),
            (LOCATIONS, "GPE"),
            (GROUPS, "NORP"),
            (DATES, "DATE"),
            (TIMES, "TIME"),
        ];
        for (words, label) in built_in {
            for w in words {
                phrases.insert(w.to_string(), label);
            }
        }
        let configured: [(&Vec<String>, &'static str); 5] = [
            (&extra.events, "EVENT"),
            (&extra.locations, "GPE"),
            (&extra.products, "PRODUCT"),
            (&extra.audience_groups, "NORP"),
            (&extra.orgs, "ORG"),
        ];
        for (words, label) in configured {
            for w in words {
                let key = w.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
                if !key.is_empty() {
                    phrases.insert(key, label);
                }
            }
        }
        let longest = phrases
            .keys()
            .map(|k| k.split(' ').count())
            .max()
            .unwrap_or(1);

        Self {
            phrases,
            longest,
            stop_words: STOP_WORDS.iter().copied().collect(),
        }
    }

    /// Longest lexicon phrase starting at `i`: (word count, label).
    fn match_at(&self, words: &[WordSpan<'_>], i: usize) -> Option<(usize, &'static str)> {
        let max = self.longest.min(words.len() - i);
        (1..=max).rev().find_map(|n| {
            let key = words[i..i + n]
                .iter()
                .map(|w| w.lower.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            self.phrases.get(&key).map(|label| (n, *label))
        })
    }

    fn classify(&self, word: &WordSpan<'_>) -> PartOfSpeech {
        let lower = word.lower.as_str();
        if self.stop_words.contains(lower) || NON_NOUNS.contains(&lower) || lower.ends_with("ly") {
            return PartOfSpeech::Other;
        }
        if lower.contains('%') {
            return PartOfSpeech::Noun;
        }
        if lower.chars().all(|c| c.is_ascii_digit()) {
            return PartOfSpeech::Other;
        }
        let capitalized = word.text.chars().next().is_some_and(char::is_uppercase);
        if capitalized && !word.sentence_start {
            PartOfSpeech::ProperNoun
        } else {
            PartOfSpeech::Noun
        }
    }

    pub fn annotate_text(&self, text: &str) -> Annotation {
        let words = split_words(text);
        let mut annotation = Annotation::default();
        let mut i = 0;

        while i < words.len() {
            let matched = self.match_at(&words, i).or_else(|| {
                YEAR.is_match(&words[i].lower).then_some((1, "DATE"))
            });
            if let Some((n, label)) = matched {
                let span = &text[words[i].start..words[i + n - 1].end];
                annotation.entities.push(NamedEntity::new(span, label));
                for w in &words[i..i + n] {
                    annotation.tokens.push(Token {
                        text: w.text.to_string(),
                        lemma: w.lower.clone(),
                        pos: PartOfSpeech::ProperNoun,
                        is_stop: false,
                        in_entity: true,
                    });
                }
                i += n;
                continue;
            }

            let word = &words[i];
            let pos = self.classify(word);
            let lemma = match pos {
                PartOfSpeech::ProperNoun => word.text.to_string(),
                _ => lemmatize(&word.lower),
            };
            annotation.tokens.push(Token {
                text: word.text.to_string(),
                lemma,
                pos,
                is_stop: self.stop_words.contains(word.lower.as_str()),
                in_entity: false,
            });
            i += 1;
        }

        annotation
    }
}

#[async_trait]
impl EntityRecognizer for LexiconRecognizer {
    async fn annotate(&self, text: &str) -> Result<Annotation, RecognizerError> {
        Ok(self.annotate_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::entities::categorize;

    #[test]
    fn festival_goal_yields_event_and_offer_keywords() {
        let b = categorize(&LexiconRecognizer::default().annotate_text("Diwali discount sale"));
        assert_eq!(b.events, vec!["diwali"]);
        assert_eq!(b.misc_keywords, vec!["discount", "sale"]);
        assert_eq!(
            b.offer_terms,
            Some(vec!["discount".to_string(), "sale".to_string()])
        );
    }

    #[test]
    fn multiword_phrases_match_longest_first() {
        let r = LexiconRecognizer::default();
        let a = r.annotate_text("Ganesh Chaturthi offers for students in New Delhi this weekend");
        let labels: Vec<_> = a
            .entities
            .iter()
            .map(|e| (e.text.as_str(), e.label.as_str()))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("Ganesh Chaturthi", "EVENT"),
                ("New Delhi", "GPE"),
                ("this weekend", "DATE"),
            ]
        );
        let b = categorize(&a);
        assert_eq!(b.misc_keywords, vec!["offer", "student"]);
        assert_eq!(b.offer_terms, Some(vec!["offers".to_string()]));
    }

    #[test]
    fn verbs_stop_words_and_numbers_are_not_keywords() {
        let b = categorize(
            &LexiconRecognizer::default().annotate_text("Increase the footfall by 200 in 2025"),
        );
        assert_eq!(b.misc_keywords, vec!["footfall"]);
        assert_eq!(b.dates_times, vec!["2025"]);
    }

    #[test]
    fn percent_tokens_count_as_offers() {
        let b = categorize(&LexiconRecognizer::default().annotate_text("Flat 20% off on lattes"));
        assert!(b.misc_keywords.contains(&"20%".to_string()));
        assert!(b.misc_keywords.contains(&"latte".to_string()));
        assert_eq!(b.offer_terms, Some(vec!["20%".to_string()]));
    }

    #[test]
    fn config_extensions_add_products_and_orgs() {
        let extra = LexiconExtensions {
            products: vec!["Cold Brew".into()],
            orgs: vec!["Zomato".into()],
            ..Default::default()
        };
        let b = categorize(
            &LexiconRecognizer::new(&extra).annotate_text("Promote cold brew on Zomato"),
        );
        assert_eq!(b.products_services, vec!["cold brew"]);
        assert_eq!(b.orgs, vec!["zomato"]);
        assert!(b.misc_keywords.is_empty());
    }

    #[test]
    fn capitalized_mid_sentence_words_are_proper_nouns() {
        let a = LexiconRecognizer::default().annotate_text("Launch at Phoenix Mall");
        let phoenix = a.tokens.iter().find(|t| t.text == "Phoenix").unwrap();
        assert_eq!(phoenix.pos, PartOfSpeech::ProperNoun);
        let launch = a.tokens.iter().find(|t| t.text == "Launch").unwrap();
        assert_eq!(launch.pos, PartOfSpeech::Other);
    }

    #[test]
    fn lemmatizer_handles_common_plurals() {
        assert_eq!(lemmatize("cookies"), "cooky");
        assert_eq!(lemmatize("boxes"), "box");
        assert_eq!(lemmatize("sales"), "sale");
        assert_eq!(lemmatize("business"), "business");
        assert_eq!(lemmatize("bus"), "bus");
    }
}
