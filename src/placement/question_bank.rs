// src/placement/question_bank.rs

//! Curated lookup plus offline synthesis of multiple-choice questions.
//!
//! Lookup order for a requested language and difficulty:
//! 1. curated entries matching language and difficulty,
//! 2. curated entries matching the language only,
//! 3. items synthesized from the language's topic pool and the difficulty's
//!    phrasing templates.

use std::{collections::HashSet, fmt, path::Path};

use rand::{Rng, seq::SliceRandom};
use uuid::Uuid;

use crate::models::question::{BankEntry, Difficulty, QuestionItem};

#[derive(Debug)]
pub struct BankError(String);

impl fmt::Display for BankError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "question bank error: {}", self.0)
    }
}

impl std::error::Error for BankError {}

/// Topic pools used for synthesis, grouped by bucket.
const LANGUAGE_TOPICS: &[(&str, &[&[&str]])] = &[
    (
        "python",
        &[
            &["functions", "list comprehensions", "with statement"],
            &["classes", "generators", "context managers"],
            &["virtualenv", "pip", "pytest"],
        ],
    ),
    (
        "javascript",
        &[
            &["let/const", "arrow functions", "template literals"],
            &["closures", "prototype chain", "event loop"],
            &["npm", "ES modules", "fetch API"],
        ],
    ),
    (
        "go",
        &[
            &["goroutines", "channels", "defer"],
            &["interfaces", "struct embedding", "error handling"],
            &["go mod", "testing", "pprof"],
        ],
    ),
    (
        "java",
        &[
            &["classes", "generics", "streams"],
            &["JVM memory", "concurrency", "exceptions"],
            &["Maven/Gradle", "JUnit", "JDK tooling"],
        ],
    ),
];

/// Pool used for any language without its own entry.
const DEFAULT_POOL_LANGUAGE: &str = "python";

fn templates(difficulty: Difficulty) -> &'static [&'static str; 3] {
    match difficulty {
        Difficulty::Beginner => &[
            "In {lang}, what does {topic} typically refer to?",
            "Which option best describes {lang} {topic}?",
            "For a newcomer to {lang}, how is {topic} commonly used?",
        ],
        Difficulty::Intermediate => &[
            "When working with {lang} {topic}, which choice is most correct?",
            "What is a common pitfall when using {lang} {topic}?",
            "How do you idiomatically handle {topic} in {lang}?",
        ],
        Difficulty::Advanced => &[
            "What is a performance consideration for {lang} {topic}?",
            "How does {lang} handle {topic} under the hood?",
            "Which approach is recommended for production-grade {lang} {topic}?",
        ],
    }
}

/// Normalizes a client-supplied language key, resolving common aliases.
/// Blank input becomes "general".
pub fn normalize_language(raw: &str) -> String {
    let key = raw.trim().to_lowercase();
    let resolved = match key.as_str() {
        "" => "general",
        "js" | "node" | "nodejs" => "javascript",
        "py" | "python3" => "python",
        "golang" => "go",
        "c++" => "cpp",
        "c#" => "csharp",
        "ts" => "typescript",
        other => other,
    };
    resolved.to_string()
}

/// Human-readable label used inside question prompts.
pub fn language_label(language: &str) -> String {
    match language {
        "python" => "Python".to_string(),
        "javascript" => "JavaScript".to_string(),
        "typescript" => "TypeScript".to_string(),
        "go" => "Go".to_string(),
        "java" => "Java".to_string(),
        "cpp" => "C++".to_string(),
        "csharp" => "C#".to_string(),
        "" | "general" => "General".to_string(),
        other => other
            .split(['_', ' '])
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn topic_pool(language: &str) -> Vec<&'static str> {
    let buckets = LANGUAGE_TOPICS
        .iter()
        .find(|(lang, _)| *lang == language)
        .or_else(|| LANGUAGE_TOPICS.iter().find(|(lang, _)| *lang == DEFAULT_POOL_LANGUAGE))
        .map(|(_, buckets)| *buckets)
        .unwrap_or(&[]);

    let flat: Vec<&'static str> = buckets.iter().flat_map(|b| b.iter().copied()).collect();
    if flat.is_empty() {
        vec!["syntax", "tooling", "concepts"]
    } else {
        flat
    }
}

#[derive(Debug, Default)]
pub struct QuestionBank {
    entries: Vec<BankEntry>,
}

impl QuestionBank {
    pub fn new(entries: Vec<BankEntry>) -> Self {
        Self { entries }
    }

    /// Loads the curated dataset (a JSON array of entries).
    pub fn from_file(path: &Path) -> Result<Self, BankError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BankError(format!("{}: {}", path.display(), e)))?;
        let entries: Vec<BankEntry> = serde_json::from_str(&raw)
            .map_err(|e| BankError(format!("{}: {}", path.display(), e)))?;

        let valid: Vec<BankEntry> = entries
            .into_iter()
            .filter(|e| e.options.len() == 4 && e.options.contains(&e.correct_answer))
            .collect();

        Ok(Self::new(valid))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `count` fresh question items. Never fails: whatever the
    /// curated entries cannot cover is synthesized.
    pub fn fetch(
        &self,
        language: &str,
        difficulty: Difficulty,
        topic_hint: Option<&str>,
        count: usize,
    ) -> Vec<QuestionItem> {
        let language = normalize_language(language);
        let mut rng = rand::rng();

        let matches_language = |entry: &BankEntry| {
            language == "general" || normalize_language(&entry.language) == language
        };
        let entry_difficulty = |entry: &BankEntry| entry.difficulty.unwrap_or(Difficulty::Intermediate);

        let mut exact: Vec<&BankEntry> = self
            .entries
            .iter()
            .filter(|e| matches_language(e) && entry_difficulty(e) == difficulty)
            .collect();
        let mut language_only: Vec<&BankEntry> = self
            .entries
            .iter()
            .filter(|e| matches_language(e) && entry_difficulty(e) != difficulty)
            .collect();

        exact.shuffle(&mut rng);
        language_only.shuffle(&mut rng);

        // Entries on the hinted topic go first within each tier.
        if let Some(hint) = topic_hint {
            exact.sort_by_key(|e| !e.topic.eq_ignore_ascii_case(hint));
            language_only.sort_by_key(|e| !e.topic.eq_ignore_ascii_case(hint));
        }

        let mut items: Vec<QuestionItem> = exact
            .into_iter()
            .chain(language_only)
            .take(count)
            .map(|entry| QuestionItem {
                id: Uuid::new_v4().to_string(),
                prompt: entry.prompt.clone(),
                options: entry.options.clone(),
                correct_answer: entry.correct_answer.clone(),
                topic: entry.topic.trim().to_lowercase(),
                difficulty: entry_difficulty(entry),
                language: language.clone(),
            })
            .collect();

        if items.len() < count {
            let needed = count - items.len();
            let taken: HashSet<String> = items.iter().map(|i| i.prompt.clone()).collect();
            items.extend(synthesize(&language, difficulty, topic_hint, needed, taken, &mut rng));
        }

        items
    }
}

/// Builds items from the topic pool and phrasing templates. The correct
/// option is built from the same topic substituted into the prompt.
///
/// Each (topic, phrasing) pair is used at most once, and prompts already in
/// `taken` are skipped, so a batch never repeats a question. Returns fewer
/// than `count` items only when every pair is exhausted.
fn synthesize<R: Rng>(
    language: &str,
    difficulty: Difficulty,
    topic_hint: Option<&str>,
    count: usize,
    mut taken: HashSet<String>,
    rng: &mut R,
) -> Vec<QuestionItem> {
    let phrasing = templates(difficulty);
    let label = language_label(language);

    let mut hinted: Vec<(String, String)> = Vec::new();
    if let Some(hint) = topic_hint {
        for template in phrasing {
            hinted.push((hint.to_string(), render(template, &label, hint)));
        }
    }
    let mut general: Vec<(String, String)> = Vec::new();
    for topic in topic_pool(language) {
        for template in phrasing {
            general.push((topic.to_string(), render(template, &label, topic)));
        }
    }
    hinted.shuffle(rng);
    general.shuffle(rng);

    let mut hinted = hinted.into_iter();
    let mut general = general.into_iter();
    let mut items = Vec::with_capacity(count);

    while items.len() < count {
        // Every other item goes to the hinted topic while its phrasings last.
        let next = if items.len() % 2 == 0 {
            hinted.next().or_else(|| general.next())
        } else {
            general.next().or_else(|| hinted.next())
        };
        let Some((topic, prompt)) = next else {
            tracing::warn!(
                "Synthesis for {} ran out of distinct prompts after {} items",
                language,
                items.len()
            );
            break;
        };
        if !taken.insert(prompt.clone()) {
            continue;
        }

        let correct = format!("The idiomatic {} approach to {}", label, topic);
        let mut options = vec![
            correct.clone(),
            format!("A feature unrelated to {}", topic),
            format!("A deprecated workaround that avoids {}", topic),
            format!("Something {} only partially supports through {}", label, topic),
        ];
        options.shuffle(rng);

        items.push(QuestionItem {
            id: Uuid::new_v4().to_string(),
            prompt,
            options,
            correct_answer: correct,
            topic: topic.to_lowercase(),
            difficulty,
            language: language.to_string(),
        });
    }

    items
}

fn render(template: &str, label: &str, topic: &str) -> String {
    template.replace("{lang}", label).replace("{topic}", topic)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(prompt: &str, topic: &str, difficulty: Option<Difficulty>, language: &str) -> BankEntry {
        BankEntry {
            prompt: prompt.to_string(),
            options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
            correct_answer: "a".to_string(),
            topic: topic.to_string(),
            difficulty,
            language: language.to_string(),
        }
    }

    #[test]
    fn normalize_language_resolves_aliases() {
        assert_eq!(normalize_language(" JS "), "javascript");
        assert_eq!(normalize_language("golang"), "go");
        assert_eq!(normalize_language(""), "general");
        assert_eq!(normalize_language("Rust"), "rust");
    }

    #[test]
    fn language_label_title_cases_unknown_keys() {
        assert_eq!(language_label("javascript"), "JavaScript");
        assert_eq!(language_label("machine_learning"), "Machine Learning");
        assert_eq!(language_label("general"), "General");
    }

    #[test]
    fn curated_exact_matches_come_first() {
        let bank = QuestionBank::new(vec![
            entry("py beginner", "syntax", Some(Difficulty::Beginner), "python"),
            entry("py advanced", "async", Some(Difficulty::Advanced), "python"),
            entry("js beginner", "syntax", Some(Difficulty::Beginner), "javascript"),
        ]);

        let items = bank.fetch("py", Difficulty::Beginner, None, 2);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].prompt, "py beginner");
        assert_eq!(items[1].prompt, "py advanced");
        assert!(items.iter().all(|i| i.language == "python"));
    }

    #[test]
    fn missing_difficulty_counts_as_intermediate() {
        let bank = QuestionBank::new(vec![entry("untagged", "oop", None, "java")]);
        let items = bank.fetch("java", Difficulty::Intermediate, None, 1);
        assert_eq!(items[0].prompt, "untagged");
        assert_eq!(items[0].difficulty, Difficulty::Intermediate);
    }

    #[test]
    fn hinted_topic_is_preferred_among_curated() {
        let bank = QuestionBank::new(vec![
            entry("one", "syntax", Some(Difficulty::Beginner), "python"),
            entry("two", "loops", Some(Difficulty::Beginner), "python"),
            entry("three", "syntax", Some(Difficulty::Beginner), "python"),
        ]);
        let items = bank.fetch("python", Difficulty::Beginner, Some("loops"), 1);
        assert_eq!(items[0].topic, "loops");
    }

    #[test]
    fn synthesis_fills_the_remainder_for_unknown_language() {
        let bank = QuestionBank::default();
        let items = bank.fetch("cobol", Difficulty::Advanced, None, 7);

        assert_eq!(items.len(), 7);
        let ids: HashSet<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids.len(), 7);

        for item in &items {
            assert_eq!(item.options.len(), 4);
            assert_eq!(item.options.iter().filter(|o| **o == item.correct_answer).count(), 1);
            assert!(item.correct_answer.to_lowercase().contains(&item.topic));
            assert!(item.prompt.to_lowercase().contains(&item.topic));
            assert!(item.prompt.contains("Cobol"));
            assert_eq!(item.difficulty, Difficulty::Advanced);
        }
    }

    #[test]
    fn synthesis_alternates_the_hinted_topic() {
        let items = QuestionBank::default().fetch("go", Difficulty::Beginner, Some("channels"), 4);
        assert_eq!(items[0].topic, "channels");
        assert_eq!(items[2].topic, "channels");
    }

    #[test]
    fn prompts_within_one_batch_are_distinct() {
        let bank = QuestionBank::default();
        let cases = [
            ("cobol", Difficulty::Beginner, None, 10),
            ("java", Difficulty::Intermediate, Some("streams"), 7),
            ("go", Difficulty::Beginner, Some("channels"), 10),
            ("python", Difficulty::Advanced, Some("decorators"), 15),
        ];

        for (language, difficulty, hint, count) in cases {
            let items = bank.fetch(language, difficulty, hint, count);
            assert_eq!(items.len(), count, "{}", language);
            let prompts: HashSet<&str> = items.iter().map(|i| i.prompt.as_str()).collect();
            assert_eq!(prompts.len(), count, "{} repeated a prompt", language);
        }
    }

    #[test]
    fn synthesis_skips_prompts_already_curated() {
        let curated = "In Go, what does channels typically refer to?";
        let bank = QuestionBank::new(vec![entry(curated, "channels", Some(Difficulty::Beginner), "go")]);
        let items = bank.fetch("go", Difficulty::Beginner, Some("channels"), 6);

        assert_eq!(items.len(), 6);
        assert_eq!(items.iter().filter(|i| i.prompt == curated).count(), 1);
    }

    #[test]
    fn from_file_drops_entries_without_a_valid_answer() {
        let dir = std::env::temp_dir().join(format!("bank-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bank.json");
        std::fs::write(
            &path,
            r#"[
                {"question": "ok", "options": ["a","b","c","d"], "correct_answer": "b", "topic": "syntax", "language": "python"},
                {"question": "bad", "options": ["a","b"], "correct_answer": "z", "topic": "syntax"}
            ]"#,
        )
        .unwrap();

        let bank = QuestionBank::from_file(&path).unwrap();
        assert_eq!(bank.len(), 1);
        assert!(QuestionBank::from_file(&dir.join("missing.json")).is_err());
    }
}
