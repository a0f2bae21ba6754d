//! Query intent classification.
//!
//! A query is reduced to a set of [`QuerySignals`] once, then an ordered rule
//! table is evaluated top to bottom; the first rule whose predicate holds
//! decides the intent.

use crate::query::filters::{extract_document_type, extract_jurisdiction, extract_year};
use crate::query::vocabulary::Vocabulary;
use crate::search::tokenizer::fold_accents;
use serde::{Deserialize, Serialize};

// ============================================================================
// Core Types
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryIntent {
    Greeting,
    Faq,
    OffTopic,
    SimpleListing,
    Count,
    SemanticSearch,
    Computational,
}

impl QueryIntent {
    pub fn needs_lexical_search(self) -> bool {
        matches!(self, Self::SemanticSearch | Self::SimpleListing | Self::Count)
    }

    pub fn needs_computation(self) -> bool {
        self == Self::Computational
    }

    /// Whether the result is meant to be handed to a language model rather
    /// than shown from metadata.
    pub fn needs_generation(self) -> bool {
        matches!(self, Self::SemanticSearch | Self::Computational)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: QueryIntent,
    pub needs_lexical_search: bool,
    pub needs_computation: bool,
    pub needs_generation: bool,
    /// Name of the rule that fired.
    pub rule: String,
}

impl Classification {
    fn new(intent: QueryIntent, rule: &str) -> Self {
        Self {
            intent,
            needs_lexical_search: intent.needs_lexical_search(),
            needs_computation: intent.needs_computation(),
            needs_generation: intent.needs_generation(),
            rule: rule.to_string(),
        }
    }
}

/// Facts about a query that the rules are written against.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuerySignals {
    pub greeting: bool,
    pub jurisdiction_faq: bool,
    pub faq: bool,
    pub computational: bool,
    pub count_phrase: bool,
    /// Names a jurisdiction, a document type or a year.
    pub scoped: bool,
    pub content: bool,
    pub off_topic: bool,
}

struct Rule {
    name: &'static str,
    intent: QueryIntent,
    applies: fn(&QuerySignals) -> bool,
}

const RULES: &[Rule] = &[
    Rule {
        name: "greeting",
        intent: QueryIntent::Greeting,
        applies: |s| s.greeting && !s.content && !s.scoped && !s.computational,
    },
    Rule {
        name: "faq_jurisdictions",
        intent: QueryIntent::Faq,
        applies: |s| s.jurisdiction_faq,
    },
    Rule {
        name: "faq",
        intent: QueryIntent::Faq,
        applies: |s| s.faq,
    },
    Rule {
        name: "computational",
        intent: QueryIntent::Computational,
        applies: |s| s.computational,
    },
    Rule {
        name: "scoped_count",
        intent: QueryIntent::Count,
        applies: |s| s.scoped && !s.content && s.count_phrase,
    },
    Rule {
        name: "scoped_listing",
        intent: QueryIntent::SimpleListing,
        applies: |s| s.scoped && !s.content,
    },
    Rule {
        name: "content",
        intent: QueryIntent::SemanticSearch,
        applies: |s| s.content,
    },
    Rule {
        name: "off_topic",
        intent: QueryIntent::OffTopic,
        applies: |s| s.off_topic,
    },
];

const DEFAULT_RULE: &str = "default";

// ============================================================================
// Classifier
// ============================================================================

/// Vocabulary patterns compiled once. Patterns that fail to compile are
/// logged and skipped.
#[derive(Debug, Clone)]
pub struct QueryClassifier {
    greeting: Vec<regex::Regex>,
    jurisdiction_faq: Vec<regex::Regex>,
    faq: Vec<regex::Regex>,
    computational: Vec<regex::Regex>,
    count: Vec<regex::Regex>,
    vocabulary: Vocabulary,
}

fn compile(list: &'static str, patterns: &[String]) -> Vec<regex::Regex> {
    patterns
        .iter()
        .filter_map(|p| match regex::Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::warn!(list, pattern = %p, error = %e, "Skipping invalid vocabulary pattern");
                None
            }
        })
        .collect()
}

fn any_match(res: &[regex::Regex], text: &str) -> bool {
    res.iter().any(|re| re.is_match(text))
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new(&Vocabulary::default())
    }
}

impl QueryClassifier {
    pub fn new(vocabulary: &Vocabulary) -> Self {
        Self {
            greeting: compile("greeting_patterns", &vocabulary.greeting_patterns),
            jurisdiction_faq: compile("jurisdiction_faq_patterns", &vocabulary.jurisdiction_faq_patterns),
            faq: compile("faq_patterns", &vocabulary.faq_patterns),
            computational: compile("computational_patterns", &vocabulary.computational_patterns),
            count: compile("count_patterns", &vocabulary.count_patterns),
            vocabulary: vocabulary.clone(),
        }
    }

    pub fn signals<S: AsRef<str>>(&self, query: &str, jurisdictions: &[S]) -> QuerySignals {
        let folded = fold_accents(query.trim());
        // Raw words rather than index tokens so short content words survive.
        let words: Vec<&str> = folded
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();

        QuerySignals {
            greeting: any_match(&self.greeting, &folded),
            jurisdiction_faq: any_match(&self.jurisdiction_faq, &folded),
            faq: any_match(&self.faq, &folded),
            computational: any_match(&self.computational, &folded),
            count_phrase: any_match(&self.count, &folded),
            scoped: extract_document_type(query).is_some()
                || extract_year(query).is_some()
                || extract_jurisdiction(query, jurisdictions).is_some(),
            content: words.iter().any(|w| self.vocabulary.is_content_token(w)),
            off_topic: words.iter().any(|w| self.vocabulary.is_off_topic_token(w)),
        }
    }

    /// Classify without knowledge of the corpus jurisdictions.
    pub fn classify(&self, query: &str) -> Classification {
        self.classify_with::<&str>(query, &[])
    }

    pub fn classify_with<S: AsRef<str>>(&self, query: &str, jurisdictions: &[S]) -> Classification {
        let signals = self.signals(query, jurisdictions);
        let classification = RULES
            .iter()
            .find(|rule| (rule.applies)(&signals))
            .map(|rule| Classification::new(rule.intent, rule.name))
            .unwrap_or_else(|| Classification::new(QueryIntent::SemanticSearch, DEFAULT_RULE));
        tracing::debug!(
            intent = ?classification.intent,
            rule = %classification.rule,
            "Classified query"
        );
        classification
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(query: &str) -> QueryIntent {
        QueryClassifier::default().classify(query).intent
    }

    #[test]
    fn test_content_beats_scope() {
        for query in [
            "sueldos de carlos tejedor de 2025",
            "salaries of Jurisdiction X 2025",
            "salarios municipales merlo",
            "remuneraciones del personal",
            "jornada laboral ordenanzas",
            "ordenanzas de tránsito carlos tejedor",
            "normativas viales",
            "tasas municipales merlo",
            "habilitación comercial",
            "ordenanzas sobre salud",
            "educación en carlos tejedor",
        ] {
            assert_eq!(intent(query), QueryIntent::SemanticSearch, "{}", query);
        }
    }

    #[test]
    fn test_scoped_listing() {
        for query in [
            "decretos de carlos tejedor 2025",
            "decrees of Jurisdiction X 2025",
            "ordenanzas de merlo 2024",
            "resoluciones de la plata",
        ] {
            let c = QueryClassifier::default().classify(query);
            assert_eq!(c.intent, QueryIntent::SimpleListing, "{}", query);
            assert!(c.needs_lexical_search);
            assert!(!c.needs_generation);
        }
    }

    #[test]
    fn test_scoped_count() {
        for query in [
            "cuántas ordenanzas hay de carlos tejedor",
            "cantidad de decretos 2025",
            "cuantas ordenanzas tuvo carlos tejedor en el 2025?",
            "how many decrees in 2025",
        ] {
            assert_eq!(intent(query), QueryIntent::Count, "{}", query);
        }
    }

    #[test]
    fn test_jurisdiction_scope_needs_known_names() {
        let classifier = QueryClassifier::default();
        assert_eq!(
            classifier.classify("cuantas normas tiene merlo").intent,
            QueryIntent::SemanticSearch
        );
        let c = classifier.classify_with("cuantas normas tiene merlo", &["Merlo"]);
        assert_eq!(c.intent, QueryIntent::Count);
        assert_eq!(c.rule, "scoped_count");
    }

    #[test]
    fn test_computational() {
        for query in [
            "suma de todas las tasas municipales",
            "total de montos en la ordenanza",
            "promedio de las tasas",
            "cuál es el monto más alto",
            "cuál es la tasa mayor",
            "cuál es el valor mínimo",
            "comparar tasas entre categorías",
            "cuántos montos distintos hay",
        ] {
            let c = QueryClassifier::default().classify(query);
            assert_eq!(c.intent, QueryIntent::Computational, "{}", query);
            assert!(c.needs_computation);
            assert!(!c.needs_lexical_search);
        }
    }

    #[test]
    fn test_not_computational() {
        for query in [
            "qué dice la ordenanza de tránsito",
            "contenido del decreto 123",
            "velocidad máxima en zona urbana",
        ] {
            assert_ne!(intent(query), QueryIntent::Computational, "{}", query);
        }
    }

    #[test]
    fn test_greeting_faq_off_topic() {
        assert_eq!(intent("hola"), QueryIntent::Greeting);
        assert_eq!(intent("buenos días"), QueryIntent::Greeting);
        assert_eq!(intent("cómo estás"), QueryIntent::Greeting);
        assert_eq!(intent("hola, ¿qué tasas tiene merlo?"), QueryIntent::SemanticSearch);

        let c = QueryClassifier::default().classify("qué municipios están disponibles");
        assert_eq!(c.intent, QueryIntent::Faq);
        assert_eq!(c.rule, "faq_jurisdictions");
        assert_eq!(intent("cómo busco una ordenanza"), QueryIntent::Faq);
        assert_eq!(intent("diferencia entre ordenanza y decreto"), QueryIntent::Faq);

        assert_eq!(intent("¿cómo está el clima hoy?"), QueryIntent::OffTopic);
        assert_eq!(intent("quién ganó el partido de futbol"), QueryIntent::OffTopic);
        assert_eq!(intent("estacionamiento prohibido"), QueryIntent::SemanticSearch);
        assert_eq!(QueryClassifier::default().classify("algo raro").rule, "default");
    }

    #[test]
    fn test_invalid_patterns_are_skipped() {
        let mut vocabulary = Vocabulary::default();
        vocabulary.off_topic_terms.clear();
        vocabulary.greeting_patterns = vec!["(".into(), r"^hola\b".into()];
        let classifier = QueryClassifier::new(&vocabulary);
        assert_eq!(classifier.classify("hola").intent, QueryIntent::Greeting);
    }
}
