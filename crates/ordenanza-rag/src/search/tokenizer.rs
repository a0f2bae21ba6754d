//! Spanish-aware tokenizer shared by indexing and querying.
//!
//! Terms are lowercased and accent-folded before stopword filtering, so the
//! stopword set below is stored in folded form.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Tokens of this length or shorter are discarded.
const MIN_TOKEN_CHARS: usize = 3;

static STOPWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "el", "la", "de", "que", "y", "a", "en", "un", "ser", "se", "no", "haber", "por", "con",
        "su", "para", "como", "estar", "tener", "le", "lo", "todo", "pero", "mas", "hacer", "o",
        "poder", "decir", "este", "ir", "otro", "ese", "si", "me", "ya", "ver", "porque", "dar",
        "cuando", "muy", "sin", "vez", "mucho", "saber", "sobre", "mi", "alguno", "mismo", "yo",
        "tambien", "hasta", "ano", "dos", "querer", "entre", "asi", "primero", "desde", "grande",
        "eso", "ni", "nos", "llegar", "pasar", "tiempo", "ella", "dia", "uno", "bien", "poco",
        "deber", "entonces", "poner", "cosa", "tanto", "hombre", "parecer", "nuestro", "tan",
        "donde", "ahora", "parte", "despues", "vida", "quedar", "siempre", "creer", "hablar",
        "llevar", "dejar", "los", "las", "del", "una", "unos", "unas", "al",
    ]
    .into_iter()
    .collect()
});

/// Groups of interchangeable legal terms, in folded form.
const SYNONYM_GROUPS: &[&[&str]] = &[
    &["sueldo", "salario", "remuneracion", "haber", "retribucion", "paga"],
    &["transito", "vial", "circulacion", "trafico"],
    &["impuesto", "tasa", "tributo", "gravamen", "canon"],
    &["habilitacion", "permiso", "licencia", "autorizacion"],
];

/// Lowercase and strip diacritics. `ñ` folds to `n`, matching canonical
/// decomposition followed by removal of combining marks.
pub fn fold_accents(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars().flat_map(char::to_lowercase) {
        let folded = match c {
            'á' | 'à' | 'ä' | 'â' | 'ã' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' | 'õ' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            // Combining marks left over from decomposed input.
            '\u{0300}'..='\u{036f}' => continue,
            other => other,
        };
        out.push(folded);
    }
    out
}

pub fn is_stopword(term: &str) -> bool {
    STOPWORDS.contains(term)
}

/// Normalize `text` into index terms, preserving order and duplicates.
pub fn tokenize(text: &str) -> Vec<String> {
    let folded = fold_accents(text);
    let cleaned: String = folded
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS && !is_stopword(t))
        .map(str::to_string)
        .collect()
}

/// Expand terms with their legal synonyms. The result is deduplicated and
/// keeps first-occurrence order, each term followed by its group.
pub fn expand_synonyms(terms: &[String]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(terms.len());

    for term in terms {
        if seen.insert(term.clone()) {
            out.push(term.clone());
        }
        for group in SYNONYM_GROUPS.iter().filter(|g| g.contains(&term.as_str())) {
            for syn in group.iter() {
                if seen.insert((*syn).to_string()) {
                    out.push((*syn).to_string());
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_accents() {
        assert_eq!(fold_accents("Resolución AÑO Vía"), "resolucion ano via");
        assert_eq!(fold_accents("e\u{0301}xito"), "exito");
    }

    #[test]
    fn test_tokenize_drops_short_tokens_and_stopwords() {
        let tokens = tokenize("La Ordenanza N° 2833 sobre el tránsito, de 2025.");
        assert_eq!(tokens, vec!["ordenanza", "2833", "transito", "2025"]);
    }

    #[test]
    fn test_tokenize_is_deterministic() {
        let text = "Tasa por Habilitación de Comercios e Industrias";
        assert_eq!(tokenize(text), tokenize(text));
        assert_eq!(tokenize(text), vec!["tasa", "habilitacion", "comercios", "industrias"]);
    }

    #[test]
    fn test_accented_stopwords_are_removed() {
        assert!(tokenize("más también después").is_empty());
    }

    #[test]
    fn test_expand_synonyms_dedupes_in_order() {
        let terms = vec!["sueldo".to_string(), "salario".to_string(), "municipal".to_string()];
        let expanded = expand_synonyms(&terms);
        assert_eq!(expanded[0], "sueldo");
        assert_eq!(expanded[1], "salario");
        assert!(expanded.contains(&"remuneracion".to_string()));
        assert_eq!(expanded.last().map(String::as_str), Some("municipal"));
        assert_eq!(expanded.iter().filter(|t| *t == "salario").count(), 1);
    }
}
