//! Curated keyword lists that steer query classification.
//!
//! Everything here is data: patterns are regex sources matched against the
//! accent-folded lowercase query, stems are matched as token prefixes. A
//! deployment can replace any list through the `vocabulary` config section.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vocabulary {
    /// Salutations and small talk with no request attached.
    pub greeting_patterns: Vec<String>,
    /// Questions about which jurisdictions the corpus covers.
    pub jurisdiction_faq_patterns: Vec<String>,
    /// Questions about using the assistant itself.
    pub faq_patterns: Vec<String>,
    /// Aggregation, extremes and comparison over tabular data.
    pub computational_patterns: Vec<String>,
    /// Quantity-asking phrases that turn a scoped listing into a count.
    pub count_patterns: Vec<String>,
    /// Token prefixes naming a legal subject matter.
    pub content_stems: Vec<String>,
    /// Whole tokens that mark a question as unrelated to municipal law.
    pub off_topic_terms: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            greeting_patterns: strings(&[
                r"^(?:hola|holis|buen[oa]s?(?: dias| tardes| noches)?|hi|hello|hey|saludos)\b",
                r"\bcomo (?:estas|andas|va)\b|\bque tal\b",
                r"\bquien (?:sos|eres)\b|\bque sos\b",
                r"^(?:gracias|muchas gracias|chau|adios|thanks|thank you|bye)\b",
                r"^(?:ayuda|help)\W*$",
            ]),
            jurisdiction_faq_patterns: strings(&[
                r"\bque\b.*\bmunicipios\b.*\b(?:disponibles|hay|tenes|cubr)",
                r"\bcuales\b.*\bmunicipios\b",
                r"\bmunicipios\b.*\b(?:hay|disponibles)\b",
                r"\bwhich\b.*\b(?:municipalities|jurisdictions)\b",
                r"\b(?:municipalities|jurisdictions)\b.*\bavailable\b",
            ]),
            faq_patterns: strings(&[
                r"\bcomo\b.*\b(?:busco|buscar|consulto|consultar|encuentro|encontrar)\b",
                r"\bcomo\b.*\b(?:uso|usar)\b.*\bchat\b",
                r"\bcomo\b.*\b(?:citar|cito|referenciar)\b",
                r"\bque\b.*\btipos\b.*\bnormativas\b|\bque\b.*\bpuedo\b.*\bconsultar\b",
                r"\bdiferencia\b.*\bentre\b.*\bordenanza\b.*\bdecreto\b",
                r"\bcomo\b.*\bfunciona\b",
                r"\binformacion\b.*\bdisponible\b",
                r"\bpara\b.*\bque\b.*\bsirve\b|\bque\b.*\bpuede\b.*\bhacer\b",
                r"\bhow (?:do i|to|can i)\b.*\b(?:search|use|cite|find)\b",
            ]),
            computational_patterns: strings(&[
                r"\bsuma(?:r|toria)?\b|\bsum of\b|\bsumatoria\b",
                r"\btotal (?:de )?(?:los |las )?(?:montos|importes|tasas|valores|sueldos|salarios|gastos|tarifas)\b",
                r"\bpromedio\b|\bmedia de\b|\baverage\b",
                r"\b(?:maxim[oa]s?|minim[oa]s?|mayor(?:es)?|menor(?:es)?|mas (?:alt|baj|car|barat)[oa]s?|highest|lowest|maximum|minimum)\b.*\b(?:tasa|monto|importe|valor|precio|tarifa|sueldo|salario|amount|fee|rate|price)s?\b",
                r"\b(?:tasa|monto|importe|valor|precio|tarifa|sueldo|salario|amount|fee|rate|price)(?:e?s)?\b.*\b(?:maxim[oa]|minim[oa]|mayor|menor|mas (?:alt|baj|car|barat)[oa])\b",
                r"\bcompar(?:ar|acion|e)\b|\bdiferencia\b|\bversus\b",
                r"\bagrupa(?:r|do|dos)?\b|\bgroup(?:ed)? by\b",
                r"\bcuant[oa]s\b.*\b(?:distint|diferent)[oa]s\b|\bhow many distinct\b",
            ]),
            count_patterns: strings(&[
                r"\bcuant[oa]s\b",
                r"\bcantidad\b",
                r"\btotal\b",
                r"\bnumero de\b",
                r"\bhow many\b|\bcount\b|\bquantity\b|\bnumber of\b",
            ]),
            content_stems: strings(&[
                "sueld", "salar", "remunerac", "jornad", "laboral", "personal", "tasa", "impuest",
                "tribut", "habilitac", "permis", "licenc", "transit", "vial", "estacionam", "salud",
                "educac", "obra", "presupuest", "ambient", "residu", "segurid", "comerci",
                "alumbrad", "barrid", "zonific", "construcc", "agua", "multa", "contravenc", "pago",
                "finanz", "tax", "fee", "permit", "licens", "traffic", "health", "educat", "budget",
                "wage",
            ]),
            off_topic_terms: strings(&[
                "clima", "futbol", "receta", "recetas", "cocina", "dolar", "cotizacion", "inflacion",
                "pelicula", "peliculas", "serie", "series", "netflix", "spotify", "chiste", "chistes",
                "famoso", "famosos", "celebridad", "actor", "actriz", "cantante", "amor", "pareja",
                "noticias", "weather", "football", "soccer", "recipe", "movie", "movies", "joke",
            ]),
        }
    }
}

impl Vocabulary {
    pub fn is_content_token(&self, token: &str) -> bool {
        self.content_stems.iter().any(|stem| token.starts_with(stem.as_str()))
    }

    pub fn is_off_topic_token(&self, token: &str) -> bool {
        self.off_topic_terms.iter().any(|t| t == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_stems_match_inflections() {
        let v = Vocabulary::default();
        assert!(v.is_content_token("sueldos"));
        assert!(v.is_content_token("viales"));
        assert!(v.is_content_token("salaries"));
        assert!(!v.is_content_token("decretos"));
    }

    #[test]
    fn test_vocabulary_overrides_from_json() {
        let v: Vocabulary = serde_json::from_str(r#"{"off_topic_terms": ["horoscopo"]}"#).unwrap();
        assert!(v.is_off_topic_token("horoscopo"));
        assert!(!v.is_off_topic_token("clima"));
        assert_eq!(v.content_stems, Vocabulary::default().content_stems);
    }
}
