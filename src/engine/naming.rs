//! Cluster naming: top TF-IDF terms over member entities, made unique
//! across every identity published together.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use regex::Regex;

use crate::config::NamingConfig;
use crate::types::{ClusterId, Evolution, LineageError, LineageResult};

/// Tokens of two or more word characters.
const TOKEN_PATTERN: &str = r"(?u)\b\w\w+\b";

/// Common English words never used as name terms.
pub const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto", "or",
    "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "part",
    "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too",
    "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon",
    "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
    "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why",
    "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Derives cluster names from the TF-IDF weight of terms in member entities.
///
/// Each entity string is one document. Terms are lowercased regex tokens
/// minus stop words; idf is smoothed (`ln((1 + n) / (1 + df)) + 1`), each
/// document vector is l2-normalized, and term weights are summed over
/// documents. Ties are broken alphabetically.
#[derive(Debug, Clone)]
pub struct TfIdfNamer {
    token: Regex,
    stop_words: BTreeSet<&'static str>,
    top_n: usize,
    separator: String,
}

impl TfIdfNamer {
    pub fn new(top_n: usize, separator: impl Into<String>) -> LineageResult<Self> {
        if top_n == 0 {
            return Err(LineageError::Config("top_n_terms must be > 0".into()));
        }
        let token = Regex::new(TOKEN_PATTERN).map_err(|e| LineageError::Config(e.to_string()))?;
        Ok(Self {
            token,
            stop_words: ENGLISH_STOP_WORDS.iter().copied().collect(),
            top_n,
            separator: separator.into(),
        })
    }

    pub fn from_config(config: &NamingConfig) -> LineageResult<Self> {
        Self::new(config.top_n_terms, config.separator.clone())
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.token
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .filter(|t| !self.stop_words.contains(*t))
            .map(str::to_string)
            .collect()
    }

    /// Summed TF-IDF weight per term, highest first.
    pub fn ranked_terms<S: AsRef<str>>(&self, entities: &[S]) -> Vec<(String, f64)> {
        let docs: Vec<HashMap<String, f64>> = entities
            .iter()
            .map(|e| {
                let mut tf: HashMap<String, f64> = HashMap::new();
                for t in self.tokenize(e.as_ref()) {
                    *tf.entry(t).or_insert(0.0) += 1.0;
                }
                tf
            })
            .collect();

        let mut df: HashMap<&str, usize> = HashMap::new();
        for doc in &docs {
            for term in doc.keys() {
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }

        let n = docs.len() as f64;
        let mut weights: BTreeMap<&str, f64> = BTreeMap::new();
        for doc in &docs {
            let weighted: Vec<(&str, f64)> = doc
                .iter()
                .map(|(term, tf)| {
                    let d = df.get(term.as_str()).copied().unwrap_or(0) as f64;
                    (term.as_str(), tf * (((1.0 + n) / (1.0 + d)).ln() + 1.0))
                })
                .collect();
            let norm = weighted.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm == 0.0 {
                continue;
            }
            for (term, w) in weighted {
                *weights.entry(term).or_insert(0.0) += w / norm;
            }
        }

        let mut ranked: Vec<(String, f64)> = weights
            .into_iter()
            .map(|(t, w)| (t.to_string(), w))
            .collect();
        // BTreeMap order is alphabetical; a stable sort keeps it for ties.
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// Top terms joined by the separator, or `None` when no term survives
    /// tokenization.
    pub fn name<S: AsRef<str>>(&self, entities: &[S]) -> Option<String> {
        let terms: Vec<String> = self
            .ranked_terms(entities)
            .into_iter()
            .take(self.top_n)
            .map(|(t, _)| t)
            .collect();
        (!terms.is_empty()).then(|| terms.join(&self.separator))
    }

    /// Name every identity in an evolution from its membership at the
    /// latest year it appears in, then make the names unique.
    pub fn name_evolution(&self, evolution: &Evolution) -> BTreeMap<ClusterId, String> {
        let raw: Vec<(ClusterId, String)> = evolution
            .identities()
            .into_iter()
            .filter_map(|id| {
                let (_, members) = evolution.final_membership(id)?;
                let name = self.name(members).unwrap_or_else(|| {
                    log::warn!("Cluster {id} has no nameable terms; using its identity");
                    id.to_string()
                });
                Some((id.clone(), name))
            })
            .collect();
        make_names_unique(raw, &self.separator)
    }
}

/// Disambiguate colliding names.
///
/// Within each group of identities sharing a name, the first in input order
/// keeps the bare name and the member at position `i` becomes
/// `{name}{separator}{i}`. A suffixed name that is already taken moves on to
/// the next free index.
pub fn make_names_unique(
    names: Vec<(ClusterId, String)>,
    separator: &str,
) -> BTreeMap<ClusterId, String> {
    let mut groups: BTreeMap<&str, Vec<&ClusterId>> = BTreeMap::new();
    for (id, name) in &names {
        groups.entry(name.as_str()).or_default().push(id);
    }

    let mut taken: BTreeSet<String> = groups.keys().map(|n| n.to_string()).collect();
    let mut unique = BTreeMap::new();
    for (name, ids) in &groups {
        let mut next = 1usize;
        for (i, id) in ids.iter().enumerate() {
            if i == 0 {
                unique.insert((*id).clone(), name.to_string());
                continue;
            }
            next = next.max(i);
            let mut candidate = format!("{name}{separator}{next}");
            while taken.contains(&candidate) {
                next += 1;
                candidate = format!("{name}{separator}{next}");
            }
            next += 1;
            taken.insert(candidate.clone());
            unique.insert((*id).clone(), candidate);
        }
        if ids.len() > 1 {
            log::debug!("Disambiguated {} clusters named {:?}", ids.len(), name);
        }
    }
    unique
}
