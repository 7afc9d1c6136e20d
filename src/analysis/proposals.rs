//! Term extraction over the plain-text government-proposal extracts.

use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::Path;

use log::{debug, warn};

/// The Portuguese stopword list used when ranking proposal terms.
const PORTUGUESE_STOPWORDS: &[&str] = &[
    "a", "à", "ao", "aos", "aquela", "aquelas", "aquele", "aqueles", "aquilo", "as", "às", "até",
    "com", "como", "da", "das", "de", "dela", "delas", "dele", "deles", "depois", "do", "dos",
    "e", "é", "ela", "elas", "ele", "eles", "em", "entre", "era", "eram", "éramos", "essa",
    "essas", "esse", "esses", "esta", "está", "estamos", "estão", "estar", "estas", "estava",
    "estavam", "estávamos", "este", "esteja", "estejam", "estejamos", "estes", "esteve",
    "estive", "estivemos", "estiver", "estivera", "estiveram", "estivéramos", "estiverem",
    "estivermos", "estivesse", "estivessem", "estivéssemos", "estou", "eu", "foi", "fomos",
    "for", "fora", "foram", "fôramos", "forem", "formos", "fosse", "fossem", "fôssemos", "fui",
    "há", "haja", "hajam", "hajamos", "hão", "havemos", "haver", "hei", "houve", "houvemos",
    "houver", "houvera", "houverá", "houveram", "houvéramos", "houverão", "houverei",
    "houverem", "houveremos", "houveria", "houveriam", "houveríamos", "houvermos", "houvesse",
    "houvessem", "houvéssemos", "isso", "isto", "já", "lhe", "lhes", "mais", "mas", "me",
    "mesmo", "meu", "meus", "minha", "minhas", "muito", "na", "não", "nas", "nem", "no", "nos",
    "nós", "nossa", "nossas", "nosso", "nossos", "num", "numa", "o", "os", "ou", "para", "pela",
    "pelas", "pelo", "pelos", "por", "qual", "quando", "que", "quem", "são", "se", "seja",
    "sejam", "sejamos", "sem", "ser", "será", "serão", "serei", "seremos", "seria", "seriam",
    "seríamos", "seu", "seus", "só", "somos", "sou", "sua", "suas", "também", "te", "tem",
    "tém", "temos", "tenha", "tenham", "tenhamos", "tenho", "terá", "terão", "terei", "teremos",
    "teria", "teriam", "teríamos", "teu", "teus", "teve", "tinha", "tinham", "tínhamos", "tive",
    "tivemos", "tiver", "tivera", "tiveram", "tivéramos", "tiverem", "tivermos", "tivesse",
    "tivessem", "tivéssemos", "tu", "tua", "tuas", "um", "uma", "você", "vocês", "vos",
];

pub fn portuguese_stopwords() -> HashSet<&'static str> {
    PORTUGUESE_STOPWORDS.iter().copied().collect()
}

fn is_term(token: &str, stopwords: &HashSet<&'static str>) -> bool {
    !token.is_empty() && token.chars().all(char::is_alphabetic) && !stopwords.contains(token)
}

/// Counts the alphabetic, non-stopword terms across every `*.txt` file in
/// `dir`. Returns the terms ranked by descending frequency, ties broken
/// alphabetically. Unreadable files are skipped with a warning.
pub fn term_frequencies(
    dir: &Path,
    stopwords: &HashSet<&'static str>,
) -> io::Result<Vec<(String, u64)>> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    let mut entries: Vec<_> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().map_or(false, |ext| ext == "txt"))
        .collect();
    entries.sort();
    debug!("reading {} proposal extracts from {}", entries.len(), dir.display());

    for path in entries {
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!("skipping proposal {}: {}", path.display(), err);
                continue;
            }
        };
        let text = String::from_utf8_lossy(&bytes).to_lowercase();
        for token in text.split(|c: char| !c.is_alphabetic()) {
            if is_term(token, stopwords) {
                *counts.entry(token.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut ranked: Vec<(String, u64)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(ranked)
}
