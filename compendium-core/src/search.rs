//! # Busca e Navegação
//!
//! Busca por substring (sem índice invertido: o dataset tem centenas de
//! artigos) e resolução de nomes soltos para artigos, usada quando o leitor
//! clica em um link cujo alvo não tem id.
//!
//! | Onde casou  | Pontuação |
//! |-------------|-----------|
//! | Título      | 2         |
//! | Texto puro  | 1         |

use std::ops::Range;

use regex::RegexBuilder;
use serde::Serialize;

use crate::content::{Article, Compendium};

/// Consultas menores que isto não retornam nada.
pub const MIN_QUERY_LEN: usize = 2;
/// Limite de resultados usado pela interface.
pub const DEFAULT_LIMIT: usize = 15;

const PREVIEW_BEFORE: usize = 40;
const PREVIEW_AFTER: usize = 80;
const PREVIEW_FALLBACK: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit<'a> {
    pub category: &'a str,
    pub article: &'a Article,
    pub score: u8,
}

/// Busca case-insensitive em título e texto puro dos artigos de topo.
pub fn search<'a>(compendium: &'a Compendium, query: &str, limit: usize) -> Vec<SearchHit<'a>> {
    if query.chars().count() < MIN_QUERY_LEN {
        return Vec::new();
    }
    let needle = query.to_lowercase();

    let mut hits: Vec<SearchHit<'a>> = compendium
        .articles()
        .filter_map(|(category, article)| {
            let score = if article.title.to_lowercase().contains(&needle) {
                2
            } else if article.raw.to_lowercase().contains(&needle) {
                1
            } else {
                return None;
            };
            Some(SearchHit {
                category,
                article,
                score,
            })
        })
        .collect();

    // estável: empates mantêm a ordem do dataset
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits.truncate(limit);
    hits
}

/// Intervalos (em bytes) de todas as ocorrências de `query`, ignorando caixa.
pub fn highlight_ranges(text: &str, query: &str) -> Vec<Range<usize>> {
    if query.is_empty() {
        return Vec::new();
    }
    match RegexBuilder::new(&regex::escape(query))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.find_iter(text).map(|m| m.range()).collect(),
        Err(_) => Vec::new(),
    }
}

/// Trecho do texto ao redor da primeira ocorrência de `query`.
///
/// Mostra 40 caracteres antes e 80 depois, com `...` nos lados cortados.
/// Sem ocorrência, devolve os primeiros 120 caracteres seguidos de `...`.
pub fn preview(text: &str, query: &str) -> String {
    let Some(first) = highlight_ranges(text, query).into_iter().next() else {
        let head: String = text.chars().take(PREVIEW_FALLBACK).collect();
        return format!("{}...", head);
    };

    let total = text.chars().count();
    let match_start = text[..first.start].chars().count();
    let start = match_start.saturating_sub(PREVIEW_BEFORE);
    let end = (match_start + query.chars().count() + PREVIEW_AFTER).min(total);

    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.extend(text.chars().skip(start).take(end - start));
    if end < total {
        out.push_str("...");
    }
    out
}

fn normalize(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Resolve um nome solto para o primeiro artigo compatível.
///
/// Compara título e alvo normalizados (minúsculas, só `[a-z0-9]`): casa se um
/// contém o outro.
pub fn resolve_target<'a>(compendium: &'a Compendium, target: &str) -> Option<(&'a str, &'a Article)> {
    let target = normalize(target);
    if target.is_empty() {
        return None;
    }
    compendium.articles().find(|(_, article)| {
        let title = normalize(&article.title);
        !title.is_empty() && (title.contains(&target) || target.contains(&title))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo::demo_compendium;

    #[test]
    fn test_short_query_returns_nothing() {
        let c = demo_compendium().unwrap();
        assert!(search(&c, "s", DEFAULT_LIMIT).is_empty());
    }

    #[test]
    fn test_title_hits_rank_first() {
        let c = demo_compendium().unwrap();
        let hits = search(&c, "kael", DEFAULT_LIMIT);
        let ids: Vec<(&str, u8)> = hits.iter().map(|h| (h.article.id.as_str(), h.score)).collect();
        // título: kael, vor-kael; conteúdo: jonas-crale
        assert_eq!(ids, vec![("kael", 2), ("vor-kael", 2), ("jonas-crale", 1)]);
    }

    #[test]
    fn test_limit_applies() {
        let c = demo_compendium().unwrap();
        assert_eq!(search(&c, "the", 2).len(), 2);
    }

    #[test]
    fn test_preview_window() {
        let text = format!("{}needle{}", "a".repeat(50), "b".repeat(100));
        let p = preview(&text, "NEEDLE");
        assert!(p.starts_with("..."));
        assert!(p.ends_with("..."));
        assert_eq!(p.len(), 3 + 40 + 6 + 80 + 3);
        assert!(p.contains("needle"));
    }

    #[test]
    fn test_preview_short_text_without_ellipsis() {
        assert_eq!(preview("Kael waits", "kael"), "Kael waits");
    }

    #[test]
    fn test_preview_fallback() {
        let text = "x".repeat(200);
        let p = preview(&text, "zz");
        assert_eq!(p.chars().count(), 123);
    }

    #[test]
    fn test_highlight_ranges_case_insensitive() {
        assert_eq!(highlight_ranges("Sol and SOL", "sol"), vec![0..3, 8..11]);
        assert_eq!(highlight_ranges("a.b axb", "a.b"), vec![0..3]);
        assert!(highlight_ranges("abc", "").is_empty());
    }

    #[test]
    fn test_resolve_target() {
        let c = demo_compendium().unwrap();
        let (category, article) = resolve_target(&c, "Jonas").unwrap();
        assert_eq!((category, article.id.as_str()), ("NPCs", "jonas-crale"));

        let (_, article) = resolve_target(&c, "the Emberfall gates").unwrap();
        assert_eq!(article.id, "emberfall");

        assert!(resolve_target(&c, "Nowhere").is_none());
        assert!(resolve_target(&c, "!!!").is_none());
    }
}
