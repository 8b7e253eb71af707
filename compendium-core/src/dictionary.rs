//! # Dicionário de Entidades
//!
//! Lista ordenada de nomes conhecidos usada pelo [`matcher`](crate::matcher).
//! É reconstruída sempre que o conjunto de conteúdo muda e tratada como um
//! snapshot imutável durante cada chamada de matching.
//!
//! ## Ordenação
//!
//! As entradas ficam ordenadas pelo tamanho do nome (em caracteres), do maior
//! para o menor. Empates preservam a ordem de inserção. O matcher depende
//! disso: "Sol Raven" precisa ser tentado antes de "Sol", senão o nome curto
//! tomaria o trecho do nome composto.
//!
//! ## Regra de casamento
//!
//! Cada entrada compila uma única regex:
//!
//! ```text
//! (?i)\b(?:<título escapado>)(?:['’]s)?\b
//! ```
//!
//! - case-insensitive e com fronteira de palavra;
//! - possessivo opcional ("Kael's") incluído no trecho;
//! - o título é escapado com `regex::escape`. Se mesmo assim a compilação
//!   falhar, a entrada fica sem padrão (não casável) e o resto do lote segue.
//!
//! ## Aliases
//!
//! Primeiros nomes podem ser registrados como alias ("Jonas" → "Jonas Crale")
//! segundo uma [`AliasPolicy`]. Um alias só entra quando resolve para
//! exatamente uma entidade.

use std::collections::{HashMap, HashSet};

use regex::{Regex, RegexBuilder};
use tracing::{debug, info, warn};
use unicode_segmentation::UnicodeSegmentation;

use crate::entity::{Entity, EntityRecord};
use crate::matcher::{find_mentions, MatchSpan};

/// Limite padrão de tamanho de cada regex compilada (bytes).
pub const DEFAULT_PATTERN_SIZE_LIMIT: usize = 1 << 20;

/// Política de registro de primeiros nomes como alias.
///
/// Sem categorias configuradas nenhum alias é criado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasPolicy {
    /// Categorias cujos títulos geram alias (ex: "NPCs", "Party").
    pub categories: Vec<String>,
    /// Tamanho mínimo do alias em caracteres.
    pub min_len: usize,
}

impl AliasPolicy {
    pub fn for_categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            categories: categories.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.categories.is_empty()
    }

    fn applies_to(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

impl Default for AliasPolicy {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
            min_len: 3,
        }
    }
}

/// Monta a regra textual de casamento para um nome.
pub fn match_rule(title: &str) -> String {
    format!(r"(?i)\b(?:{})(?:['’]s)?\b", regex::escape(title))
}

/// Uma entrada do dicionário: a entidade e sua regra compilada.
#[derive(Debug, Clone)]
pub struct DictionaryEntry {
    pub entity: Entity,
    pattern: Option<Regex>,
}

impl DictionaryEntry {
    fn compile(entity: Entity, size_limit: usize) -> Self {
        let pattern = match RegexBuilder::new(&match_rule(&entity.title))
            .size_limit(size_limit)
            .build()
        {
            Ok(re) => Some(re),
            Err(err) => {
                warn!(title = %entity.title, error = %err, "Entrada do dicionário não casável");
                None
            }
        };
        Self { entity, pattern }
    }

    pub fn pattern(&self) -> Option<&Regex> {
        self.pattern.as_ref()
    }

    pub fn is_matchable(&self) -> bool {
        self.pattern.is_some()
    }
}

/// Dicionário ordenado de entidades.
#[derive(Debug, Clone)]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
    policy: AliasPolicy,
    size_limit: usize,
}

impl Dictionary {
    /// Dicionário vazio (nenhum texto casa).
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            policy: AliasPolicy::default(),
            size_limit: DEFAULT_PATTERN_SIZE_LIMIT,
        }
    }

    pub fn build<I>(records: I, policy: &AliasPolicy) -> Self
    where
        I: IntoIterator<Item = EntityRecord>,
    {
        Self::build_with_limit(records, policy, DEFAULT_PATTERN_SIZE_LIMIT)
    }

    /// Igual a [`Dictionary::build`], com limite explícito de tamanho de regex.
    pub fn build_with_limit<I>(records: I, policy: &AliasPolicy, size_limit: usize) -> Self
    where
        I: IntoIterator<Item = EntityRecord>,
    {
        let mut dictionary = Self {
            entries: Vec::new(),
            policy: policy.clone(),
            size_limit,
        };
        dictionary.rebuild(records);
        dictionary
    }

    /// Substitui o snapshot inteiro a partir de novos registros.
    ///
    /// A política de alias e o limite de regex são mantidos.
    pub fn rebuild<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = EntityRecord>,
    {
        let mut seen = HashSet::new();
        let mut canonical = Vec::new();

        for record in records {
            if record.title.trim().is_empty() {
                debug!(id = %record.id, "Registro sem título ignorado");
                continue;
            }
            if !seen.insert(record.title.clone()) {
                debug!(title = %record.title, "Título duplicado ignorado");
                continue;
            }
            canonical.push(Entity::from(record));
        }

        let aliases = first_name_aliases(&canonical, &self.policy);
        let alias_count = aliases.len();

        let mut entries: Vec<DictionaryEntry> = canonical
            .into_iter()
            .chain(aliases)
            .map(|entity| DictionaryEntry::compile(entity, self.size_limit))
            .collect();

        // sort_by é estável: empates mantêm a ordem do dataset
        entries.sort_by(|a, b| b.entity.name_len().cmp(&a.entity.name_len()));

        self.entries = entries;
        info!(
            entries = self.entries.len(),
            aliases = alias_count,
            unmatchable = self.unmatchable(),
            "Dicionário reconstruído"
        );
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Quantidade de entradas cuja regra não compilou.
    pub fn unmatchable(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_matchable()).count()
    }

    pub fn policy(&self) -> &AliasPolicy {
        &self.policy
    }

    pub fn get(&self, title: &str) -> Option<&Entity> {
        self.entries
            .iter()
            .map(|e| &e.entity)
            .find(|e| e.title == title)
    }

    /// Atalho para [`find_mentions`] com este dicionário.
    pub fn find_mentions(&self, text: &str, exclude_title: &str) -> Vec<MatchSpan> {
        find_mentions(text, exclude_title, self)
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::empty()
    }
}

/// Gera aliases de primeiro nome sem ambiguidade.
///
/// Um primeiro nome vira alias quando aparece em exatamente um título das
/// categorias da política, não coincide com nenhum título completo e tem o
/// tamanho mínimo.
fn first_name_aliases(entities: &[Entity], policy: &AliasPolicy) -> Vec<Entity> {
    if !policy.is_enabled() {
        return Vec::new();
    }

    let titles: HashSet<String> = entities.iter().map(|e| e.title.to_lowercase()).collect();
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut candidates: Vec<(&str, &Entity)> = Vec::new();

    for entity in entities.iter().filter(|e| policy.applies_to(&e.category)) {
        let mut words = entity.title.unicode_words();
        let (Some(first), Some(_)) = (words.next(), words.next()) else {
            continue;
        };
        *counts.entry(first.to_lowercase()).or_default() += 1;
        candidates.push((first, entity));
    }

    candidates
        .into_iter()
        .filter(|(first, _)| {
            let key = first.to_lowercase();
            counts.get(&key) == Some(&1)
                && !titles.contains(&key)
                && first.chars().count() >= policy.min_len
        })
        .map(|(first, entity)| Entity::alias(first, entity))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, category: &str) -> EntityRecord {
        let id = title.to_lowercase().replace(' ', "-");
        EntityRecord::new(title, id, category)
    }

    fn titles(dict: &Dictionary) -> Vec<&str> {
        dict.entries().iter().map(|e| e.entity.title.as_str()).collect()
    }

    #[test]
    fn test_sorted_longest_first() {
        let dict = Dictionary::build(
            vec![record("Sol", "NPCs"), record("Sol Raven", "NPCs"), record("Ashfall", "Locations")],
            &AliasPolicy::default(),
        );
        assert_eq!(titles(&dict), vec!["Sol Raven", "Ashfall", "Sol"]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let dict = Dictionary::build(
            vec![record("Kael", "NPCs"), record("Vorn", "NPCs"), record("Mira", "NPCs")],
            &AliasPolicy::default(),
        );
        assert_eq!(titles(&dict), vec!["Kael", "Vorn", "Mira"]);
    }

    #[test]
    fn test_blank_and_duplicate_titles_dropped() {
        let dict = Dictionary::build(
            vec![record("Kael", "NPCs"), record("   ", "NPCs"), record("Kael", "Lore")],
            &AliasPolicy::default(),
        );
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.entries()[0].entity.category, "NPCs");
    }

    #[test]
    fn test_unique_first_name_becomes_alias() {
        let dict = Dictionary::build(
            vec![record("Jonas Crale", "NPCs"), record("Ashen Keep", "Locations")],
            &AliasPolicy::for_categories(["NPCs"]),
        );
        let alias = dict.get("Jonas").expect("alias registrado");
        assert_eq!(alias.canonical().title, "Jonas Crale");
        // categoria fora da política não gera alias
        assert!(dict.get("Ashen").is_none());
    }

    #[test]
    fn test_ambiguous_first_name_is_skipped() {
        let dict = Dictionary::build(
            vec![record("Mira Vale", "NPCs"), record("Mira Thorn", "NPCs")],
            &AliasPolicy::for_categories(["NPCs"]),
        );
        assert!(dict.get("Mira").is_none());
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_alias_never_shadows_full_title() {
        let dict = Dictionary::build(
            vec![record("Sol Raven", "NPCs"), record("Sol", "Lore")],
            &AliasPolicy::for_categories(["NPCs"]),
        );
        let sol = dict.get("Sol").unwrap();
        assert!(!sol.is_alias());
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_alias_min_len() {
        let dict = Dictionary::build(
            vec![record("Al Varro", "NPCs")],
            &AliasPolicy::for_categories(["NPCs"]),
        );
        assert!(dict.get("Al").is_none());
    }

    #[test]
    fn test_rebuild_replaces_snapshot() {
        let mut dict = Dictionary::build(vec![record("Kael", "NPCs")], &AliasPolicy::default());
        dict.rebuild(vec![record("Mira", "NPCs"), record("Ashfall", "Locations")]);
        assert_eq!(titles(&dict), vec!["Ashfall", "Mira"]);
    }

    #[test]
    fn test_special_characters_are_escaped() {
        let dict = Dictionary::build(
            vec![record("The (Old) Gate", "Locations"), record("Z+", "Lore")],
            &AliasPolicy::default(),
        );
        assert_eq!(dict.unmatchable(), 0);
        let spans = dict.find_mentions("Beyond The (Old) Gate lies ash.", "");
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].matched_text, "The (Old) Gate");
    }

    #[test]
    fn test_uncompilable_entries_fail_closed() {
        let dict = Dictionary::build_with_limit(
            vec![record("Jonas Crale", "NPCs"), record("Kael", "NPCs")],
            &AliasPolicy::default(),
            1,
        );
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.unmatchable(), 2);
        assert!(dict.find_mentions("Jonas Crale met Kael.", "").is_empty());
    }
}
