//! # Matcher de Entidades
//!
//! Dado um texto, o título sendo renderizado e o dicionário ordenado, retorna o
//! maior conjunto de menções sem sobreposição.
//!
//! ## Algoritmo (guloso, maior nome primeiro)
//!
//! 1. Percorre as entradas na ordem do dicionário (nomes mais longos primeiro).
//! 2. Pula entradas que se referem ao título excluído (sem auto-link).
//! 3. Para cada ocorrência da regra da entrada:
//!    - rejeita se o caractere anterior for um apóstrofo (`Vor'Kael` não
//!      menciona `Kael`);
//!    - rejeita se `[start, end)` intersecta qualquer trecho já aceito.
//! 4. Candidatos rejeitados são descartados, nunca retentados.
//! 5. Ordena o resultado por posição.
//!
//! O dicionário é emprestado de forma imutável durante toda a chamada, então
//! é um snapshot: quem reconstrói o dicionário precisa de `&mut` e não pode
//! fazê-lo com uma chamada em andamento.

use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::entity::Entity;

/// Trecho do texto atribuído a uma entidade.
///
/// `start` e `end` são offsets em bytes no texto UTF-8 (intervalo semiaberto).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
    /// Texto exatamente como aparece (inclui o possessivo, se houver).
    pub matched_text: String,
    pub entity: Entity,
}

impl MatchSpan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Verdadeiro se `[start, end)` intersecta este trecho.
    ///
    /// Cobre sobreposição parcial à esquerda/direita e contenção nos dois
    /// sentidos.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        start < self.end && self.start < end
    }
}

/// Motivo pelo qual um candidato foi aceito ou descartado.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    /// Intersecta um trecho já aceito (de um nome mais longo ou anterior).
    Overlap,
    /// Precedido por apóstrofo, parte de um nome composto.
    ApostrophePrefix,
}

/// Uma ocorrência encontrada pela regra de uma entrada, antes da decisão.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub start: usize,
    pub end: usize,
    pub text: &'a str,
    pub entity: &'a Entity,
}

const APOSTROPHES: [char; 2] = ['\'', '\u{2019}'];

/// Encontra as menções de entidades em `text`.
///
/// Texto vazio ou dicionário vazio produzem `[]`.
pub fn find_mentions(text: &str, exclude_title: &str, dictionary: &Dictionary) -> Vec<MatchSpan> {
    scan(text, exclude_title, dictionary, |_, _| {})
}

/// Mesmo algoritmo de [`find_mentions`], reportando cada candidato e seu veredito.
///
/// O observador é chamado na ordem de processamento (ordem do dicionário,
/// depois posição no texto).
pub fn scan<F>(text: &str, exclude_title: &str, dictionary: &Dictionary, mut observer: F) -> Vec<MatchSpan>
where
    F: FnMut(&Candidate<'_>, Verdict),
{
    let mut accepted: Vec<MatchSpan> = Vec::new();
    if text.is_empty() || dictionary.is_empty() {
        return accepted;
    }

    for entry in dictionary.entries() {
        if !exclude_title.is_empty() && entry.entity.refers_to(exclude_title) {
            continue;
        }
        let Some(pattern) = entry.pattern() else {
            continue;
        };

        let mut at = 0;
        while let Some(m) = pattern.find_at(text, at) {
            let candidate = Candidate {
                start: m.start(),
                end: m.end(),
                text: m.as_str(),
                entity: &entry.entity,
            };

            let verdict = if preceded_by_apostrophe(text, m.start()) {
                Verdict::ApostrophePrefix
            } else if accepted.iter().any(|s| s.overlaps(m.start(), m.end())) {
                Verdict::Overlap
            } else {
                Verdict::Accepted
            };

            observer(&candidate, verdict);

            if verdict == Verdict::Accepted {
                accepted.push(MatchSpan {
                    start: m.start(),
                    end: m.end(),
                    matched_text: m.as_str().to_string(),
                    entity: entry.entity.clone(),
                });
            }

            // um candidato após apóstrofo nunca casou: a busca volta logo após o seu início
            at = if verdict == Verdict::ApostrophePrefix || m.is_empty() {
                next_char_boundary(text, m.start())
            } else {
                m.end()
            };
            if at > text.len() {
                break;
            }
        }
    }

    accepted.sort_by_key(|s| s.start);
    accepted
}

fn next_char_boundary(text: &str, index: usize) -> usize {
    text[index..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| index + c.len_utf8())
}

fn preceded_by_apostrophe(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .next_back()
        .map(|c| APOSTROPHES.contains(&c))
        .unwrap_or(false)
}
