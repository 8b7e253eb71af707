//! # Anotação de Texto
//!
//! Camada entre o matcher puro e a apresentação. O matcher só devolve trechos;
//! aqui eles viram segmentos (texto/link) que qualquer renderizador
//! (HTML, terminal, árvore de UI) consegue montar sem recalcular offsets.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::dictionary::{AliasPolicy, Dictionary};
use crate::entity::EntityRecord;
use crate::matcher::{find_mentions, MatchSpan};

/// Textos cujo tamanho (sem espaços nas bordas) fica abaixo disto não são analisados.
pub const DEFAULT_MIN_TEXT_LEN: usize = 3;

/// Pedaço de um texto anotado.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Link(&'a MatchSpan),
}

impl<'a> Segment<'a> {
    /// Texto original coberto pelo segmento.
    pub fn as_str(&self) -> &'a str {
        match self {
            Segment::Text(t) => t,
            Segment::Link(span) => span.matched_text.as_str(),
        }
    }
}

/// Divide `text` em segmentos de texto e link.
///
/// Os trechos precisam estar ordenados e sem sobreposição (como saem do
/// matcher). Concatenar os segmentos reproduz `text` exatamente.
pub fn splice<'a>(text: &'a str, spans: &'a [MatchSpan]) -> Vec<Segment<'a>> {
    let mut segments = Vec::with_capacity(spans.len() * 2 + 1);
    let mut cursor = 0;

    for span in spans {
        if span.start < cursor || span.end > text.len() {
            continue;
        }
        if span.start > cursor {
            segments.push(Segment::Text(&text[cursor..span.start]));
        }
        segments.push(Segment::Link(span));
        cursor = span.end;
    }
    if cursor < text.len() {
        segments.push(Segment::Text(&text[cursor..]));
    }
    segments
}

/// Resultado da anotação de um bloco de texto.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Annotation {
    pub spans: Vec<MatchSpan>,
}

impl Annotation {
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    pub fn segments<'a>(&'a self, text: &'a str) -> Vec<Segment<'a>> {
        splice(text, &self.spans)
    }
}

/// Dono do dicionário e ponto de entrada para anotar textos.
#[derive(Debug, Clone, Default)]
pub struct Annotator {
    dictionary: Dictionary,
    min_text_len: usize,
}

impl Annotator {
    pub fn new(dictionary: Dictionary) -> Self {
        Self {
            dictionary,
            min_text_len: DEFAULT_MIN_TEXT_LEN,
        }
    }

    pub fn from_records<I>(records: I, policy: &AliasPolicy) -> Self
    where
        I: IntoIterator<Item = EntityRecord>,
    {
        Self::new(Dictionary::build(records, policy))
    }

    pub fn with_min_text_len(mut self, min_text_len: usize) -> Self {
        self.min_text_len = min_text_len;
        self
    }

    pub fn dictionary(&self) -> &Dictionary {
        &self.dictionary
    }

    /// Reconstrói o dicionário (ex: após recarregar o dataset).
    pub fn rebuild<I>(&mut self, records: I)
    where
        I: IntoIterator<Item = EntityRecord>,
    {
        self.dictionary.rebuild(records);
    }

    /// Verdadeiro se o texto é longo o bastante para ser analisado.
    pub fn accepts(&self, text: &str) -> bool {
        text.trim().chars().count() >= self.min_text_len
    }

    pub fn annotate(&self, text: &str, exclude_title: &str) -> Annotation {
        if !self.accepts(text) {
            return Annotation::default();
        }
        Annotation {
            spans: find_mentions(text, exclude_title, &self.dictionary),
        }
    }

    /// Anota vários blocos em paralelo; a saída segue a ordem da entrada.
    pub fn annotate_batch<S>(&self, blocks: &[S], exclude_title: &str) -> Vec<Annotation>
    where
        S: AsRef<str> + Sync,
    {
        blocks
            .par_iter()
            .map(|block| self.annotate(block.as_ref(), exclude_title))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotator(titles: &[&str]) -> Annotator {
        Annotator::from_records(
            titles.iter().map(|t| EntityRecord::new(*t, t.to_lowercase(), "NPCs")),
            &AliasPolicy::default(),
        )
    }

    #[test]
    fn test_splice_reconstructs_text() {
        let a = annotator(&["Jonas", "Jonas Crale"]);
        let text = "Jonas Crale spoke to Jonas about the plan.";
        let annotation = a.annotate(text, "");
        let segments = annotation.segments(text);

        let rebuilt: String = segments.iter().map(|s| s.as_str()).collect();
        assert_eq!(rebuilt, text);
        assert!(matches!(segments[0], Segment::Link(s) if s.entity.title == "Jonas Crale"));
        assert_eq!(segments[1], Segment::Text(" spoke to "));
        assert!(matches!(segments[2], Segment::Link(s) if s.entity.title == "Jonas"));
        assert_eq!(segments[3], Segment::Text(" about the plan."));
    }

    #[test]
    fn test_splice_without_spans() {
        assert_eq!(splice("nada aqui", &[]), vec![Segment::Text("nada aqui")]);
        assert!(splice("", &[]).is_empty());
    }

    #[test]
    fn test_short_text_skipped() {
        let a = annotator(&["Al"]);
        assert!(a.annotate(" Al ", "").is_empty());
        let a = a.with_min_text_len(0);
        assert_eq!(a.annotate(" Al ", "").spans.len(), 1);
    }

    #[test]
    fn test_batch_preserves_order() {
        let a = annotator(&["Kael", "Mira"]);
        let blocks = vec!["Mira waits.", "nobody", "Kael's oath"];
        let out = a.annotate_batch(&blocks, "");
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].spans[0].entity.title, "Mira");
        assert!(out[1].is_empty());
        assert_eq!(out[2].spans[0].matched_text, "Kael's");
    }

    #[test]
    fn test_rebuild_changes_results() {
        let mut a = annotator(&["Kael"]);
        assert_eq!(a.annotate("Kael and Mira", "").spans.len(), 1);
        a.rebuild(vec![EntityRecord::new("Mira", "mira", "NPCs")]);
        let spans = a.annotate("Kael and Mira", "").spans;
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].entity.title, "Mira");
    }
}
