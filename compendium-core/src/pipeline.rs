//! # Pipeline de Links: Orquestrador com Eventos Observáveis
//!
//! Executa o matcher emitindo eventos em cada passo via um canal Rust
//! (`mpsc`), permitindo que o servidor WebSocket mostre ao cliente, em tempo
//! real, quais candidatos foram encontrados e por que alguns foram
//! descartados.

use std::sync::mpsc;

use serde::{Deserialize, Serialize};

use crate::annotate::Annotator;
use crate::matcher::{scan, MatchSpan, Verdict};

/// Eventos emitidos pelo pipeline durante o processamento.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PipelineEvent {
    /// **Passo 1**: snapshot do dicionário usado nesta chamada.
    DictionaryReady {
        entries: usize,
        unmatchable: usize,
    },
    /// **Passo 2**: uma regra casou em algum ponto do texto.
    CandidateFound {
        start: usize,
        end: usize,
        text: String,
        title: String,
    },
    /// **Passo 3a**: candidato descartado (sobreposição ou apóstrofo).
    CandidateRejected {
        start: usize,
        end: usize,
        title: String,
        reason: Verdict,
    },
    /// **Passo 3b**: candidato aceito como link.
    SpanAccepted {
        span: MatchSpan,
    },
    /// **Conclusão**: trechos finais ordenados por posição.
    Done {
        spans: Vec<MatchSpan>,
        processing_ms: u64,
    },
    /// Texto ignorado (curto demais para análise).
    Skipped {
        reason: String,
    },
}

/// Pipeline de auto-link.
///
/// # Modos de Uso
/// - **Sync**: [`LinkPipeline::analyze`] para chamadas diretas.
/// - **Streaming**: [`LinkPipeline::analyze_streaming`] para UIs reativas (via WebSocket).
pub struct LinkPipeline {
    pub annotator: Annotator,
}

impl LinkPipeline {
    pub fn new(annotator: Annotator) -> Self {
        Self { annotator }
    }

    /// Processa o texto de forma síncrona e retorna apenas os trechos finais.
    pub fn analyze(&self, text: &str, exclude_title: &str) -> Vec<MatchSpan> {
        let (tx, rx) = mpsc::channel();
        self.analyze_streaming(text, exclude_title, tx);
        let mut spans = vec![];

        while let Ok(event) = rx.recv() {
            if let PipelineEvent::Done { spans: done, .. } = event {
                spans = done;
            }
        }
        spans
    }

    /// Executa o matcher enviando eventos de progresso pelo canal `tx`.
    ///
    /// # Fluxo de Eventos
    /// 1. `DictionaryReady`
    /// 2. `CandidateFound` seguido de `CandidateRejected` ou `SpanAccepted` (loop)
    /// 3. `Done` (ou `Skipped` + `Done` vazio para textos curtos)
    pub fn analyze_streaming(&self, text: &str, exclude_title: &str, tx: mpsc::Sender<PipelineEvent>) {
        let start = std::time::Instant::now();
        let dictionary = self.annotator.dictionary();

        let _ = tx.send(PipelineEvent::DictionaryReady {
            entries: dictionary.len(),
            unmatchable: dictionary.unmatchable(),
        });

        if !self.annotator.accepts(text) {
            let _ = tx.send(PipelineEvent::Skipped {
                reason: "texto curto demais".to_string(),
            });
            let _ = tx.send(PipelineEvent::Done {
                spans: vec![],
                processing_ms: start.elapsed().as_millis() as u64,
            });
            return;
        }

        let spans = scan(text, exclude_title, dictionary, |candidate, verdict| {
            let _ = tx.send(PipelineEvent::CandidateFound {
                start: candidate.start,
                end: candidate.end,
                text: candidate.text.to_string(),
                title: candidate.entity.title.clone(),
            });
            let event = match verdict {
                Verdict::Accepted => PipelineEvent::SpanAccepted {
                    span: MatchSpan {
                        start: candidate.start,
                        end: candidate.end,
                        matched_text: candidate.text.to_string(),
                        entity: candidate.entity.clone(),
                    },
                },
                reason => PipelineEvent::CandidateRejected {
                    start: candidate.start,
                    end: candidate.end,
                    title: candidate.entity.title.clone(),
                    reason,
                },
            };
            let _ = tx.send(event);
        });

        let _ = tx.send(PipelineEvent::Done {
            spans,
            processing_ms: start.elapsed().as_millis() as u64,
        });
    }
}
