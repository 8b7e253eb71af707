//! # compendium-core: Auto-link de Entidades do Compêndio
//!
//! Este crate implementa o núcleo do compêndio da campanha: dado o dataset de
//! artigos (NPCs, locais, sessões, lore), encontra menções a entidades
//! conhecidas em texto livre e as entrega, como trechos, para quem for
//! desenhar os links.
//!
//! ## Arquitetura do Sistema
//!
//! O dado flui em um pipeline linear:
//!
//! 1.  **Conteúdo** ([`content`]): `data.json` → [`Compendium`] → registros de entidade.
//! 2.  **Dicionário** ([`dictionary`]): registros → entradas ordenadas (maior nome primeiro),
//!     com aliases de primeiro nome opcionais e regras regex compiladas uma vez.
//! 3.  **Matcher** ([`matcher`]): texto + título excluído + dicionário → [`MatchSpan`]s
//!     sem sobreposição.
//! 4.  **Apresentação** ([`annotate`], [`markup`]): trechos → segmentos texto/link,
//!     aplicados só ao texto fora de links, títulos e código.
//!
//! O restante do compêndio (busca, favoritos, reputação) vive em módulos
//! independentes que só compartilham o modelo de conteúdo.
//!
//! ## Exemplo de Uso
//!
//! ```rust
//! use compendium_core::{AliasPolicy, Annotator, EntityRecord};
//!
//! let annotator = Annotator::from_records(
//!     vec![
//!         EntityRecord::new("Jonas", "jonas", "NPCs"),
//!         EntityRecord::new("Jonas Crale", "jonas-crale", "NPCs"),
//!     ],
//!     &AliasPolicy::default(),
//! );
//!
//! let annotation = annotator.annotate("Jonas Crale spoke to Jonas about the plan.", "");
//! let spans: Vec<(usize, usize)> = annotation.spans.iter().map(|s| (s.start, s.end)).collect();
//! assert_eq!(spans, vec![(0, 11), (21, 26)]);
//! ```

pub mod annotate;
pub mod bookmarks;
pub mod content;
pub mod demo;
pub mod dictionary;
pub mod entity;
pub mod error;
pub mod markup;
pub mod matcher;
pub mod pipeline;
pub mod reputation;
pub mod search;

pub use annotate::{splice, Annotation, Annotator, Segment};
pub use content::{Article, Compendium};
pub use dictionary::{AliasPolicy, Dictionary};
pub use entity::{Entity, EntityRecord};
pub use error::{CompendiumError, Result};
pub use matcher::{find_mentions, MatchSpan};
pub use pipeline::{LinkPipeline, PipelineEvent};
