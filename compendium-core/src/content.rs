//! # Conteúdo do Compêndio
//!
//! Modelo do dataset JSON exportado pelo site (`data.json`):
//!
//! ```text
//! {
//!   "<Categoria>": {
//!     "info": { "icon": "...", "description": "..." },
//!     "items": [ { "id", "title", "content", "raw", "frontmatter" } ],
//!     "subcategories": { "<Nome>": [ artigos... ] }
//!   }
//! }
//! ```
//!
//! A ordem das categorias é preservada (é a ordem da navegação e da busca).
//! Campos ausentes recebem valores padrão; só o formato geral é validado.

use std::path::Path;

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::info;

use crate::entity::EntityRecord;
use crate::error::{CompendiumError, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Metadados do cabeçalho Markdown de um artigo.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Frontmatter {
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub race: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub organ: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub allegiance: Option<String>,
}

/// Aceita string, número, booleano ou lista (unida por vírgula).
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    fn render(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) if s.trim().is_empty() => None,
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().filter_map(render).collect();
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join(", "))
                }
            }
            other => Some(other.to_string()),
        }
    }
    Ok(render(&Value::deserialize(deserializer)?))
}

/// Um artigo do compêndio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Article {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// Corpo em HTML.
    #[serde(default)]
    pub content: String,
    /// Corpo em texto puro (usado na busca).
    #[serde(default)]
    pub raw: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontmatter: Option<Frontmatter>,
    /// Campos não modelados, preservados na re-serialização.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Article {
    /// Pares (ícone, texto) exibidos sob o título, na ordem da página.
    pub fn meta_tags(&self) -> Vec<(&'static str, &str)> {
        let Some(fm) = &self.frontmatter else {
            return Vec::new();
        };
        [
            ("map-pin", &fm.parent),
            ("user", &fm.race),
            ("sword", &fm.class),
            ("shield", &fm.role),
            ("activity", &fm.status),
            ("heart", &fm.organ),
            ("map", &fm.domain),
            ("flag", &fm.allegiance),
        ]
        .into_iter()
        .filter_map(|(icon, value)| value.as_deref().map(|v| (icon, v)))
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Category {
    #[serde(default)]
    pub info: CategoryInfo,
    #[serde(default)]
    pub items: Vec<Article>,
    /// Subcategorias na ordem do dataset.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "ordered_subcategories",
        serialize_with = "serialize_subcategories"
    )]
    pub subcategories: Option<Vec<(String, Vec<Article>)>>,
}

fn ordered_subcategories<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<Vec<(String, Vec<Article>)>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(map) = Option::<Map<String, Value>>::deserialize(deserializer)? else {
        return Ok(None);
    };
    map.into_iter()
        .map(|(name, items)| {
            serde_json::from_value(items)
                .map(|articles| (name, articles))
                .map_err(serde::de::Error::custom)
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Some)
}

fn serialize_subcategories<S: Serializer>(
    subcategories: &Option<Vec<(String, Vec<Article>)>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    let Some(list) = subcategories else {
        return serializer.serialize_none();
    };
    let mut map = serializer.serialize_map(Some(list.len()))?;
    for (name, articles) in list {
        map.serialize_entry(name, articles)?;
    }
    map.end()
}

impl Category {
    /// Itens do topo seguidos dos itens de subcategorias.
    pub fn all_articles(&self) -> impl Iterator<Item = &Article> {
        self.items.iter().chain(
            self.subcategories
                .iter()
                .flatten()
                .flat_map(|(_, articles)| articles),
        )
    }

    /// Artigos anterior e seguinte entre os itens de topo, dando a volta nas pontas.
    ///
    /// Artigos de subcategoria não têm vizinhos.
    pub fn neighbors(&self, id: &str) -> Option<(&Article, &Article)> {
        let index = self.items.iter().position(|a| a.id == id)?;
        let len = self.items.len();
        Some((&self.items[(index + len - 1) % len], &self.items[(index + 1) % len]))
    }
}

/// O dataset completo, com categorias em ordem.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Compendium {
    categories: Vec<(String, Category)>,
}

impl Compendium {
    pub fn new(categories: Vec<(String, Category)>) -> Self {
        Self { categories }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(json)?)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(CompendiumError::invalid_data(
                "o dataset deve ser um objeto categoria → dados",
            ));
        };
        let mut categories = Vec::with_capacity(map.len());
        for (name, data) in map {
            let category: Category = serde_json::from_value(data).map_err(|e| {
                CompendiumError::invalid_data(format!("categoria '{}': {}", name, e))
            })?;
            categories.push((name, category));
        }
        Ok(Self { categories })
    }

    /// Lê e interpreta um `data.json` do disco.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)?;
        let compendium = Self::from_json_str(&json)?;
        info!(
            path = %path.display(),
            categories = compendium.categories.len(),
            articles = compendium.article_count(),
            "Compêndio carregado"
        );
        Ok(compendium)
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, &Category)> {
        self.categories.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    /// Artigos de topo (sem subcategorias), em ordem de categoria.
    pub fn articles(&self) -> impl Iterator<Item = (&str, &Article)> {
        self.categories
            .iter()
            .flat_map(|(name, c)| c.items.iter().map(move |a| (name.as_str(), a)))
    }

    pub fn article_count(&self) -> usize {
        self.categories
            .iter()
            .map(|(_, c)| c.all_articles().count())
            .sum()
    }

    /// Procura um artigo por id na categoria, incluindo subcategorias.
    pub fn find(&self, category: &str, id: &str) -> Option<&Article> {
        self.category(category)?.all_articles().find(|a| a.id == id)
    }

    /// Registros para o dicionário de auto-link.
    pub fn entity_records(&self) -> Vec<EntityRecord> {
        self.categories
            .iter()
            .flat_map(|(name, c)| {
                c.all_articles()
                    .map(move |a| EntityRecord::new(a.title.clone(), a.id.clone(), name.clone()))
            })
            .collect()
    }
}

impl Serialize for Compendium {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.categories.len()))?;
        for (name, category) in &self.categories {
            map.serialize_entry(name, category)?;
        }
        map.end()
    }
}
