//! # Entidades do Compêndio
//!
//! Uma entidade é qualquer coisa nomeada no dataset (personagem, local, item,
//! sessão) que pode virar um link a partir de texto livre.
//!
//! Existem dois tipos de entrada no dicionário:
//!
//! | Tipo      | `title`                 | `alias_of`                    |
//! |-----------|-------------------------|-------------------------------|
//! | Canônica  | "Jonas Crale"           | `None`                        |
//! | Alias     | "Jonas"                 | `Some("Jonas Crale")`         |
//!
//! O alias herda `id` e `category` da entidade canônica, então o link gerado
//! aponta sempre para o artigo completo.

use serde::{Deserialize, Serialize};

/// Registro mínimo produzido pelo carregador de conteúdo.
///
/// É o formato "cru" vindo do dataset; o dicionário converte cada registro
/// em uma [`Entity`] canônica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub title: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub category: String,
}

impl EntityRecord {
    pub fn new(title: impl Into<String>, id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
            category: category.into(),
        }
    }
}

/// Uma entidade linkável.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Nome de exibição usado para casar o texto.
    pub title: String,
    /// Identificador do artigo de destino.
    pub id: String,
    /// Categoria do artigo de destino (ex: "NPCs", "Locations").
    pub category: String,
    /// Entidade canônica quando esta entrada é um alias.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias_of: Option<Box<Entity>>,
}

impl Entity {
    pub fn new(title: impl Into<String>, id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            id: id.into(),
            category: category.into(),
            alias_of: None,
        }
    }

    /// Cria um alias (ex: primeiro nome) que resolve para `target`.
    pub fn alias(name: impl Into<String>, target: &Entity) -> Self {
        let canonical = target.canonical().clone();
        Self {
            title: name.into(),
            id: canonical.id.clone(),
            category: canonical.category.clone(),
            alias_of: Some(Box::new(canonical)),
        }
    }

    pub fn is_alias(&self) -> bool {
        self.alias_of.is_some()
    }

    /// Entidade para a qual esta entrada resolve (ela mesma se canônica).
    pub fn canonical(&self) -> &Entity {
        match &self.alias_of {
            Some(target) => target.canonical(),
            None => self,
        }
    }

    /// Verdadeiro se o título próprio ou o canônico for igual a `title`.
    pub fn refers_to(&self, title: &str) -> bool {
        self.title == title || self.canonical().title == title
    }

    /// Tamanho do nome em caracteres (não bytes), usado na ordenação.
    pub fn name_len(&self) -> usize {
        self.title.chars().count()
    }
}

impl From<EntityRecord> for Entity {
    fn from(record: EntityRecord) -> Self {
        Entity::new(record.title, record.id, record.category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_resolves_to_canonical() {
        let jonas = Entity::new("Jonas Crale", "jonas-crale", "NPCs");
        let alias = Entity::alias("Jonas", &jonas);

        assert!(alias.is_alias());
        assert_eq!(alias.id, "jonas-crale");
        assert_eq!(alias.category, "NPCs");
        assert_eq!(alias.canonical().title, "Jonas Crale");
    }

    #[test]
    fn test_alias_of_alias_flattens() {
        let sol = Entity::new("Sol Raven", "sol", "NPCs");
        let first = Entity::alias("Sol", &sol);
        let second = Entity::alias("S", &first);

        assert_eq!(second.alias_of.as_deref(), Some(&sol));
    }

    #[test]
    fn test_refers_to() {
        let kael = Entity::new("Kael Dorn", "kael", "NPCs");
        let alias = Entity::alias("Kael", &kael);

        assert!(alias.refers_to("Kael"));
        assert!(alias.refers_to("Kael Dorn"));
        assert!(!alias.refers_to("Dorn"));
        assert!(!kael.refers_to("Kael"));
    }

    #[test]
    fn test_name_len_counts_chars() {
        let e = Entity::new("Ærin", "aerin", "NPCs");
        assert_eq!(e.name_len(), 4);
    }
}
