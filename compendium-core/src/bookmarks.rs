//! # Favoritos
//!
//! Lista de artigos marcados pelo leitor, persistida como um array JSON em
//! disco. Cada alteração grava o arquivo inteiro (a lista é pequena).

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::content::Article;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub category: String,
    pub id: String,
    pub title: String,
    /// Momento da marcação, em milissegundos desde a época Unix.
    pub timestamp: i64,
}

/// Resultado de [`BookmarkStore::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    Added,
    Removed,
}

#[derive(Debug)]
pub struct BookmarkStore {
    path: PathBuf,
    bookmarks: Vec<Bookmark>,
}

impl BookmarkStore {
    /// Abre o arquivo de favoritos; arquivo ausente equivale a lista vazia.
    ///
    /// Conteúdo corrompido também vira lista vazia (com aviso), como faria
    /// um armazenamento local do navegador limpo.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let bookmarks = match std::fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(list) => list,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "Favoritos ilegíveis, começando do zero");
                    Vec::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(err.into()),
        };
        debug!(path = %path.display(), count = bookmarks.len(), "Favoritos abertos");
        Ok(Self { path, bookmarks })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn is_bookmarked(&self, category: &str, id: &str) -> bool {
        self.position(category, id).is_some()
    }

    /// Marca ou desmarca o artigo e grava o arquivo.
    ///
    /// Se a gravação falhar, a lista em memória fica como estava.
    pub fn toggle(&mut self, category: &str, article: &Article) -> Result<Toggle> {
        let mut updated = self.bookmarks.clone();
        let outcome = match self.position(category, &article.id) {
            Some(index) => {
                updated.remove(index);
                Toggle::Removed
            }
            None => {
                updated.push(Bookmark {
                    category: category.to_string(),
                    id: article.id.clone(),
                    title: article.title.clone(),
                    timestamp: Utc::now().timestamp_millis(),
                });
                Toggle::Added
            }
        };
        write(&self.path, &updated)?;
        self.bookmarks = updated;
        Ok(outcome)
    }

    fn position(&self, category: &str, id: &str) -> Option<usize> {
        self.bookmarks
            .iter()
            .position(|b| b.category == category && b.id == id)
    }
}

fn write(path: &Path, bookmarks: &[Bookmark]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    std::fs::write(path, serde_json::to_string_pretty(bookmarks)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, title: &str) -> Article {
        Article {
            id: id.to_string(),
            title: title.to_string(),
            ..Article::default()
        }
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = BookmarkStore::open(dir.path().join("bookmarks.json")).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_toggle_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bookmarks.json");
        let kael = article("kael", "Kael");

        let mut store = BookmarkStore::open(&path).unwrap();
        assert_eq!(store.toggle("NPCs", &kael).unwrap(), Toggle::Added);
        assert!(store.is_bookmarked("NPCs", "kael"));
        assert!(!store.is_bookmarked("Lore", "kael"));

        let reopened = BookmarkStore::open(&path).unwrap();
        assert_eq!(reopened.list().len(), 1);
        assert_eq!(reopened.list()[0].title, "Kael");
        assert!(reopened.list()[0].timestamp > 0);

        assert_eq!(store.toggle("NPCs", &kael).unwrap(), Toggle::Removed);
        let reopened = BookmarkStore::open(&path).unwrap();
        assert!(reopened.list().is_empty());
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");
        std::fs::write(&path, "not json").unwrap();
        let store = BookmarkStore::open(&path).unwrap();
        assert!(store.list().is_empty());
    }

    #[test]
    fn test_failed_write_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.json");
        let mut store = BookmarkStore::open(&path).unwrap();
        // um diretório no lugar do arquivo faz a gravação falhar
        std::fs::create_dir(&path).unwrap();

        assert!(store.toggle("NPCs", &article("kael", "Kael")).is_err());
        assert!(!store.is_bookmarked("NPCs", "kael"));
        assert!(store.list().is_empty());
    }
}
