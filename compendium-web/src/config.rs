//! Configuração do servidor via linha de comando ou variáveis de ambiente.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use compendium_core::search::DEFAULT_LIMIT;

#[derive(Debug, Clone, Parser)]
#[command(name = "compendium-web", about = "Servidor do compêndio com auto-link de entidades")]
pub struct Config {
    /// Dataset `data.json`; sem ele o compêndio de demonstração é servido.
    #[arg(long, env = "COMPENDIUM_DATA")]
    pub data: Option<PathBuf>,

    /// Arquivo `relationships-data.json` do rastreador de reputação.
    #[arg(long, env = "COMPENDIUM_RELATIONSHIPS")]
    pub relationships: Option<PathBuf>,

    /// Onde os favoritos são gravados.
    #[arg(long, env = "COMPENDIUM_BOOKMARKS", default_value = "bookmarks.json")]
    pub bookmarks: PathBuf,

    /// Pasta de arquivos estáticos servida em `/static`.
    #[arg(long, env = "COMPENDIUM_STATIC", default_value = "static")]
    pub static_dir: PathBuf,

    #[arg(long, env = "COMPENDIUM_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Categorias cujos primeiros nomes viram alias (separadas por vírgula).
    #[arg(long, env = "COMPENDIUM_ALIAS_CATEGORIES", value_delimiter = ',')]
    pub alias_categories: Vec<String>,

    #[arg(long, env = "COMPENDIUM_SEARCH_LIMIT", default_value_t = DEFAULT_LIMIT)]
    pub search_limit: usize,

    /// Textos menores que isto (sem espaços nas bordas) não recebem links.
    #[arg(long, env = "COMPENDIUM_MIN_TEXT_LEN", default_value_t = 3)]
    pub min_text_len: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["compendium-web"]).unwrap();
        assert_eq!(config.search_limit, 15);
        assert_eq!(config.bind.port(), 3000);
        assert!(config.data.is_none());
    }

    #[test]
    fn test_alias_categories_split() {
        let config =
            Config::try_parse_from(["compendium-web", "--alias-categories", "NPCs,Party"]).unwrap();
        assert_eq!(config.alias_categories, vec!["NPCs", "Party"]);
    }
}
