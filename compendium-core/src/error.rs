//! Tipos de erro do compêndio.
//!
//! Apenas carregamento e persistência falham. O matcher nunca retorna erro:
//! uma entrada que não compila vira "não casável" e o lote continua.

use thiserror::Error;

/// Resultado padrão das operações de I/O do crate.
pub type Result<T> = std::result::Result<T, CompendiumError>;

#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CompendiumError {
    /// Falha de leitura/escrita em disco.
    #[error("Erro de I/O: {0}")]
    Io(#[from] std::io::Error),

    /// JSON malformado (dataset, bookmarks ou reputação).
    #[error("JSON inválido: {0}")]
    Json(#[from] serde_json::Error),

    /// O JSON é válido mas não tem o formato esperado.
    #[error("Dados inválidos: {0}")]
    InvalidData(String),
}

impl CompendiumError {
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        CompendiumError::InvalidData(msg.into())
    }
}
