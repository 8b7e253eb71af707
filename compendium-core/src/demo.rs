//! # Dados de Demonstração
//!
//! Compêndio pequeno embutido no binário, usado quando nenhum `data.json` é
//! configurado e como fixture nos testes. Cobre os casos interessantes do
//! auto-link: nome composto contendo nome curto ("Sol Raven" / "Sol"),
//! possessivo ("Sol Raven's") e nome com apóstrofo ("Vor'Kael" / "Kael").

use crate::content::Compendium;
use crate::error::Result;

/// JSON no mesmo formato do `data.json` exportado pelo site.
pub const DEMO_DATA: &str = include_str!("../data/demo.json");

pub fn demo_compendium() -> Result<Compendium> {
    Compendium::from_json_str(DEMO_DATA)
}

/// Textos livres para testar o auto-link na interface.
pub fn demo_texts() -> Vec<(&'static str, &'static str)> {
    vec![
        (
            "Sessão 12",
            "Jonas Crale led the party out of Emberfall at dawn. Kael's axe was still notched from the fight at Vor'Kael, and Sol Raven refused to speak until the Hollow Throne was out of sight.",
        ),
        (
            "Rumores",
            "Some say Sol itself dims whenever Sol Raven weeps. Others swear Jonas sold a forged map of the Hollow Throne to Kael.",
        ),
        (
            "Diário",
            "Nobody in Vor'Kael remembers Kael. The templars of Emberfall remember Jonas Crale's oath all too well.",
        ),
    ]
}
