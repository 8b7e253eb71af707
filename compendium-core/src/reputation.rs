//! # Rastreador de Reputação
//!
//! Reputação de cada personagem do grupo com os NPCs, em faixas no estilo de
//! MMO. O valor bruto vai de 0 a [`MAX_REPUTATION`]; cada faixa tem um
//! intervalo `[min, max)`.
//!
//! | Faixa      | Intervalo       |
//! |------------|-----------------|
//! | Hated      | 0 – 3000        |
//! | Hostile    | 3000 – 6000     |
//! | Unfriendly | 6000 – 9000     |
//! | Neutral    | 9000 – 15000    |
//! | Cordial    | 15000 – 21000   |
//! | Friendly   | 21000 – 33000   |
//! | Trusted    | 33000 – 45000   |
//! | Devoted    | 45000 – 51000   |
//! | Soulbound  | 51000 – 57000   |

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CompendiumError, Result};

pub const MAX_REPUTATION: i64 = 57_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Tier {
    pub name: &'static str,
    pub min: i64,
    pub max: i64,
    /// Sufixo de classe CSS.
    pub class: &'static str,
}

pub static TIERS: [Tier; 9] = [
    Tier { name: "Hated", min: 0, max: 3_000, class: "hated" },
    Tier { name: "Hostile", min: 3_000, max: 6_000, class: "hostile" },
    Tier { name: "Unfriendly", min: 6_000, max: 9_000, class: "unfriendly" },
    Tier { name: "Neutral", min: 9_000, max: 15_000, class: "neutral" },
    Tier { name: "Cordial", min: 15_000, max: 21_000, class: "cordial" },
    Tier { name: "Friendly", min: 21_000, max: 33_000, class: "friendly" },
    Tier { name: "Trusted", min: 33_000, max: 45_000, class: "trusted" },
    Tier { name: "Devoted", min: 45_000, max: 51_000, class: "devoted" },
    Tier { name: "Soulbound", min: 51_000, max: 57_000, class: "soulbound" },
];

/// Maior faixa cujo mínimo já foi atingido (valores negativos caem em Hated).
pub fn tier_for(reputation: i64) -> &'static Tier {
    TIERS
        .iter()
        .rev()
        .find(|t| reputation >= t.min)
        .unwrap_or(&TIERS[0])
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Progress {
    pub current: i64,
    pub needed: i64,
    pub percentage: f64,
}

/// Progresso dentro da faixa atual. Na última faixa o percentual satura em 100.
pub fn progress(reputation: i64) -> Progress {
    let tier = tier_for(reputation);
    let needed = tier.max - tier.min;
    let current = reputation - tier.min;
    let mut percentage = current as f64 / needed as f64 * 100.0;
    if std::ptr::eq(tier, &TIERS[TIERS.len() - 1]) {
        percentage = percentage.min(100.0);
    }
    Progress {
        current,
        needed,
        percentage,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub change: i64,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unlock {
    pub threshold: i64,
    pub reward: String,
}

/// Recompensa como a interface a mostra: oculta até atingir o limiar.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlockView {
    pub tier: &'static str,
    pub reward: Option<String>,
    pub unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub name: String,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub reputation: i64,
    #[serde(default)]
    pub permanent_enemy: bool,
    #[serde(default)]
    pub romance_available: bool,
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(default)]
    pub dislikes: Vec<String>,
    #[serde(default)]
    pub history: Vec<HistoryEntry>,
    #[serde(default)]
    pub unlocks: Vec<Unlock>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portrait: Option<String>,
}

impl Relationship {
    pub fn tier(&self) -> &'static Tier {
        tier_for(self.reputation)
    }

    pub fn progress(&self) -> Progress {
        progress(self.reputation)
    }

    /// As três entradas mais recentes do histórico.
    pub fn recent_history(&self) -> &[HistoryEntry] {
        &self.history[..self.history.len().min(3)]
    }

    pub fn unlock_view(&self) -> Vec<UnlockView> {
        self.unlocks
            .iter()
            .map(|u| {
                let unlocked = self.reputation >= u.threshold;
                UnlockView {
                    tier: tier_for(u.threshold).name,
                    reward: unlocked.then(|| u.reward.clone()),
                    unlocked,
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterSheet {
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Relações de todos os personagens do grupo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationshipSheet {
    pub characters: BTreeMap<String, CharacterSheet>,
}

impl Default for RelationshipSheet {
    /// Grupo padrão com listas vazias.
    fn default() -> Self {
        Self {
            characters: ["jonas", "sol", "fursen"]
                .iter()
                .map(|c| (c.to_string(), CharacterSheet::default()))
                .collect(),
        }
    }
}

impl RelationshipSheet {
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Lê o arquivo de relações; se faltar ou for inválido, usa o padrão.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let loaded = std::fs::read_to_string(path)
            .map_err(CompendiumError::from)
            .and_then(|json| Self::from_json_str(&json));
        match loaded {
            Ok(sheet) => sheet,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "Relações indisponíveis, usando padrão");
                Self::default()
            }
        }
    }

    /// Relações de um personagem filtradas por categoria (`"all"` não filtra).
    ///
    /// Inimigos permanentes vêm primeiro; depois ordem decrescente de reputação.
    pub fn roster(&self, character: &str, filter: &str) -> Option<Vec<&Relationship>> {
        let sheet = self.characters.get(character)?;
        let mut list: Vec<&Relationship> = sheet
            .relationships
            .iter()
            .filter(|r| filter == "all" || r.category == filter)
            .collect();
        list.sort_by(|a, b| {
            b.permanent_enemy
                .cmp(&a.permanent_enemy)
                .then(b.reputation.cmp(&a.reputation))
        });
        Some(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(tier_for(-500).name, "Hated");
        assert_eq!(tier_for(0).name, "Hated");
        assert_eq!(tier_for(2_999).name, "Hated");
        assert_eq!(tier_for(3_000).name, "Hostile");
        assert_eq!(tier_for(14_999).name, "Neutral");
        assert_eq!(tier_for(51_000).name, "Soulbound");
        assert_eq!(tier_for(90_000).name, "Soulbound");
    }

    #[test]
    fn test_progress_within_tier() {
        let p = progress(12_000);
        assert_eq!((p.current, p.needed), (3_000, 6_000));
        assert!((p.percentage - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_progress_capped_at_top() {
        let p = progress(70_000);
        assert_eq!(p.percentage, 100.0);
        assert_eq!(progress(MAX_REPUTATION).percentage, 100.0);
    }

    fn sheet() -> RelationshipSheet {
        RelationshipSheet::from_json_str(
            r#"{
                "jonas": {"relationships": [
                    {"name": "Mira", "type": "Ally", "category": "npc", "reputation": 22000,
                     "unlocks": [{"threshold": 21000, "reward": "Safehouse"}, {"threshold": 45000, "reward": "Her blade"}]},
                    {"name": "Vorn", "type": "Rival", "category": "npc", "reputation": 40000, "permanentEnemy": true},
                    {"name": "The Ashen Court", "type": "Faction", "category": "faction", "reputation": 9000}
                ]}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_roster_sorting_and_filter() {
        let s = sheet();
        let all: Vec<&str> = s.roster("jonas", "all").unwrap().iter().map(|r| r.name.as_str()).collect();
        assert_eq!(all, vec!["Vorn", "Mira", "The Ashen Court"]);

        let factions = s.roster("jonas", "faction").unwrap();
        assert_eq!(factions.len(), 1);
        assert!(s.roster("sol", "all").is_none());
    }

    #[test]
    fn test_unlock_view_hides_future_rewards() {
        let s = sheet();
        let mira = &s.characters["jonas"].relationships[0];
        let view = mira.unlock_view();
        assert_eq!(view[0].reward.as_deref(), Some("Safehouse"));
        assert_eq!(view[0].tier, "Friendly");
        assert!(!view[1].unlocked);
        assert_eq!(view[1].reward, None);
        assert_eq!(view[1].tier, "Devoted");
    }

    #[test]
    fn test_missing_file_uses_default_party() {
        let sheet = RelationshipSheet::load_or_default("/nonexistent/relationships-data.json");
        assert_eq!(sheet.characters.len(), 3);
        assert!(sheet.roster("fursen", "all").unwrap().is_empty());
    }
}
