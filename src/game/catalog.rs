//! Static item catalog and the seed character roster.

use super::types::{CharacterRecord, Item, ItemKind};

pub const HEALING_POTION_ID: &str = "potion_heal";

pub const ITEMS: &[Item] = &[
    Item {
        id: HEALING_POTION_ID,
        name: "Poção de Cura",
        kind: ItemKind::Potion,
    },
    Item {
        id: "short_sword",
        name: "Espada Curta",
        kind: ItemKind::Weapon,
    },
    Item {
        id: "leather_armor",
        name: "Armadura de Couro",
        kind: ItemKind::Armor,
    },
    Item {
        id: "wooden_shield",
        name: "Escudo de Madeira",
        kind: ItemKind::Armor,
    },
];

pub fn item(id: &str) -> Option<&'static Item> {
    ITEMS.iter().find(|item| item.id == id)
}

/// Display name for an item id, falling back to the id for items missing from the catalog.
pub fn item_name(id: &str) -> String {
    item(id)
        .map(|i| i.name.to_string())
        .unwrap_or_else(|| id.to_string())
}

pub fn default_loot_table() -> Vec<String> {
    vec![
        HEALING_POTION_ID.to_string(),
        HEALING_POTION_ID.to_string(),
        "short_sword".to_string(),
        "leather_armor".to_string(),
        "wooden_shield".to_string(),
    ]
}

pub fn default_flavor_texts() -> Vec<String> {
    [
        "Nothing here.",
        "You hear a distant whisper...",
        "The wind carries a smell of danger.",
        "You find old footprints.",
        "The ground here looks recently disturbed.",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

pub const ENCOUNTER_TEXTS: &[&str] = &[
    "A monster leaps out of the shadows!",
    "Something growls behind you. A monster attacks!",
    "A hulking beast blocks the path!",
];

/// Roster inserted into an empty store.
pub fn starter_characters() -> Vec<CharacterRecord> {
    vec![
        CharacterRecord::new(1, "Arthas", "Guerreiro", 12, 8, 100),
        CharacterRecord::new(2, "Lyra", "Arqueira", 14, 5, 90),
        CharacterRecord::new(3, "Thorin", "Paladino", 10, 12, 100),
        CharacterRecord::new(4, "Merlin", "Mago", 16, 3, 80),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_ids_are_unique_and_loot_is_known() {
        for (i, a) in ITEMS.iter().enumerate() {
            assert!(ITEMS[i + 1..].iter().all(|b| b.id != a.id), "dup {}", a.id);
        }
        for id in default_loot_table() {
            assert!(item(&id).is_some(), "loot item {} missing", id);
        }
        assert_eq!(item(HEALING_POTION_ID).map(|i| i.kind), Some(ItemKind::Potion));
        assert_eq!(item_name("mystery"), "mystery");
    }
}
