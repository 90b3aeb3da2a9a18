/// Inventory ledger: item quantities held by one owner (a session).
use serde::{Deserialize, Serialize};

use super::catalog::{self, HEALING_POTION_ID};
use super::dice::Dice;
use super::types::{ItemKind, INVENTORY_SCHEMA_VERSION};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InventoryEntry {
    pub item_id: String,
    pub quantity: u32,
}

/// Inventory entry joined with its catalog data, for display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InventoryLine {
    pub item_id: String,
    pub name: String,
    pub kind: Option<ItemKind>,
    pub quantity: u32,
}

/// Entries stay in first-grant order. Rows that reach zero are kept so the order is stable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inventory {
    entries: Vec<InventoryEntry>,
    pub schema_version: u8,
}

impl Default for Inventory {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            schema_version: INVENTORY_SCHEMA_VERSION,
        }
    }
}

// ============================================================================
// Ledger Operations
// ============================================================================

impl Inventory {
    /// Starting kit for new and defeated players: one healing potion.
    pub fn starter_kit() -> Self {
        let mut inv = Self::default();
        inv.grant(HEALING_POTION_ID, 1);
        inv
    }

    pub fn reset_to_starter_kit(&mut self) {
        *self = Self::starter_kit();
    }

    /// Add `quantity` of an item, creating its row on first grant. Returns the new quantity.
    pub fn grant(&mut self, item_id: &str, quantity: u32) -> u32 {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.item_id == item_id) {
            entry.quantity = entry.quantity.saturating_add(quantity);
            return entry.quantity;
        }
        if quantity == 0 {
            return 0;
        }
        self.entries.push(InventoryEntry {
            item_id: item_id.to_string(),
            quantity,
        });
        quantity
    }

    /// Take `quantity` of an item. Missing and insufficient stock both fail without changes.
    pub fn consume(&mut self, item_id: &str, quantity: u32) -> bool {
        if quantity == 0 {
            return false;
        }
        match self.entries.iter_mut().find(|e| e.item_id == item_id) {
            Some(entry) if entry.quantity >= quantity => {
                entry.quantity -= quantity;
                true
            }
            _ => false,
        }
    }

    pub fn quantity(&self, item_id: &str) -> u32 {
        self.entries
            .iter()
            .find(|e| e.item_id == item_id)
            .map(|e| e.quantity)
            .unwrap_or(0)
    }

    pub fn entries(&self) -> &[InventoryEntry] {
        &self.entries
    }

    pub fn lines(&self) -> Vec<InventoryLine> {
        self.entries
            .iter()
            .map(|e| {
                let item = catalog::item(&e.item_id);
                InventoryLine {
                    item_id: e.item_id.clone(),
                    name: catalog::item_name(&e.item_id),
                    kind: item.map(|i| i.kind),
                    quantity: e.quantity,
                }
            })
            .collect()
    }

    /// Break one random piece of carried weapon/armor. Returns the item id that lost a unit.
    pub fn wear_random_gear(&mut self, dice: &mut dyn Dice) -> Option<String> {
        let gear: Vec<usize> = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, e)| {
                e.quantity > 0 && catalog::item(&e.item_id).is_some_and(|i| i.kind.is_gear())
            })
            .map(|(idx, _)| idx)
            .collect();
        if gear.is_empty() {
            return None;
        }
        let entry = &mut self.entries[gear[dice.pick(gear.len())]];
        entry.quantity -= 1;
        Some(entry.item_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::dice::ScriptedDice;

    #[test]
    fn grant_upserts_in_first_grant_order() {
        let mut inv = Inventory::default();
        assert_eq!(inv.grant("short_sword", 1), 1);
        assert_eq!(inv.grant(HEALING_POTION_ID, 2), 2);
        assert_eq!(inv.grant("short_sword", 3), 4);
        let ids: Vec<_> = inv.entries().iter().map(|e| e.item_id.as_str()).collect();
        assert_eq!(ids, vec!["short_sword", HEALING_POTION_ID]);
        assert_eq!(inv.grant("wooden_shield", 0), 0);
        assert_eq!(inv.entries().len(), 2);
    }

    #[test]
    fn consume_never_goes_negative() {
        let mut inv = Inventory::starter_kit();
        assert!(!inv.consume(HEALING_POTION_ID, 2));
        assert_eq!(inv.quantity(HEALING_POTION_ID), 1);
        assert!(inv.consume(HEALING_POTION_ID, 1));
        assert_eq!(inv.quantity(HEALING_POTION_ID), 0);
        assert!(!inv.consume(HEALING_POTION_ID, 1));
        assert!(!inv.consume("short_sword", 1));
        assert!(!inv.consume(HEALING_POTION_ID, 0));
        assert_eq!(inv.quantity(HEALING_POTION_ID), 0);
        // Row is kept at zero.
        assert_eq!(inv.entries().len(), 1);
    }

    #[test]
    fn wear_only_touches_gear() {
        let mut inv = Inventory::starter_kit();
        let mut dice = ScriptedDice::new([0], []);
        assert_eq!(inv.wear_random_gear(&mut dice), None);

        inv.grant("leather_armor", 1);
        inv.grant("short_sword", 2);
        let mut dice = ScriptedDice::new([1], []);
        assert_eq!(inv.wear_random_gear(&mut dice).as_deref(), Some("short_sword"));
        assert_eq!(inv.quantity("short_sword"), 1);
        assert_eq!(inv.quantity(HEALING_POTION_ID), 1);
    }

    #[test]
    fn lines_resolve_catalog_names() {
        let inv = Inventory::starter_kit();
        let lines = inv.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Poção de Cura");
        assert_eq!(lines[0].kind, Some(ItemKind::Potion));
    }
}
