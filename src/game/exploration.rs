//! Grid movement and the random event rolled after each step.

use log::debug;

use super::catalog::{self, ENCOUNTER_TEXTS};
use super::dice::Dice;
use super::errors::GameError;
use super::inventory::Inventory;
use super::types::{Direction, ExplorationEvent, MoveResult, SessionRecord};
use crate::config::GameConfig;

/// Move one cell and roll what waits there.
///
/// One roll in `0..100` splits into encounter, loot and nothing windows. The roll also happens when
/// the step runs into the map edge: the player still spends the turn searching.
pub fn explore(
    session: &mut SessionRecord,
    inventory: &mut Inventory,
    direction: Direction,
    rules: &GameConfig,
    dice: &mut dyn Dice,
) -> Result<MoveResult, GameError> {
    if session.in_combat {
        return Err(GameError::CombatInProgress);
    }

    let from = session.position;
    session.position = from.step(direction);
    let moved = session.position != from;

    let roll = dice.roll(0, 100);
    let (event, description) = if roll < rules.encounter_percent {
        session.start_encounter();
        let text = ENCOUNTER_TEXTS[dice.pick(ENCOUNTER_TEXTS.len())];
        (ExplorationEvent::Encounter, text.to_string())
    } else if roll < rules.encounter_percent.saturating_add(rules.loot_percent)
        && !rules.loot_table.is_empty()
    {
        let item_id = &rules.loot_table[dice.pick(rules.loot_table.len())];
        inventory.grant(item_id, 1);
        let item_name = catalog::item_name(item_id);
        let description = format!("You found a {}!", item_name);
        (
            ExplorationEvent::Loot {
                item_id: item_id.clone(),
                item_name,
                quantity: 1,
            },
            description,
        )
    } else {
        let text = match rules.flavor_texts.len() {
            0 => "Nothing here.".to_string(),
            n => rules.flavor_texts[dice.pick(n)].clone(),
        };
        (ExplorationEvent::Nothing, text)
    };

    debug!(
        "session {} moved {:?} to ({},{}) roll={} event={:?}",
        session.id, direction, session.position.x, session.position.y, roll, event
    );

    Ok(MoveResult {
        direction,
        position: session.position,
        moved,
        event,
        description,
        player_hp: session.player_hp,
        monster_hp: session.visible_monster_hp(),
        in_combat: session.in_combat,
    })
}
