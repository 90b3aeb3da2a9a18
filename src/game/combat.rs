//! Turn resolution: one player action, the monster's answer, then victory/defeat checks.
//!
//! Roll order per turn (what a [`ScriptedDice`](super::dice::ScriptedDice) must supply):
//! 1. player phase: attack damage `5..25`, or block's incoming hit `10..30`; heal rolls nothing
//! 2. gear wear check (attack/block only), plus a gear pick when it fires
//! 3. monster phase: attack-or-block check, then its damage `10..30` on attack
//! 4. victory reward `1..3` potions
//!
//! When both sides drop to 0 HP in one turn the victory is reported first and the defeat reset
//! is applied after it, so the player keeps the level-up but loses the reward with the inventory.

use log::info;

use super::catalog::{self, HEALING_POTION_ID};
use super::dice::Dice;
use super::errors::GameError;
use super::inventory::Inventory;
use super::types::{
    Action, BattleOutcome, CharacterRecord, SessionRecord, TurnResult, MAX_HP,
};
use crate::config::GameConfig;

const PLAYER_DAMAGE: (u32, u32) = (5, 25);
const MONSTER_DAMAGE: (u32, u32) = (10, 30);
const BLOCK_DIVISOR: u32 = 3;
const REWARD_POTIONS: (u32, u32) = (1, 3);
const LEVEL_UP_ATTACK: u32 = 2;
const LEVEL_UP_HP: u8 = 10;

/// Resolved turn plus whether the linked character changed and must be persisted.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub result: TurnResult,
    pub character_changed: bool,
}

fn take_damage(hp: u8, amount: u32) -> u8 {
    // The result never exceeds `hp`, so it always fits back into u8.
    (hp as u32).saturating_sub(amount) as u8
}

fn push_sentence(buf: &mut String, sentence: &str) {
    if !buf.is_empty() {
        buf.push(' ');
    }
    buf.push_str(sentence);
}

/// Apply a victory's level-up to the character and return the new level.
pub fn level_up(character: &mut CharacterRecord) -> u8 {
    character.level = character.level.saturating_add(1);
    character.attack = character.attack.saturating_add(LEVEL_UP_ATTACK);
    character.base_hp = character.base_hp.saturating_add(LEVEL_UP_HP).min(MAX_HP);
    character.level
}

pub fn resolve_turn(
    session: &mut SessionRecord,
    inventory: &mut Inventory,
    character: Option<&mut CharacterRecord>,
    action: Action,
    rules: &GameConfig,
    dice: &mut dyn Dice,
) -> Result<TurnReport, GameError> {
    session.normalize();
    if !session.in_combat && action != Action::Heal {
        return Err(GameError::NoActiveCombat);
    }
    let was_in_combat = session.in_combat;
    let potion = catalog::item_name(HEALING_POTION_ID);
    let mut monster_message = String::new();

    let mut player_message = match action {
        Action::Attack => {
            let dealt = dice.roll(PLAYER_DAMAGE.0, PLAYER_DAMAGE.1);
            session.monster_hp = take_damage(session.monster_hp, dealt);
            format!("You attacked and dealt {} damage!", dealt)
        }
        Action::Block => {
            let incoming = dice.roll(MONSTER_DAMAGE.0, MONSTER_DAMAGE.1);
            let taken = incoming / BLOCK_DIVISOR;
            session.player_hp = take_damage(session.player_hp, taken);
            monster_message = format!(
                "The monster struck for {}, but your guard absorbed most of it.",
                incoming
            );
            format!("You raised your guard and took only {} damage!", taken)
        }
        Action::Heal => {
            if !inventory.consume(HEALING_POTION_ID, 1) {
                format!("You have no {} left!", potion)
            } else {
                let recovered = MAX_HP - session.player_hp;
                session.player_hp = MAX_HP;
                if recovered > 0 {
                    format!(
                        "You drank a {} and recovered {} HP (full heal).",
                        potion, recovered
                    )
                } else {
                    format!(
                        "Your HP was already full: the {} was wasted (recovered 0 HP).",
                        potion
                    )
                }
            }
        }
    };

    let mut broken_item = None;
    if action != Action::Heal && dice.percent(rules.gear_break_percent) {
        if let Some(item_id) = inventory.wear_random_gear(dice) {
            push_sentence(
                &mut player_message,
                &format!("Your {} broke!", catalog::item_name(&item_id)),
            );
            broken_item = Some(item_id);
        }
    }

    // Blocking already accounted for the monster's blow this turn.
    if action != Action::Block && session.in_combat && session.monster_hp > 0 {
        if dice.percent(rules.monster_attack_percent) {
            let dealt = dice.roll(MONSTER_DAMAGE.0, MONSTER_DAMAGE.1);
            session.player_hp = take_damage(session.player_hp, dealt);
            monster_message = format!("The monster attacked and dealt {} damage!", dealt);
        } else {
            monster_message = "The monster hunkered down behind its guard.".to_string();
        }
    } else if !session.in_combat {
        monster_message = "There is no monster nearby.".to_string();
    }

    let player_fell = session.player_hp == 0;
    let mut outcome = None;
    let mut character_changed = false;

    if was_in_combat && session.monster_hp == 0 {
        session.end_combat();
        let reward = dice.roll(REWARD_POTIONS.0, REWARD_POTIONS.1);
        inventory.grant(HEALING_POTION_ID, reward);
        push_sentence(
            &mut monster_message,
            &format!("The monster was defeated! You earned {} x {}.", reward, potion),
        );
        let character_level = character.map(level_up);
        if let Some(level) = character_level {
            push_sentence(
                &mut monster_message,
                &format!("Level up! You reached level {}.", level),
            );
            character_changed = true;
        }
        info!(
            "session {} won a battle (reward {} potions, level {:?})",
            session.id, reward, character_level
        );
        outcome = Some(BattleOutcome::Victory {
            reward_potions: reward,
            character_level,
        });
    }

    if player_fell {
        session.reset_after_defeat();
        inventory.reset_to_starter_kit();
        push_sentence(
            &mut monster_message,
            "You were defeated! Your adventure starts over.",
        );
        info!("session {} was defeated and reset", session.id);
        outcome = Some(BattleOutcome::Defeat);
    }

    Ok(TurnReport {
        result: TurnResult {
            action,
            player_message,
            monster_message,
            player_hp: session.player_hp,
            monster_hp: session.visible_monster_hp(),
            in_combat: session.in_combat,
            outcome,
            broken_item,
        },
        character_changed,
    })
}
