//! Random driver: picks one legal command at a time from the query API

use crate::config::DriverWeights;
use hexlegion_core::legion::{is_legal_split, subtract};
use hexlegion_core::{
    BattlePhase, BattleSide, Command, CreatureId, EngagementStage, Game, Hex, Legion, Marker, Phase,
    PlayerId, SpeciesId,
};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Random split attempts per legion before giving up
const SPLIT_ATTEMPTS: usize = 24;

/// Keeps the driver's stream apart from the dice stream of the same seed
const DRIVER_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Seeded random player for every seat of a game
pub struct RandomDriver {
    rng: ChaCha8Rng,
    weights: DriverWeights,
}

impl RandomDriver {
    pub fn new(seed: u64, weights: DriverWeights) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed ^ DRIVER_SALT),
            weights,
        }
    }

    fn chance(&mut self, p: f64) -> bool {
        self.rng.gen_bool(p.clamp(0.0, 1.0))
    }

    // ========================================================================
    // LEVEL 1 - DISPATCH
    // ========================================================================

    /// Next command for whoever the game is waiting on
    pub fn choose(&mut self, game: &Game) -> Option<(PlayerId, Command)> {
        let actor = game.actor()?;

        if let Some(legion) = game
            .legions()
            .find(|l| l.owner == actor && !l.pending_acquire.is_empty())
        {
            let command = self.acquire(legion);
            return Some((actor, command));
        }

        if let Some(engagement) = game.engagement() {
            let command = if engagement.pending_summon {
                self.summon(game, actor)
            } else if engagement.pending_reinforce {
                self.reinforce(game)
            } else {
                match engagement.stage {
                    EngagementStage::AwaitingFlee => self.flee(game, &engagement.defender),
                    EngagementStage::AwaitingFight => self.fight(&engagement.attacker),
                    EngagementStage::Battle => self.battle(game),
                    EngagementStage::Settling => return None,
                }
            };
            return Some((actor, command));
        }

        let command = match game.phase() {
            Phase::Split => self.split(game, actor),
            Phase::Move => self.movement(game, actor),
            Phase::Fight => match game.engagements().first() {
                Some(&hex) => Command::ResolveEngagement { hex },
                None => return None,
            },
            Phase::Muster => self.muster(game, actor),
            Phase::GameOver => return None,
        };
        Some((actor, command))
    }

    /// The pass or decline that fits the game's current situation
    pub fn fallback(&self, game: &Game) -> Option<(PlayerId, Command)> {
        let actor = game.actor()?;
        if let Some(legion) = game
            .legions()
            .find(|l| l.owner == actor && !l.pending_acquire.is_empty())
        {
            return Some((actor, Command::DeclineAcquire { marker: legion.marker.clone() }));
        }
        if let Some(engagement) = game.engagement() {
            let command = if engagement.pending_summon {
                Command::DeclineSummon
            } else if engagement.pending_reinforce {
                Command::DeclineReinforce
            } else {
                match engagement.stage {
                    EngagementStage::AwaitingFlee => Command::DeclineFlee,
                    EngagementStage::AwaitingFight => Command::Fight,
                    EngagementStage::Battle => match game.battle().map(|b| b.phase) {
                        Some(BattlePhase::Strike) | Some(BattlePhase::Counterstrike) => Command::DoneStrikes,
                        _ => Command::DoneManeuvers,
                    },
                    EngagementStage::Settling => return None,
                }
            };
            return Some((actor, command));
        }
        let command = match game.phase() {
            Phase::Split => Command::DoneSplits,
            Phase::Move => Command::DoneMoves,
            Phase::Fight => Command::ResolveEngagement { hex: *game.engagements().first()? },
            Phase::Muster => Command::DoneRecruits,
            Phase::GameOver => return None,
        };
        Some((actor, command))
    }

    // ========================================================================
    // LEVEL 2 - STRATEGIC PHASES
    // ========================================================================

    fn split(&mut self, game: &Game, player: PlayerId) -> Command {
        let max = game.options().max_legion_height;
        let Some(child) = game.player(player).and_then(|p| p.markers.first().cloned()) else {
            return Command::DoneSplits;
        };
        let touched: Vec<&Marker> = game.legions().filter_map(|l| l.split_from.as_ref()).collect();
        let candidates: Vec<&Legion> = game
            .legions_of(player)
            .into_iter()
            .filter(|l| l.split_from.is_none() && !touched.contains(&&l.marker))
            .filter(|l| l.can_split(game.turn()))
            .collect();

        // Oversized legions first; they block the roll
        let forced: Vec<&Legion> = candidates.iter().copied().filter(|l| l.height() > max).collect();
        let legion = if let Some(&legion) = forced.first() {
            legion
        } else if !candidates.is_empty() && self.chance(self.weights.split) {
            candidates[self.rng.gen_range(0..candidates.len())]
        } else {
            return Command::DoneSplits;
        };

        match self.random_split(game, legion) {
            Some(creatures) => Command::Split { parent: legion.marker.clone(), child, creatures },
            None => Command::DoneSplits,
        }
    }

    fn random_split(&mut self, game: &Game, legion: &Legion) -> Option<Vec<SpeciesId>> {
        let contents = legion.species();
        let table = &game.variant().species;
        for _ in 0..SPLIT_ATTEMPTS {
            let mut shuffled = contents.clone();
            shuffled.shuffle(&mut self.rng);
            let take = if contents.len() == 8 {
                4
            } else {
                self.rng.gen_range(2..=contents.len() - 2)
            };
            let chosen = shuffled[..take].to_vec();
            let Some(rest) = subtract(&contents, &chosen) else {
                continue;
            };
            if is_legal_split(&contents, &rest, &chosen, table) {
                return Some(chosen);
            }
        }
        None
    }

    fn movement(&mut self, game: &Game, player: PlayerId) -> Command {
        let roll = game.player(player).and_then(|p| p.movement_roll).unwrap_or(0);
        if roll < self.weights.mulligan_below && game.can_take_mulligan(player) {
            return Command::TakeMulligan;
        }

        let legions = game.legions_of(player);
        let any_moved = legions.iter().any(|l| l.moved);
        let movable: Vec<(&Legion, Vec<_>)> = legions
            .iter()
            .filter(|l| !l.moved)
            .map(|l| (*l, game.legal_moves(&l.marker)))
            .filter(|(_, moves)| !moves.is_empty())
            .collect();
        if movable.is_empty() || (any_moved && !self.chance(self.weights.extra_move)) {
            return Command::DoneMoves;
        }

        let (legion, moves) = &movable[self.rng.gen_range(0..movable.len())];
        let hostile: Vec<_> = moves
            .iter()
            .filter(|m| game.legions().any(|o| o.hex == m.hex && o.owner != player))
            .collect();
        let chosen = if !hostile.is_empty() && self.chance(self.weights.attack) {
            hostile[self.rng.gen_range(0..hostile.len())]
        } else {
            &moves[self.rng.gen_range(0..moves.len())]
        };

        let teleport = !chosen.is_normal();
        let entry_side = if teleport {
            None
        } else {
            chosen.entry_sides.choose(&mut self.rng).copied()
        };
        Command::MoveLegion { marker: legion.marker.clone(), to: chosen.hex, entry_side, teleport }
    }

    fn muster(&mut self, game: &Game, player: PlayerId) -> Command {
        let eligible: Vec<&Legion> = game
            .legions_of(player)
            .into_iter()
            .filter(|l| game.can_recruit(&l.marker))
            .collect();
        if eligible.is_empty() || !self.chance(self.weights.recruit) {
            return Command::DoneRecruits;
        }
        let legion = eligible[self.rng.gen_range(0..eligible.len())];
        let options = game.legal_recruits(&legion.marker);
        match options.choose(&mut self.rng) {
            Some(option) => Command::Recruit {
                marker: legion.marker.clone(),
                recruit: option.recruit,
                recruiters: option.recruiters.clone(),
            },
            None => Command::DoneRecruits,
        }
    }

    // ========================================================================
    // LEVEL 2 - ENGAGEMENT DECISIONS
    // ========================================================================

    fn acquire(&mut self, legion: &Legion) -> Command {
        if self.chance(self.weights.acquire) {
            Command::AcquireAngels { marker: legion.marker.clone(), species: legion.pending_acquire.clone() }
        } else {
            Command::DeclineAcquire { marker: legion.marker.clone() }
        }
    }

    fn summon(&mut self, game: &Game, player: PlayerId) -> Command {
        let donors = game.summon_donors(player);
        if !self.chance(self.weights.summon) {
            return Command::DeclineSummon;
        }
        match donors.choose(&mut self.rng) {
            Some((donor, species)) => Command::SummonAngel { donor: donor.clone(), species: *species },
            None => Command::DeclineSummon,
        }
    }

    fn reinforce(&mut self, game: &Game) -> Command {
        let options = game.reinforcements();
        if !self.chance(self.weights.reinforce) {
            return Command::DeclineReinforce;
        }
        match options.choose(&mut self.rng) {
            Some(option) => Command::Reinforce { recruit: option.recruit, recruiters: option.recruiters.clone() },
            None => Command::DeclineReinforce,
        }
    }

    fn flee(&mut self, game: &Game, defender: &Marker) -> Command {
        if game.can_flee(defender) && self.chance(self.weights.flee) {
            Command::Flee
        } else {
            Command::DeclineFlee
        }
    }

    fn fight(&mut self, attacker: &Marker) -> Command {
        if self.chance(self.weights.concede) {
            Command::Concede { marker: attacker.clone() }
        } else if self.chance(self.weights.settle) {
            Command::SettleMutually
        } else {
            Command::Fight
        }
    }

    // ========================================================================
    // LEVEL 2 - BATTLE
    // ========================================================================

    fn battle(&mut self, game: &Game) -> Command {
        let Some(battle) = game.battle() else {
            return Command::DoneManeuvers;
        };
        match battle.phase {
            BattlePhase::Strike | BattlePhase::Counterstrike => self.strike(game),
            _ => self.maneuver(game, battle.active),
        }
    }

    fn maneuver(&mut self, game: &Game, side: BattleSide) -> Command {
        let enemies: Vec<Hex> = game
            .side_units(side.other())
            .iter()
            .filter(|u| u.alive())
            .filter_map(|u| u.hex)
            .collect();
        let waiting: Vec<(CreatureId, bool, Vec<Hex>)> = game
            .side_units(side)
            .iter()
            .filter(|u| u.alive() && !u.moved)
            .map(|u| {
                let moves: Vec<Hex> = game.legal_creature_moves(u.id).into_iter().collect();
                (u.id, u.hex.is_none(), moves)
            })
            .filter(|(_, _, moves)| !moves.is_empty())
            .collect();

        // Off-board creatures die if left behind
        let entering = waiting.iter().position(|(_, off, _)| *off);
        let index = match entering {
            Some(i) => i,
            None => {
                if waiting.is_empty() || !self.chance(self.weights.advance) {
                    return Command::DoneManeuvers;
                }
                self.rng.gen_range(0..waiting.len())
            }
        };
        let (creature, _, moves) = &waiting[index];
        let creature = *creature;

        let closest = |hex: &Hex| enemies.iter().map(|e| hex.distance_to(*e)).min().unwrap_or(0);
        let best = moves.iter().map(closest).min().unwrap_or(0);
        let near: Vec<Hex> = moves.iter().copied().filter(|h| closest(h) == best).collect();
        let to = match near.choose(&mut self.rng) {
            Some(&hex) => hex,
            None => moves[0],
        };
        Command::MoveCreature { creature, to }
    }

    fn strike(&mut self, game: &Game) -> Command {
        let carry = game.carry_targets();
        if let Some(&target) = carry.choose(&mut self.rng) {
            return Command::ApplyCarry { target };
        }
        let pairs: Vec<(CreatureId, CreatureId)> = game
            .strikers()
            .into_iter()
            .flat_map(|s| game.strike_targets(s).into_iter().map(move |(t, _)| (s, t)))
            .collect();
        match pairs.choose(&mut self.rng) {
            Some(&(striker, target)) => Command::Strike { striker, target },
            None => Command::DoneStrikes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hexlegion_core::{Color, PlayerSetup, RuleOptions, ScriptedDice, Variant};
    use std::sync::Arc;

    fn simple_game() -> Game {
        let seats = vec![PlayerSetup::new("a", Color::ALL[0]), PlayerSetup::new("b", Color::ALL[1])];
        Game::new(
            Arc::new(Variant::standard()),
            RuleOptions::default(),
            &seats,
            Box::new(ScriptedDice::new([]).with_fallback(4)),
        )
        .unwrap()
    }

    #[test]
    fn test_opening_split_is_legal() {
        let mut game = simple_game();
        let mut driver = RandomDriver::new(5, DriverWeights::default());
        let (player, command) = driver.choose(&game).unwrap();
        assert_eq!(player, PlayerId(0));
        assert!(matches!(command, Command::Split { ref creatures, .. } if creatures.len() == 4));
        game.apply_and_settle(player, command).unwrap();
        assert_eq!(game.legions_of(PlayerId(0)).len(), 2);
    }

    #[test]
    fn test_fallback_passes_the_phase() {
        let game = simple_game();
        let driver = RandomDriver::new(5, DriverWeights::default());
        assert_eq!(driver.fallback(&game), Some((PlayerId(0), Command::DoneSplits)));
    }

    #[test]
    fn test_first_turn_reaches_second_player() {
        let mut game = simple_game();
        let mut driver = RandomDriver::new(11, DriverWeights::default());
        for _ in 0..200 {
            if game.active_player() == PlayerId(1) {
                break;
            }
            let (player, command) = driver.choose(&game).unwrap();
            game.apply_and_settle(player, command).unwrap();
        }
        assert_eq!(game.active_player(), PlayerId(1));
        assert_eq!(game.turn(), 1);
    }
}
