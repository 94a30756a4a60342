// Core session state and the event-driven control loop.
//
// `GameSession` is the single owner of everything mutable: the window
// cache (which owns the overlay and the materialized set), the player
// state, the movement facade, and the boxed render surface. The session is
// a function from commands to events: every external stimulus arrives as a
// `GameCommand` through `handle`, is processed synchronously to
// completion, and yields the `GameEvent`s it caused. Position updates from
// the movement channel are drained the same way — one at a time, each to
// completion, no reentrancy of `recompute` or token transitions.
//
// ## Action flow
//
// Every attempted action runs the same pipeline: interaction gate first
// (out-of-range attempts are rejected with the measured per-axis distance,
// never silently dropped), then the pure token state machine
// (`actions::apply`), then — on success — the cache's write path, which
// updates the materialized cell, its visual, and the overlay in one step.
// The holding register is updated only here.
//
// ## Movement flow
//
// All backends feed one channel (see `movement.rs`). Whenever updates are
// drained — after a `Step`/`Relocate`, on `pump`, or before a backend
// switch so nothing pending is lost — each position update moves the
// player, re-runs the gate restyle over every materialized cell, and
// refreshes the status line.
//
// See also: `command.rs` / `event.rs` for the in/out vocabulary,
// `cache.rs` for window maintenance, `config.rs` for the tunables.
//
// **Critical constraint: determinism.** For a given config and command
// sequence (movement timing aside), the session emits the same events in
// the same order. All mutation is confined to the thread calling `handle`.

use crate::actions::{self, ActionRejection, TokenAction};
use crate::cache::WindowCache;
use crate::command::GameCommand;
use crate::config::GameConfig;
use crate::event::{CellMenu, GameEvent, MenuBody};
use crate::gate;
use crate::grid::GridMapping;
use crate::movement::{BackendKind, MovementFacade, PositionProvider};
use crate::render::RenderSurface;
use crate::types::{CellBounds, CellIndex, TokenValue, WorldPos};
use serde::{Deserialize, Serialize};

/// The player: a continuous position and a single-slot carry register.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub position: WorldPos,
    pub holding: Option<TokenValue>,
}

/// Top-level game state and command processor.
pub struct GameSession {
    config: GameConfig,
    grid: GridMapping,
    cache: WindowCache,
    player: PlayerState,
    facade: MovementFacade,
    surface: Box<dyn RenderSurface>,
    points: u32,
}

impl GameSession {
    pub fn new(config: GameConfig, surface: Box<dyn RenderSurface>) -> Self {
        let grid = GridMapping::new(config.origin, config.cell_size);
        let cache = WindowCache::new(&config);
        let facade = MovementFacade::new(&config);
        let player = PlayerState {
            position: config.origin,
            holding: None,
        };
        Self {
            config,
            grid,
            cache,
            player,
            facade,
            surface,
            points: 0,
        }
    }

    /// Install the continuous backend's position source (e.g. the host's
    /// location service). Without one, switching to the continuous backend
    /// fails and movement stays on the discrete stepper.
    pub fn set_position_provider(&mut self, provider: Box<dyn PositionProvider>) {
        self.facade.set_position_provider(provider);
    }

    /// One-time startup: place the player marker and materialize the
    /// initial window. Runs unconditionally, before any viewport event.
    pub fn start(&mut self, viewport: CellBounds) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.surface.move_player_marker(self.player.position);
        let stats = self
            .cache
            .recompute(viewport, self.player_cell(), &mut *self.surface);
        events.push(GameEvent::WindowRecomputed {
            spawned: stats.spawned,
            evicted: stats.evicted,
            live: stats.live,
        });
        events.push(GameEvent::HeldChanged {
            held: self.player.holding,
        });
        events.push(GameEvent::StatusChanged {
            line: format!("Points: {}", self.points),
        });
        events
    }

    /// Process one command synchronously, returning the events it caused.
    pub fn handle(&mut self, command: GameCommand) -> Vec<GameEvent> {
        let mut events = Vec::new();
        match command {
            GameCommand::ViewportChanged { bounds } => {
                let stats = self
                    .cache
                    .recompute(bounds, self.player_cell(), &mut *self.surface);
                events.push(GameEvent::WindowRecomputed {
                    spawned: stats.spawned,
                    evicted: stats.evicted,
                    live: stats.live,
                });
            }
            GameCommand::CellClicked { index } => {
                events.push(GameEvent::MenuShown {
                    menu: self.menu_for(index),
                });
            }
            GameCommand::Act { index, action } => {
                self.try_action(index, action, &mut events);
            }
            GameCommand::Step { di, dj } => {
                if self.facade.step(di, dj, self.player.position) {
                    self.drain_updates(&mut events);
                }
            }
            GameCommand::Relocate { position } => {
                self.facade.relocate(position);
                self.drain_updates(&mut events);
            }
            GameCommand::SwitchBackend { kind } => {
                // Process anything still pending so the swap loses nothing.
                self.drain_updates(&mut events);
                match self.facade.activate(kind) {
                    Ok(active) => events.push(GameEvent::BackendSwitched { kind: active }),
                    Err(err) => {
                        log::warn!("movement backend {kind} unavailable: {err}");
                        events.push(GameEvent::BackendFallback {
                            attempted: kind,
                            reason: err.to_string(),
                        });
                    }
                }
            }
        }
        events
    }

    /// Drain pending position updates from the movement channel. Hosts
    /// call this on their tick while the continuous backend is active.
    pub fn pump(&mut self) -> Vec<GameEvent> {
        let mut events = Vec::new();
        self.drain_updates(&mut events);
        events
    }

    /// The menu model for a clicked cell: gate verdict first, then exactly
    /// one body chosen from the (cell, hand) state.
    pub fn menu_for(&self, index: CellIndex) -> CellMenu {
        let center = self.grid.center_of(index);
        let check = gate::range_check(index, self.player_cell(), self.config.interaction_radius);
        if !check.in_range() {
            return CellMenu {
                index,
                center,
                body: MenuBody::TooFar {
                    delta_i: check.delta_i,
                    delta_j: check.delta_j,
                    radius: check.radius,
                },
            };
        }
        let cell_token = self.cache.cell(index).and_then(|cell| cell.token);
        let body = match (cell_token, self.player.holding) {
            (Some(value), None) => MenuBody::GrabOffer { value },
            (Some(cell), Some(held)) if cell == held => MenuBody::CraftOffer { value: cell },
            (Some(cell), Some(held)) => MenuBody::Mismatch { held, cell },
            (None, Some(held)) => MenuBody::PlaceOffer { held },
            (None, None) => MenuBody::Empty,
        };
        CellMenu {
            index,
            center,
            body,
        }
    }

    /// The single held-token display value.
    pub fn held_display(&self) -> String {
        match self.player.holding {
            Some(value) => format!("Held Token: {value}"),
            None => "Held Token: none".into(),
        }
    }

    pub fn player(&self) -> &PlayerState {
        &self.player
    }

    pub fn player_cell(&self) -> CellIndex {
        self.grid.cell_at(self.player.position)
    }

    pub fn cache(&self) -> &WindowCache {
        &self.cache
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn active_backend(&self) -> BackendKind {
        self.facade.active()
    }

    fn try_action(&mut self, index: CellIndex, action: TokenAction, events: &mut Vec<GameEvent>) {
        let check = gate::range_check(index, self.player_cell(), self.config.interaction_radius);
        if !check.in_range() {
            events.push(GameEvent::ActionRejected {
                index,
                reason: check.into(),
            });
            return;
        }
        let cell_token = match self.cache.cell(index) {
            Some(cell) => cell.token,
            None => {
                events.push(GameEvent::ActionRejected {
                    index,
                    reason: ActionRejection::NotMaterialized { index },
                });
                return;
            }
        };
        match actions::apply(
            action,
            cell_token,
            self.player.holding,
            self.config.craft_value_ceiling,
        ) {
            Ok(transition) => {
                self.cache
                    .apply_token_change(index, transition.cell, &mut *self.surface);
                self.player.holding = transition.holding;
                match action {
                    TokenAction::Grab => {
                        if let Some(value) = cell_token {
                            events.push(GameEvent::TokenGrabbed { index, value });
                        }
                    }
                    TokenAction::Place => {
                        if let Some(value) = transition.cell {
                            events.push(GameEvent::TokenPlaced { index, value });
                        }
                    }
                    TokenAction::Craft => {
                        if let Some(value) = transition.holding {
                            events.push(GameEvent::TokensCrafted { index, value });
                        }
                    }
                }
                events.push(GameEvent::HeldChanged {
                    held: self.player.holding,
                });
            }
            Err(reason) => events.push(GameEvent::ActionRejected { index, reason }),
        }
    }

    fn drain_updates(&mut self, events: &mut Vec<GameEvent>) {
        while let Some(position) = self.facade.poll() {
            self.apply_position_update(position, events);
        }
    }

    /// One delivered position update, processed to completion: move the
    /// player, restyle every materialized cell for the new gate verdicts,
    /// refresh the status display.
    fn apply_position_update(&mut self, position: WorldPos, events: &mut Vec<GameEvent>) {
        self.player.position = position;
        let cell = self.grid.cell_at(position);
        self.surface.move_player_marker(position);
        self.cache.restyle_all(cell, &mut *self.surface);
        events.push(GameEvent::PlayerMoved { position, cell });
        events.push(GameEvent::StatusChanged {
            line: format!("moved to cell {cell} {position}"),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::ScriptedProvider;
    use crate::render::NullSurface;
    use std::time::{Duration, Instant};

    fn test_config() -> GameConfig {
        GameConfig {
            world_seed: "session-tests".into(),
            spawn_probability: 0.5,
            stream_interval_ms: 2,
            ..GameConfig::default()
        }
    }

    fn viewport(half: f64) -> CellBounds {
        CellBounds::new(WorldPos::new(-half, -half), WorldPos::new(half, half))
    }

    fn started_session() -> GameSession {
        let mut session = GameSession::new(test_config(), Box::new(NullSurface::default()));
        session.start(viewport(8.0));
        session
    }

    /// Materialized in-range cells currently holding a token.
    fn in_range_token_cells(session: &GameSession) -> Vec<(CellIndex, TokenValue)> {
        let player = session.player_cell();
        let radius = session.config().interaction_radius;
        session
            .cache()
            .live_indices_sorted()
            .into_iter()
            .filter(|idx| gate::within_range(*idx, player, radius))
            .filter_map(|idx| session.cache().cell(idx).unwrap().token.map(|v| (idx, v)))
            .collect()
    }

    fn in_range_empty_cell(session: &GameSession) -> CellIndex {
        let player = session.player_cell();
        let radius = session.config().interaction_radius;
        session
            .cache()
            .live_indices_sorted()
            .into_iter()
            .filter(|idx| gate::within_range(*idx, player, radius))
            .find(|idx| session.cache().cell(*idx).unwrap().token.is_none())
            .expect("an empty in-range cell")
    }

    /// Two distinct in-range cells holding the same value.
    fn equal_value_pair(session: &GameSession) -> (CellIndex, CellIndex, TokenValue) {
        let cells = in_range_token_cells(session);
        for (k, (a, va)) in cells.iter().enumerate() {
            for (b, vb) in &cells[k + 1..] {
                if va == vb {
                    return (*a, *b, *va);
                }
            }
        }
        panic!("a 0.5 spawn rate over a 7x7 reach should contain a same-value pair");
    }

    #[test]
    fn startup_materializes_the_window_and_reports_displays() {
        let mut session = GameSession::new(test_config(), Box::new(NullSurface::default()));
        let events = session.start(viewport(6.0));

        assert!(matches!(events[0], GameEvent::WindowRecomputed { spawned, .. } if spawned > 0));
        assert!(events.contains(&GameEvent::HeldChanged { held: None }));
        assert!(events.contains(&GameEvent::StatusChanged {
            line: "Points: 0".into()
        }));
        assert_eq!(session.held_display(), "Held Token: none");
        assert_eq!(session.player_cell(), CellIndex::new(0, 0));
    }

    #[test]
    fn grab_empties_the_cell_and_fills_the_hand() {
        let mut session = started_session();
        let (idx, value) = in_range_token_cells(&session)[0];

        let events = session.handle(GameCommand::Act {
            index: idx,
            action: TokenAction::Grab,
        });

        assert!(events.contains(&GameEvent::TokenGrabbed { index: idx, value }));
        assert!(events.contains(&GameEvent::HeldChanged { held: Some(value) }));
        assert_eq!(session.player().holding, Some(value));
        assert_eq!(session.cache().cell(idx).unwrap().token, None);
        // Write-through: the divergence is in the overlay immediately.
        assert!(session.cache().overlay().get(idx).is_some());
        assert_eq!(session.held_display(), format!("Held Token: {value}"));
    }

    #[test]
    fn out_of_range_actions_report_the_signed_distance() {
        let mut session = started_session();
        let target = CellIndex::new(5, 0);

        let events = session.handle(GameCommand::Act {
            index: target,
            action: TokenAction::Grab,
        });

        assert_eq!(
            events,
            vec![GameEvent::ActionRejected {
                index: target,
                reason: ActionRejection::OutOfRange {
                    delta_i: 5,
                    delta_j: 0,
                    radius: 3,
                },
            }]
        );
        // No state change, no overlay write.
        assert!(session.cache().overlay().is_empty());
        assert_eq!(session.player().holding, None);
    }

    #[test]
    fn place_moves_the_held_token_into_an_empty_cell() {
        let mut session = started_session();
        let (grab_idx, value) = in_range_token_cells(&session)[0];
        session.handle(GameCommand::Act {
            index: grab_idx,
            action: TokenAction::Grab,
        });

        let empty = in_range_empty_cell(&session);
        let events = session.handle(GameCommand::Act {
            index: empty,
            action: TokenAction::Place,
        });

        assert!(events.contains(&GameEvent::TokenPlaced { index: empty, value }));
        assert_eq!(session.player().holding, None);
        assert_eq!(session.cache().cell(empty).unwrap().token, Some(value));
    }

    #[test]
    fn craft_merges_equal_values_into_a_doubled_held_token() {
        let mut session = started_session();
        let (first, second, value) = equal_value_pair(&session);

        session.handle(GameCommand::Act {
            index: first,
            action: TokenAction::Grab,
        });
        let events = session.handle(GameCommand::Act {
            index: second,
            action: TokenAction::Craft,
        });

        assert!(events.contains(&GameEvent::TokensCrafted {
            index: second,
            value: value.doubled(),
        }));
        assert_eq!(session.player().holding, Some(value.doubled()));
        assert_eq!(session.cache().cell(second).unwrap().token, None);
    }

    #[test]
    fn craft_rejects_mismatched_values_without_touching_state() {
        let mut session = started_session();
        let cells = in_range_token_cells(&session);
        let (grab_idx, held) = cells[0];
        let Some((target, cell_value)) = cells.iter().copied().find(|(_, v)| *v != held) else {
            panic!("a 0.5 spawn rate over a 7x7 reach should contain two distinct values");
        };

        session.handle(GameCommand::Act {
            index: grab_idx,
            action: TokenAction::Grab,
        });
        let overlay_before = session.cache().overlay().len();
        let events = session.handle(GameCommand::Act {
            index: target,
            action: TokenAction::Craft,
        });

        assert!(events.contains(&GameEvent::ActionRejected {
            index: target,
            reason: ActionRejection::ValueMismatch {
                held,
                cell: cell_value,
            },
        }));
        assert_eq!(session.player().holding, Some(held));
        assert_eq!(session.cache().cell(target).unwrap().token, Some(cell_value));
        assert_eq!(session.cache().overlay().len(), overlay_before);
    }

    #[test]
    fn menus_reflect_the_cell_and_hand_state() {
        let mut session = started_session();
        let (token_idx, value) = in_range_token_cells(&session)[0];
        let empty_idx = in_range_empty_cell(&session);

        assert_eq!(session.menu_for(token_idx).body, MenuBody::GrabOffer { value });
        assert_eq!(session.menu_for(empty_idx).body, MenuBody::Empty);
        assert_eq!(
            session.menu_for(CellIndex::new(5, 0)).body,
            MenuBody::TooFar {
                delta_i: 5,
                delta_j: 0,
                radius: 3,
            }
        );

        session.handle(GameCommand::Act {
            index: token_idx,
            action: TokenAction::Grab,
        });
        assert_eq!(
            session.menu_for(empty_idx).body,
            MenuBody::PlaceOffer { held: value }
        );
        // The menu title carries the cell's world-space center.
        let menu = session.menu_for(empty_idx);
        assert_eq!(menu.center, WorldPos::new(empty_idx.i as f64, empty_idx.j as f64));
    }

    #[test]
    fn clicking_a_cell_shows_its_menu() {
        let mut session = started_session();
        let (idx, value) = in_range_token_cells(&session)[0];
        let events = session.handle(GameCommand::CellClicked { index: idx });
        assert_eq!(events.len(), 1);
        let GameEvent::MenuShown { menu } = &events[0] else {
            panic!("expected MenuShown, got {:?}", events[0]);
        };
        assert_eq!(menu.body, MenuBody::GrabOffer { value });
    }

    #[test]
    fn steps_move_one_cell_and_restyle() {
        let mut session = started_session();
        let events = session.handle(GameCommand::Step { di: 1, dj: 0 });

        assert_eq!(session.player_cell(), CellIndex::new(1, 0));
        assert!(events.contains(&GameEvent::PlayerMoved {
            position: WorldPos::new(1.0, 0.0),
            cell: CellIndex::new(1, 0),
        }));
        assert!(
            events
                .iter()
                .any(|e| matches!(e, GameEvent::StatusChanged { line } if line.contains("1,0")))
        );

        // The gate moved with the player: (4,0) is now reachable.
        let events = session.handle(GameCommand::Act {
            index: CellIndex::new(5, 0),
            action: TokenAction::Grab,
        });
        assert!(matches!(
            events[0],
            GameEvent::ActionRejected {
                reason: ActionRejection::OutOfRange {
                    delta_i: 4,
                    delta_j: 0,
                    radius: 3
                },
                ..
            }
        ));
    }

    #[test]
    fn relocation_jumps_anywhere() {
        let mut session = started_session();
        let events = session.handle(GameCommand::Relocate {
            position: WorldPos::new(-7.0, 2.0),
        });
        assert_eq!(session.player_cell(), CellIndex::new(-7, 2));
        assert!(!events.is_empty());
    }

    #[test]
    fn switching_without_a_source_falls_back_to_the_stepper() {
        let mut session = started_session();
        let events = session.handle(GameCommand::SwitchBackend {
            kind: BackendKind::Continuous,
        });

        assert!(matches!(
            &events[0],
            GameEvent::BackendFallback {
                attempted: BackendKind::Continuous,
                ..
            }
        ));
        assert_eq!(session.active_backend(), BackendKind::Discrete);
        // The stepper still works.
        session.handle(GameCommand::Step { di: 0, dj: 1 });
        assert_eq!(session.player_cell(), CellIndex::new(0, 1));
    }

    #[test]
    fn continuous_backend_delivers_through_pump() {
        let mut session = started_session();
        let target = WorldPos::new(2.0, -1.0);
        session.set_position_provider(Box::new(ScriptedProvider::new([target])));

        let events = session.handle(GameCommand::SwitchBackend {
            kind: BackendKind::Continuous,
        });
        assert!(events.contains(&GameEvent::BackendSwitched {
            kind: BackendKind::Continuous,
        }));

        let deadline = Instant::now() + Duration::from_secs(1);
        let mut moved = Vec::new();
        while moved.is_empty() && Instant::now() < deadline {
            moved = session.pump();
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(moved.contains(&GameEvent::PlayerMoved {
            position: target,
            cell: CellIndex::new(2, -1),
        }));
    }

    #[test]
    fn craft_ceiling_is_enforced_when_configured() {
        let mut session = GameSession::new(
            GameConfig {
                craft_value_ceiling: Some(2),
                ..test_config()
            },
            Box::new(NullSurface::default()),
        );
        session.start(viewport(8.0));

        let (first, second, value) = equal_value_pair(&session);
        session.handle(GameCommand::Act {
            index: first,
            action: TokenAction::Grab,
        });
        let events = session.handle(GameCommand::Act {
            index: second,
            action: TokenAction::Craft,
        });

        if value.doubled().get() > 2 {
            assert!(matches!(
                events[0],
                GameEvent::ActionRejected {
                    reason: ActionRejection::CeilingExceeded { .. },
                    ..
                }
            ));
            assert_eq!(session.player().holding, Some(value));
        } else {
            assert_eq!(session.player().holding, Some(value.doubled()));
        }
    }
}
