pub mod game;

use rand::rngs::SmallRng;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

pub use game::{
    Card, CardEffect, CardId, CardSelection, Deck, FieldState, GameEvent, GamePhase, GameState,
    IntegrityError, MatchConfig, MatchSnapshot, PendingEffect, PlayViolation, Player, PlayerId,
    Rank, RuleEngine, RuleError, RuleResolution, SequenceLock, Suit,
};

#[cfg(all(feature = "wee_alloc", target_arch = "wasm32"))]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    web_sys::console::warn_1(&format!("action rejected: {error}").into());
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: RuleResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

/// One match behind a JavaScript handle. The page only ever sees JSON
/// snapshots; all mutation goes through the action methods.
#[wasm_bindgen]
pub struct GameEngine {
    engine: RuleEngine,
    state: GameState,
    rng: SmallRng,
}

impl GameEngine {
    fn execute<F>(&mut self, action: F) -> Result<String, JsValue>
    where
        F: FnOnce(&RuleEngine, &mut GameState, &mut SmallRng) -> Result<Vec<GameEvent>, RuleError>,
    {
        let Self { engine, state, rng } = self;
        let events = action(&*engine, state, rng).map_err(to_js_error)?;
        make_resolution_json(RuleResolution::new(state, events))
    }

    fn parse_selection(json: &str) -> Result<CardSelection, JsValue> {
        serde_json::from_str(json).map_err(serde_to_js_error)
    }
}

#[wasm_bindgen]
impl GameEngine {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<GameEngine, JsValue> {
        let config = match config_json {
            Some(json) => serde_json::from_str(&json).map_err(serde_to_js_error)?,
            None => MatchConfig::default(),
        };
        let engine = RuleEngine::with_config(config).map_err(to_js_error)?;
        let rng = engine.config().rng();
        web_sys::console::log_1(&"daifugo engine ready".into());
        Ok(GameEngine {
            engine,
            state: GameState::new(),
            rng,
        })
    }

    pub fn state_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state).map_err(serde_to_js_error)
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.state.snapshot()).map_err(serde_to_js_error)
    }

    pub fn add_player(&mut self, name: String) -> Result<String, JsValue> {
        self.execute(|engine, state, _| engine.add_player(state, name))
    }

    pub fn remove_player(&mut self, player_id: u8) -> Result<String, JsValue> {
        self.execute(|engine, state, _| engine.remove_player(state, player_id))
    }

    pub fn start_game(&mut self) -> Result<String, JsValue> {
        self.execute(|engine, state, rng| engine.start_game(state, rng))
    }

    pub fn play_cards_json(&mut self, selection_json: &str) -> Result<String, JsValue> {
        let selection = Self::parse_selection(selection_json)?;
        self.execute(|engine, state, _| engine.play_cards(state, selection))
    }

    pub fn pass(&mut self, player_id: u8) -> Result<String, JsValue> {
        self.execute(|engine, state, _| engine.pass(state, player_id))
    }

    pub fn resolve_transfer_json(&mut self, selection_json: &str) -> Result<String, JsValue> {
        let selection = Self::parse_selection(selection_json)?;
        self.execute(|engine, state, _| engine.resolve_transfer(state, selection))
    }

    pub fn resolve_discard_json(&mut self, selection_json: &str) -> Result<String, JsValue> {
        let selection = Self::parse_selection(selection_json)?;
        self.execute(|engine, state, _| engine.resolve_discard(state, selection))
    }

    pub fn skip_pending_effect(&mut self, player_id: u8) -> Result<String, JsValue> {
        self.execute(|engine, state, _| engine.skip_pending_effect(state, player_id))
    }

    pub fn return_to_lobby(&mut self) -> Result<String, JsValue> {
        self.execute(|engine, state, _| engine.return_to_lobby(state))
    }

    pub fn move_to_wolf_action(&mut self) -> Result<String, JsValue> {
        self.execute(|engine, state, _| engine.move_to_wolf_action(state))
    }

    pub fn move_to_voting(&mut self) -> Result<String, JsValue> {
        self.execute(|engine, state, _| engine.move_to_voting(state))
    }

    pub fn move_to_result(&mut self) -> Result<String, JsValue> {
        self.execute(|engine, state, _| engine.move_to_result(state))
    }
}

/// An empty lobby, for pages that want to render before creating an engine.
#[wasm_bindgen(js_name = "createGameState")]
pub fn create_game_state() -> Result<JsValue, JsValue> {
    to_value(&GameState::new()).map_err(JsValue::from)
}

/// Immutable view of a serialized state, advisory card set included.
#[wasm_bindgen(js_name = "snapshotOf")]
pub fn snapshot_of(state: JsValue) -> Result<JsValue, JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    to_value(&state.snapshot()).map_err(JsValue::from)
}

/// Checks a candidate group against a field, returning the violation if any.
#[wasm_bindgen(js_name = "checkPlay")]
pub fn check_play(cards: JsValue, field: JsValue) -> Result<JsValue, JsValue> {
    let cards: Vec<Card> = from_value(cards).map_err(JsValue::from)?;
    let field: FieldState = from_value(field).map_err(JsValue::from)?;
    match game::check_play(&cards, &field) {
        Ok(()) => Ok(JsValue::NULL),
        Err(violation) => to_value(&violation).map_err(JsValue::from),
    }
}

#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))?;
    Ok(())
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
