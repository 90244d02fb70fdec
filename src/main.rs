//! Comic mini-game entry point
//!
//! In the browser this wires the canvas, pointer listeners and the
//! requestAnimationFrame loop, and exports `start_game` for the comic page
//! script. Natively it plays a scripted session headless and logs the result.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
mod wasm_game {
    use std::cell::RefCell;
    use std::rc::Rc;
    use glam::Vec2;
    use wasm_bindgen::prelude::*;
    use web_sys::{HtmlCanvasElement, HtmlElement, MouseEvent, TouchEvent};

    use comic_minigame::consts::*;
    use comic_minigame::renderer::CanvasSurface;
    use comic_minigame::sim::{PointerEvent, PointerKind, SurfaceMapping};
    use comic_minigame::{Engine, FrameOutcome, LevelSpec, SessionToken};

    /// Everything the browser loop needs
    struct Game {
        engine: Engine,
        surface: CanvasSurface,
    }

    thread_local! {
        static GAME: RefCell<Option<Rc<RefCell<Game>>>> = const { RefCell::new(None) };
    }

    pub fn init() -> Result<(), JsValue> {
        console_error_panic_hook::set_once();
        console_log::init_with_level(log::Level::Info).expect("Failed to init logger");

        let window = web_sys::window().expect("no window");
        let document = window.document().expect("no document");

        let canvas: HtmlCanvasElement = document
            .get_element_by_id("canvas")
            .ok_or_else(|| JsValue::from_str("no #canvas element"))?
            .dyn_into()?;

        // Fixed logical size; CSS does the scaling
        canvas.set_width(GAME_WIDTH as u32);
        canvas.set_height(GAME_HEIGHT as u32);

        let asset_root = canvas
            .get_attribute("data-assets")
            .unwrap_or_else(|| "assets".to_string());
        let surface = CanvasSurface::new(&canvas, asset_root)?;

        let game = Rc::new(RefCell::new(Game {
            engine: Engine::new(),
            surface,
        }));
        setup_input_handlers(&canvas, game.clone());
        GAME.with(|g| *g.borrow_mut() = Some(game));

        log::info!("Comic mini-game ready");
        Ok(())
    }

    /// Start (or restart) the mini-game
    ///
    /// `level` is a preset name or a JSON level. When the game finishes,
    /// `#game-page` is hidden and the element `next_page` (if any) is shown.
    pub fn start_game(level: &str, next_page: Option<String>) -> Result<(), JsValue> {
        let game = GAME
            .with(|g| g.borrow().clone())
            .ok_or_else(|| JsValue::from_str("mini-game not initialised"))?;

        let level = load_level(level).map_err(|e| {
            log::error!("Cannot start mini-game: {}", e);
            JsValue::from_str(&e.to_string())
        })?;

        {
            let mut g = game.borrow_mut();
            let images = level_images(&level);
            g.surface.preload(images.iter().map(String::as_str));
        }

        let seed = js_sys::Date::now() as u64;
        let token = game
            .borrow_mut()
            .engine
            .start(level, seed, move || show_next_page(next_page.as_deref()))
            .map_err(|e| JsValue::from_str(&e.to_string()))?;

        log::info!("Mini-game started with seed: {}", seed);
        request_animation_frame(game, token);
        Ok(())
    }

    fn load_level(level: &str) -> Result<LevelSpec, comic_minigame::LevelError> {
        if level.trim_start().starts_with('{') {
            return LevelSpec::from_json(level);
        }
        match LevelSpec::preset(level) {
            Some(spec) => Ok(spec),
            None => {
                log::warn!("Unknown level '{}', using the comic preset", level);
                Ok(LevelSpec::comic())
            }
        }
    }

    /// Static images a level will ask for, so the first frames are not blank
    fn level_images(level: &LevelSpec) -> Vec<String> {
        use comic_minigame::sim::{Resolution, StepSpec, Visual};

        let mut ids = vec![level.background.clone()];
        let visuals = level.entities.iter().map(|e| &e.visual)
            .chain(level.targets.iter().map(|t| &t.visual));
        for visual in visuals {
            if let Visual::Image { id } = visual {
                ids.push(id.clone());
            }
        }
        for pairing in &level.pairings {
            if let Resolution::Animated { anim } = &pairing.resolution {
                ids.extend((0..anim.total_frames).map(|f| anim.frame_image(f)));
            }
        }
        for step in &level.transition {
            match step {
                StepSpec::Fade { to, .. } => ids.push(to.clone()),
                StepSpec::Flight { flight } => ids.push(flight.sprite.clone()),
                StepSpec::Specials { frame_prefix, total_frames, .. } => {
                    ids.extend((1..=*total_frames).map(|n| format!("{frame_prefix}{n}")));
                }
                StepSpec::Delay { .. } | StepSpec::HideEntities => {}
            }
        }
        ids
    }

    fn set_display(id: &str, value: &str) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        if let Some(el) = document
            .get_element_by_id(id)
            .and_then(|el| el.dyn_into::<HtmlElement>().ok())
        {
            let _ = el.style().set_property("display", value);
        }
    }

    fn show_next_page(next_page: Option<&str>) {
        set_display("game-page", "none");
        if let Some(page) = next_page {
            set_display(page, "block");
        }
        log::info!("Mini-game complete, handing back to the comic");
    }

    fn mapping(canvas: &HtmlCanvasElement) -> SurfaceMapping {
        let rect = canvas.get_bounding_client_rect();
        SurfaceMapping {
            rect_origin: Vec2::new(rect.left() as f32, rect.top() as f32),
            rect_size: Vec2::new(rect.width() as f32, rect.height() as f32),
            surface_size: Vec2::new(GAME_WIDTH, GAME_HEIGHT),
        }
    }

    fn setup_input_handlers(canvas: &HtmlCanvasElement, game: Rc<RefCell<Game>>) {
        // Mouse
        for (name, kind) in [
            ("mousedown", PointerKind::Press),
            ("mousemove", PointerKind::Move),
            ("mouseup", PointerKind::Release),
            ("mouseleave", PointerKind::Release),
        ] {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: MouseEvent| {
                let client = Vec2::new(event.client_x() as f32, event.client_y() as f32);
                let pos = mapping(&canvas_clone).to_surface(client);
                game.borrow_mut().engine.pointer(PointerEvent { kind, pos });
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }

        // Touch - first touch point only
        for (name, kind) in [
            ("touchstart", PointerKind::Press),
            ("touchmove", PointerKind::Move),
            ("touchend", PointerKind::Release),
            ("touchcancel", PointerKind::Release),
        ] {
            let game = game.clone();
            let canvas_clone = canvas.clone();
            let closure = Closure::<dyn FnMut(_)>::new(move |event: TouchEvent| {
                event.prevent_default();
                let event = match kind {
                    PointerKind::Release => PointerEvent::release(),
                    _ => {
                        let Some(touch) = event.touches().get(0) else {
                            return;
                        };
                        let client = Vec2::new(touch.client_x() as f32, touch.client_y() as f32);
                        PointerEvent { kind, pos: mapping(&canvas_clone).to_surface(client) }
                    }
                };
                game.borrow_mut().engine.pointer(event);
            });
            let _ = canvas.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref());
            closure.forget();
        }
    }

    fn request_animation_frame(game: Rc<RefCell<Game>>, token: SessionToken) {
        let window = web_sys::window().expect("no window");
        let closure = Closure::once(move |time: f64| {
            game_loop(game, token, time);
        });
        let _ = window.request_animation_frame(closure.as_ref().unchecked_ref());
        closure.forget();
    }

    fn game_loop(game: Rc<RefCell<Game>>, token: SessionToken, time: f64) {
        let outcome = {
            let mut g = game.borrow_mut();
            let Game { engine, surface } = &mut *g;
            engine.frame(token, time, surface)
        };

        // Finished or superseded by a newer session: this loop ends here
        if outcome == FrameOutcome::Continue {
            request_animation_frame(game, token);
        }
    }
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    wasm_game::init()
}

/// Entry called by the comic page when the mini-game panel is reached
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen]
pub fn start_game(level: &str, next_page: Option<String>) -> Result<(), JsValue> {
    wasm_game::start_game(level, next_page)
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Comic mini-game (native) starting...");
    log::info!("Native mode plays headless - run with `trunk serve` for the web version");

    let level = std::env::args().nth(1).unwrap_or_else(|| "comic".to_string());
    match autoplay::run(&level) {
        Ok(summary) => println!("{summary}"),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

/// Scripted player that drags each figure onto its enemies
#[cfg(not(target_arch = "wasm32"))]
mod autoplay {
    use std::cell::Cell;
    use std::rc::Rc;

    use glam::Vec2;

    use comic_minigame::renderer::DrawCommand;
    use comic_minigame::sim::PointerEvent;
    use comic_minigame::{Engine, FrameOutcome, LevelError, LevelSpec};

    const FRAME_MS: f64 = 1000.0 / 60.0;
    const MAX_MS: f64 = 120_000.0;

    pub fn run(level_name: &str) -> Result<String, LevelError> {
        let level = match LevelSpec::preset(level_name) {
            Some(level) => level,
            None => LevelSpec::from_json(&std::fs::read_to_string(level_name)?)?,
        };
        let name = level.name.clone();

        let done = Rc::new(Cell::new(false));
        let done_hook = done.clone();
        let mut engine = Engine::new();
        let token = engine.start(level, 1, move || done_hook.set(true))?;
        let homes: Vec<Vec2> = engine
            .session()
            .map(|s| s.entities.iter().map(|e| e.pos).collect())
            .unwrap_or_default();

        let mut surface: Vec<DrawCommand> = Vec::new();
        let mut now = 0.0;
        let mut frames = 0u32;
        let mut cleared_at = None;

        while now < MAX_MS {
            if cleared_at.is_none() {
                play_move(&mut engine, &homes);
            }

            surface.clear();
            let outcome = engine.frame(token, now, &mut surface);
            frames += 1;

            if cleared_at.is_none() && engine.session().is_some_and(|s| s.is_cleared()) {
                cleared_at = Some(now);
                log::info!("Cleared after {:.0}ms", now);
            }
            if outcome != FrameOutcome::Continue {
                break;
            }
            now += FRAME_MS;
        }

        Ok(format!(
            "level '{}': {} frames, cleared at {}, finished: {}",
            name,
            frames,
            cleared_at.map_or("never".to_string(), |t| format!("{t:.0}ms")),
            done.get()
        ))
    }

    fn drag(engine: &mut Engine, from: Vec2, to: Vec2) {
        engine.pointer(PointerEvent::press(from.x, from.y));
        engine.pointer(PointerEvent::moved(to.x, to.y));
        engine.pointer(PointerEvent::release());
    }

    /// Send free figures home, then drag one onto a matching enemy
    fn play_move(engine: &mut Engine, homes: &[Vec2]) {
        let Some(session) = engine.session() else {
            return;
        };

        // Grip at the visual center so both box and circle bounds are hit
        let grip = |e: &comic_minigame::sim::ControlledEntity| e.bounds.center(e.pos) - e.pos;
        let mut moves: Vec<(Vec2, Vec2)> = session
            .entities
            .iter()
            .zip(homes)
            .rev()
            .filter(|(e, home)| e.can_grab() && e.pos != **home)
            .map(|(e, home)| (e.pos + grip(e), *home + grip(e)))
            .collect();

        let level = &session.level;
        let next = session.targets.iter().find_map(|t| {
            let entity = session
                .entities
                .iter()
                .find(|e| e.can_grab() && level.pairing(e.kind, t.kind).is_some())?;
            t.in_overlap_pool().then(|| {
                let home = homes.iter().zip(&session.entities).find(|(_, e)| e.id == entity.id);
                let from = home.map_or(entity.pos, |(h, _)| *h);
                (from + grip(entity), t.pos + grip(entity))
            })
        });
        moves.extend(next);

        for (from, to) in moves {
            drag(engine, from, to);
        }
    }
}
