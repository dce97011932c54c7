//! Pipino Air: presentation shell
//!
//! Draws the current stage and routes keyboard/mouse input into the journey
//! controller. Stage choreography lives elsewhere; this is just enough shell
//! to walk the journey and hear its cues.

use airport_journey::audio::{AudioOutput, HeadlessOutput, SAMPLE_RATE};
use airport_journey::config::JourneyConfig;
use airport_journey::haptics::default_haptics;
use airport_journey::journey::{FlightPhase, Stage, StageController, TOTAL_STAGES};
use airport_journey::storage::{default_store, StageStore};
use airport_journey::{AudioEngine, SoundEffect, VibrationPattern, VERSION};
use macroquad::prelude::*;

const BACKGROUND: Color = Color::new(0.06, 0.09, 0.16, 1.0);
const ACCENT: Color = Color::new(0.98, 0.62, 0.18, 1.0);
const MUTED: Color = Color::new(0.55, 0.60, 0.70, 1.0);
const HEADER_HEIGHT: f32 = 72.0;

/// Digit row keys mapped onto stage indices 0..11
const JUMP_KEYS: [KeyCode; TOTAL_STAGES] = [
    KeyCode::Key1,
    KeyCode::Key2,
    KeyCode::Key3,
    KeyCode::Key4,
    KeyCode::Key5,
    KeyCode::Key6,
    KeyCode::Key7,
    KeyCode::Key8,
    KeyCode::Key9,
    KeyCode::Key0,
    KeyCode::Minus,
    KeyCode::Equal,
];

fn window_conf() -> Conf {
    Conf {
        window_title: format!("Pipino Air v{}", VERSION),
        window_width: 960,
        window_height: 640,
        window_resizable: true,
        high_dpi: true,
        ..Default::default()
    }
}

fn load_config() -> JourneyConfig {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let path = std::env::args()
            .nth(1)
            .unwrap_or_else(|| airport_journey::config::DEFAULT_CONFIG_FILE.to_string());
        JourneyConfig::load_or_default(path)
    }

    #[cfg(target_arch = "wasm32")]
    {
        JourneyConfig::default()
    }
}

fn audio_output(config: &JourneyConfig) -> Box<dyn AudioOutput> {
    if !config.audio_enabled {
        log::info!("Audio disabled in config");
        return Box::new(HeadlessOutput::new(SAMPLE_RATE));
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(airport_journey::audio::CpalOutput::new())
    }

    #[cfg(target_arch = "wasm32")]
    {
        Box::new(airport_journey::audio::WebOutput::new())
    }
}

fn build_controller(config: &JourneyConfig) -> StageController {
    let audio = AudioEngine::new(audio_output(config))
        .with_levels(config.levels())
        .with_fade_out(config.fade_out_secs)
        .with_haptics(default_haptics());
    let store = StageStore::new(default_store(), config.storage_key.clone());
    StageController::new(audio, store, config.transition_delay_secs)
        .with_flight_duration(config.flight_duration_secs)
}

/// Local feedback cue: effect plus vibration
fn cue(controller: &mut StageController, effect: SoundEffect, pattern: impl Into<VibrationPattern>) {
    let audio = controller.audio_mut();
    audio.play_effect(effect);
    audio.vibrate(pattern);
}

/// Unlock audio on the first gesture and kick off the background track
async fn unlock_audio(controller: &mut StageController, config: &JourneyConfig) {
    if !controller.init_audio() {
        return;
    }
    let Some(track) = config.background_track.as_deref() else {
        return;
    };

    #[cfg(not(target_arch = "wasm32"))]
    controller.audio_mut().preload_background(track);

    #[cfg(target_arch = "wasm32")]
    match macroquad::file::load_file(track).await {
        Ok(bytes) => {
            let hint = airport_journey::audio::background::extension_hint(track);
            controller.audio_mut().load_background_bytes(bytes, hint.as_deref());
        }
        Err(e) => log::warn!("Failed to fetch background track {}: {}", track, e),
    }
}

fn draw_header(controller: &StageController) {
    let w = screen_width();
    draw_rectangle(0.0, 0.0, w, HEADER_HEIGHT, Color::new(0.0, 0.0, 0.0, 0.35));

    let title = format!("{}  ·  {}/{}", controller.stage().name(), controller.current_stage() + 1, TOTAL_STAGES);
    draw_text(&title, 24.0, 34.0, 28.0, WHITE);

    let toggles = format!(
        "SFX {}   AMB {}",
        if controller.sfx_enabled() { "on" } else { "off" },
        if controller.ambient_enabled() { "on" } else { "off" },
    );
    let dims = measure_text(&toggles, None, 20, 1.0);
    draw_text(&toggles, w - dims.width - 24.0, 32.0, 20.0, MUTED);

    // Progress bar
    let bar_w = w - 48.0;
    let fill = bar_w * (controller.progress_percent() / 100.0) as f32;
    draw_rectangle(24.0, 52.0, bar_w, 6.0, Color::new(1.0, 1.0, 1.0, 0.15));
    draw_rectangle(24.0, 52.0, fill, 6.0, ACCENT);
}

fn draw_stage_card(controller: &StageController) {
    let w = screen_width();
    let h = screen_height();
    // Content fades out while a transition is pending
    let alpha = if controller.is_transitioning() { 0.35 } else { 1.0 };

    let card_w = (w - 96.0).min(640.0);
    let card_h = 260.0;
    let x = (w - card_w) * 0.5;
    let y = HEADER_HEIGHT + (h - HEADER_HEIGHT - card_h) * 0.5;
    draw_rectangle(x, y, card_w, card_h, Color::new(1.0, 1.0, 1.0, 0.06 * alpha));
    draw_rectangle_lines(x, y, card_w, card_h, 2.0, Color::new(ACCENT.r, ACCENT.g, ACCENT.b, alpha));

    let stage = controller.stage();
    let name_dims = measure_text(stage.name(), None, 56, 1.0);
    draw_text(
        stage.name(),
        x + (card_w - name_dims.width) * 0.5,
        y + 100.0,
        56.0,
        Color::new(1.0, 1.0, 1.0, alpha),
    );

    let hint = match stage {
        Stage::Flight => flight_hint(controller),
        Stage::Arrival => "Fin del viaje  ·  R para reiniciar".to_string(),
        _ => "Enter / clic para continuar".to_string(),
    };
    let hint_dims = measure_text(&hint, None, 22, 1.0);
    draw_text(
        &hint,
        x + (card_w - hint_dims.width) * 0.5,
        y + 160.0,
        22.0,
        Color::new(MUTED.r, MUTED.g, MUTED.b, alpha),
    );

    if stage == Stage::Flight && controller.flight().is_started() {
        let bar_w = card_w - 80.0;
        let progress = controller.flight().progress() as f32;
        draw_rectangle(x + 40.0, y + 200.0, bar_w, 8.0, Color::new(1.0, 1.0, 1.0, 0.15));
        draw_rectangle(x + 40.0, y + 200.0, bar_w * progress, 8.0, ACCENT);
    }
}

fn flight_hint(controller: &StageController) -> String {
    let flight = controller.flight();
    match flight.phase() {
        FlightPhase::Boarding => "F para despegar".to_string(),
        FlightPhase::Arrived => flight.phase().label().to_string(),
        phase => format!("{}  ·  F para saltar", phase.label()),
    }
}

#[macroquad::main(window_conf)]
async fn main() {
    // Initialize crash logging FIRST (before any other code)
    #[cfg(not(target_arch = "wasm32"))]
    crashlog::setup!(crashlog::cargo_metadata!().capitalized(), false);

    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = load_config();
    let mut controller = build_controller(&config);
    let mut audio_unlocked = false;

    log::info!("=== Pipino Air v{} ===", VERSION);

    loop {
        let now = get_time();

        let clicked = is_mouse_button_pressed(MouseButton::Left) && mouse_position().1 > HEADER_HEIGHT;
        let gesture = clicked || get_last_key_pressed().is_some();
        if gesture && !audio_unlocked {
            audio_unlocked = true;
            unlock_audio(&mut controller, &config).await;
        }

        if clicked || is_key_pressed(KeyCode::Enter) || is_key_pressed(KeyCode::Space) {
            controller.advance(now);
        }
        for (target, key) in JUMP_KEYS.iter().enumerate() {
            if is_key_pressed(*key) {
                controller.go_to(target, now);
            }
        }
        if is_key_pressed(KeyCode::R) {
            controller.reset();
        }
        if is_key_pressed(KeyCode::S) {
            controller.toggle_sfx();
        }
        if is_key_pressed(KeyCode::A) {
            controller.toggle_ambient();
        }
        if is_key_pressed(KeyCode::F) && !controller.start_flight(now) {
            controller.skip_flight(now);
        }
        if is_key_pressed(KeyCode::P) {
            cue(&mut controller, SoundEffect::Stamp, 50u32);
        }
        if is_key_pressed(KeyCode::U) {
            cue(&mut controller, SoundEffect::Unlock, [100u32, 50, 100, 50, 200]);
        }
        if is_key_pressed(KeyCode::D) {
            cue(&mut controller, SoundEffect::Door, [50u32, 50, 100]);
        }

        if controller.update(now) == Some(Stage::Arrival.index()) {
            cue(&mut controller, SoundEffect::Success, [100u32, 50, 100]);
        }
        controller.audio_mut().update(get_frame_time() as f64);

        clear_background(BACKGROUND);
        draw_header(&controller);
        draw_stage_card(&controller);

        next_frame().await;
    }
}
