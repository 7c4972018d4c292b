use std::time::{Duration, Instant};

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, warn};

use crate::audio::AudioPlayer;
use crate::config;
use crate::error::Result as PlaybackResult;

use super::terminal::TerminalSink;

const VOLUME_STEP: u8 = 5;

/// What a key press asks the engine to do.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyAction {
    PlayPause,
    Next,
    Prev,
    ToggleShuffle,
    ToggleRepeat,
    /// Relative seek as a fraction of the track.
    Scrub(f32),
    /// Relative volume change in percent.
    Volume(i16),
    Quit,
}

impl KeyAction {
    /// Transport actions are rate limited; the rest go through immediately.
    fn is_transport(self) -> bool {
        matches!(self, KeyAction::PlayPause | KeyAction::Next | KeyAction::Prev)
    }
}

/// Drops transport actions that follow the last accepted one within `gap`.
#[derive(Debug)]
pub struct ActionThrottle {
    gap: Duration,
    last: Option<Instant>,
}

impl ActionThrottle {
    pub fn new(gap: Duration) -> Self {
        Self { gap, last: None }
    }

    pub fn accept(&mut self, action: KeyAction, now: Instant) -> bool {
        if !action.is_transport() {
            return true;
        }
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) < self.gap {
                return false;
            }
        }
        self.last = Some(now);
        true
    }
}

/// Map a key press to an action.
pub fn map_key(key: KeyEvent, controls: &config::ControlsSettings) -> Option<KeyAction> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(KeyAction::Quit);
    }
    let scrub = controls.scrub_percent as f32 / 100.0;
    let action = match key.code {
        KeyCode::Char(' ') | KeyCode::Char('p') => KeyAction::PlayPause,
        KeyCode::Char('l') | KeyCode::Right => KeyAction::Next,
        KeyCode::Char('h') | KeyCode::Left => KeyAction::Prev,
        KeyCode::Char('s') => KeyAction::ToggleShuffle,
        KeyCode::Char('r') => KeyAction::ToggleRepeat,
        KeyCode::Char('L') => KeyAction::Scrub(scrub),
        KeyCode::Char('H') => KeyAction::Scrub(-scrub),
        KeyCode::Char('+') | KeyCode::Char('=') => KeyAction::Volume(VOLUME_STEP as i16),
        KeyCode::Char('-') => KeyAction::Volume(-(VOLUME_STEP as i16)),
        KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
        _ => return None,
    };
    Some(action)
}

/// Read keys until the user quits.
pub fn run(
    player: &AudioPlayer,
    settings: &config::Settings,
    sink: &TerminalSink,
) -> Result<(), Box<dyn std::error::Error>> {
    let info = player.info();
    sink.set_modes(info.shuffle, info.repeat);
    let mut throttle = ActionThrottle::new(settings.playback.action_throttle());

    loop {
        if !event::poll(Duration::from_millis(100))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        let Some(action) = map_key(key, &settings.controls) else {
            continue;
        };
        if action == KeyAction::Quit {
            return Ok(());
        }
        if !throttle.accept(action, Instant::now()) {
            debug!(?action, "dropping action inside the throttle window");
            continue;
        }
        if let Err(e) = apply(player, sink, action) {
            warn!("{action:?} failed: {e}");
        }
    }
}

fn apply(player: &AudioPlayer, sink: &TerminalSink, action: KeyAction) -> PlaybackResult<()> {
    match action {
        KeyAction::PlayPause => player.play_pause(),
        KeyAction::Next => player.skip_next(),
        KeyAction::Prev => player.skip_previous(),
        KeyAction::ToggleShuffle | KeyAction::ToggleRepeat => {
            if action == KeyAction::ToggleShuffle {
                player.toggle_shuffle()?;
            } else {
                player.toggle_repeat()?;
            }
            let info = player.info();
            sink.set_modes(info.shuffle, info.repeat);
            Ok(())
        }
        KeyAction::Scrub(delta) => {
            let now = player
                .info()
                .progress
                .map(|p| p.percent_in())
                .unwrap_or(0.0);
            player.seek((now + delta).clamp(0.0, 1.0))
        }
        KeyAction::Volume(delta) => {
            let next = (player.info().volume as i16 + delta).clamp(0, 100);
            player.set_volume(next as u8)
        }
        KeyAction::Quit => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn maps_transport_keys() {
        let controls = config::ControlsSettings::default();
        assert_eq!(map_key(press(KeyCode::Char(' ')), &controls), Some(KeyAction::PlayPause));
        assert_eq!(map_key(press(KeyCode::Char('l')), &controls), Some(KeyAction::Next));
        assert_eq!(map_key(press(KeyCode::Left), &controls), Some(KeyAction::Prev));
        assert_eq!(map_key(press(KeyCode::Char('q')), &controls), Some(KeyAction::Quit));
        assert_eq!(map_key(press(KeyCode::Char('x')), &controls), None);
    }

    #[test]
    fn scrub_step_follows_controls() {
        let controls = config::ControlsSettings { scrub_percent: 10 };
        assert_eq!(map_key(press(KeyCode::Char('L')), &controls), Some(KeyAction::Scrub(0.1)));
        assert_eq!(map_key(press(KeyCode::Char('H')), &controls), Some(KeyAction::Scrub(-0.1)));
    }

    #[test]
    fn ctrl_c_quits() {
        let controls = config::ControlsSettings::default();
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(map_key(key, &controls), Some(KeyAction::Quit));
    }

    #[test]
    fn throttle_drops_transport_actions_inside_the_gap() {
        let mut throttle = ActionThrottle::new(Duration::from_millis(50));
        let t0 = Instant::now();
        assert!(throttle.accept(KeyAction::PlayPause, t0));
        assert!(!throttle.accept(KeyAction::PlayPause, t0 + Duration::from_millis(10)));
        assert!(!throttle.accept(KeyAction::Next, t0 + Duration::from_millis(49)));
        assert!(throttle.accept(KeyAction::Prev, t0 + Duration::from_millis(50)));
    }

    #[test]
    fn throttle_lets_other_actions_through() {
        let mut throttle = ActionThrottle::new(Duration::from_millis(50));
        let t0 = Instant::now();
        assert!(throttle.accept(KeyAction::Next, t0));
        assert!(throttle.accept(KeyAction::Volume(5), t0));
        assert!(throttle.accept(KeyAction::ToggleShuffle, t0));
        assert!(throttle.accept(KeyAction::Scrub(0.05), t0));
        assert!(!throttle.accept(KeyAction::Next, t0 + Duration::from_millis(1)));
    }

    #[test]
    fn zero_gap_disables_the_throttle() {
        let mut throttle = ActionThrottle::new(Duration::ZERO);
        let t0 = Instant::now();
        assert!(throttle.accept(KeyAction::PlayPause, t0));
        assert!(throttle.accept(KeyAction::PlayPause, t0));
    }
}
