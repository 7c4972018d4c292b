//! One-line terminal status display.

use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};

use crate::audio::PlaybackState;
use crate::library::Track;
use crate::progress::DisplaySink;

const BAR_WIDTH: usize = 30;

#[derive(Debug, Default)]
struct StatusLine {
    title: String,
    state: PlaybackState,
    millis_in: u64,
    total: Option<Duration>,
    percent: f32,
    volume: u8,
    shuffle: bool,
    repeat: bool,
    /// Last rendered text; identical frames are not redrawn.
    rendered: String,
}

/// [`DisplaySink`] redrawing a single status line on stdout.
#[derive(Debug, Default)]
pub struct TerminalSink {
    line: Mutex<StatusLine>,
}

impl TerminalSink {
    pub fn new(volume: u8) -> Self {
        Self {
            line: Mutex::new(StatusLine {
                volume,
                ..StatusLine::default()
            }),
        }
    }

    pub fn set_modes(&self, shuffle: bool, repeat: bool) {
        self.with_line(|line| {
            line.shuffle = shuffle;
            line.repeat = repeat;
        });
    }

    fn with_line(&self, f: impl FnOnce(&mut StatusLine)) {
        let Ok(mut line) = self.line.lock() else {
            return;
        };
        f(&mut line);
        let text = line.render();
        if text == line.rendered {
            return;
        }
        let mut out = io::stdout();
        let _ = queue!(out, MoveToColumn(0), Clear(ClearType::CurrentLine), Print(&text));
        let _ = out.flush();
        line.rendered = text;
    }
}

impl DisplaySink for TerminalSink {
    fn position(&self, millis_in: u64, total: Option<Duration>) {
        self.with_line(|line| {
            line.millis_in = millis_in;
            line.total = total;
        });
    }

    fn progress(&self, percent: f32) {
        self.with_line(|line| line.percent = percent.clamp(0.0, 1.0));
    }

    fn volume(&self, percent: u8) {
        self.with_line(|line| line.volume = percent);
    }

    fn track_changed(&self, track: Option<&Track>) {
        self.with_line(|line| {
            line.title = track.map(|t| t.display.clone()).unwrap_or_default();
            line.millis_in = 0;
            line.percent = 0.0;
        });
    }

    fn state_changed(&self, state: PlaybackState) {
        self.with_line(|line| line.state = state);
    }
}

impl StatusLine {
    fn render(&self) -> String {
        let icon = match self.state {
            PlaybackState::Playing => ">",
            PlaybackState::Paused => "||",
            PlaybackState::Stopped => "[]",
        };
        let filled = ((self.percent * BAR_WIDTH as f32).round() as usize).min(BAR_WIDTH);
        let bar = format!("{}{}", "#".repeat(filled), "-".repeat(BAR_WIDTH - filled));
        let total = self
            .total
            .map(|d| format_millis(d.as_millis() as u64))
            .unwrap_or_else(|| "--:--".to_string());

        format!(
            "{icon} {} [{bar}] {}/{} vol {}%{}{}",
            self.title,
            format_millis(self.millis_in),
            total,
            self.volume,
            if self.shuffle { " [shuffle]" } else { "" },
            if self.repeat { " [repeat]" } else { "" },
        )
    }
}

/// `m:ss`, or `h:mm:ss` past an hour.
pub fn format_millis(millis: u64) -> String {
    let secs = millis / 1000;
    let (h, m, s) = (secs / 3600, (secs / 60) % 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_millis_minutes_and_hours() {
        assert_eq!(format_millis(0), "0:00");
        assert_eq!(format_millis(61_500), "1:01");
        assert_eq!(format_millis(3_723_000), "1:02:03");
    }

    #[test]
    fn render_shows_bar_and_flags() {
        let line = StatusLine {
            title: "Song (dreamy)".into(),
            state: PlaybackState::Playing,
            millis_in: 30_000,
            total: Some(Duration::from_secs(60)),
            percent: 0.5,
            volume: 40,
            shuffle: true,
            repeat: false,
            rendered: String::new(),
        };
        let text = line.render();
        assert!(text.starts_with("> Song (dreamy) ["));
        assert!(text.contains(&format!("{}{}", "#".repeat(15), "-".repeat(15))));
        assert!(text.contains("0:30/1:00"));
        assert!(text.contains("vol 40%"));
        assert!(text.contains("[shuffle]"));
        assert!(!text.contains("[repeat]"));
    }

    #[test]
    fn render_unknown_total() {
        let line = StatusLine::default();
        assert!(line.render().contains("0:00/--:--"));
    }
}
