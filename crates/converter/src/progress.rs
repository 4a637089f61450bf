use regex::Regex;

/// Percent-complete update for one running conversion.
///
/// Percent is always 0..=100 and never decreases across the events one
/// parser emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    pub percent: u8,
}

/// Incremental parser for the engine's diagnostic stream.
///
/// Two states: until a `Duration: HH:MM:SS.ff` line is seen, every line is
/// scanned only for the total duration. Once it is known, `time=HH:MM:SS.ff`
/// lines yield progress events. Everything else is noise and is ignored;
/// diagnostic formats vary across engine versions, so unparseable lines are
/// never an error. If the duration line never shows up, no events are ever
/// emitted and completion is judged from the exit status alone.
pub struct ProgressParser {
    duration_secs: Option<f64>,
    last_percent: u8,
    duration_re: Regex,
    time_re: Regex,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self {
            duration_secs: None,
            last_percent: 0,
            // Patterns are fixed; compile failure would be a programming error
            duration_re: Regex::new(r"Duration:\s(\d+):(\d+):(\d+\.\d+)").unwrap(),
            time_re: Regex::new(r"time=(\d+):(\d+):(\d+\.\d+)").unwrap(),
        }
    }

    /// Feed one diagnostic line; returns an event when progress advanced
    pub fn push_line(&mut self, line: &str) -> Option<ProgressEvent> {
        match self.duration_secs {
            None => {
                if let Some(caps) = self.duration_re.captures(line) {
                    let secs = Self::to_seconds(&caps);
                    if secs > 0.0 {
                        self.duration_secs = Some(secs);
                    }
                }
                None
            }
            Some(duration) => {
                let caps = self.time_re.captures(line)?;
                let position = Self::to_seconds(&caps);
                let percent = ((position / duration).min(1.0) * 100.0).floor() as u8;
                // Clamp non-decreasing; a stale time= line never walks back
                let percent = percent.max(self.last_percent);
                self.last_percent = percent;
                Some(ProgressEvent { percent })
            }
        }
    }

    fn to_seconds(caps: &regex::Captures<'_>) -> f64 {
        let h: f64 = caps[1].parse().unwrap_or(0.0);
        let m: f64 = caps[2].parse().unwrap_or(0.0);
        let s: f64 = caps[3].parse().unwrap_or(0.0);
        h * 3600.0 + m * 60.0 + s
    }
}

impl Default for ProgressParser {
    fn default() -> Self {
        Self::new()
    }
}
