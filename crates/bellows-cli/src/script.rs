//! Performance scripts for offline rendering.
//!
//! One timed event per line, `#` starts a comment:
//!
//! ```text
//! # C major triad with the lid half open
//! 0     angle 60
//! 0     down a
//! 0     down d
//! 0     down g
//! 500   up d
//! 1000  scale Natural Minor
//! 1000  down d
//! 1500  pressure off
//! 2000  up a
//! ```
//!
//! ## Grammar
//!
//! ```text
//! line    ::= time_ms action
//! action  ::= 'down' key | 'up' key | 'angle' degrees
//!           | 'scale' name | 'pressure' ('on' | 'off')
//! key     ::= single character printed on the key
//! ```
//!
//! Events are returned sorted by time; events sharing a time keep their
//! order in the file.

use bellows_platform::KeyCode;
use thiserror::Error;

/// What happens at an event's time.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Press a key.
    KeyDown(KeyCode),
    /// Release a key.
    KeyUp(KeyCode),
    /// Move the lid to this angle in degrees.
    Angle(f64),
    /// Switch to the named scale.
    Scale(String),
    /// Turn air-pressure volume on or off.
    AirPressure(bool),
}

/// One timed script event.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptEvent {
    /// Milliseconds from the start of the render.
    pub time_ms: u64,
    /// The event.
    pub action: Action,
}

/// Script parse failure.
#[derive(Debug, Error)]
#[error("line {line}: {reason}")]
pub struct ScriptError {
    /// 1-based line number.
    pub line: usize,
    /// What was wrong.
    pub reason: String,
}

impl ScriptError {
    fn new(line: usize, reason: impl Into<String>) -> Self {
        Self {
            line,
            reason: reason.into(),
        }
    }
}

/// Parse a performance script.
pub fn parse_script(text: &str) -> Result<Vec<ScriptEvent>, ScriptError> {
    let mut events = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.split('#').next().unwrap_or_default().trim();
        if line.is_empty() {
            continue;
        }

        let (time, rest) = line
            .split_once(char::is_whitespace)
            .ok_or_else(|| ScriptError::new(line_no, "expected '<time_ms> <action>'"))?;
        let time_ms = time
            .parse::<u64>()
            .map_err(|e| ScriptError::new(line_no, format!("bad time '{time}': {e}")))?;

        let rest = rest.trim_start();
        let (verb, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(verb, arg)| (verb, arg.trim()));

        let action = match verb {
            "down" => Action::KeyDown(parse_key(line_no, arg)?),
            "up" => Action::KeyUp(parse_key(line_no, arg)?),
            "angle" => Action::Angle(
                arg.parse::<f64>()
                    .ok()
                    .filter(|deg| deg.is_finite())
                    .ok_or_else(|| ScriptError::new(line_no, format!("bad angle '{arg}'")))?,
            ),
            "scale" if !arg.is_empty() => Action::Scale(arg.to_string()),
            "scale" => return Err(ScriptError::new(line_no, "missing scale name")),
            "pressure" => match arg {
                "on" => Action::AirPressure(true),
                "off" => Action::AirPressure(false),
                _ => {
                    return Err(ScriptError::new(
                        line_no,
                        format!("expected 'on' or 'off', got '{arg}'"),
                    ));
                }
            },
            other => {
                return Err(ScriptError::new(
                    line_no,
                    format!("unknown action '{other}'"),
                ));
            }
        };
        events.push(ScriptEvent { time_ms, action });
    }

    events.sort_by_key(|e| e.time_ms);
    Ok(events)
}

fn parse_key(line: usize, arg: &str) -> Result<KeyCode, ScriptError> {
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => KeyCode::from_char(c)
            .ok_or_else(|| ScriptError::new(line, format!("unknown key '{c}'"))),
        _ => Err(ScriptError::new(
            line,
            format!("expected a single key character, got '{arg}'"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: char) -> KeyCode {
        KeyCode::from_char(c).unwrap()
    }

    #[test]
    fn test_parse_all_actions() {
        let events = parse_script(
            "0 down a\n\
             10 up a\n\
             20 angle 42.5\n\
             30 scale Natural Minor\n\
             40 pressure off\n",
        )
        .unwrap();
        let actions: Vec<_> = events.into_iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                Action::KeyDown(key('a')),
                Action::KeyUp(key('a')),
                Action::Angle(42.5),
                Action::Scale("Natural Minor".to_string()),
                Action::AirPressure(false),
            ]
        );
    }

    #[test]
    fn test_comments_blank_lines_and_spacing() {
        let events = parse_script("# intro\n\n   100    down   ;  # semicolon key\n").unwrap();
        assert_eq!(
            events,
            vec![ScriptEvent {
                time_ms: 100,
                action: Action::KeyDown(key(';')),
            }]
        );
    }

    #[test]
    fn test_sorted_stably() {
        let events = parse_script("200 down s\n0 down a\n200 up s\n").unwrap();
        let times: Vec<_> = events.iter().map(|e| e.time_ms).collect();
        assert_eq!(times, vec![0, 200, 200]);
        assert_eq!(events[1].action, Action::KeyDown(key('s')));
        assert_eq!(events[2].action, Action::KeyUp(key('s')));
    }

    #[test]
    fn test_errors_report_line() {
        let err = parse_script("0 down a\nsoon down s\n").unwrap_err();
        assert_eq!(err.line, 2);

        for bad in [
            "0 down",
            "0 down ab",
            "0 up \u{e9}",
            "0 angle wide",
            "0 angle NaN",
            "0 scale",
            "0 pressure maybe",
            "0 strum a",
            "0",
        ] {
            assert!(parse_script(bad).is_err(), "{bad:?} should not parse");
        }
    }
}
