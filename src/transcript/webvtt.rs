use std::time::Duration;

use crate::utils::{collapse_whitespace, decode_entities, strip_markup};
use crate::TranscriptError;

/// One timed caption entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub identifier: Option<String>,
    pub start: Duration,
    pub end: Duration,
    /// Positioning settings after the end timestamp, if any
    pub settings: Option<String>,
    pub lines: Vec<String>,
}

/// Parsed WebVTT document; cues keep the order the source delivered them in
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimedTextDocument {
    pub cues: Vec<Cue>,
}

fn parse_error(line: usize, reason: impl Into<String>) -> TranscriptError {
    TranscriptError::Parse {
        line,
        reason: reason.into(),
    }
}

impl TimedTextDocument {
    /// Parse a WebVTT payload
    pub fn parse(input: &str) -> Result<Self, TranscriptError> {
        let input = input.strip_prefix('\u{feff}').unwrap_or(input);
        let lines: Vec<&str> = input.lines().collect();

        match lines.first() {
            Some(first) if is_signature(first) => {}
            _ => return Err(parse_error(1, "missing WEBVTT header")),
        }

        let mut cues = Vec::new();
        // The header runs until the first blank line
        let mut index = lines
            .iter()
            .position(|line| line.trim().is_empty())
            .unwrap_or(lines.len());

        while index < lines.len() {
            if lines[index].trim().is_empty() {
                index += 1;
                continue;
            }

            let start = index;
            while index < lines.len() && !lines[index].trim().is_empty() {
                index += 1;
            }

            if let Some(cue) = parse_block(&lines[start..index], start + 1)? {
                cues.push(cue);
            }
        }

        Ok(Self { cues })
    }

    /// Cue text in order with markup removed and immediate repeats collapsed
    pub fn to_plain_text(&self) -> String {
        let mut kept: Vec<String> = Vec::new();

        for line in self.cues.iter().flat_map(|cue| cue.lines.iter()) {
            let cleaned = collapse_whitespace(&decode_entities(&strip_markup(line)));
            if cleaned.is_empty() || kept.last() == Some(&cleaned) {
                continue;
            }
            kept.push(cleaned);
        }

        kept.join(" ")
    }
}

fn is_signature(line: &str) -> bool {
    match line.strip_prefix("WEBVTT") {
        Some(rest) => rest.is_empty() || rest.starts_with(' ') || rest.starts_with('\t'),
        None => false,
    }
}

fn is_block_keyword(line: &str, keyword: &str) -> bool {
    match line.strip_prefix(keyword) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// `first_line` is the 1-based line number of `block[0]`
fn parse_block(block: &[&str], first_line: usize) -> Result<Option<Cue>, TranscriptError> {
    let first = block[0];
    if ["NOTE", "STYLE", "REGION"]
        .iter()
        .any(|keyword| is_block_keyword(first, keyword))
    {
        return Ok(None);
    }

    let (identifier, timing_index) = if first.contains("-->") {
        (None, 0)
    } else if block.len() > 1 && block[1].contains("-->") {
        (Some(first.trim().to_string()), 1)
    } else {
        return Err(parse_error(first_line, "cue block without a timing line"));
    };

    let timing_line = first_line + timing_index;
    let (start, end, settings) = parse_timing(block[timing_index], timing_line)?;

    Ok(Some(Cue {
        identifier,
        start,
        end,
        settings,
        lines: block[timing_index + 1..]
            .iter()
            .map(|line| line.to_string())
            .collect(),
    }))
}

fn parse_timing(line: &str, line_number: usize) -> Result<(Duration, Duration, Option<String>), TranscriptError> {
    let (left, right) = line
        .split_once("-->")
        .ok_or_else(|| parse_error(line_number, "missing '-->'"))?;

    let right = right.trim_start();
    let (end_token, settings) = match right.split_once(char::is_whitespace) {
        Some((end, rest)) => (end, Some(rest.trim().to_string()).filter(|s| !s.is_empty())),
        None => (right, None),
    };

    let start = parse_timestamp(left.trim())
        .ok_or_else(|| parse_error(line_number, format!("invalid start timestamp '{}'", left.trim())))?;
    let end = parse_timestamp(end_token)
        .ok_or_else(|| parse_error(line_number, format!("invalid end timestamp '{}'", end_token)))?;

    if end < start {
        return Err(parse_error(line_number, "cue ends before it starts"));
    }

    Ok((start, end, settings))
}

/// `hh:mm:ss.ttt` or `mm:ss.ttt`
pub fn parse_timestamp(timestamp: &str) -> Option<Duration> {
    let (clock, millis) = timestamp.split_once('.')?;
    if millis.len() != 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let parts: Vec<&str> = clock.split(':').collect();
    let (hours, minutes, seconds) = match parts.as_slice() {
        [h, m, s] if h.len() >= 2 && h.bytes().all(|b| b.is_ascii_digit()) => (h.parse::<u64>().ok()?, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };

    let two_digits = |field: &str| -> Option<u64> {
        if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        field.parse::<u64>().ok().filter(|value| *value < 60)
    };

    let total_ms = hours
        .checked_mul(3_600_000)?
        .checked_add(two_digits(minutes)? * 60_000)?
        .checked_add(two_digits(seconds)? * 1_000)?
        .checked_add(millis.parse::<u64>().ok()?)?;

    Some(Duration::from_millis(total_ms))
}
