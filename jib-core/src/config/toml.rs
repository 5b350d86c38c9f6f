//! Simple TOML parser for head configuration
//!
//! This is a minimal TOML parser that handles only the subset needed for
//! `head.toml`. It does NOT support the full TOML spec and needs no allocator.
//!
//! Supported features:
//! - Key = value pairs (string, integer, float, boolean)
//! - `[axis.<name>]` section headers
//! - Comments (# ...), including trailing comments
//!
//! NOT supported:
//! - Arrays and inline tables
//! - Multi-line strings
//! - Dotted keys outside section headers

use heapless::String as HString;

use super::axis::{midpoint, AxisConfig, HeadConfig, LimitPolarity, MAX_NAME_LEN};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Invalid or unsupported section header
    InvalidSection,
    /// Value has the wrong type or is out of range
    InvalidValue,
    /// Key not recognised in this section
    UnknownKey,
    /// Too many axes (exceeded heapless capacity)
    TooManyItems,
}

/// Current parsing context
#[derive(Debug, Clone)]
enum Section {
    Root,
    Axis(HString<MAX_NAME_LEN>),
}

/// Axis being built, with whether home was given explicitly
struct PendingAxis {
    config: AxisConfig,
    home_set: bool,
}

/// Parse TOML configuration into a `HeadConfig`
///
/// Values are not validated here; call [`HeadConfig::validate`] on the result.
pub fn parse_config(input: &str) -> Result<HeadConfig, ParseError> {
    let mut config = HeadConfig::new();
    let mut section = Section::Root;
    let mut current: Option<PendingAxis> = None;

    for line in input.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with('[') {
            save_section(&mut config, &mut current)?;

            let header = strip_comment(line);
            let header = header
                .strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .ok_or(ParseError::InvalidSection)?;
            section = parse_section_header(header)?;

            if let Section::Axis(name) = &section {
                let mut axis = AxisConfig::default();
                axis.name = name.clone();
                current = Some(PendingAxis {
                    config: axis,
                    home_set: false,
                });
            }
            continue;
        }

        if let Some((key, value)) = parse_key_value(line) {
            apply_value(&section, key, value, &mut current)?;
        } else {
            return Err(ParseError::InvalidValue);
        }
    }

    save_section(&mut config, &mut current)?;

    Ok(config)
}

/// Parse section header like "axis.pan" or "axis pan"
fn parse_section_header(header: &str) -> Result<Section, ParseError> {
    let header = header.trim();

    let (kind, name) = header
        .split_once('.')
        .or_else(|| header.split_once(char::is_whitespace))
        .ok_or(ParseError::InvalidSection)?;

    let name = parse_string(name.trim());
    if name.is_empty() || name.contains('.') {
        return Err(ParseError::InvalidSection);
    }

    match kind.trim() {
        "axis" => {
            let name = HString::try_from(name).map_err(|_| ParseError::InvalidSection)?;
            Ok(Section::Axis(name))
        }
        _ => Err(ParseError::InvalidSection),
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        // Make sure # is not inside a string
        Some(pos) if line[..pos].matches('"').count() % 2 == 0 => line[..pos].trim(),
        _ => line,
    }
}

fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = strip_comment(value.trim());

    if key.is_empty() || value.is_empty() {
        return None;
    }

    Some((key, value))
}

fn parse_string(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        // Allow unquoted strings for simple values
        value
    }
}

fn parse_int<T: core::str::FromStr>(value: &str) -> Result<T, ParseError> {
    let value = value.replace_underscores();
    value.as_str().parse().map_err(|_| ParseError::InvalidValue)
}

fn parse_float(value: &str) -> Result<f32, ParseError> {
    let value = value.replace_underscores();
    let parsed: f32 = value.as_str().parse().map_err(|_| ParseError::InvalidValue)?;
    if parsed.is_finite() {
        Ok(parsed)
    } else {
        Err(ParseError::InvalidValue)
    }
}

fn parse_bool(value: &str) -> Result<bool, ParseError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ParseError::InvalidValue),
    }
}

fn parse_polarity(value: &str) -> Result<LimitPolarity, ParseError> {
    match parse_string(value) {
        "active_low" | "low" => Ok(LimitPolarity::ActiveLow),
        "active_high" | "high" => Ok(LimitPolarity::ActiveHigh),
        _ => Err(ParseError::InvalidValue),
    }
}

/// TOML allows `26_000`; numbers are short, so a fixed buffer is enough
trait ReplaceUnderscores {
    fn replace_underscores(&self) -> HString<24>;
}

impl ReplaceUnderscores for str {
    fn replace_underscores(&self) -> HString<24> {
        let mut out = HString::new();
        for c in self.chars().filter(|&c| c != '_') {
            if out.push(c).is_err() {
                // Too long to be a number; an empty string fails to parse
                return HString::new();
            }
        }
        out
    }
}

fn apply_value(
    section: &Section,
    key: &str,
    value: &str,
    current: &mut Option<PendingAxis>,
) -> Result<(), ParseError> {
    match section {
        // No root-level keys are defined
        Section::Root => Err(ParseError::UnknownKey),
        Section::Axis(_) => {
            let pending = current.as_mut().ok_or(ParseError::InvalidSection)?;
            let a = &mut pending.config;
            match key {
                "max_speed" => a.max_speed = parse_float(value)?,
                "default_acceleration" | "acceleration" => {
                    a.default_acceleration = parse_float(value)?
                }
                "min_position" => a.min_position = parse_int(value)?,
                "max_position" => a.max_position = parse_int(value)?,
                "home_position" => {
                    a.home_position = parse_int(value)?;
                    pending.home_set = true;
                }
                "safe_zone" => a.safe_zone = parse_int(value)?,
                "limit_polarity" => a.limit_polarity = parse_polarity(value)?,
                "direction_inverted" => a.direction_inverted = parse_bool(value)?,
                "homing_speed" => a.homing_speed_percent = parse_int(value)?,
                "min_speed" => a.min_speed = parse_float(value)?,
                "speed_full_scale" => a.scaling.speed_full_scale = parse_float(value)?,
                "accel_full_scale" => a.scaling.accel_full_scale = parse_float(value)?,
                _ => return Err(ParseError::UnknownKey),
            }
            Ok(())
        }
    }
}

fn save_section(
    config: &mut HeadConfig,
    current: &mut Option<PendingAxis>,
) -> Result<(), ParseError> {
    if let Some(mut pending) = current.take() {
        if !pending.home_set {
            pending.config.home_position =
                midpoint(pending.config.min_position, pending.config.max_position);
        }
        config
            .axes
            .push(pending.config)
            .map_err(|_| ParseError::TooManyItems)?;
    }
    Ok(())
}
