//! Build script for jib-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates head.toml at compile time

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Axes the firmware wires up, in coordinator order
const REQUIRED_AXES: [&str; 2] = ["pan", "tilt"];

const FLOAT_KEYS: [&str; 6] = [
    "max_speed",
    "default_acceleration",
    "acceleration",
    "min_speed",
    "speed_full_scale",
    "accel_full_scale",
];

const INT_KEYS: [&str; 5] = [
    "min_position",
    "max_position",
    "home_position",
    "safe_zone",
    "homing_speed",
];

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate head.toml at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=head.toml");

    let config_path = Path::new("head.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: head.toml not found!                                     ║\n\
            ║                                                                  ║\n\
            ║  The firmware embeds head.toml for its axis configuration.       ║\n\
            ║  Please create one in the jib-firmware directory.                ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read head.toml                                 ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in head.toml                         ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                ║                                                                  ║\n\
                {}\n\
                ║                                                                  ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();

    match config.get("axis").and_then(|a| a.as_table()) {
        Some(axes) => {
            for name in REQUIRED_AXES {
                if !axes.contains_key(name) {
                    errors.push(format!("Missing [axis.{}] section", name));
                }
            }
            for (name, axis) in axes {
                validate_axis(name, axis, &mut errors);
            }
        }
        None => errors.push("Missing [axis.*] sections".to_string()),
    }

    if let Some(table) = config.as_table() {
        for key in table.keys().filter(|k| k.as_str() != "axis") {
            errors.push(format!("Unknown top-level key '{}'", key));
        }
    }

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid head configuration in head.toml                  ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=head.toml validated successfully");
}

/// Check one `[axis.<name>]` table
fn validate_axis(name: &str, axis: &toml::Value, errors: &mut Vec<String>) {
    let Some(table) = axis.as_table() else {
        errors.push(format!("axis.{} must be a table", name));
        return;
    };

    for (key, value) in table {
        let key = key.as_str();
        if FLOAT_KEYS.contains(&key) {
            let ok = value.as_float().is_some() || value.as_integer().is_some();
            if !ok {
                errors.push(format!("axis.{}.{} must be a number", name, key));
            }
        } else if INT_KEYS.contains(&key) {
            if value.as_integer().is_none() {
                errors.push(format!("axis.{}.{} must be an integer", name, key));
            }
        } else if key == "limit_polarity" {
            match value.as_str() {
                Some("active_low" | "low" | "active_high" | "high") => {}
                _ => errors.push(format!(
                    "axis.{}.limit_polarity must be \"active_low\" or \"active_high\"",
                    name
                )),
            }
        } else if key == "direction_inverted" {
            if value.as_bool().is_none() {
                errors.push(format!("axis.{}.direction_inverted must be true/false", name));
            }
        } else {
            errors.push(format!("axis.{}: unknown key '{}'", name, key));
        }
    }

    let int = |key: &str| table.get(key).and_then(|v| v.as_integer());
    let min = int("min_position").unwrap_or(0);
    let max = int("max_position").unwrap_or(6000);
    let safe_zone = int("safe_zone").unwrap_or(20);

    if min >= max {
        errors.push(format!(
            "axis.{}: min_position ({}) must be below max_position ({})",
            name, min, max
        ));
        return;
    }
    if safe_zone < 0 || 2 * safe_zone >= max - min {
        errors.push(format!("axis.{}: safe_zone ({}) leaves no travel", name, safe_zone));
        return;
    }
    if let Some(home) = int("home_position") {
        if home < min + safe_zone || home > max - safe_zone {
            errors.push(format!(
                "axis.{}: home_position ({}) outside {}..={}",
                name,
                home,
                min + safe_zone,
                max - safe_zone
            ));
        }
    }
    if let Some(pct) = int("homing_speed") {
        if !(1..=100).contains(&pct) {
            errors.push(format!("axis.{}: homing_speed must be 1-100 %", name));
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
