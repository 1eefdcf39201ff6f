//! Output and color utilities for consistent terminal formatting
//!
//! Provides shared color functions respecting NO_COLOR environment variable.

use colored::Colorize;

use crate::scoring::Zone;

/// Check if colors should be used (respects NO_COLOR env var)
pub fn use_colors() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Colorize question identifier (bold)
pub fn colorize_id(text: &str, use_color: bool) -> String {
    if use_color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize link (cyan)
pub fn colorize_link(text: &str, use_color: bool) -> String {
    if use_color {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize similarity percentage by confidence zone
pub fn colorize_percent(percent: f64, zone: Zone, use_color: bool) -> String {
    let text = format!("{:>6.2}%", percent);
    if !use_color {
        return text;
    }
    match zone {
        Zone::High => text.green().bold().to_string(),
        Zone::Medium => text.yellow().to_string(),
        Zone::Low => text.red().to_string(),
    }
}

/// Colorize raw distance (dimmed)
pub fn colorize_distance(distance: f32, use_color: bool) -> String {
    let text = format!("d={:.4}", distance);
    if use_color {
        text.dimmed().to_string()
    } else {
        text
    }
}
