//! Output formatting for CLI commands

use crate::{
    geometry::{GRID_SIZE, GridPoint},
    hunt::{GameState, PredatorAction, StepRecord},
};

/// Print a section header
pub fn print_section(title: &str) {
    println!("\n{}", "=".repeat(60));
    println!("{title}");
    println!("{}", "=".repeat(60));
}

/// Print a subsection header
pub fn print_subsection(title: &str) {
    println!("\n{title}");
    println!("{}", "-".repeat(40));
}

/// Format a number with thousands separators
pub fn format_number(n: usize) -> String {
    let s = n.to_string();
    let mut result = String::new();
    for (i, c) in s.chars().rev().enumerate() {
        if i > 0 && i.is_multiple_of(3) {
            result.insert(0, ',');
        }
        result.insert(0, c);
    }
    result
}

pub fn format_percent(rate: f64) -> String {
    format!("{:.1}%", rate * 100.0)
}

/// Print a key-value pair
pub fn print_kv(key: &str, value: &str) {
    println!("  {:20} {}", format!("{}:", key), value);
}

/// One line describing a tick of a hunt.
pub fn format_step(record: &StepRecord) -> String {
    let mut line = format!(
        "t={:3}  lion {} {:9} {:6}  impala {} {:10} {:10}",
        record.time_step,
        record.predator_position,
        record.predator_state.as_str(),
        record.predator_action.as_str(),
        record.prey_position,
        record.prey_state.as_str(),
        record.prey_action.as_str(),
    );
    if !record.info.is_empty() {
        line.push_str("  ");
        line.push_str(&record.info);
    }
    line
}

/// Q-values for the three predator actions, in their usual order.
pub fn format_q_row(row: &[f64; 3]) -> String {
    PredatorAction::ALL
        .iter()
        .map(|action| format!("{action}={:.3}", row[action.index()]))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Render the map: `L` lion, `I` impala, `~` waterhole, `.` open ground.
pub fn render_map(state: &GameState) -> String {
    let mut out = String::new();
    for row in 0..GRID_SIZE {
        for col in 0..GRID_SIZE {
            let cell = GridPoint::new(row, col);
            let glyph = if cell == state.predator.position {
                'L'
            } else if cell == state.prey.position {
                'I'
            } else if state.map.is_waterhole(cell) {
                '~'
            } else {
                '.'
            };
            out.push(glyph);
        }
        out.push('\n');
    }
    out
}
