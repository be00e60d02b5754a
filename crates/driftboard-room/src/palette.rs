//! Fixed ten-color palette assignment for room members.

use rand::Rng;

pub const PALETTE: [&str; 10] = [
    "#e6194b", "#3cb44b", "#ffe119", "#4363d8", "#f58231", "#911eb4", "#46f0f0", "#f032e6",
    "#bcf60c", "#fabebe",
];

/// First-unused sweep of the fixed palette; falls back to a random entry
/// once every color is already assigned to some room member.
pub fn assign_color(in_use: &[&str]) -> String {
    for candidate in PALETTE {
        if !in_use.contains(&candidate) {
            return candidate.to_string();
        }
    }
    let index = rand::thread_rng().gen_range(0..PALETTE.len());
    PALETTE[index].to_string()
}
