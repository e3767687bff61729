use crate::state::{EmbeddedParticipants, ParticipantRef};

pub const UNKNOWN_RUNNER: &str = "Unknown";
pub const GUEST_RUNNER: &str = "Guest";
pub const USER_RUNNER: &str = "User";

/// Resolves a run participant to a display name. Never fails: leaderboard payloads
/// routinely omit names, so every gap maps to a placeholder.
pub fn resolve(participant: Option<&ParticipantRef>, table: &EmbeddedParticipants) -> String {
    match participant {
        None | Some(ParticipantRef::Unrecognized) => UNKNOWN_RUNNER.to_string(),
        Some(ParticipantRef::Guest { name }) => non_empty(name.as_deref())
            .unwrap_or(GUEST_RUNNER)
            .to_string(),
        Some(ParticipantRef::Registered { ref_id }) => table
            .get(ref_id)
            .and_then(|entry| {
                non_empty(entry.international.as_deref())
                    .or_else(|| non_empty(entry.name.as_deref()))
            })
            .unwrap_or(USER_RUNNER)
            .to_string(),
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
