//! Input validation for identifiers, names, and amounts.
//!
//! Player ids double as storage key components, so the rules here are
//! stricter than plain display names: no path separators, no whitespace, no
//! key-delimiter characters.

use crate::game::errors::GameError;

pub const MIN_PLAYER_ID_LENGTH: usize = 2;
pub const MAX_PLAYER_ID_LENGTH: usize = 32;
pub const MAX_DRAGON_NAME_LENGTH: usize = 40;

/// Names no player may register; all lowercase for case-insensitive compare.
const RESERVED_IDS: &[&str] = &["admin", "system", "root", "moderator", "all"];

/// Validate a player id for use as a storage key component.
pub fn validate_player_id(player_id: &str) -> Result<(), GameError> {
    if player_id.len() < MIN_PLAYER_ID_LENGTH {
        return Err(GameError::Validation(format!(
            "player id too short (minimum {} characters)",
            MIN_PLAYER_ID_LENGTH
        )));
    }
    if player_id.len() > MAX_PLAYER_ID_LENGTH {
        return Err(GameError::Validation(format!(
            "player id too long (maximum {} characters)",
            MAX_PLAYER_ID_LENGTH
        )));
    }
    if !player_id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(GameError::Validation(
            "player id may only contain letters, digits, '_' and '-'".to_string(),
        ));
    }
    if RESERVED_IDS.contains(&player_id.to_ascii_lowercase().as_str()) {
        return Err(GameError::Validation(format!(
            "player id is reserved: {}",
            player_id
        )));
    }
    Ok(())
}

/// Validate a player-supplied dragon name.
pub fn validate_dragon_name(name: &str) -> Result<(), GameError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(GameError::Validation(
            "dragon name cannot be empty".to_string(),
        ));
    }
    if trimmed != name {
        return Err(GameError::Validation(
            "dragon name cannot start or end with whitespace".to_string(),
        ));
    }
    if name.chars().count() > MAX_DRAGON_NAME_LENGTH {
        return Err(GameError::Validation(format!(
            "dragon name too long (maximum {} characters)",
            MAX_DRAGON_NAME_LENGTH
        )));
    }
    if name.chars().any(|c| c.is_control()) {
        return Err(GameError::Validation(
            "dragon name contains control characters".to_string(),
        ));
    }
    Ok(())
}

/// Currency amounts must be positive.
pub fn validate_amount(amount: u64) -> Result<(), GameError> {
    if amount == 0 {
        return Err(GameError::Validation(
            "amount must be positive".to_string(),
        ));
    }
    Ok(())
}
