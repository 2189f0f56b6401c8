//! Input rules shared by the client forms and the HTTP handlers.

use thiserror::Error;

use crate::link_id::is_valid_link_id;

/// Maximum owner display name length, in characters.
pub const NAME_MAX_CHARS: usize = 50;

/// Maximum message length, in characters.
pub const MESSAGE_MAX_CHARS: usize = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter your name")]
    EmptyName,

    #[error("Name must be at most {} characters", NAME_MAX_CHARS)]
    NameTooLong,

    #[error("Please agree to the terms")]
    TermsNotAccepted,

    #[error("Message cannot be empty")]
    EmptyMessage,

    #[error("Message must be at most {} characters", MESSAGE_MAX_CHARS)]
    MessageTooLong,

    #[error("Malformed link id")]
    InvalidLinkId,

    #[error("Wallet address is required")]
    EmptyWalletAddress,
}

/// Trim and check an owner display name. Returns the trimmed name.
pub fn owner_name(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::EmptyName);
    }
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(ValidationError::NameTooLong);
    }
    Ok(name)
}

/// Trim and check a message body. Returns the trimmed text.
pub fn message_text(text: &str) -> Result<&str, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    if text.chars().count() > MESSAGE_MAX_CHARS {
        return Err(ValidationError::MessageTooLong);
    }
    Ok(text)
}

/// Normalize a wallet address for storage and comparison.
pub fn wallet_address(address: &str) -> Result<String, ValidationError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(ValidationError::EmptyWalletAddress);
    }
    Ok(address.to_lowercase())
}

pub fn link_id(id: &str) -> Result<&str, ValidationError> {
    if is_valid_link_id(id) {
        Ok(id)
    } else {
        Err(ValidationError::InvalidLinkId)
    }
}
