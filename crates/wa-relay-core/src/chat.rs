//! WhatsApp chat addressing.
//!
//! Callers hand us phone numbers in whatever shape they have them
//! (`+54 9 11 2345-6789`, `5491123456789`, ...). The automation client
//! addresses individual chats as `<digits>@c.us`.

use std::fmt;

use crate::error::{CoreError, Result};

/// Suffix WhatsApp uses for one-to-one chats.
pub const USER_CHAT_SUFFIX: &str = "@c.us";

/// A normalized one-to-one chat identifier (`<digits>@c.us`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatId(String);

impl ChatId {
    /// Build a chat ID from a caller-supplied phone number.
    ///
    /// Every non-digit character is dropped. No country code is inferred.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidPhone` if the input contains no digits.
    pub fn from_phone(phone: &str) -> Result<Self> {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(CoreError::InvalidPhone(phone.to_string()));
        }
        Ok(Self(format!("{digits}{USER_CHAT_SUFFIX}")))
    }

    /// Return the chat ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the phone digits without the chat suffix.
    #[must_use]
    pub fn digits(&self) -> &str {
        self.0.trim_end_matches(USER_CHAT_SUFFIX)
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ChatId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_digits() {
        let chat = ChatId::from_phone("5491123456789").unwrap();
        assert_eq!(chat.as_str(), "5491123456789@c.us");
        assert_eq!(chat.digits(), "5491123456789");
    }

    #[test]
    fn strips_formatting() {
        let chat = ChatId::from_phone("+54 (911) 2345-6789").unwrap();
        assert_eq!(chat.to_string(), "5491123456789@c.us");
    }

    #[test]
    fn rejects_phone_without_digits() {
        assert!(matches!(
            ChatId::from_phone("call me"),
            Err(CoreError::InvalidPhone(_))
        ));
        assert!(ChatId::from_phone("").is_err());
    }
}
