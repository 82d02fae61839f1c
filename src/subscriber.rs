//! Subscriber records and the keyword-driven subscription state machine.
//!
//! [`decide`] is pure: it looks at the current record (if any) and the
//! normalized keyword and returns what should be written and which
//! confirmation, if any, goes back to the sender. Executing the decision is
//! the job of [`crate::service::SubscriptionService`].

use serde::{Deserialize, Serialize};

/// A phone number with its subscription flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    pub number: String,
    pub subscribed: bool,
}

impl Subscriber {
    /// A freshly subscribed record.
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            subscribed: true,
        }
    }
}

/// Recognized inbound keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    Subscribe,
    Stop,
}

impl Keyword {
    /// Matches trimmed, lower-cased text exactly; anything else is not a keyword.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_lowercase().as_str() {
            "subscribe" => Some(Keyword::Subscribe),
            "stop" => Some(Keyword::Stop),
            _ => None,
        }
    }
}

/// Confirmation sent back to the number whose state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Welcome,
    Resubscribed,
    Unsubscribed,
}

impl Notification {
    pub fn text(self) -> &'static str {
        match self {
            Notification::Welcome => {
                "Thanks for subscribing to our list! Send STOP anytime if you no longer want to receive messages from us."
            }
            Notification::Resubscribed => {
                "Thanks for re-subscribing to our list! Send STOP anytime if you no longer want to receive messages from us."
            }
            Notification::Unsubscribed => {
                "Sorry to see you go! You will not receive further marketing messages from us."
            }
        }
    }
}

/// Store write implied by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Write {
    Insert(Subscriber),
    SetSubscribed { number: String, subscribed: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing to write, nothing to send.
    Ignore,
    Apply {
        write: Write,
        notification: Notification,
    },
}

/// Maps the current record and inbound text to the next state.
pub fn decide(number: &str, current: Option<&Subscriber>, text: &str) -> Transition {
    let Some(keyword) = Keyword::parse(text) else {
        return Transition::Ignore;
    };

    match (current.map(|s| s.subscribed), keyword) {
        (None, Keyword::Subscribe) => Transition::Apply {
            write: Write::Insert(Subscriber::new(number)),
            notification: Notification::Welcome,
        },
        (Some(false), Keyword::Subscribe) => Transition::Apply {
            write: Write::SetSubscribed {
                number: number.to_string(),
                subscribed: true,
            },
            notification: Notification::Resubscribed,
        },
        (Some(true), Keyword::Stop) => Transition::Apply {
            write: Write::SetSubscribed {
                number: number.to_string(),
                subscribed: false,
            },
            notification: Notification::Unsubscribed,
        },
        (Some(true), Keyword::Subscribe) | (Some(false), Keyword::Stop) | (None, Keyword::Stop) => {
            Transition::Ignore
        }
    }
}
