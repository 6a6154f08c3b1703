/// Continuation-token state for one discovery run
///
/// The directory API hands back a cursor that only becomes usable some time
/// after it is issued. The token moves through these states:
///
/// ```text
/// Absent -> Issued -> Maturing -> Valid -> Issued ... -> Exhausted
///                        |                                 ^
///                        +---------------------------------+
/// ```
use std::fmt;

/// State of a continuation token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenState {
    /// No token has been issued yet (first page not fetched)
    Absent,

    /// The API returned a token that has not been submitted yet
    Issued,

    /// The token has been submitted at least once and was rejected as not yet valid
    Maturing,

    /// The token was accepted and produced a page
    Valid,

    /// No further pages are available, or the retry ladder gave up
    Exhausted,
}

impl TokenState {
    /// Returns true while a follow-up page is being negotiated
    pub fn is_paginating(&self) -> bool {
        matches!(self, Self::Issued | Self::Maturing)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Absent => "absent",
            Self::Issued => "issued",
            Self::Maturing => "maturing",
            Self::Valid => "valid",
            Self::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for TokenState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An opaque continuation cursor together with its state
///
/// Owned by exactly one discovery run and dropped with it.
#[derive(Debug, Clone)]
pub struct AcquisitionToken {
    cursor: Option<String>,
    state: TokenState,
}

impl AcquisitionToken {
    /// Creates a token in the `Absent` state
    pub fn new() -> Self {
        Self {
            cursor: None,
            state: TokenState::Absent,
        }
    }

    pub fn state(&self) -> TokenState {
        self.state
    }

    /// The raw cursor, if one has been issued and not yet exhausted
    pub fn cursor(&self) -> Option<&str> {
        match self.state {
            TokenState::Issued | TokenState::Maturing | TokenState::Valid => self.cursor.as_deref(),
            TokenState::Absent | TokenState::Exhausted => None,
        }
    }

    /// Records the cursor returned with the latest page
    ///
    /// A missing or blank cursor means there are no more pages.
    pub fn issue(&mut self, cursor: Option<String>) {
        match cursor.filter(|c| !c.trim().is_empty()) {
            Some(cursor) if self.state != TokenState::Exhausted => {
                self.cursor = Some(cursor);
                self.state = TokenState::Issued;
            }
            _ => self.exhaust(),
        }
    }

    /// Marks the token as submitted and waiting to become valid
    pub fn begin_maturing(&mut self) {
        if self.state.is_paginating() {
            self.state = TokenState::Maturing;
        }
    }

    /// Marks the token as accepted by the API
    pub fn mark_valid(&mut self) {
        if self.state.is_paginating() {
            self.state = TokenState::Valid;
        }
    }

    /// Ends pagination; the cursor is discarded
    pub fn exhaust(&mut self) {
        self.cursor = None;
        self.state = TokenState::Exhausted;
    }
}

impl Default for AcquisitionToken {
    fn default() -> Self {
        Self::new()
    }
}
