use crate::entry::Entry;

/// Polish lifecycle of an entry as seen by a client.
///
/// `Unpolished -> Polishing -> Polished` is the only forward path.
/// `Polishing` is provisional: it falls back to `Unpolished` when the request
/// fails, and an edit of the raw text takes `Polished` back to `Unpolished`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PolishState {
    /// No polished text for the current raw text.
    #[default]
    Unpolished,
    /// A polish request is in flight.
    Polishing,
    /// Polished text is present and derived from the current raw text.
    Polished,
}

impl PolishState {
    /// The settled state implied by a server-confirmed entry.
    pub fn of(entry: &Entry) -> Self {
        if entry.is_polished() {
            Self::Polished
        } else {
            Self::Unpolished
        }
    }

    /// Returns true if the polish action may be triggered from this state.
    pub fn can_polish(&self) -> bool {
        matches!(self, Self::Unpolished)
    }

    /// Enter `Polishing`, or `None` if the trigger is disabled in this state.
    pub fn begin(self) -> Option<Self> {
        self.can_polish().then_some(Self::Polishing)
    }
}
