//! Consensus over member values

/// Outcome of comparing one attribute across the members of a group
#[derive(Debug, Clone, PartialEq)]
pub enum Consensus<T> {
    /// Every contributing member holds this value
    Agreed(T),
    /// At least two contributing members differ
    Disagreement,
    /// No member is able to report this attribute
    NoContributors,
}

impl<T: PartialEq> Consensus<T> {
    pub fn of<I>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut values = values.into_iter();
        let Some(first) = values.next() else {
            return Consensus::NoContributors;
        };
        for value in values {
            if value != first {
                return Consensus::Disagreement;
            }
        }
        Consensus::Agreed(first)
    }
}

impl<T> Consensus<T> {
    pub fn agreed(self) -> Option<T> {
        match self {
            Consensus::Agreed(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_agreed(&self) -> Option<&T> {
        match self {
            Consensus::Agreed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_agreed(&self) -> bool {
        matches!(self, Consensus::Agreed(_))
    }

    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Consensus<U> {
        match self {
            Consensus::Agreed(value) => Consensus::Agreed(f(value)),
            Consensus::Disagreement => Consensus::Disagreement,
            Consensus::NoContributors => Consensus::NoContributors,
        }
    }
}
