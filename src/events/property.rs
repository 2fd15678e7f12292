use super::ChangeSource;
use std::fmt;

/// Named change event raised when a publisher's property changes
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyChanged {
    property: String,
}

impl PropertyChanged {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn is(&self, property: &str) -> bool {
        self.property == property
    }
}

impl fmt::Display for PropertyChanged {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PropertyChanged({})", self.property)
    }
}

/// Publisher of [`PropertyChanged`] events with a fixed set of property names
///
/// The declared names let property-scoped subscriptions reject a name the
/// publisher can never raise.
pub trait NotifyPropertyChanged: ChangeSource<PropertyChanged> {
    /// Names of every property this publisher raises changes for
    fn property_names(&self) -> &[&'static str];

    fn has_property(&self, name: &str) -> bool {
        self.property_names().iter().any(|declared| *declared == name)
    }
}
