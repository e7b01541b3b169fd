use crate::heap::HeapId;

/// A user-defined class: a named type descriptor with an optional base class.
///
/// Classes carry no comparison slots of their own, so their instances only
/// ever compare through the default identity slot and the ordering fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Class {
    name: String,
    base: Option<HeapId>,
}

impl Class {
    /// The base, when given, must be a live `HeapData::Class`; the class holds a reference to it.
    #[must_use]
    pub(crate) fn new(name: String, base: Option<HeapId>) -> Self {
        Self { name, base }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base(&self) -> Option<HeapId> {
        self.base
    }
}

/// An instance of a user class.
///
/// Instances sit outside the closed variant set: deep copy and deep hash
/// reject them, comparison handles them by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    class: HeapId,
}

impl Instance {
    #[must_use]
    pub(crate) fn new(class: HeapId) -> Self {
        Self { class }
    }

    #[must_use]
    pub fn class(&self) -> HeapId {
        self.class
    }
}
