#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

//===========================================================================//

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
/// A Windows resource type that can appear in a generated executable.
pub enum ResourceType {
    /// A single icon image (`RT_ICON`); its data is a DIB.
    Icon,
    /// An icon group (`RT_GROUP_ICON`); its data is a group icon directory
    /// that refers to icon resources by ID.
    GroupIcon,
}

impl ResourceType {
    #[cfg(test)]
    pub(crate) fn from_number(number: u16) -> Option<ResourceType> {
        match number {
            3 => Some(ResourceType::Icon),
            14 => Some(ResourceType::GroupIcon),
            _ => None,
        }
    }

    /// Returns the numeric resource type ID.
    pub fn number(&self) -> u16 {
        match *self {
            ResourceType::Icon => 3,
            ResourceType::GroupIcon => 14,
        }
    }
}

//===========================================================================//


//===========================================================================//
