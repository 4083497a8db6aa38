//! Core types for the pedigree kernel.

pub mod person;
pub mod family;
pub mod edge;
pub mod warning;
pub mod view;

pub use person::{
    PersonId, PersonNode, PersonRecord, PersonName, PersonEvent, PhotoRecord, TreePhoto, Sex,
};
pub use family::{FamilyId, FamilyRecord, FamilyType, FamilyUnit, Relationship};
pub use edge::{Edge, JunctionId};
pub use warning::{DataWarning, DataWarningKind};
pub use view::{DepthProbe, Junction, Position, PositionedCouple, PositionedNode, TreeView};
