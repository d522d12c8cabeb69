//! Host entities: the game-world objects scripts can see.
//!
//! Every room, area, mob and item (and each of their static templates) is
//! exposed to scripts through an [`Entity`]. The host allocates entities
//! into the heap as host-owned slots: the sweeper never reclaims them, the
//! host frees them explicitly, and the mark phase still walks their field
//! tables so values stored on an entity stay alive.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use super::ObjRef;
use crate::table::Table;

/// Which game-world object an entity stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Area,
    AreaTemplate,
    Room,
    RoomTemplate,
    Thing,
    ThingTemplate,
    Mob,
    MobTemplate,
}

impl EntityKind {
    pub const ALL: [EntityKind; 8] = [
        EntityKind::Area,
        EntityKind::AreaTemplate,
        EntityKind::Room,
        EntityKind::RoomTemplate,
        EntityKind::Thing,
        EntityKind::ThingTemplate,
        EntityKind::Mob,
        EntityKind::MobTemplate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Area => "Area",
            EntityKind::AreaTemplate => "AreaTemplate",
            EntityKind::Room => "Room",
            EntityKind::RoomTemplate => "RoomTemplate",
            EntityKind::Thing => "Thing",
            EntityKind::ThingTemplate => "ThingTemplate",
            EntityKind::Mob => "Mob",
            EntityKind::MobTemplate => "MobTemplate",
        }
    }

    pub fn is_template(self) -> bool {
        matches!(
            self,
            EntityKind::AreaTemplate
                | EntityKind::RoomTemplate
                | EntityKind::ThingTemplate
                | EntityKind::MobTemplate
        )
    }
}

/// Script-visible header of a host game object.
#[derive(Debug)]
pub struct Entity {
    pub kind: EntityKind,
    /// Interned display name.
    pub name: ObjRef,
    /// Script fields. A value may be a [`NativeField`] object, in which case
    /// reads and writes go through to the host.
    pub fields: Table,
    /// Class whose methods the entity responds to.
    pub class: Option<ObjRef>,
    /// Attached script object (closure or instance).
    pub script: Option<ObjRef>,
}

impl Entity {
    pub fn new(kind: EntityKind, name: ObjRef) -> Self {
        Self {
            kind,
            name,
            fields: Table::new(),
            class: None,
            script: None,
        }
    }
}

/// Typed access to one field of a host struct.
///
/// The host decides where the value lives; `Cell`/`RefCell` implementations
/// cover the common case of a field shared through an `Rc`.
pub trait Accessor<T> {
    fn get(&self) -> T;
    fn set(&self, value: T);
}

impl<T: Copy> Accessor<T> for Cell<T> {
    fn get(&self) -> T {
        Cell::get(self)
    }

    fn set(&self, value: T) {
        Cell::set(self, value);
    }
}

impl Accessor<String> for RefCell<String> {
    fn get(&self) -> String {
        self.borrow().clone()
    }

    fn set(&self, value: String) {
        *self.borrow_mut() = value;
    }
}

/// A field proxy marshaling between script values and a typed host field.
///
/// Stored as an object in an entity's field table. Reading `mob.hp` from a
/// script calls the accessor's `get`; assigning calls `set` after checking
/// the script value has the right type.
#[derive(Clone)]
pub enum NativeField {
    Int(Rc<dyn Accessor<i32>>),
    Double(Rc<dyn Accessor<f64>>),
    Bool(Rc<dyn Accessor<bool>>),
    Str(Rc<dyn Accessor<String>>),
}

impl NativeField {
    /// Name of the host type, for marshaling errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            NativeField::Int(_) => "int",
            NativeField::Double(_) => "double",
            NativeField::Bool(_) => "bool",
            NativeField::Str(_) => "string",
        }
    }
}

impl fmt::Debug for NativeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeField({})", self.type_name())
    }
}
