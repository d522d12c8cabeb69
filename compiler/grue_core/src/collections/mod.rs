//! Auxiliary containers: a segmented vector with stable element addresses
//! and a doubly linked list of script values.

mod list;
mod seg_vec;

pub use list::ValueList;
pub use seg_vec::SegVec;
