//! Plain data records of the store. Persistence lives in [`crate::storage`].
pub mod aggregates;
pub mod events;
pub mod value_objects;
