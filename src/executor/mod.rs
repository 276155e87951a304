pub mod events;
pub mod index;
pub mod predicate;
pub mod statement;
