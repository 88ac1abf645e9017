pub mod btree;
pub mod btree_lookup;
pub mod btree_walker;
pub mod unpack;

#[cfg(any(test, feature = "devtools"))]
pub mod btree_builder;
