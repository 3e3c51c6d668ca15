//! `SeaORM` entity definitions.

pub mod posts;
