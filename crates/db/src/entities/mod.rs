//! `SeaORM` entities.

pub mod scans;
pub mod sea_orm_active_enums;
