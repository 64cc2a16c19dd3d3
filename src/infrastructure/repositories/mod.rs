//! Repository implementations using SeaORM

pub mod ledger_repository;
pub mod material_repository;

pub use ledger_repository::SeaOrmLedgerRepository;
pub use material_repository::SeaOrmMaterialRepository;
