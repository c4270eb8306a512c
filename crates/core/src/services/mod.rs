pub mod advisory_service;
pub mod mutation_service;
pub mod seed_service;
pub mod summary_service;
pub mod sync_service;
