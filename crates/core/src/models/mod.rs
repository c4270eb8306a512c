pub mod advisory;
pub mod calendar;
pub mod farm;
pub mod feeding;
pub mod growth;
pub mod pond;
pub mod settings;
pub mod summary;
pub mod transaction;
