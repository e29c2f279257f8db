pub mod core;
pub use self::core::*;

#[path = "companies.rs"]
pub mod companies_schema;
pub use self::companies_schema::*;

pub mod directory;
pub use self::directory::*;

pub mod requests;
pub use self::requests::*;

pub mod calendar;
pub use self::calendar::*;
