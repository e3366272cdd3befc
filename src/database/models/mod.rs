pub mod alert_entry;
pub mod category;
pub mod expense;
pub mod user;

pub use alert_entry::AlertLedgerEntry;
pub use category::Category;
pub use expense::Expense;
pub use user::User;
