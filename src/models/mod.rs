mod achievement;
mod history;
mod session;

pub use achievement::Achievement;
pub use history::HistoryStore;
pub use session::Session;
