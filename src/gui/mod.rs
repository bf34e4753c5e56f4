mod app;
mod message;

pub use app::run;
pub use message::Message;
