pub mod events;
pub mod leads;
pub mod pipeline;
pub mod reminders;
