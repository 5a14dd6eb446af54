pub mod event;
pub mod participant;

pub use event::{Conferencing, Event, EventChanges, EventPatch, NewEvent, ReminderKind, StartAt};
pub use participant::{Participant, RsvpCounts, RsvpStatus};
