pub mod agent;
pub mod events;
pub mod participants;
pub mod scheduler;
pub mod telegram;
pub mod time;
pub mod zoom;
