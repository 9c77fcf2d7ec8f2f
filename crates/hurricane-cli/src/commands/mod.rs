pub mod events;
pub mod facts;
pub mod heuristic;
pub mod network;
pub mod time;
