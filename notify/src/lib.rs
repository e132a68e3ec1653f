pub mod bus;
pub mod events;
pub mod listener;
pub mod notification;
