pub mod board;
pub mod contact;
pub mod deal;
pub mod lead;
pub mod stage;
