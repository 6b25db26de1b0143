pub mod cards;
pub mod chart;
pub mod controls;
pub mod debug;
pub mod filter_bar;
