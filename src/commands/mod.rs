pub mod cards;
pub mod check;
pub mod drill;
pub mod tutor;
