pub mod calc;
pub mod echo;
