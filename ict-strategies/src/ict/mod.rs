//! Entry, exit, stop-loss, and take-profit determiners implementing the
//! ICT confluence model.

pub mod entry;
pub mod exit;
pub mod stop_loss;
pub mod take_profit;
