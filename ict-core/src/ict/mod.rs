//! ICT (Inner Circle Trader) pattern detectors: the composable building
//! blocks `ict-strategies`' entry/exit determiners run over closed candles.
//!
//! Each submodule is a pure, synchronous function set — no I/O, no shared
//! state.

pub mod fvg;
pub mod killzones;
pub mod liquidity;
pub mod market_structure;
pub mod order_block;
pub mod smc;

pub use fvg::{detect_all_fvg, detect_bearish_fvg, detect_bullish_fvg, find_nearest_fvg, get_entry_zone, is_fvg_filled};
pub use killzones::{get_active_killzone, is_killzone_active, KillZone};
pub use liquidity::{calculate_premium_discount, detect_liquidity_sweep, find_equal_highs, find_equal_lows, is_in_discount, is_in_premium};
pub use market_structure::{detect_bos, detect_choch, get_current_trend, identify_swing_highs, identify_swing_lows, StructureEvent, SwingPoint};
pub use order_block::{find_nearest_ob, get_ob_zone, identify_bearish_ob, identify_bullish_ob};
pub use smc::{detect_displacement, detect_inducement, Displacement, Inducement};
